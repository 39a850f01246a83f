use crate::account::Log;
use bytes::Bytes;
use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top level error of the virtual machine.
///
/// Most variants describe a failure of the *current frame* and are handled
/// by the caller frame (push 0, consume gas); only internal and database
/// errors propagate out of the VM.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VMError {
    #[error("exceptional halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    /// The REVERT opcode. Not an exceptional halt: unused gas is returned
    /// to the caller and the return data is preserved.
    #[error("revert opcode")]
    RevertOpcode,
    /// Contract creation targeted an address that already has code or a
    /// non-zero nonce.
    #[error("address already occupied")]
    AddressAlreadyOccupied,
    /// The sender cannot cover the value it is trying to transfer.
    #[error("insufficient funds for transfer")]
    InsufficientFunds,
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl VMError {
    /// Errors that are bugs or infrastructure failures rather than EVM
    /// semantics. These abort execution instead of becoming a frame result.
    pub fn should_propagate(&self) -> bool {
        matches!(self, VMError::Internal(_) | VMError::Database(_))
    }

    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }
}

/// Frame-fatal conditions. The frame halts and all of its remaining gas is
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExceptionalHalt {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid jump destination {0}")]
    InvalidJump(usize),
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
    #[error("state modifying opcode in static context")]
    OpcodeNotAllowedInStaticContext,
    #[error("deployed contract exceeds the code size limit")]
    ContractOutputTooBig,
    #[error("offset out of bounds")]
    OutOfBounds,
    #[error("value does not fit in the machine word")]
    VeryLargeNumber,
}

/// Invariant violations inside the VM itself. Reaching one of these is a
/// bug, never a property of the executed program.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InternalError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("slicing out of bounds")]
    Slicing,
    #[error("type conversion failed")]
    TypeConversion,
    #[error("call frame stack is empty")]
    CouldNotPopCallframe,
    #[error("substate backup stack is empty")]
    MissingSubstateBackup,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{0}")]
pub struct DatabaseError(pub String);

/// Outcome of a single opcode execution within the interpreter loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    /// Keep running; advance the program counter by `pc_increment` bytes.
    /// Opcodes that set the counter themselves (a taken JUMP/JUMPI) return
    /// an increment of zero.
    Continue { pc_increment: usize },
    /// The frame halted successfully (STOP, RETURN or SELFDESTRUCT).
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

/// Result of one finished frame, before it is merged into the caller.
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub result: TxResult,
    pub gas_used: u64,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}

/// What the host receives after the top level frame finishes. The world
/// state delta itself stays in the [`GeneralizedDatabase`] cache.
///
/// [`GeneralizedDatabase`]: crate::db::gen_db::GeneralizedDatabase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub result: TxResult,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
    /// Accounts scheduled for deletion, to be materialized by the host at
    /// the end of the transaction.
    pub selfdestructed: Vec<Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, TxResult::Success)
    }
}
