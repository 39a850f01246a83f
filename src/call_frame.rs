use crate::{
    account::Account,
    constants::STACK_LIMIT,
    errors::{ExceptionalHalt, VMError},
    memory::Memory,
    opcodes::Opcode,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Bounded LIFO of machine words, capped at 1024 entries.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        self.values.push(value);
        Ok(())
    }

    pub fn push_zero(&mut self) -> Result<(), VMError> {
        self.push(U256::zero())
    }

    pub fn pop1(&mut self) -> Result<U256, VMError> {
        self.values
            .pop()
            .ok_or(ExceptionalHalt::StackUnderflow.into())
    }

    /// Pop `N` values at once; the top of the stack ends up first in the
    /// returned array.
    pub fn pop<const N: usize>(&mut self) -> Result<[U256; N], VMError> {
        if self.values.len() < N {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        let mut popped = [U256::zero(); N];
        for value in popped.iter_mut() {
            // Length was checked above.
            *value = self.values.pop().ok_or(ExceptionalHalt::StackUnderflow)?;
        }
        Ok(popped)
    }

    /// Duplicate the value at 0-indexed depth `N` onto the top; DUP1 is
    /// `dup::<0>()`.
    pub fn dup<const N: usize>(&mut self) -> Result<(), VMError> {
        let len = self.values.len();
        if len <= N {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        let value = self.values[len - 1 - N];
        self.push(value)
    }

    /// Swap the top with the value at depth `N`; SWAP1 is `swap::<1>()`.
    pub fn swap<const N: usize>(&mut self) -> Result<(), VMError> {
        let len = self.values.len();
        if len <= N {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        self.values.swap(len - 1, len - 1 - N);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Originals of everything a frame mutated in the world cache, recorded at
/// first touch. Replayed on failure, merged into the parent on success so a
/// later revert higher up still restores correctly.
#[derive(Debug, Clone, Default)]
pub struct CallFrameBackup {
    /// `None` means the account did not exist before this frame touched it.
    pub original_accounts: FxHashMap<Address, Option<Account>>,
}

impl CallFrameBackup {
    /// Record the pre-image of an account unless this frame already did.
    pub fn backup_account(&mut self, address: Address, original: Option<Account>) {
        self.original_accounts.entry(address).or_insert(original);
    }

    /// Absorb a child backup: the parent keeps its own, earlier originals.
    pub fn absorb(&mut self, child: CallFrameBackup) {
        for (address, original) in child.original_accounts {
            self.original_accounts.entry(address).or_insert(original);
        }
    }

    pub fn clear(&mut self) {
        self.original_accounts.clear();
    }
}

/// Scan bytecode for the offsets a JUMP/JUMPI may target: every JUMPDEST
/// byte that does not sit inside the immediate data of a PUSH.
pub fn valid_jump_destinations(code: &[u8]) -> BTreeSet<usize> {
    let mut destinations = BTreeSet::new();
    let mut pc = 0;
    while let Some(&byte) = code.get(pc) {
        if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&byte) {
            // Skip the PUSH immediate: those bytes are data, not code.
            pc += (byte - Opcode::PUSH1 as u8) as usize + 1;
        } else if byte == Opcode::JUMPDEST as u8 {
            destinations.insert(pc);
        }
        pc += 1;
    }
    destinations
}

/// The mutable state of one message call or contract creation. Created on
/// frame entry, consumed when the frame halts.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    /// Address whose context produced this frame (the `CALLER` opcode).
    pub msg_sender: Address,
    /// Address whose storage and balance this frame operates on.
    pub to: Address,
    /// Address the executing bytecode was loaded from. Differs from `to`
    /// for CALLCODE and DELEGATECALL.
    pub code_address: Address,
    pub bytecode: Bytes,
    pub valid_jump_destinations: BTreeSet<usize>,
    pub msg_value: U256,
    pub calldata: Bytes,
    pub is_static: bool,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub depth: usize,
    pub is_create: bool,
    /// Caller memory range the return data gets copied back into.
    pub ret_offset: usize,
    pub ret_size: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub pc: usize,
    /// Data returned by this frame (RETURN/REVERT, or deployed code on
    /// successful creation before the deposit).
    pub output: Bytes,
    /// Return data of the most recent completed subcall.
    pub sub_return_data: Bytes,
    pub call_frame_backup: CallFrameBackup,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
    ) -> Self {
        let valid_jump_destinations = valid_jump_destinations(&bytecode);
        Self {
            msg_sender,
            to,
            code_address,
            bytecode,
            valid_jump_destinations,
            msg_value,
            calldata,
            is_static,
            gas_limit,
            gas_used: 0,
            depth,
            is_create,
            ret_offset,
            ret_size,
            stack: Stack::default(),
            memory: Memory::new(),
            pc: 0,
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            call_frame_backup: CallFrameBackup::default(),
        }
    }

    /// Byte at the program counter. Running past the end of the code
    /// behaves as STOP.
    pub fn next_opcode(&self) -> u8 {
        self.bytecode
            .get(self.pc)
            .copied()
            .unwrap_or(Opcode::STOP as u8)
    }

    /// Check arity and cost in one step: debit `gas`, failing with
    /// OutOfGas before any state is touched.
    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), VMError> {
        let next_gas_used = self
            .gas_used
            .checked_add(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if next_gas_used > self.gas_limit {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        self.gas_used = next_gas_used;
        Ok(())
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_used)
    }

    /// Hand back gas a subcall did not consume.
    pub fn return_unused_gas(&mut self, gas: u64) {
        self.gas_used = self.gas_used.saturating_sub(gas);
    }

    pub fn is_valid_jump_destination(&self, target: usize) -> bool {
        self.valid_jump_destinations.contains(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_destinations_skip_push_immediates() {
        // PUSH2 0x5b5b JUMPDEST: only offset 3 is valid.
        let code = [0x61, 0x5b, 0x5b, 0x5b];
        let destinations = valid_jump_destinations(&code);
        assert!(!destinations.contains(&1));
        assert!(!destinations.contains(&2));
        assert!(destinations.contains(&3));
    }

    #[test]
    fn jump_destinations_of_truncated_push() {
        // PUSH32 with only 2 immediate bytes present: nothing is a
        // destination, and the scan must not run off the end.
        let code = [0x7f, 0x5b, 0x5b];
        assert!(valid_jump_destinations(&code).is_empty());
    }

    #[test]
    fn gas_accounting_is_monotonic() {
        let mut frame = CallFrame {
            gas_limit: 10,
            ..Default::default()
        };
        frame.increase_consumed_gas(4).unwrap();
        frame.increase_consumed_gas(6).unwrap();
        assert_eq!(frame.gas_remaining(), 0);
        assert!(frame.increase_consumed_gas(1).is_err());
        // A failed debit must not change the counter.
        assert_eq!(frame.gas_used, 10);
    }

    #[test]
    fn pc_past_end_reads_stop() {
        let frame = CallFrame {
            bytecode: Bytes::from_static(&[0x01]),
            pc: 5,
            ..Default::default()
        };
        assert_eq!(frame.next_opcode(), 0x00);
    }
}
