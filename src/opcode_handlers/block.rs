//! # Block information operations
//!
//! Includes the following opcodes:
//!   - `BLOCKHASH`
//!   - `COINBASE`
//!   - `TIMESTAMP`
//!   - `NUMBER`
//!   - `DIFFICULTY`
//!   - `GASLIMIT`

use crate::{
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    utils::{address_to_word, h256_to_u256},
    vm::VM,
};

/// Implementation for the `BLOCKHASH` opcode. Only the 256 most recent
/// blocks are available; anything else yields zero.
pub struct OpBlockHashHandler;
impl OpcodeHandler for OpBlockHashHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::BLOCKHASH)?;

        let block_number = vm.current_call_frame.stack.pop1()?;

        let current_block = vm.env.block_number;
        if block_number < current_block.saturating_sub(LAST_AVAILABLE_BLOCK_LIMIT)
            || block_number >= current_block
        {
            vm.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let block_number: u64 = block_number
            .try_into()
            .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;
        let block_hash = vm.db.store.get_block_hash(block_number)?;
        vm.current_call_frame.stack.push(h256_to_u256(block_hash))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `COINBASE` opcode.
pub struct OpCoinbaseHandler;
impl OpcodeHandler for OpCoinbaseHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::COINBASE)?;

        vm.current_call_frame
            .stack
            .push(address_to_word(vm.env.coinbase))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `TIMESTAMP` opcode.
pub struct OpTimestampHandler;
impl OpcodeHandler for OpTimestampHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::TIMESTAMP)?;

        vm.current_call_frame.stack.push(vm.env.timestamp)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `NUMBER` opcode.
pub struct OpNumberHandler;
impl OpcodeHandler for OpNumberHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::NUMBER)?;

        vm.current_call_frame.stack.push(vm.env.block_number)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `DIFFICULTY` opcode.
pub struct OpDifficultyHandler;
impl OpcodeHandler for OpDifficultyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::DIFFICULTY)?;

        vm.current_call_frame.stack.push(vm.env.difficulty)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `GASLIMIT` opcode (the block gas limit).
pub struct OpGasLimitHandler;
impl OpcodeHandler for OpGasLimitHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::GASLIMIT)?;

        vm.current_call_frame
            .stack
            .push(vm.env.block_gas_limit.into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
