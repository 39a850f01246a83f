//! # Stack, memory, storage and control flow operations
//!
//! Includes the following opcodes:
//!   - `POP`, `PC`, `GAS`
//!   - `MLOAD`, `MSTORE`, `MSTORE8`, `MSIZE`
//!   - `SLOAD`, `SSTORE`
//!   - `JUMP`, `JUMPI`, `JUMPDEST`

use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::u256_to_usize,
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `POP` opcode.
pub struct OpPopHandler;
impl OpcodeHandler for OpPopHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::POP)?;

        vm.current_call_frame.stack.pop1()?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `PC` opcode.
pub struct OpPcHandler;
impl OpcodeHandler for OpPcHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::PC)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.pc.into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `GAS` opcode: gas remaining after paying for
/// this instruction.
pub struct OpGasHandler;
impl OpcodeHandler for OpGasHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::GAS)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.gas_remaining().into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `MLOAD` opcode.
pub struct OpMLoadHandler;
impl OpcodeHandler for OpMLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let offset = u256_to_usize(vm.current_call_frame.stack.pop1()?)?;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mload(
                calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        let value = vm.current_call_frame.memory.load_word(offset)?;
        vm.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `MSTORE` opcode.
pub struct OpMStoreHandler;
impl OpcodeHandler for OpMStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, value] = vm.current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mstore(
                calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        vm.current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `MSTORE8` opcode: stores the low byte of the
/// value.
pub struct OpMStore8Handler;
impl OpcodeHandler for OpMStore8Handler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, value] = vm.current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::mstore8(
                calculate_memory_size(offset, 1)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        vm.current_call_frame
            .memory
            .store_data(offset, &[value.byte(0)])?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `MSIZE` opcode.
pub struct OpMSizeHandler;
impl OpcodeHandler for OpMSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::MSIZE)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.memory.len().into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SLOAD` opcode.
pub struct OpSLoadHandler;
impl OpcodeHandler for OpSLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let key = vm.current_call_frame.stack.pop1()?;
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::sload(vm.env.config.schedule()))?;

        let value = vm
            .db
            .get_storage_value(vm.current_call_frame.to, key)?;
        vm.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SSTORE` opcode.
///
/// Setting a zero slot to non-zero pays the creation price; clearing a
/// non-zero slot accrues the clearing refund. Gas is charged before the
/// write happens.
pub struct OpSStoreHandler;
impl OpcodeHandler for OpSStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [key, new_value] = vm.current_call_frame.stack.pop()?;
        let to = vm.current_call_frame.to;

        let current_value = vm.db.get_storage_value(to, key)?;
        let schedule = vm.env.config.schedule();

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::sstore(current_value, new_value, schedule))?;

        if !current_value.is_zero() && new_value.is_zero() {
            vm.substate.refunded_gas = vm
                .substate
                .refunded_gas
                .saturating_add(schedule.sstore_clears_refund);
        }

        if new_value != current_value {
            vm.update_account_storage(to, key, new_value)?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `JUMPDEST` opcode: a valid jump target, otherwise
/// a no-op.
pub struct OpJumpDestHandler;
impl OpcodeHandler for OpJumpDestHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPDEST)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `JUMP` opcode.
pub struct OpJumpHandler;
impl OpcodeHandler for OpJumpHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::JUMP)?;

        let target = vm.current_call_frame.stack.pop1()?;
        jump(vm, target)?;

        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }
}

/// Implementation for the `JUMPI` opcode: jump only when the condition is
/// non-zero.
pub struct OpJumpIHandler;
impl OpcodeHandler for OpJumpIHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPI)?;

        let [target, condition] = vm.current_call_frame.stack.pop()?;
        if !condition.is_zero() {
            jump(vm, target)?;
            Ok(OpcodeResult::Continue { pc_increment: 0 })
        } else {
            Ok(OpcodeResult::Continue { pc_increment: 1 })
        }
    }
}

/// A jump target must be a JUMPDEST byte outside any PUSH immediate, per
/// the destinations precomputed on frame entry.
fn jump(vm: &mut VM<'_>, target: U256) -> Result<(), VMError> {
    let target = u256_to_usize(target).unwrap_or(usize::MAX);
    if !vm.current_call_frame.is_valid_jump_destination(target) {
        return Err(ExceptionalHalt::InvalidJump(target).into());
    }
    vm.current_call_frame.pc = target;
    Ok(())
}
