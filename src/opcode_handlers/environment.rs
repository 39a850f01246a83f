//! # Environment operations
//!
//! Includes the following opcodes:
//!   - `ADDRESS`, `ORIGIN`, `CALLER`, `CALLVALUE`, `GASPRICE`
//!   - `CALLDATALOAD`, `CALLDATASIZE`, `CALLDATACOPY`
//!   - `CODESIZE`, `CODECOPY`
//!   - `BALANCE`, `EXTCODESIZE`, `EXTCODECOPY`, `EXTCODEHASH`
//!   - `RETURNDATASIZE`, `RETURNDATACOPY`

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::{Memory, calculate_memory_size},
    opcode_handlers::OpcodeHandler,
    utils::{address_to_word, h256_to_u256, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ethereum_types::U256;

/// Copy `size` bytes of `data` starting at `data_offset` into memory,
/// zero filling everything past the end of `data`.
fn copy_zero_padded(
    memory: &mut Memory,
    dest_offset: usize,
    data: &[u8],
    data_offset: usize,
    size: usize,
) -> Result<(), VMError> {
    if size == 0 {
        return Ok(());
    }

    let mut buffer = vec![0u8; size];
    if data_offset < data.len() {
        let copy_size = size.min(data.len() - data_offset);
        buffer[..copy_size].copy_from_slice(&data[data_offset..data_offset + copy_size]);
    }
    memory.store_data(dest_offset, &buffer)
}

/// Implementation for the `ADDRESS` opcode.
pub struct OpAddressHandler;
impl OpcodeHandler for OpAddressHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::ADDRESS)?;

        vm.current_call_frame
            .stack
            .push(address_to_word(vm.current_call_frame.to))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `ORIGIN` opcode.
pub struct OpOriginHandler;
impl OpcodeHandler for OpOriginHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::ORIGIN)?;

        vm.current_call_frame
            .stack
            .push(address_to_word(vm.env.origin))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CALLER` opcode.
pub struct OpCallerHandler;
impl OpcodeHandler for OpCallerHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLER)?;

        vm.current_call_frame
            .stack
            .push(address_to_word(vm.current_call_frame.msg_sender))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CALLVALUE` opcode.
pub struct OpCallValueHandler;
impl OpcodeHandler for OpCallValueHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLVALUE)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.msg_value)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `GASPRICE` opcode.
pub struct OpGasPriceHandler;
impl OpcodeHandler for OpGasPriceHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::GASPRICE)?;

        vm.current_call_frame.stack.push(vm.env.gas_price)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `BALANCE` opcode.
pub struct OpBalanceHandler;
impl OpcodeHandler for OpBalanceHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::balance(vm.env.config.schedule()))?;

        let balance = vm.db.get_balance(address)?;
        vm.current_call_frame.stack.push(balance)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CALLDATALOAD` opcode: 32 bytes of calldata,
/// zero padded past its end.
pub struct OpCallDataLoadHandler;
impl OpcodeHandler for OpCallDataLoadHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLDATALOAD)?;

        let offset = vm.current_call_frame.stack.pop1()?;
        let offset = u256_to_usize(offset).unwrap_or(usize::MAX);

        let calldata = &vm.current_call_frame.calldata;
        let mut word = [0u8; 32];
        if offset < calldata.len() {
            let copy_size = 32.min(calldata.len() - offset);
            word[..copy_size].copy_from_slice(&calldata[offset..offset + copy_size]);
        }

        vm.current_call_frame
            .stack
            .push(U256::from_big_endian(&word))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CALLDATASIZE` opcode.
pub struct OpCallDataSizeHandler;
impl OpcodeHandler for OpCallDataSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CALLDATASIZE)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.calldata.len().into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CALLDATACOPY` opcode.
pub struct OpCallDataCopyHandler;
impl OpcodeHandler for OpCallDataCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, data_offset, size] = vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let data_offset = u256_to_usize(data_offset).unwrap_or(usize::MAX);

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::calldatacopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        let calldata = vm.current_call_frame.calldata.clone();
        copy_zero_padded(
            &mut vm.current_call_frame.memory,
            dest_offset,
            &calldata,
            data_offset,
            size,
        )?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CODESIZE` opcode.
pub struct OpCodeSizeHandler;
impl OpcodeHandler for OpCodeSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::CODESIZE)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.bytecode.len().into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `CODECOPY` opcode.
pub struct OpCodeCopyHandler;
impl OpcodeHandler for OpCodeCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, code_offset, size] = vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = u256_to_usize(code_offset).unwrap_or(usize::MAX);

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::codecopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        let bytecode = vm.current_call_frame.bytecode.clone();
        copy_zero_padded(
            &mut vm.current_call_frame.memory,
            dest_offset,
            &bytecode,
            code_offset,
            size,
        )?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `EXTCODESIZE` opcode.
pub struct OpExtCodeSizeHandler;
impl OpcodeHandler for OpExtCodeSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodesize(vm.env.config.schedule()))?;

        let code_size = vm.db.get_code(address)?.len();
        vm.current_call_frame.stack.push(code_size.into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `EXTCODECOPY` opcode.
pub struct OpExtCodeCopyHandler;
impl OpcodeHandler for OpExtCodeCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [address, dest_offset, code_offset, size] = vm.current_call_frame.stack.pop()?;
        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = u256_to_usize(code_offset).unwrap_or(usize::MAX);

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodecopy(
                size,
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                vm.env.config.schedule(),
            )?)?;

        let code = vm.db.get_code(address)?;
        copy_zero_padded(
            &mut vm.current_call_frame.memory,
            dest_offset,
            &code,
            code_offset,
            size,
        )?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `EXTCODEHASH` opcode: hash of the account's code,
/// or zero for accounts that do not exist (or are empty).
pub struct OpExtCodeHashHandler;
impl OpcodeHandler for OpExtCodeHashHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(vm.current_call_frame.stack.pop1()?);
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::extcodehash(vm.env.config.schedule()))?;

        if !vm.db.account_exists(address)? || vm.db.get_account(address)?.is_empty() {
            vm.current_call_frame.stack.push_zero()?;
        } else {
            let code_hash = vm.db.get_code_hash(address)?;
            vm.current_call_frame.stack.push(h256_to_u256(code_hash))?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `RETURNDATASIZE` opcode.
pub struct OpReturnDataSizeHandler;
impl OpcodeHandler for OpReturnDataSizeHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame
            .increase_consumed_gas(gas_cost::RETURNDATASIZE)?;

        vm.current_call_frame
            .stack
            .push(vm.current_call_frame.sub_return_data.len().into())?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `RETURNDATACOPY` opcode. Unlike the other copy
/// opcodes, reading past the end of the return buffer is an exceptional
/// halt rather than zero fill.
pub struct OpReturnDataCopyHandler;
impl OpcodeHandler for OpReturnDataCopyHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [dest_offset, data_offset, size] = vm.current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let data_offset = u256_to_usize(data_offset).unwrap_or(usize::MAX);

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::returndatacopy(
                calculate_memory_size(dest_offset, size)?,
                vm.current_call_frame.memory.len(),
                size,
            )?)?;

        if size == 0 && data_offset == 0 {
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let sub_return_data = vm.current_call_frame.sub_return_data.clone();
        let copy_end = data_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfBounds)?;
        if copy_end > sub_return_data.len() {
            return Err(ExceptionalHalt::OutOfBounds.into());
        }

        vm.current_call_frame
            .memory
            .store_data(dest_offset, &sub_return_data[data_offset..copy_end])?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
