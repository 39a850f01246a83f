//! # Comparison and bitwise logic operations
//!
//! Includes the following opcodes:
//!   - `LT`, `GT`, `SLT`, `SGT`, `EQ`, `ISZERO`
//!   - `AND`, `OR`, `XOR`, `NOT`
//!   - `BYTE`, `SHL`, `SHR`, `SAR`

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    utils::u256_from_bool,
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `LT` opcode.
pub struct OpLtHandler;
impl OpcodeHandler for OpLtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::LT)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(u256_from_bool(lhs < rhs))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `GT` opcode.
pub struct OpGtHandler;
impl OpcodeHandler for OpGtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::GT)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(u256_from_bool(lhs > rhs))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SLT` opcode (signed less than).
pub struct OpSLtHandler;
impl OpcodeHandler for OpSLtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SLT)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        let lhs_is_negative = lhs.bit(255);
        let rhs_is_negative = rhs.bit(255);
        let result = if lhs_is_negative == rhs_is_negative {
            // Same sign: magnitudes compare like unsigned values.
            u256_from_bool(lhs < rhs)
        } else {
            u256_from_bool(lhs_is_negative)
        };
        vm.current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SGT` opcode (signed greater than).
pub struct OpSGtHandler;
impl OpcodeHandler for OpSGtHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SGT)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        let lhs_is_negative = lhs.bit(255);
        let rhs_is_negative = rhs.bit(255);
        let result = if lhs_is_negative == rhs_is_negative {
            u256_from_bool(lhs > rhs)
        } else {
            u256_from_bool(rhs_is_negative)
        };
        vm.current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `EQ` opcode.
pub struct OpEqHandler;
impl OpcodeHandler for OpEqHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::EQ)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame
            .stack
            .push(u256_from_bool(lhs == rhs))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `ISZERO` opcode.
pub struct OpIsZeroHandler;
impl OpcodeHandler for OpIsZeroHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::ISZERO)?;

        let operand = vm.current_call_frame.stack.pop1()?;
        vm.current_call_frame
            .stack
            .push(u256_from_bool(operand.is_zero()))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `AND` opcode.
pub struct OpAndHandler;
impl OpcodeHandler for OpAndHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::AND)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs & rhs)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `OR` opcode.
pub struct OpOrHandler;
impl OpcodeHandler for OpOrHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::OR)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs | rhs)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `XOR` opcode.
pub struct OpXorHandler;
impl OpcodeHandler for OpXorHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::XOR)?;

        let [lhs, rhs] = vm.current_call_frame.stack.pop()?;
        vm.current_call_frame.stack.push(lhs ^ rhs)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `NOT` opcode.
pub struct OpNotHandler;
impl OpcodeHandler for OpNotHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::NOT)?;

        let operand = vm.current_call_frame.stack.pop1()?;
        vm.current_call_frame.stack.push(!operand)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `BYTE` opcode: `index`-th byte of the word,
/// counted from the most significant end.
pub struct OpByteHandler;
impl OpcodeHandler for OpByteHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::BYTE)?;

        let [index, value] = vm.current_call_frame.stack.pop()?;
        if index < U256::from(32) {
            // U256::byte counts from the least significant end.
            let byte_index = 31 - index.as_usize();
            vm.current_call_frame
                .stack
                .push(U256::from(value.byte(byte_index)))?;
        } else {
            vm.current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SHL` opcode.
pub struct OpShlHandler;
impl OpcodeHandler for OpShlHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SHL)?;

        let [shift, value] = vm.current_call_frame.stack.pop()?;
        if shift < U256::from(256) {
            vm.current_call_frame
                .stack
                .push(value << shift.as_usize())?;
        } else {
            vm.current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SHR` opcode (logical shift right).
pub struct OpShrHandler;
impl OpcodeHandler for OpShrHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SHR)?;

        let [shift, value] = vm.current_call_frame.stack.pop()?;
        if shift < U256::from(256) {
            vm.current_call_frame
                .stack
                .push(value >> shift.as_usize())?;
        } else {
            vm.current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}

/// Implementation for the `SAR` opcode (arithmetic shift right): the sign
/// bit backfills the vacated high bits.
pub struct OpSarHandler;
impl OpcodeHandler for OpSarHandler {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame.increase_consumed_gas(gas_cost::SAR)?;

        let [shift, value] = vm.current_call_frame.stack.pop()?;
        let is_negative = value.bit(255);

        let result = if shift < U256::from(256) {
            let shift = shift.as_usize();
            let mut shifted = value >> shift;
            if is_negative && shift > 0 {
                shifted |= U256::MAX << (256 - shift);
            }
            shifted
        } else if is_negative {
            U256::MAX
        } else {
            U256::zero()
        };
        vm.current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
