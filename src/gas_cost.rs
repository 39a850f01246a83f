//! Gas costs of the EVM instructions.
//!
//! Costs that never changed across the supported forks live here as plain
//! constants; everything fork-dependent is routed through the active
//! [`FeeSchedule`].

use crate::{
    environment::EvmConfig,
    errors::{ExceptionalHalt, VMError},
    gas_schedule::FeeSchedule,
    memory,
};
use ExceptionalHalt::OutOfGas;
use ethereum_types::U256;

// Constant opcode costs.
pub const STOP: u64 = 0;
pub const ADD: u64 = 3;
pub const MUL: u64 = 5;
pub const SUB: u64 = 3;
pub const DIV: u64 = 5;
pub const SDIV: u64 = 5;
pub const MOD: u64 = 5;
pub const SMOD: u64 = 5;
pub const ADDMOD: u64 = 8;
pub const MULMOD: u64 = 8;
pub const EXP_STATIC: u64 = 10;
pub const SIGNEXTEND: u64 = 5;
pub const LT: u64 = 3;
pub const GT: u64 = 3;
pub const SLT: u64 = 3;
pub const SGT: u64 = 3;
pub const EQ: u64 = 3;
pub const ISZERO: u64 = 3;
pub const AND: u64 = 3;
pub const OR: u64 = 3;
pub const XOR: u64 = 3;
pub const NOT: u64 = 3;
pub const BYTE: u64 = 3;
pub const SHL: u64 = 3;
pub const SHR: u64 = 3;
pub const SAR: u64 = 3;
pub const KECCAK256_STATIC: u64 = 30;
pub const KECCAK256_DYNAMIC_BASE: u64 = 6;
pub const ADDRESS: u64 = 2;
pub const ORIGIN: u64 = 2;
pub const CALLER: u64 = 2;
pub const CALLVALUE: u64 = 2;
pub const CALLDATALOAD: u64 = 3;
pub const CALLDATASIZE: u64 = 2;
pub const CALLDATACOPY_STATIC: u64 = 3;
pub const CALLDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const CODESIZE: u64 = 2;
pub const CODECOPY_STATIC: u64 = 3;
pub const CODECOPY_DYNAMIC_BASE: u64 = 3;
pub const GASPRICE: u64 = 2;
pub const EXTCODECOPY_DYNAMIC_BASE: u64 = 3;
pub const RETURNDATASIZE: u64 = 2;
pub const RETURNDATACOPY_STATIC: u64 = 3;
pub const RETURNDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const BLOCKHASH: u64 = 20;
pub const COINBASE: u64 = 2;
pub const TIMESTAMP: u64 = 2;
pub const NUMBER: u64 = 2;
pub const DIFFICULTY: u64 = 2;
pub const GASLIMIT: u64 = 2;
pub const POP: u64 = 2;
pub const MLOAD_STATIC: u64 = 3;
pub const MSTORE_STATIC: u64 = 3;
pub const MSTORE8_STATIC: u64 = 3;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;
pub const JUMPDEST: u64 = 1;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;

// Precompile costs (Frontier set).
pub const ECRECOVER_COST: u64 = 3000;
pub const SHA2_256_STATIC_COST: u64 = 60;
pub const SHA2_256_DYNAMIC_BASE: u64 = 12;
pub const RIPEMD_160_STATIC_COST: u64 = 600;
pub const RIPEMD_160_DYNAMIC_BASE: u64 = 120;
pub const IDENTITY_STATIC_COST: u64 = 15;
pub const IDENTITY_DYNAMIC_BASE: u64 = 3;

const WORD_SIZE: usize = 32;

/// EXP cost: static part plus a per-byte charge on the significant bytes of
/// the exponent. The per-byte charge was repriced by EIP-160.
pub fn exp(exponent: U256, schedule: &FeeSchedule) -> Result<u64, VMError> {
    let exponent_byte_size = (exponent.bits().checked_add(7).ok_or(OutOfGas)?) / 8;

    let exponent_byte_size: u64 = exponent_byte_size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let dynamic_cost = schedule
        .exp_byte
        .checked_mul(exponent_byte_size)
        .ok_or(OutOfGas)?;

    EXP_STATIC.checked_add(dynamic_cost).ok_or(OutOfGas.into())
}

pub fn calldatacopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        CALLDATACOPY_DYNAMIC_BASE,
        CALLDATACOPY_STATIC,
    )
}

pub fn codecopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        CODECOPY_DYNAMIC_BASE,
        CODECOPY_STATIC,
    )
}

pub fn returndatacopy(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        RETURNDATACOPY_DYNAMIC_BASE,
        RETURNDATACOPY_STATIC,
    )
}

pub fn extcodecopy(
    size: usize,
    new_memory_size: usize,
    current_memory_size: usize,
    schedule: &FeeSchedule,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        EXTCODECOPY_DYNAMIC_BASE,
        schedule.extcodecopy_base,
    )
}

fn copy_behavior(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    dynamic_base: u64,
    static_cost: u64,
) -> Result<u64, VMError> {
    let minimum_word_size = (size.checked_add(WORD_SIZE).ok_or(OutOfGas)?.saturating_sub(1))
        / WORD_SIZE;

    let minimum_word_size: u64 = minimum_word_size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let minimum_word_size_cost = dynamic_base
        .checked_mul(minimum_word_size)
        .ok_or(OutOfGas)?;
    static_cost
        .checked_add(minimum_word_size_cost)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn keccak256(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    copy_behavior(
        new_memory_size,
        current_memory_size,
        size,
        KECCAK256_DYNAMIC_BASE,
        KECCAK256_STATIC,
    )
}

pub fn log(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    number_of_topics: usize,
) -> Result<u64, VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let number_of_topics: u64 = number_of_topics
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;
    let topics_cost = LOGN_DYNAMIC_BASE
        .checked_mul(number_of_topics)
        .ok_or(OutOfGas)?;

    let size: u64 = size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;
    let bytes_cost = LOGN_DYNAMIC_BYTE_BASE.checked_mul(size).ok_or(OutOfGas)?;

    topics_cost
        .checked_add(LOGN_STATIC)
        .ok_or(OutOfGas)?
        .checked_add(bytes_cost)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn mload(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MLOAD_STATIC)
}

pub fn mstore(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MSTORE_STATIC)
}

pub fn mstore8(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    mem_expansion_behavior(new_memory_size, current_memory_size, MSTORE8_STATIC)
}

/// RETURN and REVERT only pay for memory expansion.
pub fn exit_opcode(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    memory::expansion_cost(new_memory_size, current_memory_size)
}

fn mem_expansion_behavior(
    new_memory_size: usize,
    current_memory_size: usize,
    static_cost: u64,
) -> Result<u64, VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    static_cost
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas.into())
}

pub fn sload(schedule: &FeeSchedule) -> u64 {
    schedule.sload
}

/// SSTORE cost: setting a zero slot to non-zero pays the creation price,
/// everything else pays the reset price. The clearing refund is accounted
/// separately by the handler.
pub fn sstore(current_value: U256, new_value: U256, schedule: &FeeSchedule) -> u64 {
    if current_value.is_zero() && !new_value.is_zero() {
        schedule.sstore_set
    } else {
        schedule.sstore_reset
    }
}

pub fn balance(schedule: &FeeSchedule) -> u64 {
    schedule.balance
}

pub fn extcodesize(schedule: &FeeSchedule) -> u64 {
    schedule.extcodesize
}

pub fn extcodehash(schedule: &FeeSchedule) -> u64 {
    schedule.extcodehash
}

/// Cost of a CALL plus the gas limit handed to the callee.
///
/// Returns `(cost_for_caller, gas_limit_for_callee)`. The caller cost
/// includes the forwarded gas; the callee limit additionally includes the
/// stipend when value is transferred.
#[allow(clippy::too_many_arguments)]
pub fn call(
    new_memory_size: usize,
    current_memory_size: usize,
    callee_exists: bool,
    callee_is_empty: bool,
    value_to_transfer: U256,
    gas_from_stack: U256,
    gas_left: u64,
    schedule: &FeeSchedule,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let positive_value_cost = if !value_to_transfer.is_zero() {
        schedule.call_value
    } else {
        0
    };

    // New-account surcharge:
    //   - EIP-161 semantics: transferring value to an *empty* account.
    //   - before that: calling an account that does not exist at all.
    let new_account_cost = if schedule.has_empty_account_semantics {
        if callee_is_empty && !value_to_transfer.is_zero() {
            schedule.call_new_account
        } else {
            0
        }
    } else if !callee_exists {
        schedule.call_new_account
    } else {
        0
    };

    let call_gas_costs = memory_expansion_cost
        .checked_add(schedule.call_base)
        .ok_or(OutOfGas)?
        .checked_add(positive_value_cost)
        .ok_or(OutOfGas)?
        .checked_add(new_account_cost)
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(
        value_to_transfer.is_zero(),
        gas_from_stack,
        gas_left,
        call_gas_costs,
        schedule.call_stipend,
        schedule,
    )
}

pub fn callcode(
    new_memory_size: usize,
    current_memory_size: usize,
    value_to_transfer: U256,
    gas_from_stack: U256,
    gas_left: u64,
    schedule: &FeeSchedule,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let positive_value_cost = if !value_to_transfer.is_zero() {
        schedule.call_value
    } else {
        0
    };

    let call_gas_costs = memory_expansion_cost
        .checked_add(schedule.call_base)
        .ok_or(OutOfGas)?
        .checked_add(positive_value_cost)
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(
        value_to_transfer.is_zero(),
        gas_from_stack,
        gas_left,
        call_gas_costs,
        schedule.call_stipend,
        schedule,
    )
}

pub fn delegatecall(
    new_memory_size: usize,
    current_memory_size: usize,
    gas_from_stack: U256,
    gas_left: u64,
    schedule: &FeeSchedule,
) -> Result<(u64, u64), VMError> {
    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let call_gas_costs = memory_expansion_cost
        .checked_add(schedule.call_base)
        .ok_or(OutOfGas)?;

    calculate_cost_and_gas_limit_call(true, gas_from_stack, gas_left, call_gas_costs, 0, schedule)
}

pub fn staticcall(
    new_memory_size: usize,
    current_memory_size: usize,
    gas_from_stack: U256,
    gas_left: u64,
    schedule: &FeeSchedule,
) -> Result<(u64, u64), VMError> {
    delegatecall(
        new_memory_size,
        current_memory_size,
        gas_from_stack,
        gas_left,
        schedule,
    )
}

/// CREATE/CREATE2 upfront cost: base price, memory expansion, and for
/// CREATE2 the hashing of the init code.
pub fn create(
    new_memory_size: usize,
    current_memory_size: usize,
    code_size_in_memory: usize,
    is_create_2: bool,
    schedule: &FeeSchedule,
) -> Result<u64, VMError> {
    let minimum_word_size = (code_size_in_memory.checked_add(31).ok_or(OutOfGas)?) / 32;

    let minimum_word_size: u64 = minimum_word_size
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let memory_expansion_cost = memory::expansion_cost(new_memory_size, current_memory_size)?;

    let hash_cost = if is_create_2 {
        minimum_word_size
            .checked_mul(KECCAK256_DYNAMIC_BASE)
            .ok_or(OutOfGas)?
    } else {
        0
    };

    memory_expansion_cost
        .checked_add(schedule.create)
        .ok_or(OutOfGas)?
        .checked_add(hash_cost)
        .ok_or(OutOfGas.into())
}

pub fn selfdestruct(
    beneficiary_exists: bool,
    beneficiary_is_empty: bool,
    balance_to_transfer: U256,
    config: &EvmConfig,
) -> Result<u64, VMError> {
    let schedule = config.schedule();

    let new_account_cost = if config.charge_selfdestruct_for_new_account {
        if beneficiary_is_empty && !balance_to_transfer.is_zero() {
            schedule.selfdestruct_new_account
        } else {
            0
        }
    } else if !beneficiary_exists {
        schedule.selfdestruct_new_account
    } else {
        0
    };

    schedule
        .selfdestruct
        .checked_add(new_account_cost)
        .ok_or(OutOfGas.into())
}

pub fn sha2_256(data_size: usize) -> Result<u64, VMError> {
    precompile(data_size, SHA2_256_STATIC_COST, SHA2_256_DYNAMIC_BASE)
}

pub fn ripemd_160(data_size: usize) -> Result<u64, VMError> {
    precompile(data_size, RIPEMD_160_STATIC_COST, RIPEMD_160_DYNAMIC_BASE)
}

pub fn identity(data_size: usize) -> Result<u64, VMError> {
    precompile(data_size, IDENTITY_STATIC_COST, IDENTITY_DYNAMIC_BASE)
}

fn precompile(data_size: usize, static_cost: u64, dynamic_base: u64) -> Result<u64, VMError> {
    let data_word_count: u64 = data_size
        .div_ceil(WORD_SIZE)
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let dynamic_cost = dynamic_base.checked_mul(data_word_count).ok_or(OutOfGas)?;
    static_cost.checked_add(dynamic_cost).ok_or(OutOfGas.into())
}

/// Gas a frame may hand to a subcall out of what it has left. EIP-150 keeps
/// one 64th for the caller; before that everything could be forwarded.
pub fn max_message_call_gas(gas_remaining: u64, schedule: &FeeSchedule) -> u64 {
    if schedule.has_63_64_rule {
        gas_remaining - gas_remaining / 64
    } else {
        gas_remaining
    }
}

fn calculate_cost_and_gas_limit_call(
    value_is_zero: bool,
    gas_from_stack: U256,
    gas_left: u64,
    call_gas_costs: u64,
    stipend: u64,
    schedule: &FeeSchedule,
) -> Result<(u64, u64), VMError> {
    let gas_stipend = if value_is_zero { 0 } else { stipend };
    let gas_left = gas_left.checked_sub(call_gas_costs).ok_or(OutOfGas)?;

    let max_gas_for_call = max_message_call_gas(gas_left, schedule);

    let gas: u64 = gas_from_stack
        .min(max_gas_for_call.into())
        .try_into()
        .map_err(|_| ExceptionalHalt::OutOfGas)?;

    Ok((
        gas.checked_add(call_gas_costs).ok_or(OutOfGas)?,
        gas.checked_add(gas_stipend).ok_or(OutOfGas)?,
    ))
}
