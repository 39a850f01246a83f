//! # Logging operations
//!
//! Includes the opcodes `LOG0` through `LOG4`.

use crate::{
    account::Log,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{size_offset_to_usize, u256_to_h256},
    vm::VM,
};

/// Implementation for the `LOGn` opcodes, monomorphized per topic count.
pub struct OpLogHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpLogHandler<N> {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [offset, len] = vm.current_call_frame.stack.pop()?;
        let topics = vm.current_call_frame.stack.pop::<N>()?.map(u256_to_h256);
        let (len, offset) = size_offset_to_usize(len, offset)?;

        vm.current_call_frame.increase_consumed_gas(gas_cost::log(
            calculate_memory_size(offset, len)?,
            vm.current_call_frame.memory.len(),
            len,
            N,
        )?)?;

        let log = Log {
            address: vm.current_call_frame.to,
            topics: topics.into(),
            data: vm.current_call_frame.memory.load_range(offset, len)?,
        };
        vm.substate.add_log(log);

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
