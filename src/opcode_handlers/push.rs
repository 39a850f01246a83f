//! # Push operations
//!
//! Includes the opcodes `PUSH1` through `PUSH32`.

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `PUSHn` opcodes, monomorphized per immediate
/// width. Reads `N` immediate bytes and advances the counter past them.
pub struct OpPushHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpPushHandler<N> {
    #[inline(always)]
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut vm.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::PUSHN)?;

        // Immediate data starts right after the opcode byte. Code is
        // implicitly zero padded, so a PUSH truncated by the end of the
        // bytecode reads zeros for the missing bytes.
        let start = current_call_frame.pc.wrapping_add(1);
        let mut immediate = [0u8; N];
        if let Some(available) = current_call_frame.bytecode.get(start..) {
            let n = N.min(available.len());
            immediate[..n].copy_from_slice(&available[..n]);
        }

        current_call_frame
            .stack
            .push(U256::from_big_endian(&immediate))?;

        // Skip the immediate bytes plus the opcode itself.
        Ok(OpcodeResult::Continue {
            pc_increment: N.wrapping_add(1),
        })
    }
}
