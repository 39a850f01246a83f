use crate::{
    errors::{ContextResult, ExceptionalHalt, ExecutionReport, InternalError, TxResult, VMError},
    vm::VM,
};
use bytes::Bytes;

impl<'a> VM<'a> {
    /// Turn a successful halt of the current frame into its result. For
    /// creation frames this is where the returned code gets validated,
    /// paid for and persisted.
    pub fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame.is_create {
            let contract_code = std::mem::take(&mut self.current_call_frame.output);
            let code_length = contract_code.len();

            let code_length_u64: u64 = code_length
                .try_into()
                .map_err(|_| InternalError::TypeConversion)?;
            let code_deposit_cost = code_length_u64
                .checked_mul(self.env.config.schedule().code_deposit)
                .ok_or(InternalError::Overflow)?;

            let config = &self.env.config;
            let oversized = config
                .max_code_size
                .is_some_and(|limit| code_length > limit);

            let validate_create = if oversized {
                Err(VMError::from(ExceptionalHalt::ContractOutputTooBig))
            } else if self
                .current_call_frame
                .increase_consumed_gas(code_deposit_cost)
                .is_err()
            {
                if config.exceptional_failed_code_deposit {
                    Err(ExceptionalHalt::OutOfGas.into())
                } else {
                    // Frontier: a failed deposit deploys an empty contract
                    // and the creation still counts as a success.
                    Ok(false)
                }
            } else {
                Ok(true)
            };

            match validate_create {
                Ok(deposit_paid) => {
                    if deposit_paid {
                        let new_address = self.current_call_frame.to;
                        self.update_account_bytecode(new_address, contract_code.clone())?;
                        return Ok(ContextResult {
                            result: TxResult::Success,
                            gas_used: self.current_call_frame.gas_used,
                            output: contract_code,
                        });
                    }
                    return Ok(ContextResult {
                        result: TxResult::Success,
                        gas_used: self.current_call_frame.gas_used,
                        output: Bytes::new(),
                    });
                }
                Err(error) => {
                    // Failed deployment burns all the init gas.
                    self.current_call_frame.gas_used = self.current_call_frame.gas_limit;
                    return Ok(ContextResult {
                        result: TxResult::Revert(error),
                        gas_used: self.current_call_frame.gas_used,
                        output: Bytes::new(),
                    });
                }
            }
        }

        Ok(ContextResult {
            result: TxResult::Success,
            gas_used: self.current_call_frame.gas_used,
            output: std::mem::take(&mut self.current_call_frame.output),
        })
    }

    /// Turn a frame-level error into the frame's result. Internal and
    /// database errors are not frame results and propagate out.
    pub fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        if error.should_propagate() {
            return Err(error);
        }

        // Everything except REVERT forfeits the frame's remaining gas.
        if !error.is_revert_opcode() {
            self.current_call_frame.gas_used = self.current_call_frame.gas_limit;
        }

        // Only REVERT leaves anything in the output buffer.
        let output = std::mem::take(&mut self.current_call_frame.output);

        Ok(ContextResult {
            result: TxResult::Revert(error),
            gas_used: self.current_call_frame.gas_used,
            output,
        })
    }

    /// Top level creation preamble: reject occupied addresses, then set up
    /// the new account. Returns a report only when the creation is
    /// rejected outright.
    pub fn handle_create_transaction(&mut self) -> Result<Option<ExecutionReport>, VMError> {
        let new_contract_address = self.current_call_frame.to;

        if self.db.get_account(new_contract_address)?.has_code_or_nonce() {
            tracing::debug!(
                address = ?new_contract_address,
                "create transaction into occupied address"
            );
            self.tracer
                .exit_early(self.env.gas_limit, Some("CreateAccExists".to_string()))?;
            return Ok(Some(ExecutionReport {
                result: TxResult::Revert(VMError::AddressAlreadyOccupied),
                gas_used: self.env.gas_limit,
                gas_refunded: 0,
                output: Bytes::new(),
                logs: vec![],
                selfdestructed: vec![],
            }));
        }

        if self.env.config.schedule().has_empty_account_semantics {
            // EIP-161: contracts start life with nonce 1.
            self.increment_account_nonce(new_contract_address)?;
        }
        self.substate.add_created_account(new_contract_address);

        Ok(None)
    }

    /// Assemble the report handed back to the host once the first frame
    /// finishes. The refund counter is applied here, capped at half the
    /// gas used.
    pub fn build_report(&mut self, ctx_result: ContextResult) -> Result<ExecutionReport, VMError> {
        let refund_cap = ctx_result.gas_used / 2;
        let gas_refunded = self.substate.refunded_gas.min(refund_cap);

        self.tracer.exit_context(&ctx_result)?;

        tracing::trace!(
            gas_used = ctx_result.gas_used,
            gas_refunded,
            success = ctx_result.is_success(),
            "message finished"
        );

        Ok(ExecutionReport {
            result: ctx_result.result,
            gas_used: ctx_result.gas_used,
            gas_refunded,
            output: ctx_result.output,
            logs: std::mem::take(&mut self.substate.logs),
            selfdestructed: self.substate.selfdestruct_set.iter().copied().collect(),
        })
    }
}
