//! # System operations
//!
//! Includes the following opcodes:
//!   - `CALL`
//!   - `CALLCODE`
//!   - `DELEGATECALL`
//!   - `STATICCALL`
//!   - `RETURN`
//!   - `CREATE`
//!   - `CREATE2`
//!   - `SELFDESTRUCT`
//!   - `REVERT`

use crate::{
    call_frame::CallFrame,
    constants::{FAIL, MAX_CALL_DEPTH, SUCCESS},
    errors::{ContextResult, ExceptionalHalt, InternalError, OpcodeResult, TxResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    opcodes::Opcode,
    precompiles,
    utils::{
        address_to_word, calculate_create2_address, calculate_create_address, size_offset_to_usize,
        word_to_address,
    },
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};

pub struct OpCallHandler;
impl OpcodeHandler for OpCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, callee, value, args_offset, args_len, return_offset, return_len] =
            vm.current_call_frame.stack.pop()?;
        let callee = word_to_address(callee);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (return_len, return_offset) = size_offset_to_usize(return_len, return_offset)?;

        if vm.current_call_frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let (new_memory_size, callee_exists, callee_is_empty) =
            vm.get_call_gas_params(args_offset, args_len, return_offset, return_len, callee)?;
        let (gas_cost, gas_limit) = gas_cost::call(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            callee_exists,
            callee_is_empty,
            value,
            gas,
            vm.current_call_frame.gas_remaining(),
            vm.env.config.schedule(),
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;

        // Expand eagerly so the return data region exists when the callee
        // finishes.
        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm
            .current_call_frame
            .memory
            .load_range(args_offset, args_len)?;
        vm.tracer.enter(
            Opcode::CALL,
            vm.current_call_frame.to,
            callee,
            value,
            gas_limit,
            data.clone(),
        );

        vm.generic_call(
            gas_limit,
            value,
            vm.current_call_frame.to,
            callee,
            callee,
            true,
            vm.current_call_frame.is_static,
            data,
            return_offset,
            return_len,
        )
    }
}

/// CALLCODE runs the callee's code against the caller's own storage and
/// balance.
pub struct OpCallCodeHandler;
impl OpcodeHandler for OpCallCodeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, code_source, value, args_offset, args_len, return_offset, return_len] =
            vm.current_call_frame.stack.pop()?;
        let code_source = word_to_address(code_source);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (return_len, return_offset) = size_offset_to_usize(return_len, return_offset)?;

        let (new_memory_size, _, _) =
            vm.get_call_gas_params(args_offset, args_len, return_offset, return_len, code_source)?;
        let (gas_cost, gas_limit) = gas_cost::callcode(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            value,
            gas,
            vm.current_call_frame.gas_remaining(),
            vm.env.config.schedule(),
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;

        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm
            .current_call_frame
            .memory
            .load_range(args_offset, args_len)?;
        vm.tracer.enter(
            Opcode::CALLCODE,
            vm.current_call_frame.to,
            vm.current_call_frame.to,
            value,
            gas_limit,
            data.clone(),
        );

        // Storage stays the caller's own: `to` is this frame's owner, only
        // the code comes from elsewhere. The value "transfer" is self to
        // self, but the balance check still applies.
        vm.generic_call(
            gas_limit,
            value,
            vm.current_call_frame.to,
            vm.current_call_frame.to,
            code_source,
            true,
            vm.current_call_frame.is_static,
            data,
            return_offset,
            return_len,
        )
    }
}

/// DELEGATECALL keeps the caller's storage, sender and value: only the code
/// is borrowed.
pub struct OpDelegateCallHandler;
impl OpcodeHandler for OpDelegateCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, code_source, args_offset, args_len, return_offset, return_len] =
            vm.current_call_frame.stack.pop()?;
        let code_source = word_to_address(code_source);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (return_len, return_offset) = size_offset_to_usize(return_len, return_offset)?;

        let (new_memory_size, _, _) =
            vm.get_call_gas_params(args_offset, args_len, return_offset, return_len, code_source)?;
        let (gas_cost, gas_limit) = gas_cost::delegatecall(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            gas,
            vm.current_call_frame.gas_remaining(),
            vm.env.config.schedule(),
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;

        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm
            .current_call_frame
            .memory
            .load_range(args_offset, args_len)?;
        vm.tracer.enter(
            Opcode::DELEGATECALL,
            vm.current_call_frame.msg_sender,
            vm.current_call_frame.to,
            vm.current_call_frame.msg_value,
            gas_limit,
            data.clone(),
        );

        vm.generic_call(
            gas_limit,
            vm.current_call_frame.msg_value,
            vm.current_call_frame.msg_sender,
            vm.current_call_frame.to,
            code_source,
            false,
            vm.current_call_frame.is_static,
            data,
            return_offset,
            return_len,
        )
    }
}

/// STATICCALL forbids any state modification in the subframe.
pub struct OpStaticCallHandler;
impl OpcodeHandler for OpStaticCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [gas, callee, args_offset, args_len, return_offset, return_len] =
            vm.current_call_frame.stack.pop()?;
        let callee = word_to_address(callee);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (return_len, return_offset) = size_offset_to_usize(return_len, return_offset)?;

        let (new_memory_size, _, _) =
            vm.get_call_gas_params(args_offset, args_len, return_offset, return_len, callee)?;
        let (gas_cost, gas_limit) = gas_cost::staticcall(
            new_memory_size,
            vm.current_call_frame.memory.len(),
            gas,
            vm.current_call_frame.gas_remaining(),
            vm.env.config.schedule(),
        )?;
        vm.current_call_frame.increase_consumed_gas(gas_cost)?;

        vm.current_call_frame.memory.resize(new_memory_size)?;

        let data = vm
            .current_call_frame
            .memory
            .load_range(args_offset, args_len)?;
        vm.tracer.enter(
            Opcode::STATICCALL,
            vm.current_call_frame.to,
            callee,
            U256::zero(),
            gas_limit,
            data.clone(),
        );

        vm.generic_call(
            gas_limit,
            U256::zero(),
            vm.current_call_frame.to,
            callee,
            callee,
            false,
            true,
            data,
            return_offset,
            return_len,
        )
    }
}

pub struct OpReturnHandler;
impl OpcodeHandler for OpReturnHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, len] = vm.current_call_frame.stack.pop()?;
        let (len, offset) = size_offset_to_usize(len, offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::exit_opcode(
                calculate_memory_size(offset, len)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        if len != 0 {
            vm.current_call_frame.output = vm.current_call_frame.memory.load_range(offset, len)?;
        }

        Ok(OpcodeResult::Halt)
    }
}

/// REVERT halts with the frame's state discarded, but unlike the
/// exceptional halts it hands unused gas back and preserves return data.
pub struct OpRevertHandler;
impl OpcodeHandler for OpRevertHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [offset, len] = vm.current_call_frame.stack.pop()?;
        let (len, offset) = size_offset_to_usize(len, offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::exit_opcode(
                calculate_memory_size(offset, len)?,
                vm.current_call_frame.memory.len(),
            )?)?;

        if len != 0 {
            vm.current_call_frame.output = vm.current_call_frame.memory.load_range(offset, len)?;
        }

        Err(VMError::RevertOpcode)
    }
}

pub struct OpCreateHandler;
impl OpcodeHandler for OpCreateHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_len] = vm.current_call_frame.stack.pop()?;
        let (code_len, code_offset) = size_offset_to_usize(code_len, code_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::create(
                calculate_memory_size(code_offset, code_len)?,
                vm.current_call_frame.memory.len(),
                code_len,
                false,
                vm.env.config.schedule(),
            )?)?;

        vm.generic_create(value, code_offset, code_len, None)
    }
}

pub struct OpCreate2Handler;
impl OpcodeHandler for OpCreate2Handler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_len, salt] = vm.current_call_frame.stack.pop()?;
        let (code_len, code_offset) = size_offset_to_usize(code_len, code_offset)?;

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::create(
                calculate_memory_size(code_offset, code_len)?,
                vm.current_call_frame.memory.len(),
                code_len,
                true,
                vm.env.config.schedule(),
            )?)?;

        vm.generic_create(value, code_offset, code_len, Some(salt))
    }
}

/// SELFDESTRUCT sweeps the owner's balance to the beneficiary and schedules
/// the owner for deletion at the end of the transaction.
pub struct OpSelfDestructHandler;
impl OpcodeHandler for OpSelfDestructHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        if vm.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let beneficiary = word_to_address(vm.current_call_frame.stack.pop1()?);
        let owner = vm.current_call_frame.to;

        let balance = vm.db.get_balance(owner)?;
        let beneficiary_exists = vm.db.account_exists(beneficiary)?;
        let beneficiary_is_empty = vm.db.get_account(beneficiary)?.is_empty();

        vm.current_call_frame
            .increase_consumed_gas(gas_cost::selfdestruct(
                beneficiary_exists,
                beneficiary_is_empty,
                balance,
                &vm.env.config,
            )?)?;

        // Only the first selfdestruct of an address earns the refund.
        if !vm.substate.selfdestruct_set.contains(&owner) {
            vm.substate.refunded_gas = vm
                .substate
                .refunded_gas
                .saturating_add(vm.env.config.schedule().selfdestruct_refund);
        }

        // Credit the beneficiary, then zero the owner unconditionally: when
        // an account self-destructs to itself the ether is burnt.
        vm.increase_account_balance(beneficiary, balance)?;
        vm.set_account_balance_to_zero(owner)?;
        vm.substate.add_selfdestruct(owner);

        vm.tracer.enter(
            Opcode::SELFDESTRUCT,
            owner,
            beneficiary,
            balance,
            0,
            Bytes::new(),
        );
        vm.tracer.exit_early(0, None)?;

        Ok(OpcodeResult::Halt)
    }
}

impl<'a> VM<'a> {
    /// Common behavior for the CALL family. Pre-flight rejections (balance,
    /// depth) push 0 without recursing; otherwise a child frame is pushed
    /// and the interpreter loop continues inside it.
    #[allow(clippy::too_many_arguments)]
    pub fn generic_call(
        &mut self,
        gas_limit: u64,
        value: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        should_transfer_value: bool,
        is_static: bool,
        calldata: Bytes,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<OpcodeResult, VMError> {
        // The previous subcall's return buffer dies here, whatever happens
        // next.
        self.current_call_frame.sub_return_data = Bytes::new();

        if should_transfer_value && !value.is_zero() {
            let sender_balance = self.db.get_balance(msg_sender)?;
            if sender_balance < value {
                self.early_revert_message_call(gas_limit, "OutOfFund")?;
                return Ok(OpcodeResult::Continue { pc_increment: 1 });
            }
        }

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        if new_depth > MAX_CALL_DEPTH {
            self.early_revert_message_call(gas_limit, "MaxDepth")?;
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        if precompiles::is_precompile(&code_address) {
            let ctx_result =
                precompiles::execute_precompile(code_address, &calldata, gas_limit);

            if ctx_result.is_success() {
                let unused_gas = gas_limit
                    .checked_sub(ctx_result.gas_used)
                    .ok_or(InternalError::Underflow)?;
                self.current_call_frame.return_unused_gas(unused_gas);
            }

            let return_data = if ctx_result.output.len() >= ret_size {
                ctx_result
                    .output
                    .get(..ret_size)
                    .ok_or(ExceptionalHalt::OutOfBounds)?
            } else {
                &ctx_result.output
            };
            self.current_call_frame
                .memory
                .store_data(ret_offset, return_data)?;
            self.current_call_frame.sub_return_data = ctx_result.output.clone();

            self.current_call_frame.stack.push(match ctx_result.result {
                TxResult::Success => SUCCESS,
                TxResult::Revert(_) => FAIL,
            })?;

            if should_transfer_value && ctx_result.is_success() {
                self.transfer(msg_sender, to, value)?;
            }

            self.tracer.exit_context(&ctx_result)?;

            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let bytecode = self.db.get_code(code_address)?;

        // The parent resumes after the call instruction once the child
        // frame returns.
        self.current_call_frame.pc = self.current_call_frame.pc.wrapping_add(1);

        let new_call_frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            new_depth,
            false,
            ret_offset,
            ret_size,
        );
        self.add_callframe(new_call_frame);

        // Journaled in the child frame: undone if the callee fails.
        if should_transfer_value {
            self.transfer(msg_sender, to, value)?;
        }

        self.push_substate_backup();

        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    /// Common behavior for CREATE and CREATE2.
    pub fn generic_create(
        &mut self,
        value: U256,
        code_offset_in_memory: usize,
        code_size_in_memory: usize,
        salt: Option<U256>,
    ) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        self.current_call_frame.sub_return_data = Bytes::new();

        // Reserve the gas the init frame may use; whatever it leaves over
        // comes back when it returns.
        let schedule = self.env.config.schedule();
        let gas_limit =
            gas_cost::max_message_call_gas(self.current_call_frame.gas_remaining(), schedule);
        self.current_call_frame.increase_consumed_gas(gas_limit)?;

        let code = self
            .current_call_frame
            .memory
            .load_range(code_offset_in_memory, code_size_in_memory)?;

        let deployer = self.current_call_frame.to;
        let (deployer_balance, deployer_nonce) = {
            let deployer_account = self.db.get_account(deployer)?;
            (deployer_account.info.balance, deployer_account.info.nonce)
        };

        let new_address = match salt {
            Some(salt) => calculate_create2_address(deployer, &code, salt),
            None => calculate_create_address(deployer, deployer_nonce),
        };

        let call_type = match salt {
            Some(_) => Opcode::CREATE2,
            None => Opcode::CREATE,
        };
        self.tracer
            .enter(call_type, deployer, new_address, value, gas_limit, code.clone());

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        // Pre-flight rejections: push 0, return the reserved gas, and leave
        // the deployer's nonce untouched.
        let checks = [
            (deployer_balance < value, "OutOfFund"),
            (new_depth > MAX_CALL_DEPTH, "MaxDepth"),
            (deployer_nonce == u64::MAX, "MaxNonce"),
        ];
        for (condition, reason) in checks {
            if condition {
                self.early_revert_message_call(gas_limit, reason)?;
                return Ok(OpcodeResult::Continue { pc_increment: 1 });
            }
        }

        // The nonce bump survives even if the init code fails.
        self.increment_account_nonce(deployer)?;

        // Deploying over an account with code or a used nonce must fail and
        // burn the init gas: the init code is swapped for a lone INVALID
        // byte, so execution proceeds and fails on its first step.
        let init_code = if self.db.get_account(new_address)?.has_code_or_nonce() {
            tracing::debug!(address = ?new_address, "create collision, forcing failing init code");
            Bytes::from_static(&[0xfe])
        } else {
            code
        };

        self.current_call_frame.pc = self.current_call_frame.pc.wrapping_add(1);

        let new_call_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            init_code,
            value,
            Bytes::new(),
            false,
            gas_limit,
            new_depth,
            true,
            0,
            0,
        );
        self.add_callframe(new_call_frame);

        // Journaled in the child frame: undone if the init code fails.
        if schedule.has_empty_account_semantics {
            self.increment_account_nonce(new_address)?;
        }
        self.transfer(deployer, new_address, value)?;

        self.push_substate_backup();
        self.substate.add_created_account(new_address);

        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    /// Commit or roll back the finished frame's state, then merge its
    /// result into the parent frame.
    pub fn handle_return(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        self.handle_state_backup(ctx_result)?;
        let executed_call_frame = self.pop_call_frame()?;

        if executed_call_frame.is_create {
            self.handle_return_create(executed_call_frame, ctx_result)?;
        } else {
            self.handle_return_call(executed_call_frame, ctx_result)?;
        }

        Ok(())
    }

    pub fn handle_return_call(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            ret_offset,
            ret_size,
            call_frame_backup,
            ..
        } = executed_call_frame;

        let child_unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        self.current_call_frame.return_unused_gas(child_unused_gas);

        // The out region was sized when the call was dispatched; only
        // min(output, ret_size) bytes are copied back.
        let return_data = if ctx_result.output.len() >= ret_size {
            ctx_result
                .output
                .get(..ret_size)
                .ok_or(ExceptionalHalt::OutOfBounds)?
        } else {
            &ctx_result.output
        };
        self.current_call_frame
            .memory
            .store_data(ret_offset, return_data)?;

        self.current_call_frame.sub_return_data = ctx_result.output.clone();

        match &ctx_result.result {
            TxResult::Success => {
                self.current_call_frame.stack.push(SUCCESS)?;
                self.current_call_frame
                    .call_frame_backup
                    .absorb(call_frame_backup);
            }
            TxResult::Revert(_) => {
                self.current_call_frame.stack.push(FAIL)?;
            }
        }

        self.tracer.exit_context(ctx_result)?;

        Ok(())
    }

    pub fn handle_return_create(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            to,
            call_frame_backup,
            ..
        } = executed_call_frame;

        let unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        self.current_call_frame.return_unused_gas(unused_gas);

        match &ctx_result.result {
            TxResult::Success => {
                self.current_call_frame.stack.push(address_to_word(to))?;
                self.current_call_frame
                    .call_frame_backup
                    .absorb(call_frame_backup);
            }
            TxResult::Revert(err) => {
                // A reverting init preserves its return data for the
                // deployer; any other failure leaves the buffer empty.
                if err.is_revert_opcode() {
                    self.current_call_frame.sub_return_data = ctx_result.output.clone();
                }

                self.current_call_frame.stack.push(FAIL)?;
            }
        }

        self.tracer.exit_context(ctx_result)?;

        Ok(())
    }

    /// Memory growth and account facts a CALL-family opcode needs for its
    /// gas computation.
    fn get_call_gas_params(
        &mut self,
        args_offset: usize,
        args_size: usize,
        return_data_offset: usize,
        return_data_size: usize,
        address: Address,
    ) -> Result<(usize, bool, bool), VMError> {
        let callee_exists = self.db.account_exists(address)?;
        let callee_is_empty = self.db.get_account(address)?.is_empty();

        // The in and out ranges are charged as one expansion.
        let new_memory_size_for_args = calculate_memory_size(args_offset, args_size)?;
        let new_memory_size_for_return_data =
            calculate_memory_size(return_data_offset, return_data_size)?;
        let new_memory_size = new_memory_size_for_args.max(new_memory_size_for_return_data);

        Ok((new_memory_size, callee_exists, callee_is_empty))
    }

    /// Reject a call or create before recursing: the reserved gas flows
    /// back and the caller sees a 0 on its stack.
    fn early_revert_message_call(&mut self, gas_limit: u64, reason: &str) -> Result<(), VMError> {
        self.current_call_frame.return_unused_gas(gas_limit);
        self.current_call_frame.stack.push(FAIL)?;

        self.tracer.exit_early(0, Some(reason.to_string()))?;
        Ok(())
    }
}
