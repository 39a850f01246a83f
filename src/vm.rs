use crate::{
    account::Log,
    call_frame::CallFrame,
    db::gen_db::GeneralizedDatabase,
    environment::{Environment, TxKind},
    errors::{ContextResult, ExecutionReport, InternalError, OpcodeResult, VMError},
    opcodes::{OpCodeFn, Opcode},
    precompiles,
    tracing::CallTracer,
    utils::calculate_create_address,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use std::collections::BTreeSet;
use std::mem;

/// Accumulated transaction-wide side effects: scheduled deletions, created
/// accounts, the refund counter and emitted logs.
///
/// A backup is pushed when a frame starts and either committed or restored
/// when it finishes, so a reverting frame drops its logs and refunds
/// automatically.
#[derive(Debug, Clone, Default)]
pub struct Substate {
    pub selfdestruct_set: BTreeSet<Address>,
    pub created_accounts: BTreeSet<Address>,
    pub refunded_gas: u64,
    pub logs: Vec<Log>,
}

impl Substate {
    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    pub fn add_selfdestruct(&mut self, address: Address) {
        self.selfdestruct_set.insert(address);
    }

    pub fn add_created_account(&mut self, address: Address) {
        self.created_accounts.insert(address);
    }

    pub fn is_account_created(&self, address: &Address) -> bool {
        self.created_accounts.contains(address)
    }
}

/// The virtual machine: a frame stack driven by a fetch-decode-execute
/// loop, dispatching through a per-fork opcode table.
pub struct VM<'a> {
    pub current_call_frame: CallFrame,
    pub call_frames: Vec<CallFrame>,
    pub env: Environment,
    pub substate: Substate,
    pub substate_backups: Vec<Substate>,
    pub db: &'a mut GeneralizedDatabase,
    pub tracer: CallTracer,
    pub(crate) opcode_table: [OpCodeFn; 256],
    is_create: bool,
}

impl<'a> VM<'a> {
    /// Set up a VM for one message call or contract creation.
    ///
    /// For a creation the contract address is derived from the origin's
    /// current nonce and `calldata` is the init code.
    pub fn new(
        env: Environment,
        db: &'a mut GeneralizedDatabase,
        to: TxKind,
        value: U256,
        calldata: Bytes,
        mut tracer: CallTracer,
    ) -> Result<Self, VMError> {
        let opcode_table = Self::build_opcode_table(env.config.fork);

        let (initial_call_frame, is_create) = match to {
            TxKind::Call(address) => {
                let bytecode = db.get_code(address)?;
                tracer.enter(
                    Opcode::CALL,
                    env.origin,
                    address,
                    value,
                    env.gas_limit,
                    calldata.clone(),
                );
                (
                    CallFrame::new(
                        env.origin,
                        address,
                        address,
                        bytecode,
                        value,
                        calldata,
                        false,
                        env.gas_limit,
                        0,
                        false,
                        0,
                        0,
                    ),
                    false,
                )
            }
            TxKind::Create => {
                let nonce = db.get_nonce(env.origin)?;
                let new_address = calculate_create_address(env.origin, nonce);
                tracer.enter(
                    Opcode::CREATE,
                    env.origin,
                    new_address,
                    value,
                    env.gas_limit,
                    calldata.clone(),
                );
                (
                    CallFrame::new(
                        env.origin,
                        new_address,
                        new_address,
                        calldata,
                        value,
                        Bytes::new(),
                        false,
                        env.gas_limit,
                        0,
                        true,
                        0,
                        0,
                    ),
                    true,
                )
            }
        };

        Ok(Self {
            current_call_frame: initial_call_frame,
            call_frames: Vec::new(),
            env,
            substate: Substate::default(),
            substate_backups: Vec::new(),
            db,
            tracer,
            opcode_table,
            is_create,
        })
    }

    /// Run the message to completion and report the outcome. The world
    /// state delta is left in the database cache.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        tracing::trace!(
            to = ?self.current_call_frame.to,
            gas_limit = self.current_call_frame.gas_limit,
            is_create = self.is_create,
            "executing message"
        );

        if self.is_create {
            // Creation into an occupied address fails before any code runs.
            if let Some(report) = self.handle_create_transaction()? {
                return Ok(report);
            }
        }

        // Endowment moves before the first instruction; it is journaled in
        // the initial frame so a revert returns it.
        let value = self.current_call_frame.msg_value;
        if !value.is_zero() {
            let origin = self.env.origin;
            let to = self.current_call_frame.to;
            if self.db.get_balance(origin)? < value {
                return Err(VMError::InsufficientFunds);
            }
            self.transfer(origin, to, value)?;
        }

        self.push_substate_backup();

        self.run_execution()
    }

    /// Main interpreter loop.
    pub fn run_execution(&mut self) -> Result<ExecutionReport, VMError> {
        if precompiles::is_precompile(&self.current_call_frame.code_address) {
            let ctx_result = precompiles::execute_precompile(
                self.current_call_frame.code_address,
                &self.current_call_frame.calldata,
                self.current_call_frame.gas_limit,
            );
            self.handle_state_backup(&ctx_result)?;
            return self.build_report(ctx_result);
        }

        loop {
            let opcode = self.current_call_frame.next_opcode();
            let handler = self.opcode_table[usize::from(opcode)];
            let op_result = handler.call(self);

            let ctx_result = match op_result {
                Ok(OpcodeResult::Continue { pc_increment }) => {
                    self.current_call_frame.pc =
                        self.current_call_frame.pc.wrapping_add(pc_increment);
                    continue;
                }
                Ok(OpcodeResult::Halt) => self.handle_opcode_result()?,
                Err(error) => self.handle_opcode_error(error)?,
            };

            // The first frame's result is the report; a nested frame's
            // result is merged into its caller and the loop goes on.
            if self.is_initial_call_frame() {
                self.handle_state_backup(&ctx_result)?;
                return self.build_report(ctx_result);
            }

            self.handle_return(&ctx_result)?;
        }
    }

    /// Commit the finished frame's state, or roll it back on failure.
    pub fn handle_state_backup(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        if ctx_result.is_success() {
            self.commit_substate_backup()?;
        } else {
            self.revert_substate_backup()?;
            let backup = mem::take(&mut self.current_call_frame.call_frame_backup);
            self.db.undo_backup(&backup);
        }
        Ok(())
    }

    pub fn is_initial_call_frame(&self) -> bool {
        self.call_frames.is_empty()
    }

    /// True if the VM is running a contract creation at depth zero.
    pub fn is_create(&self) -> bool {
        self.is_create
    }

    pub(crate) fn add_callframe(&mut self, new_call_frame: CallFrame) {
        let parent = mem::replace(&mut self.current_call_frame, new_call_frame);
        self.call_frames.push(parent);
    }

    /// Swap the parent frame back in, returning the finished child.
    pub(crate) fn pop_call_frame(&mut self) -> Result<CallFrame, VMError> {
        let parent = self
            .call_frames
            .pop()
            .ok_or(InternalError::CouldNotPopCallframe)?;
        Ok(mem::replace(&mut self.current_call_frame, parent))
    }

    pub(crate) fn commit_substate_backup(&mut self) -> Result<(), VMError> {
        self.substate_backups
            .pop()
            .ok_or(InternalError::MissingSubstateBackup)?;
        Ok(())
    }

    pub(crate) fn revert_substate_backup(&mut self) -> Result<(), VMError> {
        self.substate = self
            .substate_backups
            .pop()
            .ok_or(InternalError::MissingSubstateBackup)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Journaled world-state mutation. Every mutation records the account's
    // pre-image in the current frame's backup first, so failures restore.
    // ------------------------------------------------------------------

    pub(crate) fn backup_account(&mut self, address: Address) -> Result<(), VMError> {
        if !self
            .current_call_frame
            .call_frame_backup
            .original_accounts
            .contains_key(&address)
        {
            let original = self.db.peek_account(address)?;
            self.current_call_frame
                .call_frame_backup
                .backup_account(address, original);
        }
        Ok(())
    }

    /// Move `value` between accounts, creating the recipient if needed.
    /// A zero value moves nothing and creates nothing.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        if value.is_zero() {
            return Ok(());
        }

        self.backup_account(from)?;
        self.backup_account(to)?;

        let from_account = self.db.get_account_mut(from)?;
        if from_account.info.balance < value {
            return Err(VMError::InsufficientFunds);
        }
        from_account.info.balance -= value;

        let to_account = self.db.get_account_mut(to)?;
        to_account.info.balance += value;

        Ok(())
    }

    pub fn increase_account_balance(
        &mut self,
        address: Address,
        amount: U256,
    ) -> Result<(), VMError> {
        self.backup_account(address)?;
        let account = self.db.get_account_mut(address)?;
        account.info.balance = account
            .info
            .balance
            .checked_add(amount)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    /// Hard-zero an account's balance, as SELFDESTRUCT requires after the
    /// beneficiary has been credited.
    pub fn set_account_balance_to_zero(&mut self, address: Address) -> Result<(), VMError> {
        self.backup_account(address)?;
        let account = self.db.get_account_mut(address)?;
        account.info.balance = U256::zero();
        Ok(())
    }

    pub fn increment_account_nonce(&mut self, address: Address) -> Result<(), VMError> {
        self.backup_account(address)?;
        let account = self.db.get_account_mut(address)?;
        account.info.nonce = account
            .info
            .nonce
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    pub fn update_account_storage(
        &mut self,
        address: Address,
        key: U256,
        value: U256,
    ) -> Result<(), VMError> {
        self.backup_account(address)?;
        let account = self.db.get_account_mut(address)?;
        account.storage.insert(key, value);
        Ok(())
    }

    pub fn update_account_bytecode(
        &mut self,
        address: Address,
        bytecode: Bytes,
    ) -> Result<(), VMError> {
        self.backup_account(address)?;
        let account = self.db.get_account_mut(address)?;
        account.set_code(bytecode);
        Ok(())
    }

    pub(crate) fn push_substate_backup(&mut self) {
        self.substate_backups.push(self.substate.clone());
    }
}
