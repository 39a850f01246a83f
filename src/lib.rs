//! # Corten EVM
//!
//! A fork-aware, pure Rust implementation of the Ethereum Virtual Machine.
//!
//! ## Overview
//!
//! The crate executes contract bytecode under strict gas metering and
//! produces an auditable state delta: modified accounts, storage writes,
//! emitted logs, scheduled deletions and gas refunds. Execution is
//! deterministic — identical inputs yield identical gas usage, output,
//! log ordering and world-state changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                          VM                            │
//! │   CallFrame ── Stack ── Memory ── Substate ── Tracer   │
//! └───────────────────────────┬────────────────────────────┘
//!                             ▼
//! ┌────────────────────────────────────────────────────────┐
//! │                  GeneralizedDatabase                   │
//! │      (journaled account state, storage and code)       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`vm::VM`]: the fetch-decode-execute engine and call/create dispatch
//! - [`call_frame::CallFrame`]: per-call execution context
//! - [`memory::Memory`]: EVM memory with word-aligned expansion costs
//! - [`environment::Environment`]: block and transaction constants
//! - [`gas_schedule::FeeSchedule`]: per-fork gas constants and refunds
//! - [`db::gen_db::GeneralizedDatabase`]: cached, journaled world state
//!
//! ## Supported Forks
//!
//! Frontier through Petersburg. Each fork selects its own fee schedule and
//! opcode table; opcodes that do not exist yet in a fork behave as INVALID.
//!
//! ## Usage
//!
//! ```ignore
//! use corten_evm::{environment::TxKind, tracing::CallTracer, vm::VM};
//!
//! let mut vm = VM::new(env, &mut db, TxKind::Call(contract), value, calldata, tracer)?;
//! let report = vm.execute()?;
//! if report.is_success() {
//!     println!("gas used: {}", report.gas_used);
//! }
//! ```

pub mod account;
pub mod call_frame;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod execution_handlers;
pub mod gas_cost;
pub mod gas_schedule;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod precompiles;
pub mod tracing;
pub mod utils;
pub mod vm;

pub use environment::{ChainConfig, Environment, EvmConfig, Fork, TxKind};
pub use errors::{ExecutionReport, TxResult, VMError};
