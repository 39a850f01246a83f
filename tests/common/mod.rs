#![allow(dead_code)]

use bytes::Bytes;
use corten_evm::{
    account::Account,
    db::{InMemoryDb, gen_db::GeneralizedDatabase},
    environment::{Environment, EvmConfig, Fork, TxKind},
    errors::ExecutionReport,
    tracing::CallTracer,
    vm::VM,
};
use ethereum_types::{Address, U256};
use std::sync::Arc;

/// Address of the contract under test.
pub fn contract() -> Address {
    Address::from_low_u64_be(0xc0de)
}

/// A second contract, for call tests.
pub fn other() -> Address {
    Address::from_low_u64_be(0xbeef)
}

/// The externally owned account driving the tests.
pub fn sender() -> Address {
    Address::from_low_u64_be(0x5e4d)
}

pub fn one_ether() -> U256 {
    U256::from(10).pow(U256::from(18))
}

pub fn db_with(accounts: Vec<(Address, Account)>) -> GeneralizedDatabase {
    let mut store = InMemoryDb::new();
    for (address, account) in accounts {
        store.add_account(address, account);
    }
    GeneralizedDatabase::new(Arc::new(store))
}

pub fn default_env(gas_limit: u64) -> Environment {
    env_for_fork(Fork::Petersburg, gas_limit)
}

pub fn env_for_fork(fork: Fork, gas_limit: u64) -> Environment {
    Environment {
        origin: sender(),
        gas_limit,
        block_number: U256::from(1),
        config: EvmConfig::new(fork),
        ..Default::default()
    }
}

pub fn run(
    mut db: GeneralizedDatabase,
    env: Environment,
    to: TxKind,
    value: U256,
    calldata: Bytes,
) -> (ExecutionReport, GeneralizedDatabase) {
    let report = {
        let mut vm = VM::new(env, &mut db, to, value, calldata, CallTracer::disabled()).unwrap();
        vm.execute().unwrap()
    };
    (report, db)
}

/// Run `code` as the contract under test with a funded sender.
pub fn execute_code(code: &[u8], gas_limit: u64) -> (ExecutionReport, GeneralizedDatabase) {
    execute_code_for_fork(code, gas_limit, Fork::Petersburg)
}

pub fn execute_code_for_fork(
    code: &[u8],
    gas_limit: u64,
    fork: Fork,
) -> (ExecutionReport, GeneralizedDatabase) {
    let db = db_with(vec![
        (
            contract(),
            Account::new(
                U256::zero(),
                Bytes::copy_from_slice(code),
                1,
                Default::default(),
            ),
        ),
        (
            sender(),
            Account::new(one_ether(), Bytes::new(), 0, Default::default()),
        ),
    ]);
    run(
        db,
        env_for_fork(fork, gas_limit),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    )
}

/// PUSH32 instruction for an arbitrary word.
pub fn push32(value: U256) -> Vec<u8> {
    let mut code = vec![0x7f];
    code.extend_from_slice(&value.to_big_endian());
    code
}

/// Bytecode tail that returns the word on top of the stack.
pub fn return_stack_top() -> Vec<u8> {
    // PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    vec![0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]
}

/// Run a snippet and return the 32-byte word it leaves on top of the stack.
pub fn execute_and_return_top(snippet: &[u8], gas_limit: u64) -> U256 {
    let mut code = snippet.to_vec();
    code.extend_from_slice(&return_stack_top());
    let (report, _) = execute_code(&code, gas_limit);
    assert!(report.is_success(), "execution failed: {:?}", report.result);
    U256::from_big_endian(&report.output)
}
