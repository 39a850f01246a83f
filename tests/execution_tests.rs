mod common;

use bytes::Bytes;
use common::{
    contract, db_with, default_env, execute_code, execute_code_for_fork, execute_and_return_top,
    one_ether, push32, return_stack_top, run, sender,
};
use corten_evm::{
    account::Account,
    environment::{Fork, TxKind},
    errors::{ExceptionalHalt, TxResult, VMError},
};
use ethereum_types::{Address, H256, U256};

const GAS: u64 = 100_000;

// ==================== Halting ====================

#[test]
fn test_simple_return() {
    // PUSH1 23, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = [0x60, 0x17, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
    let (report, _) = execute_code(&code, GAS);

    assert!(report.is_success());
    assert_eq!(report.output.len(), 32);
    assert_eq!(report.output[31], 23);
    assert_eq!(&report.output[..31], &[0u8; 31]);

    // 5 cheap instructions plus one word of memory expansion; RETURN
    // itself costs nothing beyond the expansion it needs.
    assert_eq!(report.gas_used, 5 * 3 + 3);
}

#[test]
fn test_empty_code_is_success() {
    let (report, _) = execute_code(&[], GAS);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 0);
    assert!(report.output.is_empty());
}

#[test]
fn test_running_past_code_end_stops() {
    // A lone PUSH1 with its immediate: the counter walks past the end.
    let (report, _) = execute_code(&[0x60, 0x01], GAS);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3);
}

// ==================== Errors ====================

#[test]
fn test_invalid_opcode_consumes_all_gas() {
    let (report, _) = execute_code(&[0xfe], GAS);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidOpcode(0xfe).into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_unassigned_byte_is_invalid() {
    let (report, _) = execute_code(&[0x21], GAS);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidOpcode(0x21).into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_stack_underflow_consumes_all_gas() {
    let (report, _) = execute_code(&[0x01], GAS);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::StackUnderflow.into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_out_of_gas() {
    let code = [0x60, 0x17, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
    let (report, _) = execute_code(&code, 10);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::OutOfGas.into())
    );
    assert_eq!(report.gas_used, 10);
}

// ==================== Jumps ====================

#[test]
fn test_jump_to_jumpdest() {
    // PUSH1 3, JUMP, JUMPDEST, PUSH1 1, <return top>
    let mut code = vec![0x60, 0x03, 0x56, 0x5b, 0x60, 0x01];
    code.extend(return_stack_top());
    let (report, _) = execute_code(&code, GAS);
    assert!(report.is_success());
    assert_eq!(report.output[31], 1);
    // PUSH + JUMP + JUMPDEST + PUSH + return sequence
    assert_eq!(report.gas_used, 3 + 8 + 1 + 3 + (3 + 3 + 3 + 3 + 3));
}

#[test]
fn test_jump_to_non_jumpdest_fails() {
    // PUSH1 5, JUMP with code[5] not a JUMPDEST
    let (report, _) = execute_code(&[0x60, 0x05, 0x56, 0x5b, 0x00, 0x00], GAS);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidJump(5).into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_jump_into_push_immediate_fails() {
    // code[5] is 0x5b, but it sits inside a PUSH2 immediate.
    let (report, _) = execute_code(&[0x60, 0x05, 0x56, 0x00, 0x61, 0x5b, 0x5b], GAS);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidJump(5).into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_jumpi_not_taken_falls_through() {
    // PUSH1 0 (condition), PUSH1 7 (target), JUMPI, PUSH1 42, <return top>
    let mut code = vec![0x60, 0x00, 0x60, 0x07, 0x57, 0x60, 0x2a];
    code.extend(return_stack_top());
    let (report, _) = execute_code(&code, GAS);
    assert!(report.is_success());
    assert_eq!(report.output[31], 42);
}

#[test]
fn test_jumpi_taken() {
    // PUSH1 1 (condition), PUSH1 6 (target), JUMPI, INVALID, JUMPDEST,
    // PUSH1 7, <return top>
    let mut code = vec![0x60, 0x01, 0x60, 0x06, 0x57, 0xfe, 0x5b, 0x60, 0x07];
    code.extend(return_stack_top());
    let (report, _) = execute_code(&code, GAS);
    assert!(report.is_success());
    assert_eq!(report.output[31], 7);
}

// ==================== Revert ====================

#[test]
fn test_revert_with_message_rolls_back_storage() {
    // Store something, then revert with a human readable message.
    let mut message_word = [0u8; 32];
    message_word[..14].copy_from_slice(b"revert message");

    let mut code = vec![0x6c]; // PUSH13 "reverted data"
    code.extend_from_slice(b"reverted data");
    code.extend([0x60, 0x00, 0x55]); // PUSH1 0, SSTORE
    code.extend(push32(U256::from_big_endian(&message_word)));
    code.extend([0x60, 0x00, 0x52]); // PUSH1 0, MSTORE
    code.extend([0x60, 0x0e, 0x60, 0x00, 0xfd]); // PUSH1 14, PUSH1 0, REVERT

    let (report, mut db) = execute_code(&code, 30_000);

    assert_eq!(report.result, TxResult::Revert(VMError::RevertOpcode));
    assert_eq!(&report.output[..], b"revert message");

    // The store never happened as far as the world is concerned.
    assert_eq!(
        db.get_storage_value(contract(), U256::zero()).unwrap(),
        U256::zero()
    );

    // Unused gas flows back: only what ran was paid for.
    assert_eq!(report.gas_used, 20_024);

    // A reverting frame earns no refunds.
    assert_eq!(report.gas_refunded, 0);
}

#[test]
fn test_revert_is_invalid_before_byzantium() {
    let (report, _) =
        execute_code_for_fork(&[0x60, 0x00, 0x60, 0x00, 0xfd], GAS, Fork::Homestead);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidOpcode(0xfd).into())
    );
    assert_eq!(report.gas_used, GAS);
}

#[test]
fn test_shifts_are_invalid_before_constantinople() {
    let (report, _) =
        execute_code_for_fork(&[0x60, 0x01, 0x60, 0x01, 0x1b], GAS, Fork::Byzantium);
    assert_eq!(
        report.result,
        TxResult::Revert(ExceptionalHalt::InvalidOpcode(0x1b).into())
    );
}

// ==================== Storage ====================

#[test]
fn test_sstore_persists_on_success() {
    // PUSH1 42, PUSH1 1, SSTORE
    let (report, mut db) = execute_code(&[0x60, 0x2a, 0x60, 0x01, 0x55, 0x00], GAS);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 3 + 20_000);
    assert_eq!(
        db.get_storage_value(contract(), U256::one()).unwrap(),
        U256::from(42)
    );
}

#[test]
fn test_sstore_clear_earns_capped_refund() {
    let mut account = Account::new(U256::zero(), Bytes::from_static(&[0x60, 0x00, 0x60, 0x01, 0x55, 0x00]), 1, Default::default());
    account.storage.insert(U256::one(), U256::from(5));
    let db = db_with(vec![
        (contract(), account),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);

    let (report, mut db) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    );

    assert!(report.is_success());
    // Clearing pays the reset price...
    assert_eq!(report.gas_used, 3 + 3 + 5_000);
    // ...and the 15000 clearing refund is capped at half the gas used.
    assert_eq!(report.gas_refunded, report.gas_used / 2);
    assert_eq!(
        db.get_storage_value(contract(), U256::one()).unwrap(),
        U256::zero()
    );
}

#[test]
fn test_sload_reads_committed_state() {
    let mut account = Account::new(
        U256::zero(),
        Bytes::from_static(&[0x60, 0x01, 0x54, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]),
        1,
        Default::default(),
    );
    account.storage.insert(U256::one(), U256::from(77));
    let db = db_with(vec![
        (contract(), account),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);

    let (report, _) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    );

    assert!(report.is_success());
    assert_eq!(U256::from_big_endian(&report.output), U256::from(77));
    // SLOAD costs 200 from Tangerine Whistle on.
    assert_eq!(report.gas_used, 3 + 200 + 3 + 3 + 3 + 3 + 3);
}

// ==================== Logs ====================

#[test]
fn test_log1_records_topic_and_data() {
    // MSTORE 42 at 0, then LOG1 over the full word with topic 7.
    let code = [
        0x60, 0x2a, 0x60, 0x00, 0x52, // PUSH1 42, PUSH1 0, MSTORE
        0x60, 0x07, // PUSH1 7 (topic)
        0x60, 0x20, 0x60, 0x00, // PUSH1 32 (len), PUSH1 0 (offset)
        0xa1, 0x00, // LOG1, STOP
    ];
    let (report, _) = execute_code(&code, GAS);

    assert!(report.is_success());
    assert_eq!(report.logs.len(), 1);
    let log = &report.logs[0];
    assert_eq!(log.address, contract());
    assert_eq!(log.topics, vec![H256::from_low_u64_be(7)]);
    assert_eq!(log.data[31], 42);
}

#[test]
fn test_reverted_frame_drops_its_logs() {
    let code = [
        0x60, 0x07, 0x60, 0x00, 0x60, 0x00, // topic, len 0, offset 0
        0xa1, // LOG1
        0x60, 0x00, 0x60, 0x00, 0xfd, // REVERT
    ];
    let (report, _) = execute_code(&code, GAS);
    assert_eq!(report.result, TxResult::Revert(VMError::RevertOpcode));
    assert!(report.logs.is_empty());
}

#[test]
fn test_log_in_static_frame_is_rejected() {
    // Covered in detail by the call tests; a LOG0 at the top level is
    // fine though.
    let (report, _) = execute_code(&[0x60, 0x00, 0x60, 0x00, 0xa0, 0x00], GAS);
    assert!(report.is_success());
    assert_eq!(report.logs.len(), 1);
}

// ==================== Self-destruct ====================

#[test]
fn test_selfdestruct_sweeps_balance_and_schedules_deletion() {
    let beneficiary = Address::from_low_u64_be(0x7777);

    // PUSH20 beneficiary, SELFDESTRUCT
    let mut code = vec![0x73];
    code.extend_from_slice(beneficiary.as_bytes());
    code.push(0xff);

    let db = db_with(vec![
        (
            contract(),
            Account::new(U256::from(100), Bytes::from(code), 1, Default::default()),
        ),
        (
            beneficiary,
            Account::new(U256::one(), Bytes::new(), 1, Default::default()),
        ),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);

    let (report, mut db) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    );

    assert!(report.is_success());
    assert_eq!(report.selfdestructed, vec![contract()]);
    assert_eq!(db.get_balance(beneficiary).unwrap(), U256::from(101));
    assert_eq!(db.get_balance(contract()).unwrap(), U256::zero());

    // PUSH20 + the flat 5000; the beneficiary exists so no new-account
    // surcharge applies. The 24000 refund is capped at half the usage.
    assert_eq!(report.gas_used, 3 + 5_000);
    assert_eq!(report.gas_refunded, report.gas_used / 2);
}

#[test]
fn test_selfdestruct_to_self_burns_balance() {
    // PUSH20 own address, SELFDESTRUCT: the sweep credits and then zeroes
    // the same account, so the ether is destroyed with it.
    let mut code = vec![0x73];
    code.extend_from_slice(contract().as_bytes());
    code.push(0xff);

    let db = db_with(vec![
        (
            contract(),
            Account::new(U256::from(100), Bytes::from(code), 1, Default::default()),
        ),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);

    let (report, mut db) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    );

    assert!(report.is_success());
    assert_eq!(report.selfdestructed, vec![contract()]);
    assert_eq!(db.get_balance(contract()).unwrap(), U256::zero());
}

#[test]
fn test_selfdestruct_to_fresh_account_pays_surcharge() {
    let beneficiary = Address::from_low_u64_be(0x7777);

    let mut code = vec![0x73];
    code.extend_from_slice(beneficiary.as_bytes());
    code.push(0xff);

    let db = db_with(vec![
        (
            contract(),
            Account::new(U256::from(100), Bytes::from(code), 1, Default::default()),
        ),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);

    let (report, mut db) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::new(),
    );

    assert!(report.is_success());
    // EIP-161: positive balance into a nonexistent account costs 25000 more.
    assert_eq!(report.gas_used, 3 + 5_000 + 25_000);
    assert_eq!(db.get_balance(beneficiary).unwrap(), U256::from(100));
}

// ==================== Environment ====================

#[test]
fn test_calldata_opcodes() {
    let mut calldata = vec![0u8; 32];
    calldata[31] = 0x99;
    calldata.push(0xaa); // 33 bytes total

    // CALLDATASIZE
    let mut code = vec![0x36];
    code.extend(return_stack_top());
    let db = db_with(vec![
        (contract(), Account::new(U256::zero(), Bytes::from(code), 1, Default::default())),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);
    let (report, _) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::from(calldata.clone()),
    );
    assert_eq!(U256::from_big_endian(&report.output), U256::from(33));

    // CALLDATALOAD at offset 1 reads past the end zero padded.
    let mut code = vec![0x60, 0x01, 0x35];
    code.extend(return_stack_top());
    let db = db_with(vec![
        (contract(), Account::new(U256::zero(), Bytes::from(code), 1, Default::default())),
        (sender(), Account::new(one_ether(), Bytes::new(), 0, Default::default())),
    ]);
    let (report, _) = run(
        db,
        default_env(GAS),
        TxKind::Call(contract()),
        U256::zero(),
        Bytes::from(calldata),
    );
    // bytes 1..33 of the calldata: 0x99 at position 30, 0xaa at 31.
    assert_eq!(report.output[30], 0x99);
    assert_eq!(report.output[31], 0xaa);
}

#[test]
fn test_address_and_caller() {
    let mut code = vec![0x30]; // ADDRESS
    code.extend(return_stack_top());
    let (report, _) = execute_code(&code, GAS);
    assert_eq!(
        report.output[12..],
        contract().as_bytes()[..]
    );

    let mut code = vec![0x33]; // CALLER
    code.extend(return_stack_top());
    let (report, _) = execute_code(&code, GAS);
    assert_eq!(report.output[12..], sender().as_bytes()[..]);
}

#[test]
fn test_msize_grows_by_words() {
    // MSTORE8 at offset 0, then MSIZE.
    let mut code = vec![0x60, 0x01, 0x60, 0x00, 0x53, 0x59];
    code.extend(return_stack_top());
    assert_eq!(execute_and_return_top_raw(&code), U256::from(32));
}

fn execute_and_return_top_raw(code: &[u8]) -> U256 {
    let (report, _) = execute_code(code, GAS);
    assert!(report.is_success());
    U256::from_big_endian(&report.output)
}

#[test]
fn test_pc_pushes_instruction_offset() {
    // PUSH1 0 (2 bytes), then PC sits at offset 2.
    assert_eq!(
        execute_and_return_top(&[0x60, 0x00, 0x58], GAS),
        U256::from(2)
    );
}

#[test]
fn test_gas_opcode_reports_remaining() {
    let mut code = vec![0x5a]; // GAS
    code.extend(return_stack_top());
    assert_eq!(execute_and_return_top_raw(&code), U256::from(GAS - 2));
}

#[test]
fn test_number_opcode() {
    let mut code = vec![0x43];
    code.extend(return_stack_top());
    assert_eq!(execute_and_return_top_raw(&code), U256::one());
}

#[test]
fn test_codesize_and_codecopy() {
    // CODECOPY the whole code to memory and return the first word.
    let code = [
        0x60, 0x0c, // PUSH1 12 (size = code length)
        0x60, 0x00, // PUSH1 0 (code offset)
        0x60, 0x00, // PUSH1 0 (dest offset)
        0x39, // CODECOPY
        0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN mem[0..32]
    ];
    let (report, _) = execute_code(&code, GAS);
    assert!(report.is_success());
    assert_eq!(&report.output[..12], &code[..]);
    assert_eq!(&report.output[12..], &[0u8; 20]);
}
