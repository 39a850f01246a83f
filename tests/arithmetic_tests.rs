mod common;

use common::{execute_and_return_top, execute_code, push32};
use ethereum_types::U256;

const GAS: u64 = 100_000;

fn negative(value: u64) -> U256 {
    U256::zero().overflowing_sub(U256::from(value)).0
}

fn signed_min() -> U256 {
    U256::one() << 255
}

// ==================== Division and Modulus ====================

#[test]
fn test_division_by_zero_yields_zero() {
    // PUSH1 0, PUSH1 5, DIV
    let result = execute_and_return_top(&[0x60, 0x00, 0x60, 0x05, 0x04], GAS);
    assert_eq!(result, U256::zero());
}

#[test]
fn test_division_by_zero_gas() {
    // Division by zero is not an error: exactly 2 pushes + DIV are paid.
    let (report, _) = execute_code(&[0x60, 0x00, 0x60, 0x05, 0x04, 0x00], GAS);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 3 + 5);
}

#[test]
fn test_modulus_by_zero_yields_zero() {
    // PUSH1 0, PUSH1 5, MOD
    let result = execute_and_return_top(&[0x60, 0x00, 0x60, 0x05, 0x06], GAS);
    assert_eq!(result, U256::zero());
}

#[test]
fn test_division() {
    // 42 / 7
    let result = execute_and_return_top(&[0x60, 0x07, 0x60, 0x2a, 0x04], GAS);
    assert_eq!(result, U256::from(6));
}

#[test]
fn test_signed_division() {
    // -6 / 2 = -3
    let mut code = push32(U256::from(2));
    code.extend(push32(negative(6)));
    code.push(0x05);
    assert_eq!(execute_and_return_top(&code, GAS), negative(3));
}

#[test]
fn test_signed_division_min_by_minus_one() {
    // The one overflowing case: MIN / -1 wraps back to MIN.
    let mut code = push32(negative(1));
    code.extend(push32(signed_min()));
    code.push(0x05);
    assert_eq!(execute_and_return_top(&code, GAS), signed_min());
}

#[test]
fn test_signed_modulus_takes_dividend_sign() {
    // -8 % 3 = -2
    let mut code = push32(U256::from(3));
    code.extend(push32(negative(8)));
    code.push(0x07);
    assert_eq!(execute_and_return_top(&code, GAS), negative(2));
}

// ==================== Wrapping Arithmetic ====================

#[test]
fn test_add_wraps() {
    let mut code = push32(U256::MAX);
    code.extend([0x60, 0x01, 0x01]); // PUSH1 1, ADD
    assert_eq!(execute_and_return_top(&code, GAS), U256::zero());
}

#[test]
fn test_sub_wraps() {
    // 0 - 1 = MAX
    let code = [0x60, 0x01, 0x60, 0x00, 0x03];
    assert_eq!(execute_and_return_top(&code, GAS), U256::MAX);
}

#[test]
fn test_mul_wraps() {
    // MAX * 2 = MAX - 1
    let mut code = push32(U256::MAX);
    code.extend([0x60, 0x02, 0x02]);
    assert_eq!(
        execute_and_return_top(&code, GAS),
        U256::MAX - U256::one()
    );
}

#[test]
fn test_addmod_uses_unbounded_intermediate() {
    // (MAX + 2) % 3 = 2, which is only right if the sum does not wrap.
    let mut code = vec![0x60, 0x03, 0x60, 0x02];
    code.extend(push32(U256::MAX));
    code.push(0x08);
    assert_eq!(execute_and_return_top(&code, GAS), U256::from(2));
}

#[test]
fn test_mulmod_uses_unbounded_intermediate() {
    // (MAX * MAX) % 8 = 1
    let mut code = vec![0x60, 0x08];
    code.extend(push32(U256::MAX));
    code.extend(push32(U256::MAX));
    code.push(0x09);
    assert_eq!(execute_and_return_top(&code, GAS), U256::one());
}

#[test]
fn test_exp() {
    // 2^10 = 1024
    let code = [0x60, 0x0a, 0x60, 0x02, 0x0a];
    assert_eq!(execute_and_return_top(&code, GAS), U256::from(1024));
}

#[test]
fn test_exp_gas_is_per_exponent_byte() {
    // Exponent 0x0100 has two significant bytes: 10 + 2*50 under EIP-160.
    let (report, _) = execute_code(&[0x61, 0x01, 0x00, 0x60, 0x02, 0x0a, 0x00], GAS);
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 3 + 110);
}

// ==================== Sign and Byte Manipulation ====================

#[test]
fn test_signextend_negative_byte() {
    // Extending 0xff from byte 0 gives -1.
    let code = [0x60, 0xff, 0x60, 0x00, 0x0b];
    assert_eq!(execute_and_return_top(&code, GAS), U256::MAX);
}

#[test]
fn test_signextend_positive_byte() {
    // 0x7f has a clear sign bit: unchanged.
    let code = [0x60, 0x7f, 0x60, 0x00, 0x0b];
    assert_eq!(execute_and_return_top(&code, GAS), U256::from(0x7f));
}

#[test]
fn test_byte_extracts_big_endian_index() {
    // Byte 31 of the word 0xff is 0xff, byte 30 is 0.
    let code = [0x60, 0xff, 0x60, 0x1f, 0x1a];
    assert_eq!(execute_and_return_top(&code, GAS), U256::from(0xff));

    let code = [0x60, 0xff, 0x60, 0x1e, 0x1a];
    assert_eq!(execute_and_return_top(&code, GAS), U256::zero());
}

#[test]
fn test_byte_out_of_range_is_zero() {
    let code = [0x60, 0xff, 0x60, 0x20, 0x1a];
    assert_eq!(execute_and_return_top(&code, GAS), U256::zero());
}

// ==================== Comparisons ====================

#[test]
fn test_unsigned_comparisons() {
    // 1 < 2
    assert_eq!(
        execute_and_return_top(&[0x60, 0x02, 0x60, 0x01, 0x10], GAS),
        U256::one()
    );
    // 2 > 1
    assert_eq!(
        execute_and_return_top(&[0x60, 0x01, 0x60, 0x02, 0x11], GAS),
        U256::one()
    );
    // 2 == 2
    assert_eq!(
        execute_and_return_top(&[0x60, 0x02, 0x60, 0x02, 0x14], GAS),
        U256::one()
    );
    // ISZERO 0
    assert_eq!(
        execute_and_return_top(&[0x60, 0x00, 0x15], GAS),
        U256::one()
    );
}

#[test]
fn test_signed_comparisons() {
    // -1 < 1 signed, even though it is the largest unsigned value.
    let mut code = vec![0x60, 0x01];
    code.extend(push32(negative(1)));
    code.push(0x12); // SLT
    assert_eq!(execute_and_return_top(&code, GAS), U256::one());

    // 1 > -1 signed
    let mut code = push32(negative(1));
    code.extend([0x60, 0x01]);
    code.push(0x13); // SGT
    assert_eq!(execute_and_return_top(&code, GAS), U256::one());
}

// ==================== Shifts ====================

#[test]
fn test_shl() {
    // 1 << 4 = 16
    let code = [0x60, 0x01, 0x60, 0x04, 0x1b];
    assert_eq!(execute_and_return_top(&code, GAS), U256::from(16));
}

#[test]
fn test_shr() {
    // 16 >> 4 = 1
    let code = [0x60, 0x10, 0x60, 0x04, 0x1c];
    assert_eq!(execute_and_return_top(&code, GAS), U256::one());
}

#[test]
fn test_shift_of_256_or_more_clears() {
    let mut code = push32(U256::MAX);
    code.extend([0x61, 0x01, 0x00, 0x1c]); // PUSH2 256, SHR
    assert_eq!(execute_and_return_top(&code, GAS), U256::zero());
}

#[test]
fn test_sar_backfills_sign_bit() {
    // MIN >> 255 arithmetically is all ones.
    let mut code = push32(signed_min());
    code.extend([0x60, 0xff, 0x1d]);
    assert_eq!(execute_and_return_top(&code, GAS), U256::MAX);

    // Positive values shift like SHR.
    let code = [0x60, 0x10, 0x60, 0x04, 0x1d];
    assert_eq!(execute_and_return_top(&code, GAS), U256::one());
}

// ==================== Word Representation ====================

#[test]
fn test_word_byte_round_trip() {
    for bytes in [
        vec![0x01],
        vec![0xde, 0xad, 0xbe, 0xef],
        vec![0xff; 32],
        vec![0x00; 32],
    ] {
        let word = U256::from_big_endian(&bytes);
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(&bytes);
        assert_eq!(word.to_big_endian(), padded);
    }
}
