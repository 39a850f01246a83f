//! Precompiled contracts at the reserved low addresses.
//!
//! The original set: 0x01 ecrecover, 0x02 sha256, 0x03 ripemd160,
//! 0x04 identity. Dispatch happens by destination address before any
//! contract code is loaded.

use crate::{
    errors::{ContextResult, ExceptionalHalt, TxResult},
    gas_cost,
};
use bytes::Bytes;
use ethereum_types::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use keccak_hash::keccak;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub const ECRECOVER_ADDRESS: u8 = 0x01;
pub const SHA2_256_ADDRESS: u8 = 0x02;
pub const RIPEMD_160_ADDRESS: u8 = 0x03;
pub const IDENTITY_ADDRESS: u8 = 0x04;

/// Whether `address` is a precompiled contract.
pub fn is_precompile(address: &Address) -> bool {
    let bytes = address.as_bytes();
    bytes[..19].iter().all(|byte| *byte == 0)
        && (ECRECOVER_ADDRESS..=IDENTITY_ADDRESS).contains(&bytes[19])
}

/// Run the precompile at `address`. Running out of gas consumes everything
/// that was forwarded; otherwise exactly the precompile's cost is used.
pub fn execute_precompile(address: Address, calldata: &Bytes, gas_limit: u64) -> ContextResult {
    let result = match address.as_bytes()[19] {
        ECRECOVER_ADDRESS => ecrecover(calldata, gas_limit),
        SHA2_256_ADDRESS => sha2_256(calldata, gas_limit),
        RIPEMD_160_ADDRESS => ripemd_160(calldata, gas_limit),
        IDENTITY_ADDRESS => identity(calldata, gas_limit),
        _ => Err(()),
    };

    match result {
        Ok((output, gas_used)) => ContextResult {
            result: TxResult::Success,
            gas_used,
            output,
        },
        Err(()) => ContextResult {
            result: TxResult::Revert(ExceptionalHalt::OutOfGas.into()),
            gas_used: gas_limit,
            output: Bytes::new(),
        },
    }
}

fn charge(cost: u64, gas_limit: u64) -> Result<u64, ()> {
    if cost > gas_limit { Err(()) } else { Ok(cost) }
}

/// Public key recovery. Invalid input yields an empty output rather than a
/// failure.
fn ecrecover(calldata: &Bytes, gas_limit: u64) -> Result<(Bytes, u64), ()> {
    let gas_used = charge(gas_cost::ECRECOVER_COST, gas_limit)?;

    let mut input = [0u8; 128];
    let n = calldata.len().min(128);
    input[..n].copy_from_slice(&calldata[..n]);

    let Some(address) = recover_address(&input) else {
        return Ok((Bytes::new(), gas_used));
    };

    let mut output = [0u8; 32];
    output[12..].copy_from_slice(address.as_bytes());
    Ok((Bytes::copy_from_slice(&output), gas_used))
}

fn recover_address(input: &[u8; 128]) -> Option<Address> {
    let message_hash = &input[0..32];

    // v is a 32-byte big-endian 27 or 28.
    if input[32..63].iter().any(|byte| *byte != 0) {
        return None;
    }
    let v = input[63];
    if v != 27 && v != 28 {
        return None;
    }

    let mut signature = Signature::from_slice(&input[64..128]).ok()?;
    let mut recovery_id = RecoveryId::from_byte(v - 27)?;

    // The precompile accepts high-s signatures, the curve library does not:
    // normalize and flip the recovery parity to compensate.
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)?;
    }

    let verifying_key =
        VerifyingKey::recover_from_prehash(message_hash, &signature, recovery_id).ok()?;

    let public_key = verifying_key.to_encoded_point(false);
    let hash = keccak(&public_key.as_bytes()[1..]);
    Some(Address::from_slice(&hash.as_bytes()[12..]))
}

fn sha2_256(calldata: &Bytes, gas_limit: u64) -> Result<(Bytes, u64), ()> {
    let cost = gas_cost::sha2_256(calldata.len()).map_err(|_| ())?;
    let gas_used = charge(cost, gas_limit)?;

    let mut hasher = Sha256::new();
    hasher.update(calldata);
    Ok((Bytes::copy_from_slice(&hasher.finalize()), gas_used))
}

fn ripemd_160(calldata: &Bytes, gas_limit: u64) -> Result<(Bytes, u64), ()> {
    let cost = gas_cost::ripemd_160(calldata.len()).map_err(|_| ())?;
    let gas_used = charge(cost, gas_limit)?;

    let mut hasher = Ripemd160::new();
    hasher.update(calldata);
    let digest = hasher.finalize();

    // The 20 byte digest is left padded to a full word.
    let mut output = [0u8; 32];
    output[12..].copy_from_slice(&digest);
    Ok((Bytes::copy_from_slice(&output), gas_used))
}

fn identity(calldata: &Bytes, gas_limit: u64) -> Result<(Bytes, u64), ()> {
    let cost = gas_cost::identity(calldata.len()).map_err(|_| ())?;
    let gas_used = charge(cost, gas_limit)?;
    Ok((calldata.clone(), gas_used))
}
