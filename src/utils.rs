use crate::errors::{ExceptionalHalt, VMError};
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use rlp::RlpStream;

/// Interpret the low 20 bytes of a machine word as an address.
pub fn word_to_address(word: U256) -> Address {
    let bytes = word.to_big_endian();
    Address::from_slice(&bytes[12..])
}

/// Left-pad an address to a full machine word.
pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

pub fn u256_from_bool(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

pub fn u256_to_usize(value: U256) -> Result<usize, VMError> {
    if value > U256::from(usize::MAX) {
        return Err(ExceptionalHalt::VeryLargeNumber.into());
    }
    Ok(value.as_usize())
}

/// Convert a (size, offset) stack pair to native offsets. A zero size never
/// touches memory, so the offset is allowed to be arbitrarily large in that
/// case.
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    let size = u256_to_usize(size)?;
    if size == 0 {
        return Ok((0, 0));
    }
    Ok((size, u256_to_usize(offset)?))
}

/// Contract address for CREATE: low 20 bytes of keccak256(rlp([sender, nonce])).
pub fn calculate_create_address(creator: Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&creator);
    stream.append(&nonce);
    let hash = keccak(stream.out());
    Address::from_slice(&hash.as_bytes()[12..])
}

/// Contract address for CREATE2:
/// low 20 bytes of keccak256(0xff ‖ sender ‖ salt ‖ keccak256(init_code)).
pub fn calculate_create2_address(creator: Address, init_code: &[u8], salt: U256) -> Address {
    let init_code_hash = keccak(init_code);

    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(creator.as_bytes());
    preimage[21..53].copy_from_slice(&salt.to_big_endian());
    preimage[53..85].copy_from_slice(init_code_hash.as_bytes());

    let hash = keccak(preimage);
    Address::from_slice(&hash.as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_address_round_trip() {
        let address = Address::from_low_u64_be(0xdeadbeef);
        assert_eq!(word_to_address(address_to_word(address)), address);
    }

    #[test]
    fn word_to_address_truncates_high_bytes() {
        let word = U256::MAX;
        let address = word_to_address(word);
        assert_eq!(address, Address::from_slice(&[0xff; 20]));
    }

    #[test]
    fn create_address_depends_on_nonce() {
        let creator = Address::from_low_u64_be(7);
        assert_ne!(
            calculate_create_address(creator, 0),
            calculate_create_address(creator, 1)
        );
    }

    #[test]
    fn create2_address_matches_reference_vector() {
        // EIP-1014 example 0: sender 0x00..00, salt 0, init code 0x00.
        let creator = Address::zero();
        let address = calculate_create2_address(creator, &[0x00], U256::zero());
        assert_eq!(
            address,
            Address::from_slice(&hex::decode("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38").unwrap())
        );
    }
}
