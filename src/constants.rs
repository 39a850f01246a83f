use ethereum_types::{H256, U256};

pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;
pub const WORD_SIZE: usize = 32;

pub const SUCCESS: U256 = U256([1, 0, 0, 0]);
pub const FAIL: U256 = U256::zero();

pub const STACK_LIMIT: usize = 1024;

pub const MAX_CALL_DEPTH: usize = 1024;

/// keccak256 of the empty byte string.
pub const EMPTY_CODE_HASH: H256 = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

pub const MEMORY_EXPANSION_QUOTIENT: usize = 512;

/// Contract size cap introduced by EIP-170.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// BLOCKHASH only serves the most recent 256 blocks.
pub const LAST_AVAILABLE_BLOCK_LIMIT: U256 = U256([256, 0, 0, 0]);
