#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use corten_evm::memory::{Memory, calculate_memory_size, expansion_cost};
use ethereum_types::U256;

#[test]
fn test_words() {
    let mut mem = Memory::new();

    mem.store_word(0, U256::from(4)).unwrap();

    assert_eq!(mem.load_word(0).unwrap(), U256::from(4));
    assert_eq!(mem.len(), 32);
}

#[test]
fn test_unwritten_memory_reads_zero() {
    let mut mem = Memory::new();

    // Reads at arbitrary offsets without a prior write yield zeros.
    assert_eq!(mem.load_word(0).unwrap(), U256::zero());
    assert_eq!(mem.load_word(1000).unwrap(), U256::zero());
}

#[test]
fn test_growth_is_word_aligned() {
    let mut mem = Memory::new();

    mem.store_data(0, &[1, 2, 3, 4]).unwrap();
    assert_eq!(mem.len(), 32);

    mem.store_data(33, &[5]).unwrap();
    assert_eq!(mem.len(), 64);
}

#[test]
fn test_zero_size_load_does_not_expand() {
    let mut mem = Memory::new();

    let data = mem.load_range(10_000, 0).unwrap();
    assert!(data.is_empty());
    assert_eq!(mem.len(), 0);
}

#[test]
fn test_load_range_round_trip() {
    let mut mem = Memory::new();

    mem.store_data(10, &[0xaa, 0xbb, 0xcc]).unwrap();
    let data = mem.load_range(10, 3).unwrap();
    assert_eq!(&data[..], &[0xaa, 0xbb, 0xcc]);

    // The tail of the touched word stays zero.
    let tail = mem.load_range(13, 3).unwrap();
    assert_eq!(&tail[..], &[0, 0, 0]);
}

// ==================== Expansion Cost Tests ====================

#[test]
fn test_memory_size_is_zero_for_empty_access() {
    // A zero size never requires memory, whatever the offset.
    assert_eq!(calculate_memory_size(usize::MAX - 31, 0).unwrap(), 0);
}

#[test]
fn test_memory_size_rounds_up_to_words() {
    assert_eq!(calculate_memory_size(0, 1).unwrap(), 32);
    assert_eq!(calculate_memory_size(0, 32).unwrap(), 32);
    assert_eq!(calculate_memory_size(0, 33).unwrap(), 64);
    assert_eq!(calculate_memory_size(31, 2).unwrap(), 64);
}

#[test]
fn test_linear_expansion_cost() {
    // One word costs 3 gas, each additional word 3 more (quadratic part
    // is negligible this small).
    assert_eq!(expansion_cost(32, 0).unwrap(), 3);
    assert_eq!(expansion_cost(64, 0).unwrap(), 6);
    assert_eq!(expansion_cost(64, 32).unwrap(), 3);
}

#[test]
fn test_quadratic_expansion_cost() {
    // 512 words: 3*512 + 512^2/512 = 1536 + 512 = 2048.
    assert_eq!(expansion_cost(512 * 32, 0).unwrap(), 2048);

    // 1024 words: 3*1024 + 1024^2/512 = 3072 + 2048 = 5120.
    assert_eq!(expansion_cost(1024 * 32, 0).unwrap(), 5120);
}

#[test]
fn test_no_cost_for_shrinking_access() {
    assert_eq!(expansion_cost(32, 64).unwrap(), 0);
    assert_eq!(expansion_cost(64, 64).unwrap(), 0);
}
