#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use corten_evm::call_frame::Stack;
use ethereum_types::U256;

/// Helper to setup a stack with specific values
fn setup_stack_with_values(values: &[u64]) -> Stack {
    let mut stack = Stack::default();
    for &value in values {
        stack.push(U256::from(value)).unwrap();
    }
    stack
}

// ==================== Stack DUP Tests ====================

#[test]
fn test_stack_dup_depth_1() {
    let mut stack = setup_stack_with_values(&[1, 2, 3]);

    // DUP1 duplicates the value at depth 0 (top)
    stack.dup::<0>().unwrap();

    // Stack should now be [1, 2, 3, 3] with 3 on top twice
    assert_eq!(stack.pop1().unwrap(), U256::from(3));
    assert_eq!(stack.pop1().unwrap(), U256::from(3));
    assert_eq!(stack.pop1().unwrap(), U256::from(2));
    assert_eq!(stack.pop1().unwrap(), U256::from(1));
}

#[test]
fn test_stack_dup_depth_5() {
    let mut stack = setup_stack_with_values(&[1, 2, 3, 4, 5, 6]);

    // DUP5 duplicates the value at depth 4 (5th from top)
    stack.dup::<4>().unwrap();

    // The value at depth 4 is 2, so stack becomes [1, 2, 3, 4, 5, 6, 2]
    assert_eq!(stack.pop1().unwrap(), U256::from(2));
}

#[test]
fn test_stack_dup_depth_16() {
    let mut stack = Stack::default();
    for i in 1..=20 {
        stack.push(U256::from(i)).unwrap();
    }

    // DUP16 duplicates the value at depth 15 (16th from top)
    stack.dup::<15>().unwrap();

    // The value at depth 15 is 5, so it should be on top
    assert_eq!(stack.pop1().unwrap(), U256::from(5));
}

#[test]
fn test_stack_dup_underflow() {
    let mut stack = setup_stack_with_values(&[1, 2]);
    assert!(stack.dup::<2>().is_err());
}

// ==================== Stack SWAP Tests ====================

#[test]
fn test_stack_swap_depth_1() {
    let mut stack = setup_stack_with_values(&[1, 2, 3]);

    // SWAP1 swaps top with value at depth 1
    stack.swap::<1>().unwrap();

    // Stack was [1, 2, 3], after SWAP1 it's [1, 3, 2]
    assert_eq!(stack.pop1().unwrap(), U256::from(2));
    assert_eq!(stack.pop1().unwrap(), U256::from(3));
    assert_eq!(stack.pop1().unwrap(), U256::from(1));
}

#[test]
fn test_stack_swap_depth_5() {
    let mut stack = setup_stack_with_values(&[1, 2, 3, 4, 5, 6]);

    // SWAP5 swaps top (6) with value at depth 5 (1)
    stack.swap::<5>().unwrap();

    // Top should now be 1
    assert_eq!(stack.pop1().unwrap(), U256::from(1));
    // Next values
    assert_eq!(stack.pop1().unwrap(), U256::from(5));
    assert_eq!(stack.pop1().unwrap(), U256::from(4));
    assert_eq!(stack.pop1().unwrap(), U256::from(3));
    assert_eq!(stack.pop1().unwrap(), U256::from(2));
    // Bottom should now be 6 (swapped from top)
    assert_eq!(stack.pop1().unwrap(), U256::from(6));
}

#[test]
fn test_stack_swap_depth_16() {
    let mut stack = Stack::default();
    for i in 1..=20 {
        stack.push(U256::from(i)).unwrap();
    }

    // SWAP16 swaps top (20) with value at depth 16 (4)
    stack.swap::<16>().unwrap();

    // Top should now be 4
    assert_eq!(stack.pop1().unwrap(), U256::from(4));

    // Skip to the position that was swapped
    for _ in 0..15 {
        stack.pop1().unwrap();
    }

    // This should now be 20 (swapped from top)
    assert_eq!(stack.pop1().unwrap(), U256::from(20));
}

#[test]
fn test_stack_swap_underflow() {
    let mut stack = setup_stack_with_values(&[1]);
    assert!(stack.swap::<1>().is_err());
}

// ==================== Stack Bounds Tests ====================

#[test]
fn test_stack_overflow_at_limit() {
    let mut stack = Stack::default();
    for i in 0..1024 {
        stack.push(U256::from(i)).unwrap();
    }
    assert_eq!(stack.len(), 1024);

    // The 1025th push must fail and leave the stack untouched
    assert!(stack.push(U256::from(1024)).is_err());
    assert_eq!(stack.len(), 1024);
}

#[test]
fn test_stack_underflow_on_empty_pop() {
    let mut stack = Stack::default();
    assert!(stack.pop1().is_err());
}

#[test]
fn test_stack_multi_pop_order() {
    let mut stack = setup_stack_with_values(&[1, 2, 3]);

    // pop::<N> returns the top of the stack first
    let [a, b, c] = stack.pop::<3>().unwrap();
    assert_eq!(a, U256::from(3));
    assert_eq!(b, U256::from(2));
    assert_eq!(c, U256::from(1));
    assert!(stack.is_empty());
}

#[test]
fn test_stack_multi_pop_underflow_is_atomic() {
    let mut stack = setup_stack_with_values(&[1, 2]);
    assert!(stack.pop::<3>().is_err());
    // Nothing should have been consumed
    assert_eq!(stack.len(), 2);
}
