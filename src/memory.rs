use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_USIZE},
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ExceptionalHalt::{OutOfBounds, OutOfGas};
use bytes::Bytes;
use ethereum_types::U256;

/// Byte addressable, zero extending frame memory.
///
/// The buffer only ever grows, in 32-byte words. Gas for growth is charged
/// by the opcode handlers *before* the access through [`expansion_cost`];
/// the methods here just perform the access.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    buffer: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active size in bytes, always a multiple of the word size.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Grow to cover `new_size` bytes, rounded up to a whole word. A size of
    /// zero never expands memory.
    pub fn resize(&mut self, new_size: usize) -> Result<(), VMError> {
        if new_size == 0 || new_size <= self.buffer.len() {
            return Ok(());
        }
        let target = new_size
            .checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfBounds)?;
        self.buffer.resize(target, 0);
        Ok(())
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let end = offset.checked_add(size).ok_or(OutOfBounds)?;
        self.resize(end)?;
        let slice = self.buffer.get(offset..end).ok_or(OutOfBounds)?;
        Ok(Bytes::copy_from_slice(slice))
    }

    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let end = offset
            .checked_add(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfBounds)?;
        self.resize(end)?;
        let slice = self.buffer.get(offset..end).ok_or(OutOfBounds)?;
        Ok(U256::from_big_endian(slice))
    }

    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len()).ok_or(OutOfBounds)?;
        self.resize(end)?;
        self.buffer
            .get_mut(offset..end)
            .ok_or(OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    pub fn store_word(&mut self, offset: usize, word: U256) -> Result<(), VMError> {
        self.store_data(offset, &word.to_big_endian())
    }
}

/// Word aligned size the memory must reach for an access of `size` bytes at
/// `offset`. Zero-size accesses never require growth, whatever the offset.
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }

    offset
        .checked_add(size)
        .and_then(|end| end.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .ok_or(OutOfBounds.into())
}

/// When an expansion is triggered, only the additional words are paid for.
pub fn expansion_cost(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    let cost = if new_memory_size <= current_memory_size {
        0
    } else {
        cost(new_memory_size)?
            .checked_sub(cost(current_memory_size)?)
            .ok_or(InternalError::Underflow)?
    };
    Ok(cost)
}

/// Total cost of a memory of the given byte size: `3·a + a²/512` over the
/// word count `a`.
fn cost(memory_size: usize) -> Result<u64, VMError> {
    let memory_size_word = memory_size
        .checked_add(WORD_SIZE_IN_BYTES_USIZE - 1)
        .ok_or(OutOfGas)?
        / WORD_SIZE_IN_BYTES_USIZE;

    let gas_cost = (memory_size_word.checked_pow(2).ok_or(OutOfGas)? / MEMORY_EXPANSION_QUOTIENT)
        .checked_add(3usize.checked_mul(memory_size_word).ok_or(OutOfGas)?)
        .ok_or(OutOfGas)?;

    gas_cost
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber.into())
}
