//! Scratchpad memory for the memory-hard phase
//!
//! A fixed-size byte buffer addressed in 64-bit little-endian words.
//! Every hash with a scratchpad reads and rewrites words in place, so the
//! contents evolve for as long as the engine lives.

use core::fmt;

use crate::error::EngineError;
use crate::params::{GOLDEN_RATIO, SCRATCHPAD_SIZE, WORD_SIZE};

/// Owned, length-checked scratchpad buffer
#[derive(Clone, PartialEq, Eq)]
pub struct Scratchpad {
    bytes: Vec<u8>,
}

impl Scratchpad {
    /// Allocate and seed the standard 2 MB scratchpad
    pub fn new() -> Result<Self, EngineError> {
        Self::with_size(SCRATCHPAD_SIZE)
    }

    /// Allocate and seed a scratchpad of `size` bytes
    ///
    /// `size` must be a non-zero multiple of 8. Allocation failure is
    /// reported, never aborts.
    pub fn with_size(size: usize) -> Result<Self, EngineError> {
        if size == 0 || size % WORD_SIZE != 0 {
            return Err(EngineError::InvalidScratchpadSize { size });
        }

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| EngineError::AllocationFailure { size })?;
        bytes.resize(size, 0);

        let mut scratchpad = Self { bytes };
        scratchpad.seed();
        Ok(scratchpad)
    }

    /// Word `n` is set to `GOLDEN_RATIO * n` (wrapping)
    fn seed(&mut self) {
        for (index, word) in self.bytes.chunks_exact_mut(WORD_SIZE).enumerate() {
            let value = GOLDEN_RATIO.wrapping_mul(index as u64);
            word.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of addressable words
    pub fn word_count(&self) -> usize {
        self.bytes.len() / WORD_SIZE
    }

    /// Byte address selected by a state value: `(value mod words) * 8`
    #[inline(always)]
    pub fn address_of(&self, value: u64) -> usize {
        let word = value % self.word_count() as u64;
        word as usize * WORD_SIZE
    }

    /// Read the word at byte `address`
    ///
    /// Returns `None` for unaligned or out-of-range addresses.
    #[inline(always)]
    pub fn read_word(&self, address: usize) -> Option<u64> {
        let bytes = self.word_slice(address)?;
        let word: [u8; WORD_SIZE] = bytes.try_into().ok()?;
        Some(u64::from_le_bytes(word))
    }

    /// Write `value` at byte `address`
    ///
    /// Returns `false` (and writes nothing) for unaligned or out-of-range
    /// addresses.
    #[inline(always)]
    pub fn write_word(&mut self, address: usize, value: u64) -> bool {
        if address % WORD_SIZE != 0 {
            return false;
        }
        let Some(end) = address.checked_add(WORD_SIZE) else {
            return false;
        };
        match self.bytes.get_mut(address..end) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Raw contents, for snapshots and inspection
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn word_slice(&self, address: usize) -> Option<&[u8]> {
        if address % WORD_SIZE != 0 {
            return None;
        }
        let end = address.checked_add(WORD_SIZE)?;
        self.bytes.get(address..end)
    }
}

impl fmt::Debug for Scratchpad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratchpad")
            .field("len", &self.bytes.len())
            .finish()
    }
}
