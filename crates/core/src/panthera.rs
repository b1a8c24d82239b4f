//! Core Panthera Implementation
//!
//! An 8-word, 64-bit state goes through four phases:
//! - Absorb: each template byte is XORed into `state[i % 8]`, which is then
//!   rotated left by 13
//! - Nonce: the nonce and its 8/16/24-bit right shifts are XORed into words
//!   0..=3 (the shifts are not masked to single bytes)
//! - Memory-hard: 16 rounds of read-modify-write against the scratchpad at
//!   addresses picked by the state itself
//! - Finalize: 12 rounds of neighbour XOR, rotate and add
//!
//! The memory-hard phase writes back into the scratchpad, so hashing the
//! same input twice on one scratchpad yields two different digests.

use crate::error::EngineError;
use crate::params::*;
use crate::scratchpad::Scratchpad;

/// A 32-byte digest
pub type Digest = [u8; DIGEST_SIZE];

/// Panthera hasher
///
/// Owns the scratchpad used by the memory-hard phase. Without a scratchpad
/// it degrades to the light hash (no memory-hard phase).
#[derive(Debug, Clone)]
pub struct PantheraHash {
    scratchpad: Option<Scratchpad>,
}

impl PantheraHash {
    /// Create a hasher with a freshly seeded 2 MB scratchpad
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self::with_scratchpad(Scratchpad::new()?))
    }

    /// Create a hasher around an existing scratchpad
    pub fn with_scratchpad(scratchpad: Scratchpad) -> Self {
        Self {
            scratchpad: Some(scratchpad),
        }
    }

    /// Create a hasher without a scratchpad
    pub fn light() -> Self {
        Self { scratchpad: None }
    }

    /// Whether the memory-hard phase runs
    pub fn is_memory_hard(&self) -> bool {
        self.scratchpad.is_some()
    }

    pub fn scratchpad(&self) -> Option<&Scratchpad> {
        self.scratchpad.as_ref()
    }

    /// Drop the current scratchpad (if any) and install `scratchpad`
    pub fn replace_scratchpad(&mut self, scratchpad: Option<Scratchpad>) {
        self.scratchpad = scratchpad;
    }

    /// Hash a template with a nonce, evolving the scratchpad
    pub fn hash(&mut self, template: &[u8], nonce: u32) -> Digest {
        compute_digest(template, nonce, self.scratchpad.as_mut())
    }
}

/// Compute a digest, running the memory-hard phase when a scratchpad is given
pub fn compute_digest(template: &[u8], nonce: u32, scratchpad: Option<&mut Scratchpad>) -> Digest {
    let mut state = INITIAL_STATE;

    absorb(&mut state, template);
    mix_nonce(&mut state, nonce);

    if let Some(scratchpad) = scratchpad {
        memory_hard_rounds(&mut state, scratchpad);
    }

    finalize(&mut state);
    state_to_digest(&state)
}

/// Hash without a scratchpad (no memory-hard phase)
///
/// Pure and deterministic; useful for quick host-side checks, never for
/// share validation.
pub fn hash_light(template: &[u8], nonce: u32) -> Digest {
    compute_digest(template, nonce, None)
}

#[inline(always)]
fn absorb(state: &mut [u64; 8], template: &[u8]) {
    for (i, byte) in template.iter().enumerate() {
        let word = &mut state[i % 8];
        *word ^= u64::from(*byte);
        *word = word.rotate_left(13);
    }
}

#[inline(always)]
fn mix_nonce(state: &mut [u64; 8], nonce: u32) {
    let nonce = u64::from(nonce);
    state[0] ^= nonce;
    state[1] ^= nonce >> 8;
    state[2] ^= nonce >> 16;
    state[3] ^= nonce >> 24;
}

/// Read-modify-write chain through the scratchpad
#[inline(always)]
fn memory_hard_rounds(state: &mut [u64; 8], scratchpad: &mut Scratchpad) {
    for _ in 0..MEMORY_ROUNDS {
        for i in 0..8 {
            let addr = scratchpad.address_of(state[i]);

            // address_of never leaves the buffer
            if let Some(word) = scratchpad.read_word(addr) {
                state[i] ^= word;
            }
            scratchpad.write_word(addr, state[i]);

            state[i] = state[i].rotate_left(7).wrapping_mul(GOLDEN_RATIO);
            state[i] ^= state[(i + 1) % 8];
        }
    }
}

#[inline(always)]
fn finalize(state: &mut [u64; 8]) {
    for _ in 0..FINAL_ROUNDS {
        for i in 0..8 {
            state[i] ^= state[(i + 1) % 8];
            state[i] = state[i].rotate_left(11).wrapping_add(GOLDEN_RATIO);
        }
    }
}

/// First 32 bytes of the state, words serialized little-endian
#[inline(always)]
fn state_to_digest(state: &[u64; 8]) -> Digest {
    let mut digest = [0u8; DIGEST_SIZE];
    for (chunk, word) in digest.chunks_exact_mut(WORD_SIZE).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    digest
}
