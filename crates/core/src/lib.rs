//! # Panthera Core
//!
//! An embeddable, memory-hard proof-of-work engine. A host hands it a block
//! template and a target, then drives the nonce search in small bounded
//! steps so mining can be interleaved with other work.
//!
//! ## Components
//!
//! - **Scratchpad**: 2 MB buffer, seeded with `0x9e3779b97f4a7c15 * word_index`
//! - **Hash**: 8-word state; absorb, nonce mix, 16 memory-hard rounds,
//!   12 finalization rounds
//! - **Target**: 256-bit little-endian comparison (byte 31 most significant)
//! - **Job store**: one 84-byte template, nonce at offset 39
//! - **Engine**: bounded steps with intensity throttle and soft cancellation
//!
//! The memory-hard rounds write back into the scratchpad, so hashing is
//! deliberately not idempotent: the scratchpad evolves with every hash.
//!
//! ## Example
//!
//! ```rust
//! use panthera_core::{MiningEngine, StepOutcome};
//!
//! let mut engine = MiningEngine::initialized().expect("2 MB scratchpad");
//!
//! let mut target = [0xFF; 32];
//! target[31] = 0x0F;
//! engine.set_job(&[0u8; 84], &target, 1, 1000, "example").unwrap();
//!
//! engine.start();
//! match engine.step(1_000) {
//!     StepOutcome::Found(nonce) => println!("share at nonce {}", nonce),
//!     other => println!("no share this step: {:?}", other),
//! }
//! println!("hashes so far: {}", engine.hash_count());
//! ```

mod engine;
mod error;
mod job;
mod panthera;
mod params;
mod scratchpad;
mod target;

mod ffi;

pub use engine::{MiningEngine, Share, StepOutcome, StopHandle};
pub use error::{EngineError, JobError};
pub use job::{Job, JobId, JobStore, JobUpdate, Template};
pub use panthera::{Digest, PantheraHash, compute_digest, hash_light};
pub use params::*;
pub use scratchpad::Scratchpad;
pub use target::{compare_to_target, meets_target};

#[cfg(test)]
mod tests;
