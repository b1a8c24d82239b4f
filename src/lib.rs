//! Panthera Miner Library
//!
//! Host-side companion to the Panthera proof-of-work engine.
//!
//! # Overview
//!
//! The engine (`panthera-core`) only knows how to search a bounded slice of
//! the nonce space per call. This crate is the host around it:
//!
//! - **Pool jobs**: decode `job` notifications (hex blob, full or compact
//!   target) and encode found shares as `submit` requests
//! - **Pool session**: log in over TCP, receive jobs, submit shares and
//!   keep the session alive
//! - **Targets**: convert between difficulty and 256-bit targets
//! - **Driver**: call `step` on an interval, forward shares, report the
//!   hash rate back to the engine; run several engines as one set
//! - **Config**: JSON settings for intensity, step budget and pacing
//!
//! # Example
//!
//! ```rust
//! use panthera::algorithm::{MiningEngine, StepOutcome};
//! use panthera::pool::PoolJob;
//!
//! let job = PoolJob::from_json(
//!     r#"{"job_id":"1","blob":"00","target":"ffffff0f","height":10}"#,
//! ).unwrap();
//!
//! let mut engine = MiningEngine::initialized().unwrap();
//! job.decode().unwrap().apply(&mut engine).unwrap();
//!
//! engine.start();
//! if let StepOutcome::Found(nonce) = engine.step(500) {
//!     println!("Valid share at nonce {}", nonce);
//! }
//! ```

// Re-export the core algorithm
pub use panthera_core as algorithm;

pub mod config;
pub mod driver;
pub mod pool;

// Convenience re-exports
pub use algorithm::{meets_target, MiningEngine, Share, StepOutcome};
pub use config::MinerConfig;
pub use driver::{Driver, DriverSet, RunReport, ShareLimit, StopReason};
pub use pool::{PoolJob, SubmitParams};
