//! Bounded-step mining engine
//!
//! One `MiningEngine` owns a scratchpad, the current job and the session
//! counters. A host drives it by calling [`MiningEngine::step`] repeatedly
//! with a small iteration budget, which keeps each call short enough to
//! interleave with other work.
//!
//! Everything is single-caller: mutation needs `&mut self`. The one
//! exception is the active flag, which a [`StopHandle`] can clear from
//! another thread while a step is running; the step loop checks it before
//! every hash.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::error::{EngineError, JobError};
use crate::job::{Job, JobStore, JobUpdate};
use crate::panthera::{Digest, PantheraHash};
use crate::params::*;
use crate::scratchpad::Scratchpad;
use crate::target::meets_target;

/// Result of one bounded search step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The nonce produced a digest at or below the target
    Found(u32),
    /// The whole budget ran without a hit
    Exhausted,
    /// `stop()` was observed before the budget ran out
    Stopped,
    /// The engine was inactive or has no scratchpad; nothing ran
    Inactive,
}

impl StepOutcome {
    pub fn nonce(&self) -> Option<u32> {
        match self {
            StepOutcome::Found(nonce) => Some(*nonce),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, StepOutcome::Found(_))
    }

    /// Host ABI encoding: the nonce, or `0` when nothing was found
    ///
    /// A found nonce of `0` encodes the same as "not found".
    pub fn sentinel(&self) -> u32 {
        self.nonce().unwrap_or(NOT_FOUND)
    }
}

/// A nonce that met its job's target, with the digest that met it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_id: String,
    pub nonce: u32,
    pub digest: Digest,
}

/// Cloneable handle that can stop a running engine from another thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    active: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Panthera mining engine
#[derive(Debug)]
pub struct MiningEngine {
    hasher: PantheraHash,
    jobs: JobStore,
    active: Arc<AtomicBool>,
    nonce: u32,
    hash_count: u64,
    hash_rate: f64,
    intensity: i32,
    last_share: Option<Share>,
}

impl MiningEngine {
    /// Create an inactive engine with no scratchpad; call [`init`](Self::init)
    /// before mining.
    pub fn new() -> Self {
        Self {
            hasher: PantheraHash::light(),
            jobs: JobStore::new(),
            active: Arc::new(AtomicBool::new(false)),
            nonce: 0,
            hash_count: 0,
            hash_rate: 0.0,
            intensity: DEFAULT_INTENSITY,
            last_share: None,
        }
    }

    /// Create an engine with an initialized scratchpad
    pub fn initialized() -> Result<Self, EngineError> {
        let mut engine = Self::new();
        engine.init()?;
        Ok(engine)
    }

    /// Allocate and seed the 2 MB scratchpad, discarding any previous one
    pub fn init(&mut self) -> Result<(), EngineError> {
        self.init_with_size(SCRATCHPAD_SIZE)
    }

    /// Allocate and seed a scratchpad of `size` bytes
    ///
    /// On failure the engine is left without a scratchpad and `step` does
    /// nothing until a later init succeeds.
    pub fn init_with_size(&mut self, size: usize) -> Result<(), EngineError> {
        self.hasher.replace_scratchpad(None);

        match Scratchpad::with_size(size) {
            Ok(scratchpad) => {
                self.hasher.replace_scratchpad(Some(scratchpad));
                info!(
                    "Panthera initialized with {} KB scratchpad",
                    size / 1024
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to initialize Panthera scratchpad: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.hasher.is_memory_hard()
    }

    pub fn start(&mut self) {
        self.active.store(true, Ordering::SeqCst);
        info!("Mining started");
    }

    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        info!("Mining stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// Search up to `max_iterations * intensity / 100` nonces from the cursor
    ///
    /// Each iteration writes the nonce into the template, hashes it and
    /// counts the hash. A hit leaves the cursor on the found nonce; otherwise
    /// the cursor ends one past the last nonce tried.
    pub fn step(&mut self, max_iterations: u32) -> StepOutcome {
        if !self.is_active() || !self.is_initialized() {
            return StepOutcome::Inactive;
        }

        let iterations = self.effective_iterations(max_iterations);
        let mut nonce = self.nonce;

        for _ in 0..iterations {
            if !self.is_active() {
                self.nonce = nonce;
                debug!("Step interrupted at nonce {}", nonce);
                return StepOutcome::Stopped;
            }

            let template = self.jobs.job_mut().prepare(nonce);
            let digest = self.hasher.hash(template, nonce);
            self.hash_count += 1;

            let job = self.jobs.job();
            if meets_target(&digest, job.target()) {
                self.nonce = nonce;
                info!("Found valid share! Nonce: {}, Job: {}", nonce, job.id());
                self.last_share = Some(Share {
                    job_id: job.id().to_string(),
                    nonce,
                    digest,
                });
                return StepOutcome::Found(nonce);
            }

            nonce = nonce.wrapping_add(1);
        }

        self.nonce = nonce;
        StepOutcome::Exhausted
    }

    /// Iterations a step with `max_iterations` actually runs
    ///
    /// At least one whenever `max_iterations` is non-zero.
    pub fn effective_iterations(&self, max_iterations: u32) -> u32 {
        let scaled = u64::from(max_iterations) * self.intensity as u64 / 100;
        if max_iterations > 0 && scaled == 0 {
            1
        } else {
            scaled as u32
        }
    }

    /// Replace the current job; see [`JobStore::set_job`]
    pub fn set_job(
        &mut self,
        template: &[u8],
        target: &[u8; TARGET_SIZE],
        height: u64,
        difficulty: u64,
        id: &str,
    ) -> Result<JobUpdate, JobError> {
        self.jobs.set_job(template, target, height, difficulty, id)
    }

    pub fn job(&self) -> &Job {
        self.jobs.job()
    }

    pub fn job_id(&self) -> &str {
        self.jobs.id()
    }

    pub fn difficulty(&self) -> u64 {
        self.jobs.difficulty()
    }

    pub fn height(&self) -> u64 {
        self.jobs.height()
    }

    pub fn hash_count(&self) -> u64 {
        self.hash_count
    }

    pub fn reset_hash_count(&mut self) {
        self.hash_count = 0;
    }

    /// Host-reported hash rate; never computed by the engine
    pub fn hash_rate(&self) -> f64 {
        self.hash_rate
    }

    pub fn set_hash_rate(&mut self, rate: f64) {
        self.hash_rate = rate;
    }

    /// Set intensity in percent. Values outside 0..=100 are ignored.
    ///
    /// Returns whether the value was applied.
    pub fn set_intensity(&mut self, intensity: i32) -> bool {
        if (0..=100).contains(&intensity) {
            self.intensity = intensity;
            info!("Mining intensity set to {}%", intensity);
            true
        } else {
            debug!("Ignored out-of-range intensity {}", intensity);
            false
        }
    }

    pub fn intensity(&self) -> i32 {
        self.intensity
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce = nonce;
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// Hash the current job at the cursor nonce
    ///
    /// Evolves the scratchpad like a step iteration but does not count
    /// towards `hash_count`.
    pub fn current_digest(&mut self) -> Digest {
        let nonce = self.nonce;
        let template = self.jobs.job_mut().prepare(nonce);
        self.hasher.hash(template, nonce)
    }

    /// The most recent share found by `step`
    pub fn last_share(&self) -> Option<&Share> {
        self.last_share.as_ref()
    }

    pub fn scratchpad(&self) -> Option<&Scratchpad> {
        self.hasher.scratchpad()
    }
}

impl Default for MiningEngine {
    fn default() -> Self {
        Self::new()
    }
}
