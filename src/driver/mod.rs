//! Host-side mining driver
//!
//! Calls [`MiningEngine::step`] on a fixed interval with a bounded budget,
//! forwards found shares, and periodically measures the hash rate and
//! hands it back to the engine (the engine never measures it itself).
//! [`DriverSet`] runs one driver per engine over disjoint nonce ranges.

use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use panthera_core::{EngineError, JobError, MiningEngine, Share, StepOutcome, StopHandle};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

use crate::config::MinerConfig;
use crate::pool::DecodedJob;

/// Job updates pushed to running drivers
pub type JobReceiver = watch::Receiver<Option<DecodedJob>>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Engine setup failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Job rejected: {0}")]
    Job(#[from] JobError),

    #[error("Driver task failed: {0}")]
    Join(#[from] JoinError),
}

/// Why a driver run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_shares` shares were found
    MaxShares,
    /// The engine was stopped (e.g. through a [`StopHandle`])
    Stopped,
    /// The shutdown future resolved
    Shutdown,
}

/// Summary of a driver run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub reason: StopReason,
    pub hashes: u64,
    pub shares: usize,
    pub elapsed: Duration,
    pub hash_rate: f64,
}

/// Drives one engine with the settings from a [`MinerConfig`]
pub struct Driver {
    engine: MiningEngine,
    config: MinerConfig,
    jobs: Option<JobReceiver>,
}

impl Driver {
    /// Take ownership of an initialized engine and apply the config intensity
    pub fn new(mut engine: MiningEngine, config: MinerConfig) -> Self {
        engine.set_intensity(config.intensity);
        Self {
            engine,
            config,
            jobs: None,
        }
    }

    /// Install every job published on `jobs` while running
    ///
    /// A new job restarts the search at the nonce the run started from.
    pub fn with_jobs(mut self, jobs: JobReceiver) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn engine(&self) -> &MiningEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MiningEngine {
        &mut self.engine
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.engine.stop_handle()
    }

    /// Mine until `shutdown` resolves, the engine is stopped, or
    /// `max_shares` shares have been sent on `shares`
    pub async fn run<F>(&mut self, shutdown: F, shares: mpsc::UnboundedSender<Share>) -> RunReport
    where
        F: Future<Output = ()>,
    {
        let mut step_timer = time::interval(self.config.step_interval());
        step_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report_timer = time::interval(self.config.report_interval());
        report_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        report_timer.tick().await;

        tokio::pin!(shutdown);
        let mut jobs = self.jobs.take();

        let start = Instant::now();
        let start_nonce = self.engine.nonce();
        let start_count = self.engine.hash_count();
        let mut found = 0usize;

        self.engine.start();

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => break StopReason::Shutdown,
                job = next_job(&mut jobs) => {
                    if let Some(job) = job {
                        match job.apply(&mut self.engine) {
                            Ok(_) => self.engine.set_nonce(start_nonce),
                            Err(e) => warn!("Ignoring job {}: {}", job.job_id, e),
                        }
                    }
                }
                _ = report_timer.tick() => {
                    self.update_hash_rate(start, start_count);
                }
                _ = step_timer.tick() => {
                    match self.engine.step(self.config.step_budget) {
                        StepOutcome::Found(nonce) => {
                            if let Some(share) = self.engine.last_share() {
                                if shares.send(share.clone()).is_err() {
                                    debug!("Share receiver dropped; share {} not forwarded", nonce);
                                }
                            }
                            found += 1;
                            // Continue past the found nonce rather than re-hashing it
                            self.engine.set_nonce(nonce.wrapping_add(1));

                            if self.config.max_shares.is_some_and(|max| found >= max) {
                                break StopReason::MaxShares;
                            }
                        }
                        StepOutcome::Exhausted => {}
                        StepOutcome::Stopped | StepOutcome::Inactive => break StopReason::Stopped,
                    }
                }
            }
        };

        self.engine.stop();
        self.jobs = jobs;
        let hash_rate = self.update_hash_rate(start, start_count);

        RunReport {
            reason,
            hashes: self.engine.hash_count() - start_count,
            shares: found,
            elapsed: start.elapsed(),
            hash_rate,
        }
    }

    fn update_hash_rate(&mut self, start: Instant, start_count: u64) -> f64 {
        let elapsed = start.elapsed().as_secs_f64();
        let hashes = self.engine.hash_count() - start_count;
        let hash_rate = if elapsed > 0.0 {
            hashes as f64 / elapsed
        } else {
            0.0
        };

        self.engine.set_hash_rate(hash_rate);
        info!(
            "Hashrate: {:.2} H/s | Hashes: {} | Nonce: {} | Time: {:.0}s",
            hash_rate,
            hashes,
            self.engine.nonce(),
            elapsed
        );
        hash_rate
    }
}

/// Next published job; never resolves without a job channel or once the
/// publisher is gone
async fn next_job(jobs: &mut Option<JobReceiver>) -> Option<DecodedJob> {
    let Some(receiver) = jobs else {
        return std::future::pending().await;
    };
    if receiver.changed().await.is_err() {
        return std::future::pending().await;
    }
    let job = receiver.borrow_and_update().clone();
    job
}

/// Counts shares across engines against an optional limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShareLimit {
    max: Option<usize>,
    found: usize,
}

impl ShareLimit {
    pub fn new(max: Option<usize>) -> Self {
        Self { max, found: 0 }
    }

    /// Count one share; true once the limit is reached
    pub fn record(&mut self) -> bool {
        self.found += 1;
        self.is_reached()
    }

    pub fn is_reached(&self) -> bool {
        self.max.is_some_and(|max| self.found >= max)
    }

    pub fn found(&self) -> usize {
        self.found
    }
}

/// One driver task per engine, stopped together
pub struct DriverSet {
    tasks: Vec<JoinHandle<(usize, RunReport)>>,
    shutdown: watch::Sender<bool>,
}

impl DriverSet {
    /// Spawn `config.threads` drivers on the current runtime
    ///
    /// Each engine gets its own scratchpad, `job` (when given) and a
    /// disjoint starting nonce. Per-engine `max_shares` is not applied;
    /// count shares with a [`ShareLimit`] instead.
    pub fn spawn(
        config: &MinerConfig,
        job: Option<&DecodedJob>,
        jobs: Option<JobReceiver>,
        shares: mpsc::UnboundedSender<Share>,
    ) -> Result<Self, DriverError> {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let driver_config = MinerConfig {
            max_shares: None,
            ..config.clone()
        };

        let mut tasks = Vec::new();
        for (index, start_nonce) in partition_nonces(config.threads).into_iter().enumerate() {
            let mut engine = MiningEngine::initialized()?;
            if let Some(job) = job {
                job.apply(&mut engine)?;
            }
            engine.set_nonce(start_nonce);

            let mut driver = Driver::new(engine, driver_config.clone());
            if let Some(jobs) = &jobs {
                driver = driver.with_jobs(jobs.clone());
            }
            let stop = wait_for_shutdown(shutdown_rx.clone());
            let shares = shares.clone();
            tasks.push(tokio::spawn(async move {
                let report = driver.run(stop, shares).await;
                (index, report)
            }));
        }
        debug!("Spawned {} drivers", tasks.len());

        Ok(Self { tasks, shutdown })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ask every driver to stop
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Stop every driver and collect their reports, in engine order
    pub async fn join(self) -> Result<Vec<(usize, RunReport)>, DriverError> {
        self.shutdown();
        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            reports.push(task.await?);
        }
        Ok(reports)
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Starting nonces that split the 32-bit space evenly between `engines`
pub fn partition_nonces(engines: usize) -> Vec<u32> {
    let engines = engines.max(1) as u64;
    let stride = (1u64 << 32) / engines;
    (0..engines).map(|i| (i * stride) as u32).collect()
}
