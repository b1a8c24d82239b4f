//! Panthera Miner CLI
//!
//! A command-line host for the Panthera proof-of-work engine.
//!
//! # Commands
//!
//! - `mine` - Mine on a pool, a pool job file, or the built-in default job
//! - `hash` - Hash a single template
//! - `benchmark` - Run performance benchmark
//! - `target` - Convert a difficulty to a target
//! - `config` - Show the effective configuration

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use panthera::algorithm::{
    hash_light, PantheraHash, Template, FINAL_ROUNDS, MEMORY_ROUNDS, NONCE_OFFSET, SCRATCHPAD_SIZE,
};
use panthera::driver::{DriverSet, RunReport, ShareLimit};
use panthera::pool::{
    difficulty_for_target, target_for_difficulty, DecodedJob, PoolClient, PoolMessage,
};
use panthera::{MinerConfig, PoolJob, Share, SubmitParams};

/// Seconds between `getjob` keepalives
const KEEPALIVE_SECS: u64 = 120;

/// How long to wait for the first pool job
const FIRST_JOB_TIMEOUT_SECS: u64 = 30;

#[derive(Parser)]
#[command(name = "panthera")]
#[command(version = "0.1.0")]
#[command(about = "Panthera proof-of-work miner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start mining
    Mine {
        /// Pool job JSON file (default: built-in low difficulty job)
        #[arg(short, long, conflicts_with = "pool")]
        job: Option<PathBuf>,

        /// Pool address (host:port)
        #[arg(short, long, requires = "wallet")]
        pool: Option<String>,

        /// Wallet address used to log in to the pool
        #[arg(short, long)]
        wallet: Option<String>,

        /// Number of engines to run (0 = number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Mining intensity in percent (0-100)
        #[arg(short, long)]
        intensity: Option<i32>,

        /// Iterations requested per step
        #[arg(long)]
        budget: Option<u32>,

        /// Milliseconds between steps
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many shares
        #[arg(long)]
        max_shares: Option<usize>,
    },

    /// Hash a single template
    Hash {
        /// Template bytes as hex (at most 84 bytes)
        #[arg(long)]
        blob: String,

        /// Nonce written at offset 39
        #[arg(long, default_value = "0")]
        nonce: u32,

        /// Skip the memory-hard phase
        #[arg(long)]
        light: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of hashes to compute
        #[arg(short, long, default_value = "10000")]
        count: u32,
    },

    /// Print the 32-byte target for a difficulty
    Target {
        #[arg(short, long)]
        difficulty: u64,
    },

    /// Show the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().or_else(default_config_path);
    let config = load_config(cli.config.as_deref(), config_path.as_deref())?;

    match cli.command {
        Commands::Mine {
            job,
            pool,
            wallet,
            threads,
            intensity,
            budget,
            interval_ms,
            max_shares,
        } => {
            let mut config = config;
            if let Some(threads) = threads {
                config.threads = if threads == 0 { num_cpus::get() } else { threads };
            }
            if let Some(intensity) = intensity {
                config.intensity = intensity;
            }
            if let Some(budget) = budget {
                config.step_budget = budget;
            }
            if let Some(interval_ms) = interval_ms {
                config.step_interval_ms = interval_ms;
            }
            if max_shares.is_some() {
                config.max_shares = max_shares;
            }
            config.validate()?;
            let source = match (pool, wallet) {
                (Some(address), Some(wallet)) => JobSource::Pool { address, wallet },
                _ => JobSource::Local(job),
            };
            cmd_mine(config, source)
        }
        Commands::Hash { blob, nonce, light } => cmd_hash(&blob, nonce, light),
        Commands::Benchmark { count } => cmd_benchmark(count),
        Commands::Target { difficulty } => cmd_target(difficulty),
        Commands::Config => cmd_config(&config, config_path.as_deref()),
    }
}

/// `<config_dir>/panthera/config.json`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("panthera").join("config.json"))
}

/// An explicit `--config` must exist; the default location may be absent
fn load_config(explicit: Option<&Path>, resolved: Option<&Path>) -> anyhow::Result<MinerConfig> {
    let config = match (explicit, resolved) {
        (Some(path), _) => MinerConfig::load(path)?,
        (None, Some(path)) => MinerConfig::load_or_default(path)?,
        (None, None) => MinerConfig::default(),
    };
    Ok(config)
}

fn load_job(path: &Path) -> anyhow::Result<DecodedJob> {
    let json = std::fs::read_to_string(path)?;
    let job = PoolJob::from_json(&json)?.decode()?;
    Ok(job)
}

/// Where `mine` gets its work
enum JobSource {
    /// A job file, or the built-in default job
    Local(Option<PathBuf>),
    Pool { address: String, wallet: String },
}

fn cmd_mine(config: MinerConfig, source: JobSource) -> anyhow::Result<()> {
    println!("Starting mining...");
    println!("Engines: {}", config.threads);
    println!("Intensity: {}%", config.intensity);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads)
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match source {
            JobSource::Local(path) => {
                let job = path.as_deref().map(load_job).transpose()?;
                match &job {
                    Some(job) => println!("Job: {} (height {})", job.job_id, job.height),
                    None => println!("Job: built-in default"),
                }
                mine_local(config, job).await
            }
            JobSource::Pool { address, wallet } => {
                println!("Pool: {}", address);
                mine_pool(config, &address, &wallet).await
            }
        }
    })
}

/// Flip the returned channel on Ctrl+C
fn interrupt_channel() -> watch::Receiver<bool> {
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping engines");
            interrupt_tx.send_replace(true);
        }
    });
    interrupt_rx
}

async fn interrupted(interrupt: &mut watch::Receiver<bool>) {
    while !*interrupt.borrow_and_update() {
        if interrupt.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn print_share(share: &Share) {
    println!("\nFound valid share!");
    println!("Nonce: {}", share.nonce);
    println!("Hash: {}", hex::encode(share.digest));
}

fn print_reports(reports: &[(usize, RunReport)], shares: usize) {
    println!("\nResults:");
    for (index, report) in reports {
        println!(
            "  Engine {}: {} hashes, {} shares, {:.2} H/s in {:.1}s ({:?})",
            index,
            report.hashes,
            report.shares,
            report.hash_rate,
            report.elapsed.as_secs_f64(),
            report.reason
        );
    }
    println!("  Total shares: {}", shares);
}

async fn mine_local(config: MinerConfig, job: Option<DecodedJob>) -> anyhow::Result<()> {
    let (share_tx, mut share_rx) = mpsc::unbounded_channel();
    let drivers = DriverSet::spawn(&config, job.as_ref(), None, share_tx)?;
    let mut interrupt = interrupt_channel();

    let mut limit = ShareLimit::new(config.max_shares);
    let mut request_id = 1u64;
    loop {
        tokio::select! {
            _ = interrupted(&mut interrupt) => break,
            share = share_rx.recv() => {
                let Some(share) = share else { break };
                print_share(&share);
                let request = SubmitParams::from_share(&config.worker_id, &share).to_request(request_id);
                request_id += 1;
                println!("Submit: {}", request);

                if limit.record() {
                    break;
                }
            }
        }
    }

    let reports = drivers.join().await?;
    print_reports(&reports, limit.found());
    Ok(())
}

async fn mine_pool(config: MinerConfig, address: &str, wallet: &str) -> anyhow::Result<()> {
    let mut client = PoolClient::connect(address).await?;
    client.login(wallet, &config.worker_id).await?;
    let first = time::timeout(
        Duration::from_secs(FIRST_JOB_TIMEOUT_SECS),
        client.wait_for_job(),
    )
    .await
    .map_err(|_| anyhow::anyhow!("No job from pool within {}s", FIRST_JOB_TIMEOUT_SECS))??
    .decode()?;
    println!("Job: {} (height {})", first.job_id, first.height);

    let (job_tx, job_rx) = watch::channel(None);
    let (share_tx, mut share_rx) = mpsc::unbounded_channel();
    let drivers = DriverSet::spawn(&config, Some(&first), Some(job_rx), share_tx)?;
    let mut interrupt = interrupt_channel();

    let period = Duration::from_secs(KEEPALIVE_SECS);
    let mut keepalive = time::interval_at(time::Instant::now() + period, period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut limit = ShareLimit::new(config.max_shares);
    loop {
        tokio::select! {
            _ = interrupted(&mut interrupt) => break,
            share = share_rx.recv() => {
                let Some(share) = share else { break };
                print_share(&share);
                client.submit(&share).await?;
                if limit.record() {
                    break;
                }
            }
            message = client.next_message() => match message? {
                Some(PoolMessage::Job(job)) => match job.decode() {
                    Ok(job) => {
                        println!("Job: {} (height {})", job.job_id, job.height);
                        job_tx.send_replace(Some(job));
                    }
                    Err(e) => warn!("Ignoring pool job: {}", e),
                },
                Some(_) => {}
                None => {
                    warn!("Pool closed the connection");
                    break;
                }
            },
            _ = keepalive.tick() => client.keepalive().await?,
        }
    }

    let reports = drivers.join().await?;
    print_reports(&reports, limit.found());
    let stats = client.stats();
    println!(
        "  Pool: {} submitted, {} accepted, {} rejected",
        stats.submitted, stats.accepted, stats.rejected
    );
    Ok(())
}

fn cmd_hash(blob: &str, nonce: u32, light: bool) -> anyhow::Result<()> {
    let bytes = hex::decode(blob)?;
    let mut template = Template::from_slice(&bytes)?;
    if !template.write_nonce(NONCE_OFFSET, nonce) {
        warn!("Nonce does not fit the template");
    }

    let digest = if light {
        hash_light(template.as_bytes(), nonce)
    } else {
        PantheraHash::new()?.hash(template.as_bytes(), nonce)
    };

    println!("{}", hex::encode(digest));
    Ok(())
}

fn cmd_benchmark(count: u32) -> anyhow::Result<()> {
    println!("Running benchmark with {} hashes...", count);

    let mut hasher = PantheraHash::new()?;
    let mut template = Template::default();

    let start = Instant::now();

    for nonce in 0..count {
        template.write_nonce(NONCE_OFFSET, nonce);
        let _ = hasher.hash(template.as_bytes(), nonce);
    }

    let elapsed = start.elapsed();
    let hashrate = count as f64 / elapsed.as_secs_f64();

    println!("\nResults:");
    println!("  Total hashes: {}", count);
    println!("  Time elapsed: {:.2}s", elapsed.as_secs_f64());
    println!("  Hashrate: {:.2} H/s", hashrate);

    println!("\nAlgorithm parameters:");
    println!("  Scratchpad: {} KB", SCRATCHPAD_SIZE / 1024);
    println!("  Memory rounds: {}", MEMORY_ROUNDS);
    println!("  Final rounds: {}", FINAL_ROUNDS);

    Ok(())
}

fn cmd_target(difficulty: u64) -> anyhow::Result<()> {
    let target = target_for_difficulty(difficulty)?;
    println!("Target: {}", hex::encode(target));
    println!("Difficulty: {}", difficulty_for_target(&target));
    Ok(())
}

fn cmd_config(config: &MinerConfig, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory; using defaults"),
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
