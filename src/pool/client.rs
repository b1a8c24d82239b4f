//! TCP pool client
//!
//! One connection per session. Requests are written as JSON lines; replies
//! and job notifications are read back line by line.

use std::collections::HashSet;
use std::net::SocketAddr;

use log::{debug, info, warn};
use panthera_core::Share;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};

use super::protocol::{getjob_request, to_line, LoginParams, PoolMessage};
use super::{PoolJob, PoolJobError, SubmitParams};

#[derive(Error, Debug)]
pub enum PoolClientError {
    #[error("Pool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No addresses found for {0}")]
    Resolve(String),

    #[error("Invalid pool message: {0}")]
    Protocol(#[from] PoolJobError),

    #[error("Pool login rejected: {0}")]
    LoginRejected(String),

    #[error("Pool closed the connection")]
    Disconnected,
}

/// Share outcomes reported by the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShareStats {
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// A logged-in (or logging-in) pool session
pub struct PoolClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: u64,
    login_id: Option<u64>,
    session_id: Option<String>,
    worker: String,
    pending_submits: HashSet<u64>,
    stats: ShareStats,
}

impl PoolClient {
    /// Connect to `host:port` (IP or domain name)
    pub async fn connect(address: &str) -> Result<Self, PoolClientError> {
        let address = resolve(address).await?;
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        info!("Connected to pool at {}", address);
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
            login_id: None,
            session_id: None,
            worker: String::new(),
            pending_submits: HashSet::new(),
            stats: ShareStats::default(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn stats(&self) -> ShareStats {
        self.stats
    }

    /// Send the `login` request
    pub async fn login(&mut self, wallet: &str, worker: &str) -> Result<(), PoolClientError> {
        if wallet.trim().len() < 60 {
            warn!("Wallet address looks unusual: {:?}", wallet);
        }
        self.worker = worker.to_string();

        let id = self.take_id();
        self.login_id = Some(id);
        self.send(&LoginParams::new(wallet, worker).to_request(id))
            .await?;
        info!("Sent login request (worker {})", worker);
        Ok(())
    }

    /// Submit a share under the session id, or the worker name before login
    /// completes. Returns the request id.
    pub async fn submit(&mut self, share: &Share) -> Result<u64, PoolClientError> {
        let submitter = self.session_id.as_deref().unwrap_or(&self.worker);
        let request = SubmitParams::from_share(submitter, share);

        let id = self.take_id();
        self.send(&request.to_request(id)).await?;
        self.pending_submits.insert(id);
        self.stats.submitted += 1;
        info!(
            "Submitted share: job_id={}, nonce={}",
            request.job_id, request.nonce
        );
        Ok(id)
    }

    /// Ask for the current job; a no-op before login completes
    pub async fn keepalive(&mut self) -> Result<(), PoolClientError> {
        let Some(session_id) = self.session_id.clone() else {
            return Ok(());
        };
        let id = self.take_id();
        debug!("Sending keepalive");
        self.send(&getjob_request(id, &session_id)).await
    }

    /// Read the next message, or `None` once the pool closes the connection
    ///
    /// Cancel safe: no line is lost if the future is dropped before it
    /// completes.
    pub async fn next_message(&mut self) -> Result<Option<PoolMessage>, PoolClientError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            let message = PoolMessage::parse(&line)?;
            self.track(&message);
            return Ok(Some(message));
        }
    }

    /// Read until the pool hands out a job
    ///
    /// Fails if the login is rejected or the connection closes first.
    pub async fn wait_for_job(&mut self) -> Result<PoolJob, PoolClientError> {
        loop {
            match self.next_message().await? {
                Some(PoolMessage::Job(job))
                | Some(PoolMessage::LoggedIn { job: Some(job), .. }) => return Ok(job),
                Some(PoolMessage::Rejected { id, message }) if id == self.login_id => {
                    return Err(PoolClientError::LoginRejected(message));
                }
                Some(_) => {}
                None => return Err(PoolClientError::Disconnected),
            }
        }
    }

    fn track(&mut self, message: &PoolMessage) {
        match message {
            PoolMessage::LoggedIn { session_id, .. } => {
                info!("Logged in to pool, session {}", session_id);
                self.session_id = Some(session_id.clone());
            }
            PoolMessage::Accepted { id: Some(id) } if self.pending_submits.remove(id) => {
                self.stats.accepted += 1;
                info!(
                    "Share accepted by pool ({}/{})",
                    self.stats.accepted, self.stats.submitted
                );
            }
            PoolMessage::Rejected {
                id: Some(id),
                message,
            } if self.pending_submits.remove(id) => {
                self.stats.rejected += 1;
                warn!(
                    "Share rejected by pool: {} ({}/{})",
                    message, self.stats.rejected, self.stats.submitted
                );
            }
            PoolMessage::Rejected { message, .. } => warn!("Pool error: {}", message),
            PoolMessage::Job(job) => info!("New job received from pool: {}", job.job_id),
            _ => {}
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn send(&mut self, message: &Value) -> Result<(), PoolClientError> {
        let line = to_line(message);
        debug!("Sending: {}", line.trim_end());
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

async fn resolve(address: &str) -> Result<SocketAddr, PoolClientError> {
    if let Ok(address) = address.parse::<SocketAddr>() {
        return Ok(address);
    }
    lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| PoolClientError::Resolve(address.to_string()))
}
