//! Pool session messages
//!
//! Line-delimited JSON-RPC: the miner sends `login`, `submit` and `getjob`
//! requests; the pool answers each by id and pushes `job` notifications.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{PoolJob, PoolJobError};

/// Agent string sent at login
pub const AGENT: &str = concat!("panthera-miner/", env!("CARGO_PKG_VERSION"));

/// Parameters of a pool `login` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginParams {
    /// Wallet address
    pub login: String,
    /// Worker name
    pub pass: String,
    pub agent: String,
}

impl LoginParams {
    pub fn new(wallet: &str, worker: &str) -> Self {
        Self {
            login: wallet.trim().to_string(),
            pass: worker.to_string(),
            agent: AGENT.to_string(),
        }
    }

    /// Wrap into a JSON-RPC 2.0 `login` request
    pub fn to_request(&self, id: u64) -> Value {
        json!({
            "id": id,
            "jsonrpc": "2.0",
            "method": "login",
            "params": self,
        })
    }
}

/// Keepalive `getjob` request for a logged-in session
pub fn getjob_request(id: u64, session_id: &str) -> Value {
    json!({
        "id": id,
        "jsonrpc": "2.0",
        "method": "getjob",
        "params": { "id": session_id },
    })
}

/// Serialize a request as one protocol line
pub fn to_line(message: &Value) -> String {
    format!("{}\n", message)
}

/// A message received from the pool
#[derive(Debug, Clone, PartialEq)]
pub enum PoolMessage {
    /// A `job` notification or a `getjob` reply
    Job(PoolJob),
    /// Reply to `login`, with the session id and possibly a first job
    LoggedIn {
        id: Option<u64>,
        session_id: String,
        job: Option<PoolJob>,
    },
    /// A reply with `status: "OK"`
    Accepted { id: Option<u64> },
    /// An `error` reply or a non-OK status
    Rejected { id: Option<u64>, message: String },
    /// Anything else
    Other(Value),
}

impl PoolMessage {
    /// Parse one line from the pool
    pub fn parse(line: &str) -> Result<Self, PoolJobError> {
        let message: Value = serde_json::from_str(line)?;
        debug!("Pool message: {}", message);
        Self::from_value(message)
    }

    pub fn from_value(message: Value) -> Result<Self, PoolJobError> {
        let id = message.get("id").and_then(Value::as_u64);

        if message.get("method").and_then(Value::as_str) == Some("job") {
            if let Some(params) = message.get("params") {
                return Ok(PoolMessage::Job(serde_json::from_value(params.clone())?));
            }
        }

        if let Some(error) = message.get("error").filter(|e| !e.is_null()) {
            let text = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Ok(PoolMessage::Rejected { id, message: text });
        }

        let Some(result) = message.get("result").filter(|r| r.is_object()) else {
            return Ok(PoolMessage::Other(message));
        };

        if let Some(session_id) = result.get("id").and_then(Value::as_str) {
            let job = match result.get("job").filter(|j| !j.is_null()) {
                Some(job) => Some(serde_json::from_value(job.clone())?),
                None => None,
            };
            return Ok(PoolMessage::LoggedIn {
                id,
                session_id: session_id.to_string(),
                job,
            });
        }

        if result.get("job_id").is_some() {
            return Ok(PoolMessage::Job(serde_json::from_value(result.clone())?));
        }

        match result.get("status").and_then(Value::as_str) {
            Some("OK") => Ok(PoolMessage::Accepted { id }),
            Some(status) => Ok(PoolMessage::Rejected {
                id,
                message: result
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or(status)
                    .to_string(),
            }),
            None => Ok(PoolMessage::Other(message)),
        }
    }
}
