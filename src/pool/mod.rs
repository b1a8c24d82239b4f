//! Pool jobs, shares and the pool session
//!
//! Pools announce work as JSON `job` notifications with a hex blob and a
//! hex target, and expect found nonces back as `submit` requests. This
//! module translates between those messages and the engine; `protocol`
//! and `client` carry them over a TCP session.

pub mod client;
pub mod protocol;

pub use client::{PoolClient, PoolClientError, ShareStats};
pub use protocol::{LoginParams, PoolMessage};

use log::{debug, info};
use panthera_core::{JobError, JobUpdate, MiningEngine, Share, TARGET_SIZE, TEMPLATE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer for target arithmetic
    pub struct U256(4);
}

/// Difficulty assumed when a pool job does not carry one
pub const DEFAULT_JOB_DIFFICULTY: u64 = 1000;

/// Algorithm name reported with submitted shares
pub const ALGO: &str = "panthera";

#[derive(Error, Debug)]
pub enum PoolJobError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid hex in {field}: {source}")]
    InvalidHex {
        field: &'static str,
        source: hex::FromHexError,
    },

    #[error("Blob is {0} bytes, at most 84 allowed")]
    BlobTooLong(usize),

    #[error("Target must be 4, 8 or 32 bytes, got {0}")]
    InvalidTargetLength(usize),

    #[error("Difficulty must be non-zero")]
    ZeroDifficulty,
}

/// A `job` notification as sent by the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolJob {
    pub job_id: String,
    /// Hex-encoded block template
    pub blob: String,
    /// Hex-encoded target, full (32 bytes) or compact (4 or 8 bytes)
    pub target: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub difficulty: Option<u64>,
}

/// A pool job with its fields decoded and validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedJob {
    pub job_id: String,
    pub template: Vec<u8>,
    pub target: [u8; TARGET_SIZE],
    pub height: u64,
    pub difficulty: u64,
}

impl PoolJob {
    pub fn from_json(json: &str) -> Result<Self, PoolJobError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode hex fields and expand the target
    pub fn decode(&self) -> Result<DecodedJob, PoolJobError> {
        let template = hex::decode(&self.blob).map_err(|source| PoolJobError::InvalidHex {
            field: "blob",
            source,
        })?;
        if template.len() > TEMPLATE_SIZE {
            return Err(PoolJobError::BlobTooLong(template.len()));
        }

        let target = decode_target(&self.target)?;
        let difficulty = self.difficulty.unwrap_or(DEFAULT_JOB_DIFFICULTY);

        debug!(
            "Decoded job {}: {} byte blob, target {}",
            self.job_id,
            template.len(),
            hex::encode(target)
        );

        Ok(DecodedJob {
            job_id: self.job_id.clone(),
            template,
            target,
            height: self.height,
            difficulty,
        })
    }
}

impl DecodedJob {
    /// Install this job on an engine
    pub fn apply(&self, engine: &mut MiningEngine) -> Result<JobUpdate, JobError> {
        let update = engine.set_job(
            &self.template,
            &self.target,
            self.height,
            self.difficulty,
            &self.job_id,
        )?;
        info!(
            "Job {} at height {} (target difficulty {})",
            engine.job_id(),
            self.height,
            difficulty_for_target(&self.target)
        );
        Ok(update)
    }
}

/// Decode a pool target into the engine's 32-byte form
///
/// A 32-byte target is taken as-is (byte 31 most significant). A compact
/// 4- or 8-byte little-endian target bounds the most significant bytes of
/// the digest, so it lands at the top of the 32 bytes with every lower
/// byte set to 0xFF.
pub fn decode_target(target_hex: &str) -> Result<[u8; TARGET_SIZE], PoolJobError> {
    let bytes = hex::decode(target_hex).map_err(|source| PoolJobError::InvalidHex {
        field: "target",
        source,
    })?;

    match bytes.len() {
        TARGET_SIZE => {
            let mut target = [0u8; TARGET_SIZE];
            target.copy_from_slice(&bytes);
            Ok(target)
        }
        4 | 8 => {
            let mut target = [0xFF; TARGET_SIZE];
            target[TARGET_SIZE - bytes.len()..].copy_from_slice(&bytes);
            Ok(target)
        }
        len => Err(PoolJobError::InvalidTargetLength(len)),
    }
}

/// Target for a difficulty: `floor((2^256 - 1) / difficulty)`
pub fn target_for_difficulty(difficulty: u64) -> Result<[u8; TARGET_SIZE], PoolJobError> {
    if difficulty == 0 {
        return Err(PoolJobError::ZeroDifficulty);
    }
    let target = U256::MAX / U256::from(difficulty);
    Ok(target.to_little_endian())
}

/// Difficulty of a target: `floor((2^256 - 1) / target)`, saturated to u64
///
/// A zero target is unreachable and reports `u64::MAX`.
pub fn difficulty_for_target(target: &[u8; TARGET_SIZE]) -> u64 {
    let target = U256::from_little_endian(target);
    if target.is_zero() {
        return u64::MAX;
    }
    let quotient = U256::MAX / target;
    if quotient > U256::from(u64::MAX) {
        u64::MAX
    } else {
        quotient.low_u64()
    }
}

/// Parameters of a pool `submit` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitParams {
    /// Worker id given at login
    pub id: String,
    pub job_id: String,
    /// Nonce as 8 lowercase hex characters
    pub nonce: String,
    /// Hex digest that met the target
    pub result: String,
    pub algo: String,
}

impl SubmitParams {
    pub fn from_share(worker_id: &str, share: &Share) -> Self {
        Self {
            id: worker_id.to_string(),
            job_id: share.job_id.clone(),
            nonce: format!("{:08x}", share.nonce),
            result: hex::encode(share.digest),
            algo: ALGO.to_string(),
        }
    }

    /// Wrap into a JSON-RPC 2.0 `submit` request
    pub fn to_request(&self, id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "jsonrpc": "2.0",
            "method": "submit",
            "params": self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB_JSON: &str = r#"{
        "job_id": "job-1",
        "blob": "0102030405",
        "target": "b88d0600",
        "height": 1234
    }"#;

    #[test]
    fn test_parse_and_decode_compact_job() {
        let job = PoolJob::from_json(JOB_JSON).unwrap();
        assert_eq!(job.height, 1234);
        assert_eq!(job.difficulty, None);

        let decoded = job.decode().unwrap();
        assert_eq!(decoded.template, vec![1, 2, 3, 4, 5]);
        assert_eq!(decoded.difficulty, DEFAULT_JOB_DIFFICULTY);
        assert_eq!(&decoded.target[28..], &[0xb8, 0x8d, 0x06, 0x00]);
        assert!(decoded.target[..28].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_full_target_taken_verbatim() {
        let mut raw = [0x11u8; 32];
        raw[31] = 0x01;
        assert_eq!(decode_target(&hex::encode(raw)).unwrap(), raw);
    }

    #[test]
    fn test_bad_targets_rejected() {
        assert!(matches!(
            decode_target("aabbcc"),
            Err(PoolJobError::InvalidTargetLength(3))
        ));
        assert!(matches!(
            decode_target("xyz0"),
            Err(PoolJobError::InvalidHex { field: "target", .. })
        ));
    }

    #[test]
    fn test_oversized_blob_rejected() {
        let job = PoolJob {
            job_id: "big".into(),
            blob: "00".repeat(90),
            target: "ffffffff".into(),
            height: 0,
            difficulty: Some(5),
        };
        assert!(matches!(job.decode(), Err(PoolJobError::BlobTooLong(90))));
    }

    #[test]
    fn test_difficulty_target_conversion() {
        assert_eq!(target_for_difficulty(1).unwrap(), [0xFF; 32]);
        assert_eq!(difficulty_for_target(&[0xFF; 32]), 1);

        // Difficulty 256 clears the top byte
        let target = target_for_difficulty(256).unwrap();
        assert_eq!(target[31], 0x00);
        assert!(target[..31].iter().all(|b| *b == 0xFF));
        assert_eq!(difficulty_for_target(&target), 256);

        assert!(matches!(
            target_for_difficulty(0),
            Err(PoolJobError::ZeroDifficulty)
        ));
        assert_eq!(difficulty_for_target(&[0u8; 32]), u64::MAX);

        let mut tiny = [0u8; 32];
        tiny[0] = 1;
        assert_eq!(difficulty_for_target(&tiny), u64::MAX);
    }

    #[test]
    fn test_apply_installs_job() {
        let job = PoolJob::from_json(JOB_JSON).unwrap().decode().unwrap();
        let mut engine = MiningEngine::new();
        job.apply(&mut engine).unwrap();
        assert_eq!(engine.job_id(), "job-1");
        assert_eq!(engine.height(), 1234);
        assert_eq!(&engine.job().template().as_bytes()[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_submit_request_shape() {
        let share = Share {
            job_id: "job-9".into(),
            nonce: 0x2a,
            digest: [0xAB; 32],
        };
        let request = SubmitParams::from_share("worker-1", &share).to_request(7);

        assert_eq!(request["method"], "submit");
        assert_eq!(request["id"], 7);
        assert_eq!(request["params"]["nonce"], "0000002a");
        assert_eq!(request["params"]["job_id"], "job-9");
        assert_eq!(request["params"]["algo"], "panthera");
        assert_eq!(request["params"]["result"], "ab".repeat(32));
    }
}
