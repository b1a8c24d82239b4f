//! Current mining job
//!
//! Exactly one job is held at a time. Updates are validated in full before
//! they replace the current job, so a rejected update leaves every field of
//! the previous job untouched.

use core::fmt;

use log::{debug, info};

use crate::error::JobError;
use crate::params::*;

/// Fixed-size block template
#[derive(Clone, PartialEq, Eq)]
pub struct Template([u8; TEMPLATE_SIZE]);

impl Template {
    /// Copy `bytes` to the front of a zeroed 84-byte buffer
    pub fn from_slice(bytes: &[u8]) -> Result<Self, JobError> {
        Self::default().overlay(bytes)
    }

    /// Copy of this template with its first `bytes.len()` bytes replaced
    ///
    /// Bytes past the end of `bytes` keep their current contents.
    pub fn overlay(&self, bytes: &[u8]) -> Result<Self, JobError> {
        if bytes.len() > TEMPLATE_SIZE {
            return Err(JobError::template_too_long(bytes.len()));
        }
        let mut template = self.0;
        template[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(template))
    }

    pub fn as_bytes(&self) -> &[u8; TEMPLATE_SIZE] {
        &self.0
    }

    /// Store `nonce` little-endian at `offset`, if four bytes fit there
    pub fn write_nonce(&mut self, offset: usize, nonce: u32) -> bool {
        match offset
            .checked_add(4)
            .and_then(|end| self.0.get_mut(offset..end))
        {
            Some(slot) => {
                slot.copy_from_slice(&nonce.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Nonce currently stored at `offset`
    pub fn nonce_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.0.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }
}

impl Default for Template {
    fn default() -> Self {
        Self([0u8; TEMPLATE_SIZE])
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Job identifier, at most 63 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JobId(String);

impl JobId {
    /// Build an id, keeping the first 63 characters of `id`
    pub fn new(id: &str) -> Self {
        match id.char_indices().nth(MAX_JOB_ID_LEN) {
            Some((cut, _)) => Self(id[..cut].to_string()),
            None => Self(id.to_string()),
        }
    }

    /// Whether `id` would be kept whole
    pub fn fits(id: &str) -> bool {
        id.chars().nth(MAX_JOB_ID_LEN).is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A unit of mining work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    template: Template,
    target: [u8; TARGET_SIZE],
    height: u64,
    id: JobId,
    nonce_offset: u32,
    difficulty: u64,
}

impl Job {
    /// Validate and build a job on a zeroed template. The nonce offset is
    /// always 39.
    pub fn new(
        template: &[u8],
        target: &[u8; TARGET_SIZE],
        height: u64,
        difficulty: u64,
        id: &str,
    ) -> Result<Self, JobError> {
        Self::with_base(&Template::default(), template, target, height, difficulty, id)
    }

    /// Build a job whose template is `base` with `template` written over
    /// its front
    pub fn with_base(
        base: &Template,
        template: &[u8],
        target: &[u8; TARGET_SIZE],
        height: u64,
        difficulty: u64,
        id: &str,
    ) -> Result<Self, JobError> {
        Ok(Self {
            template: base.overlay(template)?,
            target: *target,
            height,
            id: JobId::new(id),
            nonce_offset: NONCE_OFFSET as u32,
            difficulty,
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn target(&self) -> &[u8; TARGET_SIZE] {
        &self.target
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn nonce_offset(&self) -> u32 {
        self.nonce_offset
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// Write `nonce` into the template and return the bytes to hash
    pub(crate) fn prepare(&mut self, nonce: u32) -> &[u8; TEMPLATE_SIZE] {
        self.template.write_nonce(self.nonce_offset as usize, nonce);
        self.template.as_bytes()
    }
}

impl Default for Job {
    /// Zero template, very low difficulty target
    fn default() -> Self {
        let mut target = [0xFF; TARGET_SIZE];
        target[TARGET_SIZE - 1] = 0x0F;
        Self {
            template: Template::default(),
            target,
            height: 0,
            id: JobId::new(DEFAULT_JOB_ID),
            nonce_offset: NONCE_OFFSET as u32,
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

/// Outcome of an accepted job update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobUpdate {
    /// The supplied id was longer than 63 characters and was cut
    pub id_truncated: bool,
}

/// Holds the current job
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    current: Job,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current job
    ///
    /// A template longer than 84 bytes drops the whole update. A shorter one
    /// only overwrites the front of the current template.
    pub fn set_job(
        &mut self,
        template: &[u8],
        target: &[u8; TARGET_SIZE],
        height: u64,
        difficulty: u64,
        id: &str,
    ) -> Result<JobUpdate, JobError> {
        let base = self.current.template();
        let job = match Job::with_base(base, template, target, height, difficulty, id) {
            Ok(job) => job,
            Err(e) => {
                debug!("Dropped job update {:?}: {}", id, e);
                return Err(e);
            }
        };

        let update = JobUpdate {
            id_truncated: !JobId::fits(id),
        };
        info!("New job set: {} (difficulty: {})", job.id, job.difficulty);
        self.current = job;
        Ok(update)
    }

    pub fn job(&self) -> &Job {
        &self.current
    }

    pub(crate) fn job_mut(&mut self) -> &mut Job {
        &mut self.current
    }

    pub fn id(&self) -> &str {
        self.current.id.as_str()
    }

    pub fn difficulty(&self) -> u64 {
        self.current.difficulty
    }

    pub fn height(&self) -> u64 {
        self.current.height
    }
}
