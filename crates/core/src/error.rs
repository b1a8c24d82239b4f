//! Error types for the engine

use thiserror::Error;

use crate::params::TEMPLATE_SIZE;

/// Failures while (re)building the scratchpad
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to allocate {size} byte scratchpad")]
    AllocationFailure { size: usize },

    #[error("Scratchpad size {size} is not a non-zero multiple of 8")]
    InvalidScratchpadSize { size: usize },
}

/// Rejected job updates. A rejected update leaves the current job untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Template is {len} bytes, at most {max} allowed")]
    TemplateTooLong { len: usize, max: usize },
}

impl JobError {
    pub(crate) fn template_too_long(len: usize) -> Self {
        JobError::TemplateTooLong {
            len,
            max: TEMPLATE_SIZE,
        }
    }
}
