//! Target comparison
//!
//! Digests and targets are 256-bit little-endian numbers: byte 31 is the
//! most significant. A digest meets a target when it is numerically at or
//! below it.

use core::cmp::Ordering;

use crate::params::{DIGEST_SIZE, TARGET_SIZE};

/// Compare a digest to a target, most significant byte (index 31) first
#[inline(always)]
pub fn compare_to_target(digest: &[u8; DIGEST_SIZE], target: &[u8; TARGET_SIZE]) -> Ordering {
    digest.iter().rev().cmp(target.iter().rev())
}

/// Check if a digest meets the target
///
/// # Example
///
/// ```rust
/// use panthera_core::meets_target;
///
/// let mut target = [0xFF; 32];
/// target[31] = 0x0F;
///
/// let mut digest = [0u8; 32];
/// digest[31] = 0x0E;
/// assert!(meets_target(&digest, &target)); // below at the top byte
///
/// digest[31] = 0x10;
/// assert!(!meets_target(&digest, &target)); // above at the top byte
///
/// assert!(meets_target(&target, &target)); // equal also counts
/// ```
#[inline(always)]
pub fn meets_target(digest: &[u8; DIGEST_SIZE], target: &[u8; TARGET_SIZE]) -> bool {
    compare_to_target(digest, target) != Ordering::Greater
}
