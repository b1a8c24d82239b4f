//! Panthera Algorithm Parameters
//!
//! Sizes, round counts and mixing constants. Changing any of these changes
//! every digest the engine produces.

/// Scratchpad size in bytes (2 MB)
pub const SCRATCHPAD_SIZE: usize = 2 * 1024 * 1024;

/// Width of one scratchpad word in bytes
pub const WORD_SIZE: usize = 8;

/// Number of 64-bit words in the default scratchpad
pub const SCRATCHPAD_WORDS: usize = SCRATCHPAD_SIZE / WORD_SIZE;

/// Block template length in bytes
pub const TEMPLATE_SIZE: usize = 84;

/// Byte offset of the little-endian nonce inside the template
pub const NONCE_OFFSET: usize = 39;

/// Target length in bytes
pub const TARGET_SIZE: usize = 32;

/// Digest length in bytes
pub const DIGEST_SIZE: usize = 32;

/// Maximum number of characters kept from a job id
pub const MAX_JOB_ID_LEN: usize = 63;

/// Memory-hard rounds over the scratchpad
pub const MEMORY_ROUNDS: usize = 16;

/// Finalization rounds
pub const FINAL_ROUNDS: usize = 12;

/// Golden ratio constant (Fibonacci hashing), used for seeding and mixing
pub const GOLDEN_RATIO: u64 = 0x9E3779B97F4A7C15;

/// Initial hash state
pub const INITIAL_STATE: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

/// Intensity a fresh engine starts with (percent)
pub const DEFAULT_INTENSITY: i32 = 50;

/// Id of the job an engine holds before the first `set_job`
pub const DEFAULT_JOB_ID: &str = "scala_default";

/// Difficulty recorded on the default job
pub const DEFAULT_DIFFICULTY: u64 = 1000;

/// Value `step` reports through the host ABI when no nonce was found
pub const NOT_FOUND: u32 = 0;
