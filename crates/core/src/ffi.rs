//! C FFI bindings for native hosts
//!
//! Mirrors the host operations one-to-one. Errors collapse to the host
//! contract: `panthera_init` and `panthera_set_job` return `false`,
//! `panthera_step` returns `0` when nothing was found, and bad pointers are
//! ignored.

use crate::{MiningEngine, TARGET_SIZE};
use core::ffi::{CStr, c_char};
use core::slice;

/// Opaque engine handle for FFI
pub struct PantheraEngine {
    inner: MiningEngine,
}

fn engine<'a>(handle: *mut PantheraEngine) -> Option<&'a mut MiningEngine> {
    // SAFETY: the handle is either null or came from panthera_new
    unsafe { handle.as_mut().map(|h| &mut h.inner) }
}

/// Create a new engine (no scratchpad yet; call panthera_init)
/// Returns a pointer the caller must free with panthera_free
#[unsafe(no_mangle)]
pub extern "C" fn panthera_new() -> *mut PantheraEngine {
    let handle = Box::new(PantheraEngine {
        inner: MiningEngine::new(),
    });
    Box::into_raw(handle)
}

/// Free an engine instance
#[unsafe(no_mangle)]
pub extern "C" fn panthera_free(handle: *mut PantheraEngine) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

/// Allocate and seed the scratchpad
#[unsafe(no_mangle)]
pub extern "C" fn panthera_init(handle: *mut PantheraEngine) -> bool {
    engine(handle).is_some_and(|e| e.init().is_ok())
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_start(handle: *mut PantheraEngine) {
    if let Some(e) = engine(handle) {
        e.start();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_stop(handle: *mut PantheraEngine) {
    if let Some(e) = engine(handle) {
        e.stop();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_is_active(handle: *mut PantheraEngine) -> bool {
    engine(handle).is_some_and(|e| e.is_active())
}

/// Run one bounded step; returns the found nonce or 0
#[unsafe(no_mangle)]
pub extern "C" fn panthera_step(handle: *mut PantheraEngine, max_iterations: u32) -> u32 {
    engine(handle).map_or(0, |e| e.step(max_iterations).sentinel())
}

/// Replace the current job
/// - template: pointer to template bytes (at most 84)
/// - target: pointer to 32 target bytes
/// - job_id: NUL-terminated string
///
/// Returns false if the update was dropped.
#[unsafe(no_mangle)]
pub extern "C" fn panthera_set_job(
    handle: *mut PantheraEngine,
    template: *const u8,
    template_len: usize,
    target: *const u8,
    height: u64,
    difficulty: u64,
    job_id: *const c_char,
) -> bool {
    let Some(e) = engine(handle) else {
        return false;
    };
    if template.is_null() || target.is_null() || job_id.is_null() {
        return false;
    }

    unsafe {
        let template = slice::from_raw_parts(template, template_len);
        let target = &*(target as *const [u8; TARGET_SIZE]);
        let job_id = CStr::from_ptr(job_id).to_string_lossy();
        e.set_job(template, target, height, difficulty, &job_id).is_ok()
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_hash_count(handle: *mut PantheraEngine) -> u64 {
    engine(handle).map_or(0, |e| e.hash_count())
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_reset_hash_count(handle: *mut PantheraEngine) {
    if let Some(e) = engine(handle) {
        e.reset_hash_count();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_hash_rate(handle: *mut PantheraEngine) -> f64 {
    engine(handle).map_or(0.0, |e| e.hash_rate())
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_set_hash_rate(handle: *mut PantheraEngine, rate: f64) {
    if let Some(e) = engine(handle) {
        e.set_hash_rate(rate);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_set_intensity(handle: *mut PantheraEngine, intensity: i32) {
    if let Some(e) = engine(handle) {
        e.set_intensity(intensity);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_intensity(handle: *mut PantheraEngine) -> i32 {
    engine(handle).map_or(0, |e| e.intensity())
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_set_nonce(handle: *mut PantheraEngine, nonce: u32) {
    if let Some(e) = engine(handle) {
        e.set_nonce(nonce);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_nonce(handle: *mut PantheraEngine) -> u32 {
    engine(handle).map_or(0, |e| e.nonce())
}

/// Hash the current job at the cursor nonce into a 32-byte buffer
#[unsafe(no_mangle)]
pub extern "C" fn panthera_current_digest(handle: *mut PantheraEngine, output: *mut u8) {
    let Some(e) = engine(handle) else {
        return;
    };
    if output.is_null() {
        return;
    }

    let digest = e.current_digest();
    unsafe {
        let output_slice = slice::from_raw_parts_mut(output, digest.len());
        output_slice.copy_from_slice(&digest);
    }
}

/// Copy the job id into `output` as a NUL-terminated string
/// Returns the id length in bytes (without NUL), truncated to fit `capacity - 1`
#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_job_id(
    handle: *mut PantheraEngine,
    output: *mut c_char,
    capacity: usize,
) -> usize {
    let Some(e) = engine(handle) else {
        return 0;
    };
    if output.is_null() || capacity == 0 {
        return 0;
    }

    let id = e.job_id().as_bytes();
    let len = id.len().min(capacity - 1);
    unsafe {
        let output_slice = slice::from_raw_parts_mut(output as *mut u8, capacity);
        output_slice[..len].copy_from_slice(&id[..len]);
        output_slice[len] = 0;
    }
    len
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_difficulty(handle: *mut PantheraEngine) -> u64 {
    engine(handle).map_or(0, |e| e.difficulty())
}

#[unsafe(no_mangle)]
pub extern "C" fn panthera_get_height(handle: *mut PantheraEngine) -> u64 {
    engine(handle).map_or(0, |e| e.height())
}

/// Benchmark: compute N full hashes and return total microseconds
#[unsafe(no_mangle)]
pub extern "C" fn panthera_benchmark(iterations: u32) -> u64 {
    use crate::PantheraHash;
    use std::time::Instant;

    let Ok(mut hasher) = PantheraHash::new() else {
        return 0;
    };
    let template = [0u8; crate::TEMPLATE_SIZE];

    let start = Instant::now();
    for nonce in 0..iterations {
        let _ = hasher.hash(&template, nonce);
    }
    let elapsed = start.elapsed();

    elapsed.as_micros() as u64
}

/// Get hash rate (hashes per second) from a benchmark run
#[unsafe(no_mangle)]
pub extern "C" fn panthera_hashrate(iterations: u32, microseconds: u64) -> f64 {
    if microseconds == 0 {
        return 0.0;
    }
    (iterations as f64) / (microseconds as f64 / 1_000_000.0)
}
