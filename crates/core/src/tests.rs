//! Tests for the Panthera engine

use std::thread;
use std::time::Duration;

use crate::{
    DEFAULT_INTENSITY, JobError, MiningEngine, NONCE_OFFSET, PantheraHash, Scratchpad,
    StepOutcome, compute_digest, hash_light, meets_target,
};

/// Target of the reference scenario: 31 bytes of 0xFF, then 0x0F on top
fn easy_target() -> [u8; 32] {
    let mut target = [0xFF; 32];
    target[31] = 0x0F;
    target
}

/// Only an all-zero digest meets this
const IMPOSSIBLE_TARGET: [u8; 32] = [0u8; 32];

fn engine_with_job(target: &[u8; 32]) -> MiningEngine {
    let mut engine = MiningEngine::initialized().unwrap();
    engine.set_job(&[0u8; 84], target, 1, 1000, "test").unwrap();
    engine
}

#[test]
fn test_reference_vectors() {
    let template = [0u8; 84];
    let mut hasher = PantheraHash::new().unwrap();

    // Fresh scratchpad, then the same input again on the evolved scratchpad
    assert_eq!(
        hex::encode(hasher.hash(&template, 0)),
        "ffcc6fbed4b89eadb0ae615c623e438ffe8285c201fb390b77762ec735053f44"
    );
    assert_eq!(
        hex::encode(hasher.hash(&template, 0)),
        "1a40d5c2d3411a7e1696edacc8cdf99110d22d4782cae42ef0b601bcd525334a"
    );

    let sequential: Vec<u8> = (0u8..84).collect();
    let mut fresh = PantheraHash::new().unwrap();
    assert_eq!(
        hex::encode(fresh.hash(&sequential, 7)),
        "1298dc4ebcbeda83b0ad12ddb748961aa4da28add009e6b976bfbce808efba0a"
    );
}

#[test]
fn test_light_hash_vectors() {
    let template = [0u8; 84];
    assert_eq!(
        hex::encode(hash_light(&template, 0)),
        "9fd56f7c24b9432bfa7aa4982c62cbb5c9726bea8186eaf84fed902a3c5c5fd3"
    );
    // Unmasked shifts: 0x01020304 >> 8 still carries 0x0102 into word 1
    assert_eq!(
        hex::encode(hash_light(&template, 0x01020304)),
        "9f0f26e19822e3576aae46b7aea6bdaf893edd4d88dc4af6ff6cfa9d235091d3"
    );
}

#[test]
fn test_light_hash_is_pure() {
    let template = [0x5Au8; 84];
    assert_eq!(hash_light(&template, 42), hash_light(&template, 42));
    assert_ne!(hash_light(&template, 42), hash_light(&template, 43));
}

#[test]
fn test_determinism_from_same_snapshot() {
    let template = [0x11u8; 84];
    let mut a = Scratchpad::new().unwrap();
    // Evolve it a little first so the snapshot is not just the seed
    compute_digest(&template, 1, Some(&mut a));
    let mut b = a.clone();

    let digest_a = compute_digest(&template, 99, Some(&mut a));
    let digest_b = compute_digest(&template, 99, Some(&mut b));
    assert_eq!(digest_a, digest_b);
    assert_eq!(a, b);
}

#[test]
fn test_hash_is_not_idempotent() {
    let template = [0x22u8; 84];
    let mut hasher = PantheraHash::new().unwrap();
    let first = hasher.hash(&template, 5);
    let second = hasher.hash(&template, 5);
    assert_ne!(first, second);
}

#[test]
fn test_memory_hard_phase_touches_scratchpad() {
    let mut scratchpad = Scratchpad::new().unwrap();
    let seeded = scratchpad.clone();
    compute_digest(&[0u8; 84], 0, Some(&mut scratchpad));

    let changed = scratchpad
        .as_bytes()
        .chunks_exact(8)
        .zip(seeded.as_bytes().chunks_exact(8))
        .filter(|(now, before)| now != before)
        .count();
    // 16 rounds x 8 words, every address distinct for this input
    assert_eq!(changed, 128);
}

#[test]
fn test_reference_scenario() {
    let mut engine = engine_with_job(&easy_target());
    assert_eq!(engine.job_id(), "test");
    engine.start();

    let outcome = engine.step(1_000_000);
    assert_eq!(outcome, StepOutcome::Found(6));
    assert_eq!(outcome.sentinel(), 6);
    assert_eq!(engine.nonce(), 6);
    assert_eq!(engine.hash_count(), 7);

    let share = engine.last_share().unwrap();
    assert_eq!(share.job_id, "test");
    assert_eq!(share.nonce, 6);
    assert_eq!(
        hex::encode(share.digest),
        "16f55ed820f8684f550eac372c6003e4ca2d045f3d243e670bde233369e44a05"
    );
    assert!(meets_target(&share.digest, &easy_target()));
    assert_eq!(engine.job().template().nonce_at(NONCE_OFFSET), Some(6));
}

#[test]
fn test_step_while_inactive_does_nothing() {
    let mut engine = engine_with_job(&easy_target());
    for budget in [0, 1, 1000, u32::MAX] {
        assert_eq!(engine.step(budget), StepOutcome::Inactive);
        assert_eq!(engine.step(budget).sentinel(), 0);
    }
    assert_eq!(engine.hash_count(), 0);
    assert_eq!(engine.nonce(), 0);
}

#[test]
fn test_step_without_scratchpad_does_nothing() {
    let mut engine = MiningEngine::new();
    engine.start();
    assert!(!engine.is_initialized());
    assert_eq!(engine.step(100), StepOutcome::Inactive);
    assert_eq!(engine.hash_count(), 0);
}

#[test]
fn test_failed_reinit_disables_engine() {
    let mut engine = engine_with_job(&easy_target());
    engine.start();

    assert!(engine.init_with_size(12).is_err());
    assert!(!engine.is_initialized());
    assert_eq!(engine.step(100), StepOutcome::Inactive);

    engine.init().unwrap();
    assert!(engine.step(100).is_found());
}

#[test]
fn test_exhausted_step_advances_cursor() {
    let mut engine = engine_with_job(&IMPOSSIBLE_TARGET);
    assert!(engine.set_intensity(100));
    engine.start();

    assert_eq!(engine.step(10), StepOutcome::Exhausted);
    assert_eq!(engine.nonce(), 10);
    assert_eq!(engine.hash_count(), 10);
    assert_eq!(engine.job().template().nonce_at(NONCE_OFFSET), Some(9));

    assert_eq!(engine.step(5), StepOutcome::Exhausted);
    assert_eq!(engine.nonce(), 15);
    assert_eq!(engine.hash_count(), 15);
}

#[test]
fn test_nonce_cursor_wraps() {
    let mut engine = engine_with_job(&IMPOSSIBLE_TARGET);
    engine.set_intensity(100);
    engine.set_nonce(u32::MAX);
    engine.start();

    assert_eq!(engine.step(2), StepOutcome::Exhausted);
    assert_eq!(engine.nonce(), 1);
}

#[test]
fn test_intensity_scales_budget() {
    let mut engine = engine_with_job(&IMPOSSIBLE_TARGET);
    engine.start();
    assert_eq!(engine.intensity(), DEFAULT_INTENSITY);

    engine.step(10);
    assert_eq!(engine.hash_count(), 5);

    // Rounds down to zero, clamped to one
    engine.reset_hash_count();
    engine.step(1);
    assert_eq!(engine.hash_count(), 1);

    engine.reset_hash_count();
    engine.set_intensity(0);
    engine.step(10);
    assert_eq!(engine.hash_count(), 1);

    // A zero budget runs nothing
    engine.reset_hash_count();
    let cursor = engine.nonce();
    assert_eq!(engine.step(0), StepOutcome::Exhausted);
    assert_eq!(engine.hash_count(), 0);
    assert_eq!(engine.nonce(), cursor);
}

#[test]
fn test_effective_iterations_do_not_overflow() {
    let mut engine = MiningEngine::new();
    engine.set_intensity(100);
    assert_eq!(engine.effective_iterations(u32::MAX), u32::MAX);
    engine.set_intensity(50);
    assert_eq!(engine.effective_iterations(u32::MAX), u32::MAX / 2);
}

#[test]
fn test_out_of_range_intensity_ignored() {
    let mut engine = MiningEngine::new();
    assert!(engine.set_intensity(80));
    assert!(!engine.set_intensity(150));
    assert_eq!(engine.intensity(), 80);
    assert!(!engine.set_intensity(-5));
    assert_eq!(engine.intensity(), 80);
    assert!(engine.set_intensity(0));
    assert!(engine.set_intensity(100));
}

#[test]
fn test_oversized_job_leaves_previous_job_untouched() {
    let mut engine = MiningEngine::new();
    engine
        .set_job(&[7u8; 84], &[0x33; 32], 10, 500, "previous")
        .unwrap();
    let before = engine.job().clone();

    let result = engine.set_job(&[1u8; 90], &[0u8; 32], 11, 600, "next");
    assert_eq!(result, Err(JobError::TemplateTooLong { len: 90, max: 84 }));
    assert_eq!(engine.job(), &before);
    assert_eq!(engine.job_id(), "previous");
    assert_eq!(engine.difficulty(), 500);
    assert_eq!(engine.height(), 10);
}

#[test]
fn test_current_digest_evolves_without_counting() {
    let mut engine = MiningEngine::initialized().unwrap();
    let first = engine.current_digest();
    let second = engine.current_digest();

    // Default job: zero template, cursor at nonce 0
    assert_eq!(
        hex::encode(first),
        "ffcc6fbed4b89eadb0ae615c623e438ffe8285c201fb390b77762ec735053f44"
    );
    assert_ne!(first, second);
    assert_eq!(engine.hash_count(), 0);
}

#[test]
fn test_hash_rate_is_host_supplied() {
    let mut engine = engine_with_job(&IMPOSSIBLE_TARGET);
    engine.start();
    engine.step(100);
    assert_eq!(engine.hash_rate(), 0.0);

    engine.set_hash_rate(123.5);
    assert_eq!(engine.hash_rate(), 123.5);
}

#[test]
fn test_start_stop_toggle() {
    let mut engine = MiningEngine::new();
    assert!(!engine.is_active());
    engine.start();
    assert!(engine.is_active());
    engine.stop();
    assert!(!engine.is_active());
}

#[test]
fn test_stop_handle_interrupts_running_step() {
    let mut engine = engine_with_job(&IMPOSSIBLE_TARGET);
    engine.set_intensity(100);
    engine.start();
    let handle = engine.stop_handle();

    let worker = thread::spawn(move || {
        let outcome = engine.step(u32::MAX);
        (outcome, engine)
    });

    thread::sleep(Duration::from_millis(200));
    handle.stop();
    assert!(!handle.is_active());

    let (outcome, engine) = worker.join().unwrap();
    assert_eq!(outcome, StepOutcome::Stopped);
    assert!(engine.hash_count() < u64::from(u32::MAX));
    // The cursor resumes right after the last hashed nonce
    assert_eq!(u64::from(engine.nonce()), engine.hash_count());
}

#[test]
fn test_engines_are_independent() {
    let mut a = engine_with_job(&IMPOSSIBLE_TARGET);
    let mut b = engine_with_job(&IMPOSSIBLE_TARGET);
    a.set_intensity(100);
    a.start();
    a.step(20);

    assert_eq!(b.hash_count(), 0);
    assert!(!b.is_active());
    // b's scratchpad is still freshly seeded
    assert_eq!(
        hex::encode(b.current_digest()),
        "ffcc6fbed4b89eadb0ae615c623e438ffe8285c201fb390b77762ec735053f44"
    );
}

#[test]
fn test_short_job_hashes_over_previous_tail() {
    let mut engine = MiningEngine::initialized().unwrap();
    engine
        .set_job(&[0xAA; 84], &IMPOSSIBLE_TARGET, 1, 1, "long")
        .unwrap();
    engine
        .set_job(&[0x01; 10], &IMPOSSIBLE_TARGET, 2, 1, "short")
        .unwrap();

    // The tail of the previous template survives the shorter update
    let mut expected = [0xAAu8; 84];
    expected[..10].copy_from_slice(&[0x01; 10]);
    expected[NONCE_OFFSET..NONCE_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());

    let mut scratchpad = Scratchpad::new().unwrap();
    let digest = compute_digest(&expected, 0, Some(&mut scratchpad));
    assert_eq!(engine.current_digest(), digest);
    assert_eq!(engine.job().template().as_bytes(), &expected);
}
