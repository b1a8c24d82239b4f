//! Browser host binding for the Panthera engine
//!
//! Keeps the host calling convention: `init` and `set_job` report success as
//! a boolean, `step` returns `0` when no nonce was found, and out-of-range
//! input is dropped rather than thrown.

use panthera_core::{MiningEngine, PantheraHash, TARGET_SIZE};
use wasm_bindgen::prelude::*;

/// Route Rust panics to the browser console
#[wasm_bindgen(start)]
pub fn install_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Mining engine for Web Worker usage.
/// Owns one 2 MB scratchpad for its whole lifetime.
#[wasm_bindgen]
pub struct WebMiner {
    engine: MiningEngine,
}

impl Default for WebMiner {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WebMiner {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            engine: MiningEngine::new(),
        }
    }

    /// Allocate and seed the scratchpad
    pub fn init(&mut self) -> bool {
        match self.engine.init() {
            Ok(()) => true,
            Err(e) => {
                web_sys::console::error_1(&format!("Panthera init failed: {}", e).into());
                false
            }
        }
    }

    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Run one bounded step; returns the found nonce or 0
    pub fn step(&mut self, max_iterations: u32) -> u32 {
        self.engine.step(max_iterations).sentinel()
    }

    /// Replace the current job. Returns false (and keeps the old job) when
    /// the template is over 84 bytes or the target is not 32 bytes.
    pub fn set_job(
        &mut self,
        template: &[u8],
        target: &[u8],
        height: u64,
        difficulty: u64,
        job_id: &str,
    ) -> bool {
        let Ok(target) = <&[u8; TARGET_SIZE]>::try_from(target) else {
            return false;
        };
        self.engine
            .set_job(template, target, height, difficulty, job_id)
            .is_ok()
    }

    /// `set_job` with hex-encoded template and target, as pools send them
    pub fn set_job_hex(
        &mut self,
        template_hex: &str,
        target_hex: &str,
        height: u64,
        difficulty: u64,
        job_id: &str,
    ) -> bool {
        match (hex::decode(template_hex), hex::decode(target_hex)) {
            (Ok(template), Ok(target)) => {
                self.set_job(&template, &target, height, difficulty, job_id)
            }
            _ => false,
        }
    }

    pub fn hash_count(&self) -> u64 {
        self.engine.hash_count()
    }

    pub fn reset_hash_count(&mut self) {
        self.engine.reset_hash_count();
    }

    pub fn hash_rate(&self) -> f64 {
        self.engine.hash_rate()
    }

    pub fn set_hash_rate(&mut self, rate: f64) {
        self.engine.set_hash_rate(rate);
    }

    pub fn set_intensity(&mut self, intensity: i32) {
        self.engine.set_intensity(intensity);
    }

    pub fn intensity(&self) -> i32 {
        self.engine.intensity()
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.engine.set_nonce(nonce);
    }

    pub fn nonce(&self) -> u32 {
        self.engine.nonce()
    }

    /// Digest of the current job at the cursor nonce (evolves the scratchpad)
    pub fn current_digest(&mut self) -> Vec<u8> {
        self.engine.current_digest().to_vec()
    }

    pub fn current_digest_hex(&mut self) -> String {
        hex::encode(self.engine.current_digest())
    }

    pub fn job_id(&self) -> String {
        self.engine.job_id().to_string()
    }

    pub fn difficulty(&self) -> u64 {
        self.engine.difficulty()
    }

    pub fn height(&self) -> u64 {
        self.engine.height()
    }

    /// Last found share as JSON:
    /// `{"nonce":"0000002a","result":"..."}`, or undefined
    pub fn last_share(&self) -> Option<String> {
        self.engine.last_share().map(|share| {
            format!(
                r#"{{"nonce":"{:08x}","result":"{}"}}"#,
                share.nonce,
                hex::encode(share.digest)
            )
        })
    }
}

/// Run a benchmark on a private scratchpad
/// Returns hashrate in H/s
#[wasm_bindgen]
pub fn benchmark(num_hashes: u32) -> f64 {
    let Ok(mut hasher) = PantheraHash::new() else {
        return 0.0;
    };
    let Some(performance) = web_sys::window().and_then(|w| w.performance()) else {
        return 0.0;
    };
    let template = [0u8; panthera_core::TEMPLATE_SIZE];

    let start = performance.now();
    for nonce in 0..num_hashes {
        let _ = hasher.hash(&template, nonce);
    }
    let elapsed_s = (performance.now() - start) / 1000.0;

    if elapsed_s <= 0.0 {
        return 0.0;
    }
    (num_hashes as f64) / elapsed_s
}

/// Get algorithm parameters as JSON string
#[wasm_bindgen]
pub fn get_params() -> String {
    format!(
        r#"{{"scratchpad_kb": {}, "template_bytes": {}, "nonce_offset": {}, "memory_rounds": {}, "final_rounds": {}}}"#,
        panthera_core::SCRATCHPAD_SIZE / 1024,
        panthera_core::TEMPLATE_SIZE,
        panthera_core::NONCE_OFFSET,
        panthera_core::MEMORY_ROUNDS,
        panthera_core::FINAL_ROUNDS
    )
}
