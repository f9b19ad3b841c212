use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config;

/// Delay between stage reveals. Cosmetic only: the response is already
/// complete when pacing runs.
pub trait Pacer {
    fn pause(&self);
}

/// Base delay plus uniform random jitter.
pub struct JitterPacer {
    base: Duration,
    jitter_ms: u64,
}

impl JitterPacer {
    pub fn new(base: Duration, jitter_ms: u64) -> Self {
        Self { base, jitter_ms }
    }

    /// Next delay, within `[base, base + jitter]`.
    pub fn next_delay(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=self.jitter_ms);
        self.base + Duration::from_millis(jitter)
    }
}

impl Default for JitterPacer {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(config::PACING_BASE_MS),
            config::PACING_JITTER_MS,
        )
    }
}

impl Pacer for JitterPacer {
    fn pause(&self) {
        thread::sleep(self.next_delay());
    }
}

/// No delay (tests, `--no-pacing`).
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pause(&self) {}
}
