//! Politeness delay between consecutive document fetches.
//!
//! The traversal is strictly sequential, so a single [`Pacer`] per run is
//! enough to keep a minimum gap between requests to the document source.
//! Waiting is raced against the run's cancellation token so that a stop
//! request never has to sit out a full delay.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Configuration for the delay between fetches.
#[derive(Debug, Clone)]
pub struct PolitenessConfig {
    /// Minimum gap between the start of two consecutive fetches.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter]).
    /// `Duration::ZERO` disables it.
    pub jitter: Duration,
}

impl PolitenessConfig {
    /// A fixed delay with no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Effective delay for a single wait (delay + random jitter).
    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for PolitenessConfig {
    /// One second between documents.
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Tracks the last fetch of a run and sleeps until the configured gap has passed.
#[derive(Debug)]
pub struct Pacer {
    config: PolitenessConfig,
    last_fetch: Option<Instant>,
}

impl Pacer {
    pub fn new(config: PolitenessConfig) -> Self {
        Self {
            config,
            last_fetch: None,
        }
    }

    /// Wait for the next fetch slot. Returns `false` if `cancel` fired while waiting.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        if let Some(last) = self.last_fetch {
            let required = self.config.effective_delay();
            let elapsed = last.elapsed();
            if elapsed < required {
                let sleep_duration = required - elapsed;
                tracing::debug!(sleep_ms = %sleep_duration.as_millis(), "Pausing before next fetch");
                tokio::select! {
                    () = tokio::time::sleep(sleep_duration) => {}
                    () = cancel.cancelled() => return false,
                }
            }
        }
        self.last_fetch = Some(Instant::now());
        !cancel.is_cancelled()
    }
}

// Jitter from a time-seeded xorshift; not crypto, just spread.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
