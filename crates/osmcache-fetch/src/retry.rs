//! Retry policy and shared request pacing

use osmcache_core::config::LayeredConfig;
use osmcache_core::error::NetworkError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.value.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms.value),
            max_delay: Duration::from_millis(config.backoff_max_ms.value),
        }
    }

    /// Whether another attempt follows a failed attempt number `attempt` (0-based)
    pub fn should_retry(&self, attempt: u32, error: &NetworkError) -> bool {
        error.is_transient() && attempt + 1 < self.max_attempts
    }

    /// Delay before the attempt after `attempt` (0-based)
    ///
    /// A server-provided `Retry-After` wins over the computed backoff.
    pub fn delay_for(&self, attempt: u32, error: &NetworkError) -> Duration {
        if let Some(after) = error.retry_after() {
            return after;
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug)]
struct GateState {
    next_slot: Option<Instant>,
}

/// Request pacing shared by every concurrent fetch
///
/// Enforces a minimum spacing between request starts and a global pause
/// after the remote source rate-limits any one of them.
#[derive(Debug)]
pub struct RateLimitGate {
    spacing: Duration,
    state: Mutex<GateState>,
}

impl RateLimitGate {
    pub fn new(spacing: Duration) -> Self {
        Self { spacing, state: Mutex::new(GateState { next_slot: None }) }
    }

    /// Wait until this caller may start a request
    pub async fn wait_turn(&self) {
        let start = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let start = match state.next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            state.next_slot = Some(start + self.spacing);
            start
        };
        tokio::time::sleep_until(start).await;
    }

    /// Hold back every request for at least `duration` from now
    pub async fn pause_for(&self, duration: Duration) {
        let mut state = self.state.lock().await;
        let until = Instant::now() + duration;
        if state.next_slot.map_or(true, |slot| slot < until) {
            state.next_slot = Some(until);
        }
    }
}
