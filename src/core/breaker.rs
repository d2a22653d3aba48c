//! Global circuit breaker guarding the rate provider

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Provider calls allowed
    Closed,
    /// Provider calls suppressed until the cooldown elapses
    Open,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Counters {
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// Counts consecutive provider failures. Once `failure_threshold` is reached
/// the breaker stays open for `cooldown` after the most recent failure. The
/// open-to-closed transition is evaluated lazily on the next check.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            counters: Mutex::new(Counters::default()),
        }
    }

    fn state_of(&self, counters: &Counters) -> BreakerState {
        if counters.consecutive_failures < self.failure_threshold {
            return BreakerState::Closed;
        }
        match counters.last_failure_at {
            Some(at) if at.elapsed() < self.cooldown => BreakerState::Open,
            _ => BreakerState::Closed,
        }
    }

    /// Whether a provider call may be attempted now.
    pub async fn allows_request(&self) -> bool {
        let counters = self.counters.lock().await;
        match self.state_of(&counters) {
            BreakerState::Closed => true,
            BreakerState::Open => {
                debug!(
                    failures = counters.consecutive_failures,
                    "Circuit open, skipping provider"
                );
                false
            }
        }
    }

    pub async fn record_success(&self) {
        let mut counters = self.counters.lock().await;
        if counters.consecutive_failures > 0 {
            debug!(
                failures = counters.consecutive_failures,
                "Provider recovered, resetting failure count"
            );
        }
        counters.consecutive_failures = 0;
    }

    pub async fn record_failure(&self) {
        let mut counters = self.counters.lock().await;
        counters.consecutive_failures = counters.consecutive_failures.saturating_add(1);
        counters.last_failure_at = Some(Instant::now());

        if counters.consecutive_failures >= self.failure_threshold {
            warn!(
                failures = counters.consecutive_failures,
                threshold = self.failure_threshold,
                cooldown = ?self.cooldown,
                "Circuit open, provider calls suspended"
            );
        } else {
            debug!(
                failures = counters.consecutive_failures,
                threshold = self.failure_threshold,
                "Provider failure recorded"
            );
        }
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let counters = self.counters.lock().await;
        BreakerSnapshot {
            state: self.state_of(&counters),
            consecutive_failures: counters.consecutive_failures,
            last_failure_at: counters.last_failure_at,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}
