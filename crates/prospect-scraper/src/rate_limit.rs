//! Per-domain request spacing.
//!
//! The limiter hands out time slots per domain. Reservation happens under a
//! lock; the caller then sleeps outside it, so requests to other domains are
//! never held up by a waiting one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Source of time for rate limiting and batch pacing.
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to.
///
/// `sleep` advances the clock by the requested amount and returns at once,
/// recording the duration. Useful for deterministic pacing tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: std::sync::Mutex<Duration>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: std::sync::Mutex::new(Duration::ZERO),
            sleeps: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    /// Every duration passed to `sleep`, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Enforces a minimum delay between requests to the same domain.
#[derive(Debug)]
pub struct RateLimiter {
    next_slot: Mutex<HashMap<String, Instant>>,
    min_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter on the tokio clock.
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self::with_clock(min_delay, Arc::new(TokioClock))
    }

    /// Create a limiter on a specific clock.
    #[must_use]
    pub fn with_clock(min_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            next_slot: Mutex::new(HashMap::new()),
            min_delay,
            clock,
        }
    }

    /// Minimum spacing between two requests to one domain.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until a request to `domain` is allowed.
    ///
    /// Returns how long the caller was made to wait.
    pub async fn acquire(&self, domain: &str) -> Duration {
        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = self.clock.now();
            let slot = slots
                .get(domain)
                .map_or(now, |last| (*last + self.min_delay).max(now));
            slots.insert(domain.to_string(), slot);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tracing::debug!("Rate limiting {} for {:?}", domain, wait);
            self.clock.sleep(wait).await;
        }

        wait
    }

    /// Number of domains the limiter has seen.
    pub async fn tracked_domains(&self) -> usize {
        self.next_slot.lock().await.len()
    }
}
