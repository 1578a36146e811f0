//! Request pacing for one browsing context
//!
//! Consecutive operations in the same context are separated by a delay drawn
//! uniformly from `[min_delay, max_delay]`. Time already spent since the last
//! request counts toward the delay.

use crate::config::ScraperConfig;
use rand::Rng;
use std::time::{Duration, Instant};

/// Tracks the last request of one context and enforces the randomized gap
#[derive(Debug, Clone)]
pub struct Pacer {
    min_delay: Duration,
    max_delay: Duration,
    last_request_time: Option<Instant>,
}

impl Pacer {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };

        Self {
            min_delay,
            max_delay,
            last_request_time: None,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Draws one delay from the configured interval
    pub fn draw_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if min == max {
            return self.min_delay;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// How long the next request must still wait, given the current instant
    pub fn remaining_wait(&self, delay: Duration, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => delay.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Waits out the gap since the previous request, then records this one
    pub async fn pause(&mut self) {
        let delay = self.draw_delay();
        let wait = self.remaining_wait(delay, Instant::now());
        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Pacing request");
            tokio::time::sleep(wait).await;
        }
        self.last_request_time = Some(Instant::now());
    }

    /// Inserts a full randomized pause regardless of elapsed time
    ///
    /// Used between "load more" triggers, where the listing needs time to
    /// settle before the next expansion.
    pub async fn settle(&mut self) {
        let delay = self.draw_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
