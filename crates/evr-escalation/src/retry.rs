//! Bounded retry with exponential backoff.
//!
//! Attempt `k` (1-based) that fails is followed by a sleep of
//! `base_backoff × 2^(k−1)`, including the last attempt, after which the
//! last error is returned.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per call; at least one attempt is always made.
    pub max_tries:    u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_tries: 3, base_backoff: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn new(max_tries: u32, base_backoff: Duration) -> Self {
        Self { max_tries, base_backoff }
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_backoff.saturating_mul(1u32 << exp)
    }

    /// Run `op` until it succeeds or the attempts are used up.  `op`
    /// receives the attempt number.
    pub fn run<T, E, S, F>(&self, sleeper: &S, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        S: Sleeper + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
    {
        let tries = self.max_tries.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        "{label} attempt {attempt}/{tries} failed: {e}; backing off {:.1}s",
                        backoff.as_secs_f64(),
                    );
                    sleeper.sleep(backoff);
                    if attempt >= tries {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
