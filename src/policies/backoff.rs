//! # Backoff policy between supervision attempts.
//!
//! [`BackoffPolicy`] paces restarts of a container that keeps exiting shortly
//! after it was confirmed. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay before the first restart (`0` disables pacing);
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the delay cap, which also defines a healthy run.
//!
//! The delay for the `n`-th consecutive short run is `first × factor^n`,
//! clamped to `max`, then jitter is applied. A watch phase that lasted at
//! least `max` counts as healthy and resets `n` to zero.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use containervisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(250),
//!     max: Duration::from_secs(4),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(250));
//! assert_eq!(backoff.next(2), Duration::from_secs(1));
//! assert_eq!(backoff.next(10), Duration::from_secs(4));
//! assert!(backoff.is_healthy_run(Duration::from_secs(5)));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart; `Duration::ZERO` restarts immediately.
    pub first: Duration,
    /// Maximum delay, and the watch duration after which a run counts as healthy.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to every computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy that never delays:
    /// - `first = 0`;
    /// - `factor = 2.0`;
    /// - `max = 30s`.
    fn default() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Returns `true` if this policy never delays a restart.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.first.is_zero()
    }

    /// Computes the delay for the given number of consecutive short runs (0-indexed).
    pub fn next(&self, short_runs: u32) -> Duration {
        if self.is_disabled() {
            return Duration::ZERO;
        }
        let exp = short_runs.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }

    /// Returns `true` if a watch phase of length `watched` resets the short-run counter.
    #[inline]
    pub fn is_healthy_run(&self, watched: Duration) -> bool {
        watched >= self.max
    }
}
