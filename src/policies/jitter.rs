//! # Jitter policy for restart delays.
//!
//! - [`JitterPolicy::None`] - exact delays
//! - [`JitterPolicy::Full`] - random delay in [0, delay]
//! - [`JitterPolicy::Equal`] - delay/2 + random[0, delay/2]

use rand::Rng;
use std::time::Duration;

/// Randomization applied to a computed restart delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the exact delay.
    #[default]
    None,
    /// Random delay in [0, delay].
    Full,
    /// delay/2 + random[0, delay/2]; keeps ~75% of the delay on average.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let jitter = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + jitter)
            }
        }
    }
}
