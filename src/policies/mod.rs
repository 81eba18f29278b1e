//! Restart pacing policies.
//!
//! After a detected container exit the supervisor starts a fresh supervision
//! attempt. These knobs decide **how long** it waits before doing so.
//!
//! ## Contents
//! - [`BackoffPolicy`] how restart delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy applied to each delay
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart_backoff: BackoffPolicy, .. }
//!      └─► core::supervisor uses:
//!           - restart_backoff.next(short_runs) before re-inspecting
//!           - restart_backoff.is_healthy_run(elapsed) to reset short_runs
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=0 (restart immediately), factor=2.0, max=30s, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
