//! Runtime core: the supervision state machine and its moving parts.
//!
//! The public API from this module is [`Supervisor`] (with its
//! [`SupervisorBuilder`] and [`Outcome`]) plus the signal relay.
//!
//! Internal modules:
//! - [`supervisor`]: Inspecting → Starting → Confirming → Watching → Stopping;
//! - [`budget`]: per-attempt start/confirm allowances;
//! - [`race`]: first-of-N race with shared cancellation;
//! - [`watch`]: the watchers raced during the watch phase;
//! - [`signals`]: OS signal to stop-intent relay.

mod budget;
mod builder;
mod race;
mod signals;
mod supervisor;
mod watch;

#[cfg(test)]
pub(crate) mod testkit;

pub use builder::SupervisorBuilder;
pub use signals::{StopIntent, spawn_signal_relay};
pub use supervisor::{Outcome, Supervisor};
