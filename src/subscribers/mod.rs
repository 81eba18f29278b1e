//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the built-in subscribers
//! attached to every supervisor run.
//!
//! ## Architecture
//! ```text
//! Supervisor ── emit(&Event) ──► SubscriberSet
//!                                   ├──► [queue] ─► LogWriter  (tracing)
//!                                   ├──► [queue] ─► HostRelay  (sd_notify)
//!                                   └──► [queue] ─► custom ...
//! ```
//!
//! Subscribers observe; none of them can influence the state machine.

mod host;
mod log;
mod set;
mod subscriber;

pub use host::HostRelay;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
