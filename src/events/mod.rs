//! Supervision events.
//!
//! The state machine reports every transition as an [`Event`]; subscribers
//! (logging, host notification, tests) observe them through
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`ExitSource`] which watcher detected a container exit

mod event;

pub use event::{Event, EventKind, ExitSource};
