//! # Subscribe: observing a supervisor.
//!
//! A subscriber sees every [`Event`] the state machine emits, on its own
//! worker task and in emission order. It cannot influence supervision: a
//! slow subscriber loses events once its queue is full, a panicking one is
//! logged and skipped.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use async_trait::async_trait;
//! use containervisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct RestartCounter(AtomicU32);
//!
//! #[async_trait]
//! impl Subscribe for RestartCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::RestartScheduled {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "restart-counter"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of supervision events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in logs about this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered before new ones are dropped (at least 1).
    fn queue_capacity(&self) -> usize {
        64
    }
}
