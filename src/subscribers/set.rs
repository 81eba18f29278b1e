//! # SubscriberSet: fan-out of supervision events.
//!
//! Each subscriber owns a *lane*: a bounded queue plus one worker task that
//! drains it. [`SubscriberSet::emit`] only enqueues, so the state machine
//! never waits on logging or on the host socket.
//!
//! ```text
//!   emit(Event) ──► Arc<Event> ─┬─► lane "log"        [queue] ─► worker ─► on_event()
//!                               ├─► lane "host-relay" [queue] ─► worker ─► on_event()
//!                               └─► lane ...
//! ```
//!
//! - Order is FIFO within a lane; lanes are independent of each other.
//! - A full or closed lane drops the event for that lane only and counts it.
//! - A panicking subscriber is logged and keeps receiving later events.
//! - [`SubscriberSet::shutdown`] closes every lane and waits until its
//!   worker has processed what was already queued.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::Event;

use super::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
    worker: JoinHandle<()>,
}

impl Lane {
    fn open(sub: Arc<dyn Subscribe>) -> Self {
        let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
        let name = sub.name();
        Self {
            name,
            tx,
            dropped: AtomicU64::new(0),
            worker: tokio::spawn(drain(sub, rx)),
        }
    }

    fn offer(&self, ev: &Arc<Event>) {
        let Err(err) = self.tx.try_send(Arc::clone(ev)) else {
            return;
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        let cause = match err {
            TrySendError::Full(_) => "queue full",
            TrySendError::Closed(_) => "worker gone",
        };
        warn!(subscriber = self.name, seq = ev.seq, dropped, cause, "event not delivered");
    }

    async fn close(self) {
        let Lane {
            name,
            tx,
            dropped,
            worker,
        } = self;
        drop(tx);
        if let Err(err) = worker.await {
            warn!(subscriber = name, error = %err, "subscriber worker aborted");
        }
        let dropped = dropped.into_inner();
        if dropped > 0 {
            debug!(subscriber = name, dropped, "lane closed with undelivered events");
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let delivery = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
        if let Err(panic) = delivery {
            warn!(
                subscriber = sub.name(),
                seq = ev.seq,
                kind = ?ev.kind,
                panic = ?panic,
                "subscriber panicked"
            );
        }
    }
}

/// Non-blocking fan-out over a fixed list of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Opens one lane per subscriber.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            lanes: subs.into_iter().map(Lane::open).collect(),
        }
    }

    /// Enqueues `event` on every lane without waiting.
    pub fn emit(&self, event: Event) {
        let shared = Arc::new(event);
        for lane in &self.lanes {
            lane.offer(&shared);
        }
    }

    /// Closes all lanes and waits for their queues to drain.
    pub async fn shutdown(self) {
        for lane in self.lanes {
            lane.close().await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}
