//! # First-of-N race over asynchronous sources.
//!
//! [`Race`] runs every source as its own task and resolves with the first
//! value any of them reports. All sources share one child
//! [`CancellationToken`]: once a winner is known (or the race is dropped) the
//! token is cancelled and the remaining tasks are aborted, so a losing
//! source never reports afterwards.
//!
//! A source must not consume anything it cannot give back: a finished but
//! losing value is discarded.
//!
//! ```text
//!   parent token ──► child token ─┬──► source A ─┐
//!                                 ├──► source B ─┼──► first Some(T) wins
//!                                 └──► source C ─┘        │
//!                                                         └──► cancel + abort the rest
//! ```
//!
//! A source that returns `None` drops out without deciding the race.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub(crate) struct Race<T> {
    set: JoinSet<Option<T>>,
    token: CancellationToken,
}

impl<T: Send + 'static> Race<T> {
    /// Creates an empty race cancelled together with `parent`.
    pub(crate) fn new(parent: &CancellationToken) -> Self {
        Self {
            set: JoinSet::new(),
            token: parent.child_token(),
        }
    }

    /// Adds a source. It is dropped as soon as the race token is cancelled.
    pub(crate) fn spawn<Fut>(&mut self, source: Fut)
    where
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let token = self.token.clone();
        self.set.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                value = source => value,
            }
        });
    }

    /// Number of sources still running.
    pub(crate) fn len(&self) -> usize {
        self.set.len()
    }

    /// Waits for the first reported value.
    ///
    /// Returns `None` when every source dropped out or the parent was cancelled.
    pub(crate) async fn first(mut self) -> Option<T> {
        let mut winner = None;
        while let Some(joined) = self.set.join_next().await {
            match joined {
                Ok(Some(value)) => {
                    winner = Some(value);
                    break;
                }
                Ok(None) => {}
                Err(err) if err.is_panic() => warn!(error = %err, "race source panicked"),
                Err(_) => {}
            }
        }
        self.token.cancel();
        self.set.abort_all();
        winner
    }
}

impl<T> Drop for Race<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
