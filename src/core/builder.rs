use std::sync::Arc;

use crate::{
    config::SupervisorConfig,
    control::Connect,
    notify::{HostNotifier, SystemdNotifier},
    probes::Probes,
    subscribers::{HostRelay, Subscribe, SubscriberSet},
};

use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`] with optional collaborators.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    connector: Arc<dyn Connect>,
    probes: Probes,
    subscribers: Vec<Arc<dyn Subscribe>>,
    notifier: Arc<dyn HostNotifier>,
}

impl SupervisorBuilder {
    /// Creates a new builder with default probes and the systemd notifier.
    pub fn new(cfg: SupervisorConfig, connector: Arc<dyn Connect>) -> Self {
        Self {
            cfg,
            connector,
            probes: Probes::default(),
            subscribers: Vec::new(),
            notifier: Arc::new(SystemdNotifier),
        }
    }

    /// Replaces the liveness probes.
    pub fn with_probes(mut self, probes: Probes) -> Self {
        self.probes = probes;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the host notifier. Ignored when `notify_host` is disabled.
    pub fn with_notifier(mut self, notifier: Arc<dyn HostNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Builds the supervisor and spawns the subscriber workers.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Supervisor {
        let mut subscribers = self.subscribers;
        if self.cfg.notify_host {
            subscribers.push(Arc::new(HostRelay::new(self.notifier)));
        }
        let subs = SubscriberSet::new(subscribers);
        Supervisor::new_internal(self.cfg, self.connector, self.probes, subs)
    }
}
