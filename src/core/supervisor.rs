//! # Supervisor: the container supervision state machine.
//!
//! The [`Supervisor`] owns the immutable [`SupervisorConfig`], a [`Connect`]
//! factory for control-plane handles, the local [`Probes`] and a
//! [`SubscriberSet`] that fans lifecycle events out to subscribers.
//!
//! ## States
//! ```text
//!              ┌──────────────────────── restart (fresh RetryBudget) ◄──────────────┐
//!              ▼                                                                     │
//!   ┌──► Inspecting ── running ──► Confirming ── confirmed ──► Watching ── exit ──────┘
//!   │        │                         │                        │   │
//!   │   not running                 failed                      │   └── intent=false ──► Detached
//!   │        ▼                         │                        │
//!   └── Starting (budget left)    budget left? ── no ──► Failed  └── intent=true ──► Stopping ──► Stopped
//!            │                         │
//!       budget spent ──► Failed        └── yes ──► Inspecting
//! ```
//!
//! ## Watching
//! Two watchers race (see [`Race`]) next to the stop-intent channel:
//! - remote exit notification from the control plane → restart (stream failure is fatal)
//! - local liveness poll every `check_interval` → restart (only with `use_pid`)
//! - stop intent from the signal relay → stop or detach
//!
//! The first observed report wins; the watchers are cancelled. An intent
//! ready at the same moment as a watcher report wins, and an intent is only
//! received when it is acted on.
//!
//! ## Cancellation
//! The context token is honoured at the top of each attempt, during the watch
//! race and during the restart backoff. A cancelled run returns
//! [`Outcome::Cancelled`] and leaves the container alone.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use containervisor::{
//!     DockerConnector, DockerOptions, LogWriter, Subscribe, Supervisor, SupervisorConfig,
//!     spawn_signal_relay,
//! };
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::new("web-1");
//!     cfg.validate()?;
//!
//!     let token = CancellationToken::new();
//!     let (tx, rx) = mpsc::channel(4);
//!     let _relay = spawn_signal_relay(token.clone(), cfg.stop, tx)?;
//!
//!     let sup = Supervisor::builder(cfg, Arc::new(DockerConnector::new(DockerOptions::default())))
//!         .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!         .build();
//!
//!     let outcome = sup.run(token.clone(), rx).await?;
//!     token.cancel();
//!     println!("supervision ended: {outcome:?}");
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SupervisorConfig;
use crate::control::{Connect, ContainerSnapshot, ControlPlane, ControlRef};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::probes::Probes;
use crate::subscribers::SubscriberSet;

use super::budget::RetryBudget;
use super::builder::SupervisorBuilder;
use super::race::Race;
use super::signals::StopIntent;
use super::watch::{self, WatchOutcome};

/// Successful end of a supervision run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A stop intent arrived and the graceful stop was issued.
    Stopped,
    /// A detach intent arrived; the container was left running.
    Detached,
    /// The context token was cancelled.
    Cancelled,
}

/// Container confirmed during the current attempt.
#[derive(Debug)]
struct Confirmed {
    id: String,
    pid: i32,
}

/// How a restart backoff ended.
enum Pause {
    Elapsed,
    Intent(StopIntent),
    Cancelled,
}

/// Supervises a single container until a stop intent, a detach intent,
/// cancellation or a fatal error.
pub struct Supervisor {
    cfg: SupervisorConfig,
    container: Arc<str>,
    connector: Arc<dyn Connect>,
    probes: Probes,
    subs: SubscriberSet,
}

impl Supervisor {
    /// Starts building a supervisor for `cfg`, reaching the control plane through `connector`.
    pub fn builder(cfg: SupervisorConfig, connector: Arc<dyn Connect>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, connector)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        connector: Arc<dyn Connect>,
        probes: Probes,
        subs: SubscriberSet,
    ) -> Self {
        let container = Arc::from(cfg.container.as_str());
        Self {
            cfg,
            container,
            connector,
            probes,
            subs,
        }
    }

    /// Returns the configuration this supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Runs the state machine to its terminal state.
    ///
    /// `intents` carries stop intents (usually from
    /// [`spawn_signal_relay`](crate::spawn_signal_relay)). An intent stays
    /// queued until a watch phase or a restart backoff acts on it. Every
    /// queued event is delivered to the subscribers before this returns.
    pub async fn run(
        self,
        ctx: CancellationToken,
        mut intents: mpsc::Receiver<StopIntent>,
    ) -> Result<Outcome, RuntimeError> {
        let res = self.supervise(&ctx, &mut intents).await;

        if let Err(err) = &res {
            self.emit(Event::new(EventKind::SupervisionFailed).with_reason(err.to_string()));
        }
        self.subs.shutdown().await;
        res
    }

    async fn supervise(
        &self,
        ctx: &CancellationToken,
        intents: &mut mpsc::Receiver<StopIntent>,
    ) -> Result<Outcome, RuntimeError> {
        let backoff = self.cfg.restart_backoff;
        let mut short_runs: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                return Ok(self.cancelled());
            }

            let plane = self
                .connector
                .connect()
                .map_err(|source| RuntimeError::Connect { source })?;
            let confirmed = self.establish(plane.as_ref()).await?;

            let watch_started = Instant::now();
            match self.watch(&plane, &confirmed, ctx, intents).await {
                None => return Ok(self.cancelled()),
                Some(WatchOutcome::Stop) => return Ok(self.stop(plane.as_ref()).await),
                Some(WatchOutcome::Detach) => return Ok(self.detach()),
                Some(WatchOutcome::Fatal(err)) => return Err(err),
                Some(WatchOutcome::Restart { source, exit_code }) => {
                    let mut ev = Event::new(EventKind::RestartScheduled).with_source(source);
                    if let Some(code) = exit_code {
                        ev = ev.with_exit_code(code);
                    }
                    self.emit(ev);
                }
            }

            if backoff.is_healthy_run(watch_started.elapsed()) {
                short_runs = 0;
            }
            let delay = backoff.next(short_runs);
            if delay.is_zero() {
                continue;
            }
            short_runs = short_runs.saturating_add(1);
            self.emit(
                Event::new(EventKind::BackoffScheduled)
                    .with_delay(delay)
                    .with_attempt(short_runs),
            );

            match self.pause(delay, ctx, intents).await {
                Pause::Elapsed => {}
                Pause::Cancelled => return Ok(self.cancelled()),
                Pause::Intent(true) => return Ok(self.stop(plane.as_ref()).await),
                Pause::Intent(false) => return Ok(self.detach()),
            }
        }
    }

    /// Inspecting, Starting and Confirming with a fresh retry budget.
    async fn establish(&self, plane: &dyn ControlPlane) -> Result<Confirmed, RuntimeError> {
        let container = &self.cfg.container;
        let mut budget = RetryBudget::new(self.cfg.start_tries, self.cfg.check_tries);
        let mut starts: u32 = 0;
        let mut failures: u32 = 0;

        loop {
            let snap = plane
                .inspect(container)
                .await
                .map_err(|source| RuntimeError::Inspect {
                    container: container.clone(),
                    source,
                })?;
            self.emit(
                Event::new(EventKind::Inspected)
                    .with_status(snap.status_line())
                    .with_pid(snap.pid),
            );
            debug!(id = %snap.id, name = %snap.name, status = %snap.status, "inspect result");

            if !snap.status.is_running() {
                if !budget.try_start() {
                    return Err(RuntimeError::StartExhausted {
                        container: container.clone(),
                        attempts: starts,
                    });
                }
                starts += 1;
                self.emit(Event::new(EventKind::StartRequested).with_attempt(starts));
                plane
                    .start(&snap.id)
                    .await
                    .map_err(|source| RuntimeError::Start {
                        container: container.clone(),
                        source,
                    })?;
                self.emit(Event::new(EventKind::Started));
                continue;
            }

            match self.confirm(&snap) {
                Ok(()) => {
                    return Ok(Confirmed {
                        id: snap.id,
                        pid: snap.pid,
                    });
                }
                Err(reason) => {
                    failures += 1;
                    self.emit(
                        Event::new(EventKind::ConfirmFailed)
                            .with_pid(snap.pid)
                            .with_attempt(failures)
                            .with_reason(reason),
                    );
                    if !budget.confirm_failed() {
                        return Err(RuntimeError::ConfirmExhausted {
                            container: container.clone(),
                            attempts: failures,
                        });
                    }
                }
            }
        }
    }

    /// Checks the snapshot's pid against the local probes.
    fn confirm(&self, snap: &ContainerSnapshot) -> Result<(), &'static str> {
        if !self.cfg.use_pid {
            return Ok(());
        }
        if !self.probes.process.is_alive(snap.pid) {
            return Err("process_gone");
        }
        if self.cfg.group_check()
            && !self
                .probes
                .group
                .is_in_group(snap.pid, &self.cfg.cgroup_path(&snap.id))
        {
            return Err("cgroup_mismatch");
        }
        Ok(())
    }

    /// Arms the watchers and waits for the first report or stop intent.
    /// `None` means cancelled.
    ///
    /// A pending intent beats a watcher report observed at the same time.
    async fn watch(
        &self,
        plane: &ControlRef,
        target: &Confirmed,
        ctx: &CancellationToken,
        intents: &mut mpsc::Receiver<StopIntent>,
    ) -> Option<WatchOutcome> {
        let mut race = Race::new(ctx);

        let remote = Arc::clone(plane);
        let container = self.cfg.container.clone();
        race.spawn(watch::remote_exit(remote, container));

        if self.cfg.use_pid {
            let probes = self.probes.clone();
            let group_path = self
                .cfg
                .group_check()
                .then(|| self.cfg.cgroup_path(&target.id));
            let (pid, interval) = (target.pid, self.cfg.check_interval);
            race.spawn(watch::local_liveness(probes, pid, group_path, interval));
        }

        debug!(watchers = race.len(), id = %target.id, "watch phase armed");
        self.emit(Event::new(EventKind::Ready).with_pid(target.pid));

        let first = race.first();
        tokio::pin!(first);
        let mut open = true;
        loop {
            tokio::select! {
                biased;
                intent = intents.recv(), if open => match intent {
                    Some(intent) => return Some(WatchOutcome::from(intent)),
                    None => open = false,
                },
                report = &mut first => return report,
            }
        }
    }

    /// Waits out a restart delay unless an intent or cancellation comes first.
    async fn pause(
        &self,
        delay: Duration,
        ctx: &CancellationToken,
        intents: &mut mpsc::Receiver<StopIntent>,
    ) -> Pause {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        let mut open = true;

        loop {
            tokio::select! {
                _ = &mut sleep => return Pause::Elapsed,
                _ = ctx.cancelled() => return Pause::Cancelled,
                intent = intents.recv(), if open => match intent {
                    Some(intent) => return Pause::Intent(intent),
                    None => open = false,
                },
            }
        }
    }

    async fn stop(&self, plane: &dyn ControlPlane) -> Outcome {
        self.emit(Event::new(EventKind::StopRequested));
        match plane.stop(&self.cfg.container, self.cfg.stop_timeout).await {
            Ok(()) => self.emit(Event::new(EventKind::Stopped)),
            Err(err) => self.emit(Event::new(EventKind::StopFailed).with_reason(err.to_string())),
        }
        Outcome::Stopped
    }

    fn detach(&self) -> Outcome {
        self.emit(Event::new(EventKind::Detached));
        Outcome::Detached
    }

    fn cancelled(&self) -> Outcome {
        self.emit(Event::new(EventKind::Cancelled));
        Outcome::Cancelled
    }

    fn emit(&self, ev: Event) {
        self.subs.emit(ev.with_container(Arc::clone(&self.container)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testkit::{
        HostLog, MockPlane, Recorder, ScriptedProcess, SharedPlane, StaticGroup, Unreachable,
        exited, running,
    };
    use crate::error::ControlError;
    use crate::events::ExitSource;
    use crate::notify::HostState;
    use crate::policies::{BackoffPolicy, JitterPolicy};
    use crate::subscribers::Subscribe;

    struct Harness {
        plane: Arc<MockPlane>,
        events: Arc<Recorder>,
        host: Arc<HostLog>,
    }

    fn config() -> SupervisorConfig {
        SupervisorConfig {
            check_interval: Duration::from_millis(50),
            ..SupervisorConfig::new("web-1")
        }
    }

    fn supervisor(
        cfg: SupervisorConfig,
        plane: MockPlane,
        process: ScriptedProcess,
        in_group: bool,
    ) -> (Supervisor, Harness) {
        let plane = Arc::new(plane);
        let events = Arc::new(Recorder::default());
        let host = Arc::new(HostLog::default());
        let sup = Supervisor::builder(cfg, Arc::new(SharedPlane(plane.clone())))
            .with_probes(Probes::new(Arc::new(process), Arc::new(StaticGroup(in_group))))
            .with_subscribers(vec![events.clone() as Arc<dyn Subscribe>])
            .with_notifier(host.clone())
            .build();
        (sup, Harness { plane, events, host })
    }

    #[tokio::test]
    async fn start_budget_allows_exactly_n_start_calls() {
        let cfg = SupervisorConfig {
            start_tries: 3,
            ..config()
        };
        let (sup, h) = supervisor(cfg, MockPlane::new(vec![exited()]), ScriptedProcess::alive(), true);
        let (_tx, rx) = mpsc::channel(1);

        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert!(matches!(err, RuntimeError::StartExhausted { attempts: 3, .. }));
        assert_eq!(h.plane.start_calls(), 3);
        assert_eq!(h.plane.inspect_calls(), 4);
        assert_eq!(h.events.count(EventKind::SupervisionFailed), 1);
    }

    #[tokio::test]
    async fn confirm_budget_allows_exactly_m_checks() {
        let cfg = SupervisorConfig {
            check_tries: 3,
            ..config()
        };
        let (sup, h) = supervisor(cfg, MockPlane::new(vec![running(4242)]), ScriptedProcess::dead(), true);
        let (_tx, rx) = mpsc::channel(1);

        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ConfirmExhausted { attempts: 3, .. }));
        assert_eq!(h.plane.inspect_calls(), 3);
        assert_eq!(h.plane.start_calls(), 0);

        let failures: Vec<_> = h
            .events
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::ConfirmFailed)
            .map(|e| (e.attempt, e.reason.as_deref().map(str::to_owned)))
            .collect();
        assert_eq!(
            failures,
            vec![
                (Some(1), Some("process_gone".to_owned())),
                (Some(2), Some("process_gone".to_owned())),
                (Some(3), Some("process_gone".to_owned())),
            ]
        );
    }

    #[tokio::test]
    async fn cgroup_guard_consumes_confirm_budget() {
        let cfg = SupervisorConfig {
            check_tries: 2,
            ..config()
        };
        let (sup, h) = supervisor(cfg, MockPlane::new(vec![running(4242)]), ScriptedProcess::alive(), false);
        let (_tx, rx) = mpsc::channel(1);

        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ConfirmExhausted { attempts: 2, .. }));
        assert!(
            h.events
                .events()
                .iter()
                .filter(|e| e.kind == EventKind::ConfirmFailed)
                .all(|e| e.reason.as_deref() == Some("cgroup_mismatch"))
        );
        assert_eq!(h.events.count(EventKind::Ready), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_is_idempotent_and_free() {
        let cfg = SupervisorConfig {
            check_tries: 1,
            ..config()
        };
        let plane = MockPlane::new(vec![running(4242)])
            .exit_with(Ok(0))
            .exit_with(Ok(0));
        let (sup, h) = supervisor(cfg, plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);

        let run = tokio::spawn(sup.run(CancellationToken::new(), rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).await.unwrap();

        assert_eq!(run.await.unwrap().unwrap(), Outcome::Stopped);
        assert_eq!(h.plane.inspect_calls(), 3);
        assert_eq!(h.events.count(EventKind::Ready), 3);
        assert_eq!(h.events.count(EventKind::ConfirmFailed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_exit_wins_the_race_exactly_once() {
        // The first pid would fail the local poll at 100ms, after the remote exit.
        let plane = MockPlane::new(vec![running(4242), running(4343)]).exit_with(Ok(0));
        let process = ScriptedProcess::alive().vanish_after(4242, Duration::from_millis(60));
        let (sup, h) = supervisor(config(), plane, process, true);
        let (tx, rx) = mpsc::channel(1);

        let run = tokio::spawn(sup.run(CancellationToken::new(), rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).await.unwrap();
        assert_eq!(run.await.unwrap().unwrap(), Outcome::Stopped);

        let restarts: Vec<_> = h
            .events
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::RestartScheduled)
            .collect();
        assert_eq!(restarts.len(), 1);
        assert_eq!(restarts[0].source, Some(ExitSource::Remote));
        assert_eq!(restarts[0].exit_code, Some(0));
        assert_eq!(h.events.count(EventKind::Ready), 2);
    }

    #[tokio::test]
    async fn terminate_intent_stops_with_default_timeout() {
        let (sup, h) = supervisor(
            config(),
            MockPlane::new(vec![running(4242)]),
            ScriptedProcess::alive(),
            true,
        );
        let (tx, rx) = mpsc::channel(1);
        tx.send(true).await.unwrap();

        assert_eq!(sup.run(CancellationToken::new(), rx).await.unwrap(), Outcome::Stopped);
        assert_eq!(h.plane.stop_calls(), vec![None]);
        assert_eq!(
            h.events.kinds(),
            vec![
                EventKind::Inspected,
                EventKind::Ready,
                EventKind::StopRequested,
                EventKind::Stopped,
            ]
        );
        assert_eq!(
            h.host.states(),
            vec![
                HostState::Status("running".into()),
                HostState::Ready,
                HostState::Stopping,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_intent_beats_a_simultaneous_exit() {
        let plane = MockPlane::new(vec![running(4242)]).exit_with(Ok(0));
        let (sup, h) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);
        tx.send(true).await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            sup.run(CancellationToken::new(), rx),
        )
        .await
        .expect("run must end on the queued intent");

        assert_eq!(outcome.unwrap(), Outcome::Stopped);
        assert_eq!(h.plane.stop_calls(), vec![None]);
        assert_eq!(h.events.count(EventKind::RestartScheduled), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detach_intent_beats_a_simultaneous_exit() {
        let plane = MockPlane::new(vec![running(4242)]).exit_with(Ok(0));
        let (sup, h) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);
        tx.send(false).await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            sup.run(CancellationToken::new(), rx),
        )
        .await
        .expect("run must end on the queued intent");

        assert_eq!(outcome.unwrap(), Outcome::Detached);
        assert!(h.plane.stop_calls().is_empty());
        assert_eq!(h.events.count(EventKind::RestartScheduled), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn intent_sent_after_a_restart_is_acted_on() {
        let plane = MockPlane::new(vec![running(4242)])
            .exit_with(Ok(1))
            .exit_with(Ok(2));
        let (sup, h) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);

        let run = tokio::spawn(sup.run(CancellationToken::new(), rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).await.unwrap();

        assert_eq!(run.await.unwrap().unwrap(), Outcome::Stopped);
        assert_eq!(h.plane.stop_calls(), vec![None]);
        assert_eq!(h.events.count(EventKind::RestartScheduled), 2);
    }

    #[tokio::test]
    async fn configured_stop_timeout_is_passed_through() {
        let cfg = SupervisorConfig {
            stop_timeout: Some(Duration::from_secs(10)),
            ..config()
        };
        let (sup, h) = supervisor(cfg, MockPlane::new(vec![running(4242)]), ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);
        tx.send(true).await.unwrap();

        sup.run(CancellationToken::new(), rx).await.unwrap();
        assert_eq!(h.plane.stop_calls(), vec![Some(Duration::from_secs(10))]);
    }

    #[tokio::test]
    async fn interrupt_intent_detaches_without_stop_call() {
        let (sup, h) = supervisor(
            config(),
            MockPlane::new(vec![running(4242)]),
            ScriptedProcess::alive(),
            true,
        );
        let (tx, rx) = mpsc::channel(1);
        tx.send(false).await.unwrap();

        assert_eq!(sup.run(CancellationToken::new(), rx).await.unwrap(), Outcome::Detached);
        assert!(h.plane.stop_calls().is_empty());
        assert_eq!(h.events.count(EventKind::Detached), 1);
    }

    #[tokio::test]
    async fn failed_stop_is_reported_but_not_fatal() {
        let plane = MockPlane::new(vec![running(4242)])
            .stop_fails(ControlError::Request("container is paused".into()));
        let (sup, h) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);
        tx.send(true).await.unwrap();

        assert_eq!(sup.run(CancellationToken::new(), rx).await.unwrap(), Outcome::Stopped);
        assert_eq!(h.events.count(EventKind::StopFailed), 1);
        assert_eq!(
            h.host.states().last(),
            Some(&HostState::Status(
                "stop failed: request failed: container is paused".into()
            ))
        );
    }

    #[tokio::test]
    async fn disabled_process_check_confirms_unconditionally() {
        let cfg = SupervisorConfig {
            use_pid: false,
            use_cgroup: false,
            check_tries: 1,
            ..config()
        };
        let (sup, h) = supervisor(cfg, MockPlane::new(vec![running(4242)]), ScriptedProcess::dead(), false);
        let (tx, rx) = mpsc::channel(1);
        tx.send(false).await.unwrap();

        assert_eq!(sup.run(CancellationToken::new(), rx).await.unwrap(), Outcome::Detached);
        assert_eq!(h.events.count(EventKind::ConfirmFailed), 0);
        assert_eq!(h.events.count(EventKind::Ready), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn web_1_local_poll_restarts_with_fresh_budget() {
        let cfg = SupervisorConfig {
            start_tries: 1,
            check_tries: 1,
            ..config()
        };
        let plane = MockPlane::new(vec![exited(), running(4242)]);
        let process = ScriptedProcess::alive().vanish_after(4242, Duration::from_millis(200));
        let (sup, h) = supervisor(cfg, plane, process, true);
        let (_tx, rx) = mpsc::channel(1);

        let started = Instant::now();
        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(200));

        // The second attempt sees the same vanished pid and spends its own budget of one.
        assert!(matches!(err, RuntimeError::ConfirmExhausted { attempts: 1, .. }));
        assert_eq!(h.plane.start_calls(), 1);
        assert_eq!(
            h.events.kinds(),
            vec![
                EventKind::Inspected,
                EventKind::StartRequested,
                EventKind::Started,
                EventKind::Inspected,
                EventKind::Ready,
                EventKind::RestartScheduled,
                EventKind::Inspected,
                EventKind::ConfirmFailed,
                EventKind::SupervisionFailed,
            ]
        );
        let restart = h
            .events
            .events()
            .into_iter()
            .find(|e| e.kind == EventKind::RestartScheduled)
            .unwrap();
        assert_eq!(restart.source, Some(ExitSource::Local));
        assert_eq!(
            h.host.states(),
            vec![
                HostState::Status("exited".into()),
                HostState::Status("running".into()),
                HostState::Ready,
                HostState::Reloading,
                HostState::Status("running".into()),
                HostState::Status(
                    "failed: could not confirm container web-1 after 1 check(s)".into()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_context_never_touches_the_container() {
        let (sup, h) = supervisor(
            config(),
            MockPlane::new(vec![running(4242)]),
            ScriptedProcess::alive(),
            true,
        );
        let (_tx, rx) = mpsc::channel(1);
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(sup.run(ctx, rx).await.unwrap(), Outcome::Cancelled);
        assert_eq!(h.plane.inspect_calls(), 0);
        assert_eq!(h.events.kinds(), vec![EventKind::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_watch_phase() {
        let (sup, h) = supervisor(
            config(),
            MockPlane::new(vec![running(4242)]),
            ScriptedProcess::alive(),
            true,
        );
        let (_tx, rx) = mpsc::channel(1);
        let ctx = CancellationToken::new();

        let run = tokio::spawn(sup.run(ctx.clone(), rx));
        tokio::time::sleep(Duration::from_millis(500)).await;
        ctx.cancel();

        assert_eq!(run.await.unwrap().unwrap(), Outcome::Cancelled);
        assert!(h.plane.stop_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn short_runs_back_off_exponentially() {
        let cfg = SupervisorConfig {
            restart_backoff: BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(1),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            ..config()
        };
        let plane = MockPlane::new(vec![running(4242)])
            .exit_with(Ok(1))
            .exit_with(Ok(1));
        let (sup, h) = supervisor(cfg, plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);

        let run = tokio::spawn(sup.run(CancellationToken::new(), rx));
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(true).await.unwrap();
        assert_eq!(run.await.unwrap().unwrap(), Outcome::Stopped);

        let delays: Vec<_> = h
            .events
            .events()
            .into_iter()
            .filter(|e| e.kind == EventKind::BackoffScheduled)
            .map(|e| e.delay_ms)
            .collect();
        assert_eq!(delays, vec![Some(100), Some(200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_intent_during_backoff_is_honoured() {
        let cfg = SupervisorConfig {
            restart_backoff: BackoffPolicy {
                first: Duration::from_secs(10),
                max: Duration::from_secs(30),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            ..config()
        };
        let plane = MockPlane::new(vec![running(4242)]).exit_with(Ok(1));
        let (sup, h) = supervisor(cfg, plane, ScriptedProcess::alive(), true);
        let (tx, rx) = mpsc::channel(1);

        let run = tokio::spawn(sup.run(CancellationToken::new(), rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).await.unwrap();

        assert_eq!(run.await.unwrap().unwrap(), Outcome::Stopped);
        assert_eq!(h.plane.inspect_calls(), 1);
        assert_eq!(h.plane.stop_calls(), vec![None]);
    }

    #[tokio::test]
    async fn fatal_control_plane_failures() {
        let (_tx, rx) = mpsc::channel(1);
        let sup = Supervisor::builder(config(), Arc::new(Unreachable))
            .with_notifier(Arc::new(HostLog::default()))
            .build();
        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_connect");

        let (_tx, rx) = mpsc::channel(1);
        let plane = MockPlane::new(vec![Err(ControlError::NotFound("web-1".into()))]);
        let (sup, _) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_inspect");

        let (_tx, rx) = mpsc::channel(1);
        let plane = MockPlane::new(vec![exited()]).start_fails(ControlError::Request("no".into()));
        let (sup, _) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_start");

        let (_tx, rx) = mpsc::channel(1);
        let plane = MockPlane::new(vec![running(4242)])
            .exit_with(Err(ControlError::Request("stream reset".into())));
        let (sup, h) = supervisor(config(), plane, ScriptedProcess::alive(), true);
        let err = sup.run(CancellationToken::new(), rx).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_exit_subscription");
        assert_eq!(h.events.count(EventKind::RestartScheduled), 0);
    }
}
