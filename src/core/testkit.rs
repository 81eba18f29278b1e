//! Scripted fakes for driving the state machine in tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::control::{
    Connect, ContainerSnapshot, ContainerStatus, ControlPlane, ControlRef, ExitNotice,
};
use crate::error::ControlError;
use crate::events::{Event, EventKind};
use crate::notify::{Delivery, HostNotifier, HostState};
use crate::probes::{GroupProbe, ProcessProbe};
use crate::subscribers::Subscribe;

pub(crate) const CONTAINER_ID: &str = "abc123";

pub(crate) fn snapshot(status: ContainerStatus, pid: i32) -> ContainerSnapshot {
    ContainerSnapshot {
        id: CONTAINER_ID.into(),
        name: "/web-1".into(),
        status,
        pid,
        health: None,
    }
}

pub(crate) fn running(pid: i32) -> Result<ContainerSnapshot, ControlError> {
    Ok(snapshot(ContainerStatus::Running, pid))
}

pub(crate) fn exited() -> Result<ContainerSnapshot, ControlError> {
    Ok(snapshot(ContainerStatus::Exited, 0))
}

/// Control plane answering from scripts.
///
/// The last inspect answer repeats forever. Once the exit script is spent,
/// `wait_exit` never resolves.
pub(crate) struct MockPlane {
    inspects: Mutex<VecDeque<Result<ContainerSnapshot, ControlError>>>,
    exits: Mutex<VecDeque<Result<i64, ControlError>>>,
    start_result: Result<(), ControlError>,
    stop_result: Result<(), ControlError>,
    inspect_calls: AtomicU32,
    start_calls: AtomicU32,
    stop_calls: Mutex<Vec<Option<Duration>>>,
}

impl MockPlane {
    pub(crate) fn new(inspects: Vec<Result<ContainerSnapshot, ControlError>>) -> Self {
        Self {
            inspects: Mutex::new(inspects.into()),
            exits: Mutex::new(VecDeque::new()),
            start_result: Ok(()),
            stop_result: Ok(()),
            inspect_calls: AtomicU32::new(0),
            start_calls: AtomicU32::new(0),
            stop_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn exit_with(self, exit: Result<i64, ControlError>) -> Self {
        self.exits.lock().unwrap().push_back(exit);
        self
    }

    pub(crate) fn start_fails(mut self, err: ControlError) -> Self {
        self.start_result = Err(err);
        self
    }

    pub(crate) fn stop_fails(mut self, err: ControlError) -> Self {
        self.stop_result = Err(err);
        self
    }

    pub(crate) fn inspect_calls(&self) -> u32 {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> Vec<Option<Duration>> {
        self.stop_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlPlane for MockPlane {
    async fn inspect(&self, reference: &str) -> Result<ContainerSnapshot, ControlError> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.inspects.lock().unwrap();
        let answer = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        answer.unwrap_or_else(|| Err(ControlError::NotFound(reference.to_string())))
    }

    async fn start(&self, _id: &str) -> Result<(), ControlError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start_result.clone()
    }

    async fn stop(&self, _reference: &str, timeout: Option<Duration>) -> Result<(), ControlError> {
        self.stop_calls.lock().unwrap().push(timeout);
        self.stop_result.clone()
    }

    async fn wait_exit(&self, _reference: &str) -> Result<ExitNotice, ControlError> {
        let next = self.exits.lock().unwrap().pop_front();
        match next {
            Some(exit) => exit.map(|exit_code| ExitNotice { exit_code }),
            None => std::future::pending().await,
        }
    }
}

/// Hands out the same mock for every supervision attempt.
pub(crate) struct SharedPlane(pub(crate) Arc<MockPlane>);

impl Connect for SharedPlane {
    fn connect(&self) -> Result<ControlRef, ControlError> {
        Ok(self.0.clone())
    }
}

pub(crate) struct Unreachable;

impl Connect for Unreachable {
    fn connect(&self) -> Result<ControlRef, ControlError> {
        Err(ControlError::Connection("daemon unreachable".into()))
    }
}

/// Process probe with per-pid vanish deadlines on the tokio clock.
pub(crate) struct ScriptedProcess {
    all_alive: bool,
    vanishing: Vec<(i32, Instant)>,
}

impl ScriptedProcess {
    pub(crate) fn alive() -> Self {
        Self {
            all_alive: true,
            vanishing: Vec::new(),
        }
    }

    pub(crate) fn dead() -> Self {
        Self {
            all_alive: false,
            vanishing: Vec::new(),
        }
    }

    /// `pid` reports dead from `after` on, measured from now.
    pub(crate) fn vanish_after(mut self, pid: i32, after: Duration) -> Self {
        self.vanishing.push((pid, Instant::now() + after));
        self
    }
}

impl ProcessProbe for ScriptedProcess {
    fn is_alive(&self, pid: i32) -> bool {
        if let Some((_, deadline)) = self.vanishing.iter().find(|(p, _)| *p == pid) {
            return Instant::now() < *deadline;
        }
        self.all_alive && pid > 0
    }
}

pub(crate) struct StaticGroup(pub(crate) bool);

impl GroupProbe for StaticGroup {
    fn is_in_group(&self, _pid: i32, _group_path: &str) -> bool {
        self.0
    }
}

#[derive(Default)]
pub(crate) struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.kinds().iter().filter(|k| **k == kind).count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[derive(Default)]
pub(crate) struct HostLog(Mutex<Vec<HostState>>);

impl HostLog {
    pub(crate) fn states(&self) -> Vec<HostState> {
        self.0.lock().unwrap().clone()
    }
}

impl HostNotifier for HostLog {
    fn notify(&self, state: &HostState) -> io::Result<Delivery> {
        self.0.lock().unwrap().push(state.clone());
        Ok(Delivery::Sent)
    }
}
