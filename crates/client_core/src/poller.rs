//! Session-status polling.
//!
//! One tokio task per session drives a single fixed-cadence timer. Every tick
//! issues a sequence-tagged fetch unless the current snapshot is terminal or
//! the poll budget is spent. Fetches run concurrently so a slow response
//! never delays the cadence, and a completion older than the latest applied
//! one is dropped. Consumers observe the state through a watch channel.

use std::{sync::Arc, time::Duration};

use futures::{stream::FuturesUnordered, StreamExt};
use shared::{domain::SessionId, protocol::SessionSnapshot};
use thiserror::Error;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{ClientError, ResearchBackend};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Upper bound on fetches issued for one session.
    pub max_attempts: Option<u32>,
    /// Upper bound on wall time spent polling one session.
    pub max_duration: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            max_duration: Some(DEFAULT_MAX_POLL_DURATION),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
    #[error("session id must not be empty")]
    EmptySessionId,
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Never started.
    Idle,
    Polling,
    /// A completed or failed snapshot was applied.
    Finished,
    /// Poll budget exhausted before the session reached a terminal status.
    Stuck,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerState {
    pub session_id: Option<SessionId>,
    pub snapshot: Option<SessionSnapshot>,
    pub loading: bool,
    pub phase: PollPhase,
    pub last_error: Option<String>,
    pub polls_issued: u32,
    applied_seq: u64,
    generation: u64,
}

impl Default for PollerState {
    fn default() -> Self {
        Self::idle(0)
    }
}

impl PollerState {
    fn idle(generation: u64) -> Self {
        Self {
            session_id: None,
            snapshot: None,
            loading: false,
            phase: PollPhase::Idle,
            last_error: None,
            polls_issued: 0,
            applied_seq: 0,
            generation,
        }
    }

    fn starting(session_id: SessionId, generation: u64) -> Self {
        Self {
            session_id: Some(session_id),
            loading: true,
            phase: PollPhase::Polling,
            ..Self::idle(generation)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(SessionSnapshot::is_terminal)
    }

    /// True once polling can make no further progress on its own.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.phase,
            PollPhase::Finished | PollPhase::Stuck | PollPhase::Stopped
        )
    }

    /// Loading finished but no snapshot was ever obtained.
    pub fn is_missing_session(&self) -> bool {
        !self.loading && self.snapshot.is_none() && self.phase != PollPhase::Idle
    }
}

pub struct StatusPoller {
    backend: Arc<dyn ResearchBackend>,
    config: PollerConfig,
    state: Arc<watch::Sender<PollerState>>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn ResearchBackend>, config: PollerConfig) -> Self {
        let (state, _) = watch::channel(PollerState::idle(0));
        Self {
            backend,
            config,
            state: Arc::new(state),
            task: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts polling `session_id`, replacing any session polled before.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, session_id: impl Into<SessionId>) -> Result<(), PollerError> {
        let session_id = session_id.into();
        if session_id.is_blank() {
            return Err(PollerError::EmptySessionId);
        }
        if self.config.interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        self.abort_task();
        self.generation += 1;
        let generation = self.generation;
        self.state
            .send_replace(PollerState::starting(session_id.clone(), generation));

        info!(%session_id, interval = ?self.config.interval, "polling started");
        self.task = Some(tokio::spawn(run_poll_loop(
            Arc::clone(&self.backend),
            session_id,
            self.config.clone(),
            Arc::clone(&self.state),
            generation,
        )));
        Ok(())
    }

    /// Cancels the timer and any in-flight fetch. The last snapshot is kept.
    pub fn stop(&mut self) {
        if self.task.is_none() {
            return;
        }
        self.abort_task();
        self.generation += 1;
        let generation = self.generation;
        self.state.send_modify(|state| {
            state.generation = generation;
            state.loading = false;
            if state.phase == PollPhase::Polling {
                state.phase = PollPhase::Stopped;
            }
        });
        debug!("polling stopped");
    }

    /// Stops polling and returns to the idle state, dropping any snapshot.
    pub fn reset(&mut self) {
        self.abort_task();
        self.generation += 1;
        self.state.send_replace(PollerState::idle(self.generation));
        debug!("poller reset");
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.abort_task();
    }
}

enum TickAction {
    Fetch,
    Finish,
    Stuck,
}

fn decide_tick(state: &PollerState, config: &PollerConfig, elapsed: Duration) -> TickAction {
    if state.is_terminal() {
        return TickAction::Finish;
    }
    if config
        .max_attempts
        .is_some_and(|max| state.polls_issued >= max)
    {
        return TickAction::Stuck;
    }
    if config.max_duration.is_some_and(|max| elapsed >= max) {
        return TickAction::Stuck;
    }
    TickAction::Fetch
}

async fn run_poll_loop(
    backend: Arc<dyn ResearchBackend>,
    session_id: SessionId,
    config: PollerConfig,
    state: Arc<watch::Sender<PollerState>>,
    generation: u64,
) {
    let started = Instant::now();
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = FuturesUnordered::new();
    let mut next_seq: u64 = 0;
    // Budget spent; no new fetches, but in-flight ones may still land.
    let mut draining = false;

    loop {
        tokio::select! {
            _ = ticker.tick(), if !draining => {
                let action = decide_tick(&state.borrow(), &config, started.elapsed());
                match action {
                    TickAction::Finish => break,
                    TickAction::Stuck if in_flight.is_empty() => {
                        mark_stuck(&state, generation, &session_id);
                        break;
                    }
                    TickAction::Stuck => {
                        debug!(%session_id, pending = in_flight.len(), "poll budget spent; awaiting in-flight fetches");
                        draining = true;
                    }
                    TickAction::Fetch => {
                        next_seq += 1;
                        let seq = next_seq;
                        let live = state.send_if_modified(|current| {
                            if current.generation != generation {
                                return false;
                            }
                            current.polls_issued += 1;
                            true
                        });
                        if !live {
                            break;
                        }

                        let backend = Arc::clone(&backend);
                        let id = session_id.clone();
                        in_flight.push(async move {
                            let outcome = backend.fetch_status(&id).await;
                            (seq, outcome)
                        });
                    }
                }
            }
            Some((seq, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                if apply_outcome(&state, generation, seq, outcome, &session_id) {
                    break;
                }
                if draining && in_flight.is_empty() {
                    mark_stuck(&state, generation, &session_id);
                    break;
                }
            }
        }
    }
}

fn mark_stuck(state: &watch::Sender<PollerState>, generation: u64, session_id: &SessionId) {
    state.send_if_modified(|current| {
        if current.generation != generation {
            return false;
        }
        warn!(
            %session_id,
            polls_issued = current.polls_issued,
            "poll budget exhausted before session reached a terminal status"
        );
        current.phase = PollPhase::Stuck;
        current.loading = false;
        true
    });
}

/// Applies a fetch completion. Returns true when polling should end.
fn apply_outcome(
    state: &watch::Sender<PollerState>,
    generation: u64,
    seq: u64,
    outcome: Result<SessionSnapshot, ClientError>,
    session_id: &SessionId,
) -> bool {
    let mut finished = false;
    state.send_if_modified(|current| {
        if current.generation != generation {
            return false;
        }
        if seq < current.applied_seq {
            debug!(%session_id, seq, applied = current.applied_seq, "discarding stale status response");
            return false;
        }

        current.loading = false;
        match outcome {
            Ok(snapshot) => {
                current.applied_seq = seq;
                current.last_error = None;
                if snapshot.is_terminal() {
                    info!(%session_id, status = %snapshot.status, "session reached terminal status");
                    current.phase = PollPhase::Finished;
                    finished = true;
                }
                current.snapshot = Some(snapshot);
            }
            Err(err) => {
                warn!(%session_id, seq, error = %err, "status fetch failed");
                current.last_error = Some(err.to_string());
            }
        }
        true
    });
    finished
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
