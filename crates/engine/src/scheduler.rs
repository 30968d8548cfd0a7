// In crates/engine/src/scheduler.rs

use crate::session::{SessionState, SessionStatus};
use crate::task::{TickOutcome, TradingTask};
use crate::{Error, Result};
use app_config::types::ScheduleSettings;
use core_types::SessionId;
use futures::future;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

/// A running session's job, as the registry sees it.
struct SessionHandle {
    cancel: CancellationToken,
    status: watch::Receiver<SessionStatus>,
    job: JoinHandle<()>,
}

/// Owns one periodic job per session.
///
/// At most one job exists per `SessionId`; starting a running session
/// replaces its job. Ticks of one session never overlap, even across a
/// restart, because every tick holds the session's tick lock.
pub struct Scheduler {
    task: Arc<TradingTask>,
    tick_interval: Duration,
    initial_delay: Duration,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    // Outlives the session's jobs so a replacement job waits out a tick the
    // previous one still has in flight.
    tick_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
    shutting_down: AtomicBool,
}

impl Scheduler {
    pub fn new(task: Arc<TradingTask>, schedule: &ScheduleSettings) -> Self {
        Self {
            task,
            tick_interval: schedule.tick_interval(),
            initial_delay: schedule.initial_delay(),
            sessions: Mutex::new(HashMap::new()),
            tick_locks: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Starts the session's loop, replacing any job it already has.
    ///
    /// The first tick runs after the initial delay. A replaced job keeps no
    /// state: the new job starts with no last signal and no failures.
    pub async fn start(&self, session: SessionId) -> Result<SessionStatus> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let tick_lock = {
            let mut tick_locks = self.tick_locks.lock().await;
            Self::prune(&mut tick_locks, Some(session));
            tick_locks.entry(session).or_default().clone()
        };

        let mut sessions = self.sessions.lock().await;
        // A shutdown may have drained the registry while this call waited.
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if let Some(previous) = sessions.remove(&session) {
            tracing::info!(session = %session, "Session already running; replacing its job.");
            previous.cancel.cancel();
        }

        let status = SessionStatus { running: true, ..SessionStatus::stopped(session) };
        let (status_tx, status_rx) = watch::channel(status.clone());
        let cancel = CancellationToken::new();

        let job = SessionJob {
            session,
            task: self.task.clone(),
            cancel: cancel.clone(),
            status_tx,
            tick_lock,
            tick_interval: self.tick_interval,
            initial_delay: self.initial_delay,
        };
        let handle = tokio::spawn(job.run());

        sessions.insert(session, SessionHandle { cancel, status: status_rx, job: handle });
        tracing::info!(
            session = %session,
            tick_interval_secs = self.tick_interval.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "Session started."
        );
        Ok(status)
    }

    /// Stops the session's loop. Returns whether a job was running.
    ///
    /// A tick already in flight finishes its current step but places no
    /// order and sends no notification afterwards.
    pub async fn stop(&self, session: SessionId) -> bool {
        Self::prune(&mut *self.tick_locks.lock().await, None);

        let Some(handle) = self.sessions.lock().await.remove(&session) else {
            tracing::debug!(session = %session, "Stop requested for an idle session.");
            return false;
        };
        handle.cancel.cancel();
        tracing::info!(session = %session, "Session stopped.");
        true
    }

    /// The latest published status. Never waits for an in-flight tick.
    pub async fn status(&self, session: SessionId) -> SessionStatus {
        match self.sessions.lock().await.get(&session) {
            Some(handle) => Self::snapshot(handle),
            None => SessionStatus::stopped(session),
        }
    }

    /// Statuses of every registered session, ordered by id.
    pub async fn sessions(&self) -> Vec<SessionStatus> {
        let mut statuses: Vec<_> = self.sessions.lock().await.values().map(Self::snapshot).collect();
        statuses.sort_by_key(|status| status.session);
        statuses
    }

    /// Stops every session and waits for their jobs to exit. No session can
    /// be started afterwards.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let handles: Vec<_> = self.sessions.lock().await.drain().map(|(_, handle)| handle).collect();
        tracing::info!(count = handles.len(), "Stopping all sessions.");

        for handle in &handles {
            handle.cancel.cancel();
        }
        let results = future::join_all(handles.into_iter().map(|handle| handle.job)).await;
        for error in results.into_iter().filter_map(|r| r.err()) {
            tracing::error!(error = %error, "Session job ended abnormally.");
        }
        tracing::info!("Scheduler shut down.");
    }

    /// Drops tick locks only the map still holds. Their jobs have exited, so
    /// no tick can be in flight. `keep` is spared regardless.
    fn prune(tick_locks: &mut HashMap<SessionId, Arc<Mutex<()>>>, keep: Option<SessionId>) {
        tick_locks.retain(|id, lock| Some(*id) == keep || Arc::strong_count(lock) > 1);
    }

    fn snapshot(handle: &SessionHandle) -> SessionStatus {
        let mut status = handle.status.borrow().clone();
        status.running = !handle.cancel.is_cancelled() && !handle.job.is_finished();
        status
    }

    #[cfg(test)]
    async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    #[cfg(test)]
    async fn tracked_tick_locks(&self) -> usize {
        self.tick_locks.lock().await.len()
    }
}

/// Everything one session's job owns.
struct SessionJob {
    session: SessionId,
    task: Arc<TradingTask>,
    cancel: CancellationToken,
    status_tx: watch::Sender<SessionStatus>,
    tick_lock: Arc<Mutex<()>>,
    tick_interval: Duration,
    initial_delay: Duration,
}

impl SessionJob {
    async fn run(self) {
        let mut state = SessionState::default();

        tokio::select! {
            _ = self.cancel.cancelled() => return,
            _ = sleep(self.initial_delay) => {}
        }

        let mut ticker = interval(self.tick_interval);
        // A tick longer than the interval delays the next one; missed ticks
        // are not replayed in a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Ok(_guard) = self.tick_lock.try_lock() else {
                tracing::warn!(session = %self.session, "Previous tick still in flight; skipping this one.");
                continue;
            };

            let outcome = self.task.tick(self.session, &mut state, &self.cancel).await;
            log_outcome(self.session, &outcome);
            self.publish(&state);

            if let TickOutcome::CooldownTriggered(cooldown) = outcome {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = sleep(cooldown) => {}
                }
                self.task.backoff().finish_cooldown(&mut state.consecutive_failures);
                self.publish(&state);
                tracing::info!(session = %self.session, "Cooldown over; resuming.");
                ticker.reset();
            }
        }

        tracing::info!(session = %self.session, "Session job exited.");
    }

    fn publish(&self, state: &SessionState) {
        self.status_tx.send_replace(state.status(self.session, !self.cancel.is_cancelled()));
    }
}

fn log_outcome(session: SessionId, outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Skipped | TickOutcome::NoSignal | TickOutcome::InsufficientData { .. } => {
            tracing::debug!(session = %session, ?outcome, "Tick finished.")
        }
        TickOutcome::FetchFailed { .. } | TickOutcome::CooldownTriggered(_) => {
            tracing::warn!(session = %session, ?outcome, "Tick finished.")
        }
        TickOutcome::OrderFailed(_) => tracing::error!(session = %session, ?outcome, "Tick finished."),
        TickOutcome::NotActionable(_) | TickOutcome::OrderPlaced { .. } | TickOutcome::Aborted => {
            tracing::info!(session = %session, ?outcome, "Tick finished.")
        }
    }
}
