use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    accountant::SessionAccountant,
    db::{connection::Database, models::Category},
    settings::SettingsStore,
};

use super::state::{TickOutcome, TimerState};

/// One tick of the countdown clock.
const TICK_QUANTUM_MS: u64 = 1_000;

/// Drives the work/break cycle and owns the only mutable [`TimerState`].
///
/// Observers subscribe to a watch channel; every transition and every tick
/// publishes a fresh snapshot. Persistence goes through the
/// [`SessionAccountant`] and is never awaited here: the state transition is
/// the user-visible truth, and storage catches up on its own thread.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    state_tx: Arc<watch::Sender<TimerState>>,
    accountant: Arc<Mutex<SessionAccountant>>,
    active_category: Arc<Mutex<Option<Category>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Bumped on every clock start and cancel. A tick whose captured epoch no
    /// longer matches is stale and must not touch the state.
    epoch: Arc<AtomicU64>,
    settings: Arc<SettingsStore>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(db: Database, settings: Arc<SettingsStore>) -> Self {
        let initial = TimerState::idle(settings.timer().work_duration_ms);
        let (state_tx, _) = watch::channel(initial.clone());

        Self {
            state: Arc::new(Mutex::new(initial)),
            state_tx: Arc::new(state_tx),
            accountant: Arc::new(Mutex::new(SessionAccountant::new(db))),
            active_category: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            settings,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Receive a fresh [`TimerState`] on every transition and every tick.
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }

    pub async fn state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    /// Start a fresh work phase for `category`.
    ///
    /// Any in-flight clock is cancelled and any open session is committed
    /// first, so two sessions are never open at once.
    pub async fn start(&self, category: Category) {
        self.cancel_ticker().await;

        let prior_spent = self.state.lock().await.session_time_spent_ms;
        {
            let mut accountant = self.accountant.lock().await;
            accountant.commit_session(prior_spent);
            accountant.open_session(&category);
        }

        {
            let mut state = self.state.lock().await;
            state.begin_work(self.settings.timer().work_duration_ms, category.title.clone());
            self.publish(&state);
        }
        *self.active_category.lock().await = Some(category);

        self.spawn_ticker().await;
    }

    /// Pause a running clock, or resume a paused one. Harmless no-op when no
    /// clock is active; the UI only shows the control while one is.
    pub async fn toggle_pause_resume(&self) {
        let resumed = {
            let mut state = self.state.lock().await;
            if state.is_paused {
                state.resume();
                self.publish(&state);
                true
            } else if state.is_running {
                state.pause();
                self.publish(&state);
                false
            } else {
                return;
            }
        };

        if resumed {
            self.spawn_ticker().await;
        } else {
            self.cancel_ticker().await;
        }
    }

    /// Stop the current phase. A work phase commits its session and loads the
    /// break, paused; a break is abandoned straight back to idle.
    pub async fn stop(&self) {
        self.cancel_ticker().await;

        let (was_break, spent) = {
            let mut state = self.state.lock().await;
            let was_break = state.is_break;
            let spent = state.session_time_spent_ms;
            if was_break {
                state.reset_idle(self.settings.timer().work_duration_ms);
            } else {
                state.begin_break_pending(self.settings.timer().break_duration_ms);
            }
            self.publish(&state);
            (was_break, spent)
        };

        if was_break {
            *self.active_category.lock().await = None;
        } else {
            self.accountant.lock().await.commit_session(spent);
        }
    }

    /// Reload a full work phase, paused. During a break this is the same as
    /// [`stop`](Self::stop).
    ///
    /// Restart never throws tracked time away: the partial session is
    /// committed, then a fresh one opens for the same category.
    pub async fn restart(&self) {
        self.cancel_ticker().await;

        let (was_break, spent) = {
            let mut state = self.state.lock().await;
            let was_break = state.is_break;
            let spent = state.session_time_spent_ms;
            if was_break {
                state.reset_idle(self.settings.timer().work_duration_ms);
            } else {
                state.reset_work_paused(self.settings.timer().work_duration_ms);
            }
            self.publish(&state);
            (was_break, spent)
        };

        if was_break {
            *self.active_category.lock().await = None;
            return;
        }

        let active = self.active_category.lock().await.clone();
        let mut accountant = self.accountant.lock().await;
        accountant.commit_session(spent);
        if let Some(category) = active {
            accountant.open_session(&category);
        }
    }

    /// Apply one tick quantum on behalf of the clock that captured
    /// `expected_epoch`. Returns false when the clock should stop: the epoch
    /// went stale, the timer is no longer running, or the phase just ended.
    pub(crate) async fn advance_clock(&self, expected_epoch: u64) -> bool {
        let (outcome, spent) = {
            let mut state = self.state.lock().await;
            if self.epoch.load(Ordering::SeqCst) != expected_epoch || !state.is_running {
                return false;
            }

            let outcome = state.apply_tick(TICK_QUANTUM_MS);
            match outcome {
                TickOutcome::Running => {}
                TickOutcome::WorkComplete => {
                    state.begin_break_pending(self.settings.timer().break_duration_ms);
                }
                TickOutcome::BreakComplete => {
                    state.reset_idle(self.settings.timer().work_duration_ms);
                }
            }
            let spent = state.session_time_spent_ms;
            self.publish(&state);
            (outcome, spent)
        };

        match outcome {
            TickOutcome::Running => true,
            TickOutcome::WorkComplete => {
                self.accountant.lock().await.commit_session(spent);
                false
            }
            TickOutcome::BreakComplete => {
                *self.active_category.lock().await = None;
                false
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            // The first decrement is owed one full interval after start, so
            // skip the interval's immediate initial tick.
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;
                if !controller.advance_clock(my_epoch).await {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish(&self, state: &TimerState) {
        self.state_tx.send_replace(state.clone());
    }

    #[cfg(test)]
    fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    #[cfg(test)]
    async fn tick(&self) -> bool {
        self.advance_clock(self.epoch.load(Ordering::SeqCst)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::state::{DEFAULT_BREAK_MS, DEFAULT_WORK_MS};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, TimerController) {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::new(dir.path().join("timer.sqlite3")).expect("database");
        let settings =
            Arc::new(SettingsStore::new(dir.path().join("settings.json")).expect("settings"));
        // Park the real ticker far in the future; tests drive ticks directly.
        let controller =
            TimerController::new(db.clone(), settings).with_tick_interval(Duration::from_secs(3_600));
        (dir, db, controller)
    }

    async fn study_category(db: &Database) -> Category {
        db.create_category("Study".into(), "#4CAF50".into())
            .await
            .expect("category")
    }

    async fn flush(db: &Database) {
        db.execute(|_conn| Ok(())).await.expect("flush");
    }

    async fn tick_n(controller: &TimerController, n: u32) {
        for _ in 0..n {
            controller.tick().await;
        }
    }

    async fn total_for(db: &Database, category: &Category) -> u64 {
        flush(db).await;
        db.get_category(category.id)
            .await
            .expect("get")
            .expect("row")
            .total_time_spent_ms
    }

    #[tokio::test]
    async fn start_enters_a_running_work_phase() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category).await;

        let state = controller.state().await;
        assert_eq!(state.time_left_ms, DEFAULT_WORK_MS);
        assert_eq!(state.total_time_ms, DEFAULT_WORK_MS);
        assert!(!state.is_break);
        assert!(state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.active_category_title.as_deref(), Some("Study"));
        assert_eq!(state.session_time_spent_ms, 0);
    }

    #[tokio::test]
    async fn work_expiry_commits_and_loads_the_break_paused() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category.clone()).await;
        tick_n(&controller, 1_500).await;

        let state = controller.state().await;
        assert_eq!(state.time_left_ms, DEFAULT_BREAK_MS);
        assert!(state.is_break);
        assert!(state.is_paused);
        assert!(!state.is_running);

        assert_eq!(total_for(&db, &category).await, 1_500_000);
        let sessions = db.sessions_for_category(category.id).await.expect("sessions");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_ms(), 1_500_000);
    }

    #[tokio::test]
    async fn expired_work_never_reenters_work_on_further_ticks() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category).await;
        tick_n(&controller, 1_501).await;

        // The break is pending and paused; the extra tick must not run it.
        let state = controller.state().await;
        assert!(state.is_break);
        assert!(state.is_paused);
        assert_eq!(state.time_left_ms, DEFAULT_BREAK_MS);
    }

    #[tokio::test]
    async fn stop_commits_partial_work_and_loads_the_break() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category.clone()).await;
        tick_n(&controller, 10).await;
        controller.stop().await;

        let state = controller.state().await;
        assert!(state.is_break);
        assert!(state.is_paused);
        assert_eq!(state.time_left_ms, DEFAULT_BREAK_MS);

        assert_eq!(total_for(&db, &category).await, 10_000);
        let sessions = db.sessions_for_category(category.id).await.expect("sessions");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_ms(), 10_000);
    }

    #[tokio::test]
    async fn immediate_restart_commits_nothing() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category.clone()).await;
        controller.restart().await;

        let state = controller.state().await;
        assert!(!state.is_break);
        assert!(state.is_paused);
        assert!(!state.is_running);
        assert_eq!(state.time_left_ms, DEFAULT_WORK_MS);
        assert_eq!(state.session_time_spent_ms, 0);
        assert_eq!(state.active_category_title.as_deref(), Some("Study"));

        assert_eq!(total_for(&db, &category).await, 0);
    }

    #[tokio::test]
    async fn restart_mid_work_commits_the_partial_session() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category.clone()).await;
        tick_n(&controller, 5).await;
        controller.restart().await;

        let state = controller.state().await;
        assert_eq!(state.time_left_ms, DEFAULT_WORK_MS);
        assert!(state.is_paused);
        assert_eq!(state.session_time_spent_ms, 0);
        assert_eq!(total_for(&db, &category).await, 5_000);

        // Resume the reopened session and stop: the new time lands on top.
        controller.toggle_pause_resume().await;
        tick_n(&controller, 3).await;
        controller.stop().await;
        assert_eq!(total_for(&db, &category).await, 8_000);
    }

    #[tokio::test]
    async fn toggle_is_its_own_inverse() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category).await;
        tick_n(&controller, 3).await;
        let before = controller.state().await;

        controller.toggle_pause_resume().await;
        let paused = controller.state().await;
        assert!(paused.is_paused);
        assert!(!paused.is_running);
        // A stale tick while paused must not move the clock.
        assert!(!controller.tick().await);

        controller.toggle_pause_resume().await;
        let resumed = controller.state().await;
        assert!(resumed.is_running);
        assert_eq!(resumed.time_left_ms, before.time_left_ms);
        assert_eq!(resumed.session_time_spent_ms, before.session_time_spent_ms);
    }

    #[tokio::test]
    async fn toggle_while_idle_is_a_noop() {
        let (_dir, _db, controller) = setup().await;

        controller.toggle_pause_resume().await;

        assert_eq!(controller.state().await, TimerState::default());
    }

    #[tokio::test]
    async fn break_stop_and_break_expiry_agree_on_idle() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        // Path A: stop during the break.
        controller.start(category.clone()).await;
        controller.stop().await;
        controller.toggle_pause_resume().await;
        tick_n(&controller, 7).await;
        controller.stop().await;
        let stopped = controller.state().await;

        // Path B: let the break run out.
        controller.start(category).await;
        controller.stop().await;
        controller.toggle_pause_resume().await;
        tick_n(&controller, 300).await;
        let expired = controller.state().await;

        assert_eq!(stopped, TimerState::default());
        assert_eq!(expired, TimerState::default());
    }

    #[tokio::test]
    async fn starting_over_a_running_timer_finalizes_the_prior_session() {
        let (_dir, db, controller) = setup().await;
        let first = study_category(&db).await;
        let second = db
            .create_category("Reading".into(), "#2196F3".into())
            .await
            .expect("category");

        controller.start(first.clone()).await;
        tick_n(&controller, 5).await;
        controller.start(second.clone()).await;
        tick_n(&controller, 7).await;
        controller.stop().await;
        flush(&db).await;

        assert_eq!(total_for(&db, &first).await, 5_000);
        assert_eq!(total_for(&db, &second).await, 7_000);

        // Never two sessions open at once.
        let mut sessions = db.sessions_for_category(first.id).await.expect("sessions");
        sessions.extend(db.sessions_for_category(second.id).await.expect("sessions"));
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| !s.is_open()));
    }

    #[tokio::test]
    async fn stale_ticks_are_ignored_after_cancellation() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;

        controller.start(category).await;
        let stale_epoch = controller.epoch.load(Ordering::SeqCst);
        controller.stop().await;
        let after_stop = controller.state().await;

        assert!(!controller.advance_clock(stale_epoch).await);
        assert_eq!(controller.state().await, after_stop);
    }

    #[tokio::test]
    async fn observers_see_every_transition() {
        let (_dir, db, controller) = setup().await;
        let category = study_category(&db).await;
        let mut states = controller.subscribe();

        controller.start(category).await;
        states.changed().await.expect("changed");
        assert!(states.borrow_and_update().is_running);

        tick_n(&controller, 1).await;
        states.changed().await.expect("changed");
        assert_eq!(
            states.borrow_and_update().time_left_ms,
            DEFAULT_WORK_MS - 1_000
        );
    }
}
