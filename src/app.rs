use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};

use crate::{
    db::{
        connection::Database,
        models::{Category, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_TITLE},
    },
    scheduler::{BackgroundScheduler, KeepAlivePayload, ScheduleHandle},
    settings::SettingsStore,
    timer::{TimerController, TimerState},
};

/// Composition root: wires user intents to the timer engine and exposes
/// observable state to presentation.
///
/// Everything is constructed here once, at startup, and torn down with the
/// value; nothing lives in a process-wide global.
pub struct App {
    db: Database,
    timer: TimerController,
    settings: Arc<SettingsStore>,
    scheduler: BackgroundScheduler,
    keep_alive: Mutex<Option<ScheduleHandle>>,
    categories_tx: watch::Sender<Vec<Category>>,
}

impl App {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("pomodoro.sqlite3"))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let timer = TimerController::new(db.clone(), settings.clone());

        let categories = db.list_categories().await?;
        let (categories_tx, _) = watch::channel(categories);

        Ok(Self {
            db,
            timer,
            settings,
            scheduler: BackgroundScheduler::new(),
            keep_alive: Mutex::new(None),
            categories_tx,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Receive a fresh [`TimerState`] on every transition and every tick.
    pub fn timer_states(&self) -> watch::Receiver<TimerState> {
        self.timer.subscribe()
    }

    /// Receive the visible category list after every mutation.
    pub fn categories(&self) -> watch::Receiver<Vec<Category>> {
        self.categories_tx.subscribe()
    }

    pub async fn timer_state(&self) -> TimerState {
        self.timer.state().await
    }

    pub async fn start_timer(&self, category: Category) {
        let work_ms = self.settings.timer().work_duration_ms;
        self.timer.start(category.clone()).await;

        // Ask the platform to keep us alive for the full work phase.
        let handle = self.scheduler.schedule(
            Duration::from_millis(work_ms),
            KeepAlivePayload {
                category_id: category.id,
                duration_ms: work_ms,
            },
        );
        if let Some(previous) = self.keep_alive.lock().await.replace(handle) {
            previous.cancel();
        }
    }

    pub async fn toggle_pause_resume(&self) {
        self.timer.toggle_pause_resume().await;
    }

    pub async fn stop_timer(&self) {
        self.timer.stop().await;
        self.drop_keep_alive().await;
    }

    pub async fn restart_timer(&self) {
        self.timer.restart().await;
        self.drop_keep_alive().await;
    }

    /// Create a category with the default title and color.
    pub async fn add_category(&self) -> Result<Category> {
        let category = self
            .db
            .create_category(
                DEFAULT_CATEGORY_TITLE.to_string(),
                DEFAULT_CATEGORY_COLOR.to_string(),
            )
            .await?;
        self.refresh_categories().await?;
        Ok(category)
    }

    pub async fn update_category(&self, category: Category) -> Result<()> {
        self.db.upsert_category(category).await?;
        self.refresh_categories().await
    }

    /// Default removal path: the row is kept so historical sessions stay
    /// valid. Returns the number of rows affected.
    pub async fn delete_category(&self, category: &Category) -> Result<usize> {
        let affected = self.db.soft_delete_category(category.id).await?;
        self.refresh_categories().await?;
        Ok(affected)
    }

    /// Permanent removal; the category's sessions cascade away with it.
    pub async fn delete_category_permanently(&self, category: &Category) -> Result<()> {
        self.db.delete_category(category.id).await?;
        self.refresh_categories().await
    }

    async fn refresh_categories(&self) -> Result<()> {
        let categories = self.db.list_categories().await?;
        self.categories_tx.send_replace(categories);
        Ok(())
    }

    async fn drop_keep_alive(&self) {
        if let Some(handle) = self.keep_alive.lock().await.take() {
            handle.cancel();
        }
    }
}
