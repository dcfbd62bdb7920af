//! End-to-end tests for the application coordinator: intents in, observable
//! state and durable records out.

use pomodoro_core::{App, TimerState, DEFAULT_BREAK_MS, DEFAULT_CATEGORY_TITLE, DEFAULT_WORK_MS};
use tempfile::TempDir;

async fn open_app(dir: &TempDir) -> App {
    App::new(dir.path().join("data")).await.expect("app")
}

#[tokio::test]
async fn starts_fully_idle() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;

    assert_eq!(app.timer_state().await, TimerState::default());
    assert!(app.categories().borrow().is_empty());
}

#[tokio::test]
async fn category_lifecycle_flows_through_the_observable_list() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;
    let categories = app.categories();

    let mut category = app.add_category().await.expect("add");
    assert_eq!(category.title, DEFAULT_CATEGORY_TITLE);
    assert_eq!(categories.borrow().len(), 1);

    category.title = "Thesis".to_string();
    app.update_category(category.clone()).await.expect("update");
    assert_eq!(categories.borrow()[0].title, "Thesis");

    let affected = app.delete_category(&category).await.expect("delete");
    assert_eq!(affected, 1);
    assert!(categories.borrow().is_empty());

    // The row survives the soft delete for historical sessions.
    let stored = app
        .database()
        .get_category(category.id)
        .await
        .expect("get")
        .expect("row");
    assert!(stored.deleted);
}

#[tokio::test]
async fn permanent_delete_removes_the_row() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;

    let category = app.add_category().await.expect("add");
    app.delete_category_permanently(&category)
        .await
        .expect("delete");

    assert!(app
        .database()
        .get_category(category.id)
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn start_and_stop_drive_the_work_break_cycle() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;
    let category = app.add_category().await.expect("add");

    app.start_timer(category.clone()).await;
    let running = app.timer_state().await;
    assert!(running.is_running);
    assert!(!running.is_break);
    assert_eq!(running.time_left_ms, DEFAULT_WORK_MS);
    assert_eq!(
        running.active_category_title.as_deref(),
        Some(DEFAULT_CATEGORY_TITLE)
    );

    app.stop_timer().await;
    let on_break = app.timer_state().await;
    assert!(on_break.is_break);
    assert!(on_break.is_paused);
    assert_eq!(on_break.time_left_ms, DEFAULT_BREAK_MS);

    app.stop_timer().await;
    assert_eq!(app.timer_state().await, TimerState::default());

    // The stop committed the session: it is closed, and its span equals
    // exactly what was credited to the category.
    let sessions = app
        .database()
        .sessions_for_category(category.id)
        .await
        .expect("sessions");
    assert_eq!(sessions.len(), 1);
    let stored = app
        .database()
        .get_category(category.id)
        .await
        .expect("get")
        .expect("row");
    assert_eq!(sessions[0].duration_ms(), stored.total_time_spent_ms);
}

#[tokio::test]
async fn restart_reloads_a_paused_work_phase() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;
    let category = app.add_category().await.expect("add");

    app.start_timer(category).await;
    app.restart_timer().await;

    let state = app.timer_state().await;
    assert!(!state.is_break);
    assert!(state.is_paused);
    assert!(!state.is_running);
    assert_eq!(state.time_left_ms, DEFAULT_WORK_MS);
    assert_eq!(state.session_time_spent_ms, 0);
}

#[tokio::test]
async fn timer_observers_see_the_start_transition() {
    let dir = TempDir::new().expect("temp dir");
    let app = open_app(&dir).await;
    let category = app.add_category().await.expect("add");
    let mut states = app.timer_states();

    app.start_timer(category).await;
    states.changed().await.expect("changed");
    assert!(states.borrow_and_update().is_running);
}
