pub mod medicines;
pub mod state;

pub use state::AppState;

use std::time::Duration;

use tauri::{Emitter, Manager, Runtime};
use tokio::sync::broadcast::error::RecvError;

/// Event name the front end listens on for fired reminders.
pub const REMINDER_EVENT: &str = "reminder-fired";

/// How often the dispatcher checks for due reminders.
const DISPATCH_TICK: Duration = Duration::from_secs(30);

/// Health check IPC command. Verifies the backend is running.
#[tauri::command]
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

/// Installs the managed state, the IPC handlers and the reminder
/// dispatcher on a Tauri builder.
pub fn register<R: Runtime>(builder: tauri::Builder<R>, state: AppState) -> tauri::Builder<R> {
    builder
        .manage(state)
        .setup(|app| {
            start_reminder_forwarding(app.handle().clone());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            health_check,
            medicines::list_medicines,
            medicines::list_active_medicines,
            medicines::get_medicine,
            medicines::add_medicine,
            medicines::update_medicine,
            medicines::delete_medicine,
            medicines::mark_medicine_taken,
            medicines::get_medicine_history,
            medicines::get_statistics,
            medicines::clear_medicine_history,
            medicines::get_settings,
            medicines::save_settings,
            medicines::request_notification_permission,
            medicines::reset_all_data,
        ])
}

/// Runs the dispatcher and re-emits every fired reminder to the webview.
fn start_reminder_forwarding<R: Runtime>(app: tauri::AppHandle<R>) {
    let scheduler = app.state::<AppState>().scheduler.clone();
    let mut rx = scheduler.subscribe();

    tauri::async_runtime::spawn(async move {
        let _dispatcher = scheduler.spawn_dispatcher(DISPATCH_TICK);
        loop {
            match rx.recv().await {
                Ok(fired) => {
                    if let Err(e) = app.emit(REMINDER_EVENT, &fired) {
                        tracing::warn!(error = %e, "Failed to emit reminder event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Reminder forwarding lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
