//! Tauri IPC commands for medicine tracking.
//!
//! Thin wrappers over `MedicineService`; errors cross the IPC boundary
//! as strings.

use tauri::State;
use uuid::Uuid;

use crate::medicines::Statistics;
use crate::models::{AppSettings, HistoryEntry, Medicine, MedicineUpdate, NewMedicine};

use super::state::AppState;

fn parse_medicine_id(medicine_id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(medicine_id).map_err(|e| format!("Invalid medicine ID: {e}"))
}

#[tauri::command]
pub async fn list_medicines(state: State<'_, AppState>) -> Result<Vec<Medicine>, String> {
    state.service.list_all().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn list_active_medicines(
    state: State<'_, AppState>,
) -> Result<Vec<Medicine>, String> {
    state.service.list_active().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_medicine(
    medicine_id: String,
    state: State<'_, AppState>,
) -> Result<Option<Medicine>, String> {
    let id = parse_medicine_id(&medicine_id)?;
    state.service.get(&id).await.map_err(|e| e.to_string())
}

/// Adds a medicine and schedules its active reminders.
#[tauri::command]
pub async fn add_medicine(
    input: NewMedicine,
    state: State<'_, AppState>,
) -> Result<Medicine, String> {
    state.service.add(input).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn update_medicine(
    medicine_id: String,
    update: MedicineUpdate,
    state: State<'_, AppState>,
) -> Result<Option<Medicine>, String> {
    let id = parse_medicine_id(&medicine_id)?;
    state
        .service
        .update(&id, update)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_medicine(
    medicine_id: String,
    state: State<'_, AppState>,
) -> Result<bool, String> {
    let id = parse_medicine_id(&medicine_id)?;
    state.service.delete(&id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn mark_medicine_taken(
    medicine_id: String,
    dosage: String,
    notes: Option<String>,
    state: State<'_, AppState>,
) -> Result<Option<HistoryEntry>, String> {
    let id = parse_medicine_id(&medicine_id)?;
    state
        .service
        .mark_as_taken(&id, &dosage, notes)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_medicine_history(
    medicine_id: Option<String>,
    state: State<'_, AppState>,
) -> Result<Vec<HistoryEntry>, String> {
    let id = medicine_id.as_deref().map(parse_medicine_id).transpose()?;
    state
        .service
        .history(id.as_ref())
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_statistics(state: State<'_, AppState>) -> Result<Statistics, String> {
    state.service.statistics().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn clear_medicine_history(state: State<'_, AppState>) -> Result<usize, String> {
    state.service.clear_history().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<AppSettings, String> {
    state.service.settings().await.map_err(|e| e.to_string())
}

/// Saves settings; the notification toggle takes effect immediately.
#[tauri::command]
pub async fn save_settings(
    settings: AppSettings,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .service
        .save_settings(&settings)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn request_notification_permission(
    state: State<'_, AppState>,
) -> Result<bool, String> {
    state
        .service
        .request_notification_permission()
        .await
        .map_err(|e| e.to_string())
}

/// Clears every stored record and cancels all scheduled reminders.
#[tauri::command]
pub async fn reset_all_data(state: State<'_, AppState>) -> Result<(), String> {
    tracing::info!("Resetting all data");
    state.service.reset().await.map_err(|e| e.to_string())
}
