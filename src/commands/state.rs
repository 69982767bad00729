use std::path::Path;
use std::sync::Arc;

use crate::medicines::{MedicineError, MedicineService};
use crate::notifications::LocalScheduler;

/// Application state managed by Tauri.
/// Holds the medicine service and the reminder scheduler feeding it.
pub struct AppState {
    pub service: Arc<MedicineService>,
    pub scheduler: Arc<LocalScheduler>,
}

impl AppState {
    pub fn new(service: Arc<MedicineService>, scheduler: Arc<LocalScheduler>) -> Self {
        Self { service, scheduler }
    }

    /// State backed by the store file at `path`, with stored reminders
    /// already rescheduled.
    pub async fn open(path: &Path) -> Result<Self, MedicineError> {
        let (service, scheduler) = crate::open_service(path).await?;
        Ok(Self::new(Arc::new(service), scheduler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppSettings;
    use crate::notifications::Notifier;

    #[tokio::test]
    async fn open_creates_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medtrack.db");
        let state = AppState::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(state.service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_and_scheduler_are_wired_together() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(&dir.path().join("medtrack.db")).await.unwrap();
        state
            .service
            .save_settings(&AppSettings {
                notifications_enabled: false,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!state.scheduler.request_permission().await.unwrap());
    }
}
