pub mod config;
pub mod medicines;
pub mod models;
pub mod notifications;
pub mod storage;

#[cfg(feature = "desktop")]
pub mod commands;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::medicines::{MedicineError, MedicineService};
use crate::notifications::LocalScheduler;
use crate::storage::SqliteStore;

/// Initialize tracing. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Wires a medicine service to the SQLite store at `path` and a fresh
/// in-process reminder scheduler, then restores the stored notification
/// toggle and reminder schedule.
pub async fn open_service(
    path: &Path,
) -> Result<(MedicineService, Arc<LocalScheduler>), MedicineError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    let store = Arc::new(SqliteStore::open(path)?);
    let scheduler = Arc::new(LocalScheduler::new());
    let service = MedicineService::new(store, scheduler.clone());
    service.restore().await?;
    Ok((service, scheduler))
}

/// [`open_service`] on the platform data directory.
pub async fn open_default_service(
) -> Result<(MedicineService, Arc<LocalScheduler>), MedicineError> {
    open_service(&config::store_path()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppSettings, NewMedicine, Reminder, ReminderTime};
    use crate::notifications::Notifier;
    use chrono::NaiveDate;

    fn ibuprofen(reminders: Vec<Reminder>) -> NewMedicine {
        NewMedicine {
            name: "Ibuprofen".into(),
            dosage: "200mg".into(),
            frequency: "as needed".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: None,
            notes: None,
            is_active: true,
            reminders,
        }
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }

    #[tokio::test]
    async fn open_service_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medtrack.db");

        let added = {
            let (service, _) = open_service(&path).await.unwrap();
            service.add(ibuprofen(Vec::new())).await.unwrap()
        };

        let (reopened, _) = open_service(&path).await.unwrap();
        assert_eq!(reopened.list_all().await.unwrap(), vec![added]);
    }

    #[tokio::test]
    async fn reopen_keeps_notifications_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medtrack.db");

        {
            let (service, _) = open_service(&path).await.unwrap();
            service
                .save_settings(&AppSettings {
                    notifications_enabled: false,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let (service, scheduler) = open_service(&path).await.unwrap();
        assert!(!scheduler.request_permission().await.unwrap());

        let daily = Reminder::daily(ReminderTime::new(9, 0).unwrap());
        service.add(ibuprofen(vec![daily])).await.unwrap();
        assert!(scheduler.list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_reschedules_stored_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medtrack.db");

        let added = {
            let (service, _) = open_service(&path).await.unwrap();
            let daily = Reminder::daily(ReminderTime::new(9, 0).unwrap());
            service.add(ibuprofen(vec![daily])).await.unwrap()
        };

        let (_, scheduler) = open_service(&path).await.unwrap();
        let scheduled = scheduler.list_scheduled().await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].data.medicine_id, added.id);
    }
}
