//! Medicine domain service: CRUD over medicines, dose logging, history
//! and dashboard statistics.
//!
//! The service owns no state of its own. Every operation reads the stored
//! collection snapshot, modifies it and writes the whole snapshot back.
//! Reminder notifications are best-effort: a failure to schedule or cancel
//! is logged and never undoes a stored change.

pub mod stats;

pub use stats::{adherence_rate, compute_statistics, Statistics};

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::models::{AppSettings, HistoryEntry, Medicine, MedicineUpdate, NewMedicine};
use crate::notifications::{NotificationData, NotificationError, Notifier, ReminderRequest};
use crate::storage::{KeyValueStore, Storage, StorageError};

const MAX_NAME_LEN: usize = 200;
const MAX_DOSAGE_LEN: usize = 100;
const MAX_FREQUENCY_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 1000;

#[derive(Error, Debug)]
pub enum MedicineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub struct MedicineService {
    storage: Storage,
    notifier: Arc<dyn Notifier>,
}

impl MedicineService {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage: Storage::new(store),
            notifier,
        }
    }

    /// All medicines, in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Medicine>, MedicineError> {
        Ok(self.storage.get_medicines().await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Medicine>, MedicineError> {
        let mut medicines = self.storage.get_medicines().await?;
        medicines.retain(|m| m.is_active);
        Ok(medicines)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<Medicine>, MedicineError> {
        let medicines = self.storage.get_medicines().await?;
        Ok(medicines.into_iter().find(|m| m.id == *id))
    }

    /// Stores a new medicine and schedules its active reminders.
    pub async fn add(&self, data: NewMedicine) -> Result<Medicine, MedicineError> {
        let mut medicines = self.storage.get_medicines().await?;

        let id = loop {
            let candidate = Uuid::new_v4();
            if !medicines.iter().any(|m| m.id == candidate) {
                break candidate;
            }
        };
        let medicine = data.into_medicine(id, Utc::now());
        validate_medicine(&medicine)?;

        medicines.push(medicine.clone());
        self.storage.save_medicines(&medicines).await?;

        tracing::info!(
            medicine_id = %medicine.id,
            reminders = medicine.reminders.len(),
            "Medicine added"
        );

        self.schedule_reminders(&medicine).await;
        Ok(medicine)
    }

    /// Merges `update` into the stored medicine. `None` if `id` is unknown.
    ///
    /// Reminder notifications are not rescheduled.
    pub async fn update(
        &self,
        id: &Uuid,
        update: MedicineUpdate,
    ) -> Result<Option<Medicine>, MedicineError> {
        let mut medicines = self.storage.get_medicines().await?;
        let Some(stored) = medicines.iter_mut().find(|m| m.id == *id) else {
            tracing::debug!(medicine_id = %id, "Update for unknown medicine ignored");
            return Ok(None);
        };

        let mut merged = stored.clone();
        update.apply_to(&mut merged);
        validate_medicine(&merged)?;
        merged.updated_at = next_timestamp(stored.updated_at);
        *stored = merged.clone();

        self.storage.save_medicines(&medicines).await?;
        tracing::info!(medicine_id = %id, "Medicine updated");
        Ok(Some(merged))
    }

    /// Removes a medicine and cancels its scheduled reminders.
    /// History entries are kept. Returns `false` if `id` is unknown.
    pub async fn delete(&self, id: &Uuid) -> Result<bool, MedicineError> {
        let mut medicines = self.storage.get_medicines().await?;
        let before = medicines.len();
        medicines.retain(|m| m.id != *id);
        if medicines.len() == before {
            return Ok(false);
        }

        self.storage.save_medicines(&medicines).await?;
        let cancelled = self.cancel_reminders(id).await;
        tracing::info!(medicine_id = %id, cancelled, "Medicine deleted");
        Ok(true)
    }

    /// Logs a dose and stamps `last_taken` on every reminder of the medicine.
    /// `None` (and nothing written) if the medicine is unknown.
    ///
    /// The history entry is committed before the reminders are stamped. If
    /// stamping fails the error is returned and the dose stays recorded.
    pub async fn mark_as_taken(
        &self,
        medicine_id: &Uuid,
        dosage: &str,
        notes: Option<String>,
    ) -> Result<Option<HistoryEntry>, MedicineError> {
        let mut history = self.storage.get_history().await?;
        let medicines = self.storage.get_medicines().await?;
        let Some(medicine) = medicines.iter().find(|m| m.id == *medicine_id) else {
            tracing::debug!(medicine_id = %medicine_id, "Dose for unknown medicine ignored");
            return Ok(None);
        };

        let now = Utc::now();
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            medicine_id: medicine.id,
            medicine_name: medicine.name.clone(),
            taken_at: now,
            dosage: dosage.to_string(),
            notes,
        };
        history.push(entry.clone());
        self.storage.save_history(&history).await?;

        let reminders: Vec<_> = medicine
            .reminders
            .iter()
            .cloned()
            .map(|mut r| {
                r.last_taken = Some(now);
                r
            })
            .collect();
        self.update(
            medicine_id,
            MedicineUpdate {
                reminders: Some(reminders),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(medicine_id = %medicine_id, "Dose recorded");
        Ok(Some(entry))
    }

    /// Dose history, newest first. Restricted to one medicine when given.
    pub async fn history(
        &self,
        medicine_id: Option<&Uuid>,
    ) -> Result<Vec<HistoryEntry>, MedicineError> {
        let mut history = self.storage.get_history().await?;
        if let Some(id) = medicine_id {
            history.retain(|e| e.medicine_id == *id);
        }
        history.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(history)
    }

    pub async fn statistics(&self) -> Result<Statistics, MedicineError> {
        let medicines = self.storage.get_medicines().await?;
        let history = self.storage.get_history().await?;
        Ok(compute_statistics(&medicines, &history, &Local::now()))
    }

    /// Bulk clear of the dose history. Returns the number of entries removed.
    pub async fn clear_history(&self) -> Result<usize, MedicineError> {
        let removed = self.storage.get_history().await?.len();
        self.storage.save_history(&[]).await?;
        tracing::info!(removed, "Dose history cleared");
        Ok(removed)
    }

    pub async fn settings(&self) -> Result<AppSettings, MedicineError> {
        Ok(self.storage.get_settings().await?)
    }

    /// Stores the settings and applies the notification toggle.
    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), MedicineError> {
        self.storage.save_settings(settings).await?;
        self.notifier.set_enabled(settings.notifications_enabled);
        Ok(())
    }

    /// Brings a fresh notifier in line with the stored state: applies the
    /// saved notification toggle and, when enabled, schedules the active
    /// reminders of every stored medicine. Returns how many were scheduled.
    ///
    /// Call once at startup; calling it again schedules duplicates.
    pub async fn restore(&self) -> Result<usize, MedicineError> {
        let settings = self.storage.get_settings().await?;
        self.notifier.set_enabled(settings.notifications_enabled);
        if !settings.notifications_enabled {
            tracing::info!("Notifications disabled, no reminders restored");
            return Ok(0);
        }

        let mut scheduled = 0;
        for medicine in self.storage.get_medicines().await? {
            scheduled += self.schedule_reminders(&medicine).await;
        }
        tracing::info!(scheduled, "Reminders restored");
        Ok(scheduled)
    }

    pub async fn request_notification_permission(&self) -> Result<bool, MedicineError> {
        Ok(self.notifier.request_permission().await?)
    }

    /// Wipes every stored record and all scheduled reminders.
    pub async fn reset(&self) -> Result<(), MedicineError> {
        self.storage.clear_all().await?;
        if let Err(e) = self.notifier.cancel_all().await {
            tracing::warn!(error = %e, "Failed to cancel reminders during reset");
        }
        Ok(())
    }

    /// Schedules every active reminder. Returns how many were accepted.
    async fn schedule_reminders(&self, medicine: &Medicine) -> usize {
        let mut scheduled = 0;
        for reminder in medicine.reminders.iter().filter(|r| r.is_active) {
            let request = ReminderRequest {
                title: config::REMINDER_TITLE.to_string(),
                body: config::reminder_body(&medicine.name),
                time: reminder.time,
                days: reminder.days.clone(),
                data: NotificationData::medicine_reminder(medicine.id),
            };
            match self.notifier.schedule(request).await {
                Ok(token) => {
                    tracing::debug!(
                        medicine_id = %medicine.id,
                        reminder_id = %reminder.id,
                        token = %token,
                        "Reminder notification scheduled"
                    );
                    scheduled += 1;
                }
                Err(e) => tracing::warn!(
                    medicine_id = %medicine.id,
                    reminder_id = %reminder.id,
                    error = %e,
                    "Could not schedule reminder notification"
                ),
            }
        }
        scheduled
    }

    /// Cancels every live notification carrying `medicine_id`.
    async fn cancel_reminders(&self, medicine_id: &Uuid) -> usize {
        let scheduled = match self.notifier.list_scheduled().await {
            Ok(scheduled) => scheduled,
            Err(e) => {
                tracing::warn!(medicine_id = %medicine_id, error = %e, "Could not list reminders");
                return 0;
            }
        };

        let mut cancelled = 0;
        for notification in scheduled
            .iter()
            .filter(|n| n.data.medicine_id == *medicine_id)
        {
            match self.notifier.cancel(&notification.token).await {
                Ok(()) => cancelled += 1,
                Err(e) => tracing::warn!(
                    token = %notification.token,
                    error = %e,
                    "Could not cancel reminder"
                ),
            }
        }
        cancelled
    }
}

/// `updated_at` must strictly increase even if the clock has not moved.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn validate_medicine(medicine: &Medicine) -> Result<(), MedicineError> {
    let invalid = |msg: &str| -> Result<(), MedicineError> {
        Err(MedicineError::Validation(msg.to_string()))
    };

    if medicine.name.trim().is_empty() {
        return invalid("Medicine name is required");
    }
    if medicine.name.trim().chars().count() > MAX_NAME_LEN {
        return invalid("Medicine name is too long (max 200 characters)");
    }
    if medicine.dosage.trim().is_empty() {
        return invalid("Dosage is required");
    }
    if medicine.dosage.trim().chars().count() > MAX_DOSAGE_LEN {
        return invalid("Dosage is too long (max 100 characters)");
    }
    if medicine.frequency.trim().is_empty() {
        return invalid("Frequency is required");
    }
    if medicine.frequency.trim().chars().count() > MAX_FREQUENCY_LEN {
        return invalid("Frequency is too long (max 200 characters)");
    }
    if let Some(ref notes) = medicine.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return invalid("Notes are too long (max 1000 characters)");
        }
    }
    if let Some(end) = medicine.end_date {
        if end < medicine.start_date {
            return invalid("End date cannot be before start date");
        }
    }
    if medicine
        .reminders
        .iter()
        .any(|r| r.is_active && r.days.is_empty())
    {
        return invalid("Active reminder needs at least one day");
    }
    Ok(())
}
