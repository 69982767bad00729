//! Local reminder notifications.
//!
//! The [`Notifier`] trait is the seam to the device scheduler. Its live
//! schedule (not the medicine records) is what cancellation is driven from.

pub mod local;

pub use local::{FiredReminder, LocalScheduler};

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NotificationKind, ReminderTime, Weekday};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification permission not granted")]
    PermissionDenied,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// Payload attached to a scheduled alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub medicine_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl NotificationData {
    pub fn medicine_reminder(medicine_id: Uuid) -> Self {
        Self {
            medicine_id,
            kind: NotificationKind::MedicineReminder,
        }
    }
}

/// A recurring alert to schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub title: String,
    pub body: String,
    pub time: ReminderTime,
    pub days: BTreeSet<Weekday>,
    pub data: NotificationData,
}

/// Entry of the notifier's live schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub token: String,
    pub data: NotificationData,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask for (or report) permission to post notifications.
    async fn request_permission(&self) -> Result<bool, NotificationError>;

    /// Schedule a recurring alert, returning its token.
    async fn schedule(&self, request: ReminderRequest) -> Result<String, NotificationError>;

    /// Cancel one alert. Unknown tokens are ignored.
    async fn cancel(&self, token: &str) -> Result<(), NotificationError>;

    async fn cancel_all(&self) -> Result<(), NotificationError>;

    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError>;

    /// Apply the user's notification toggle. Schedulers without one ignore it.
    fn set_enabled(&self, _enabled: bool) {}
}
