use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, TimeZone};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{
    NotificationData, NotificationError, Notifier, ReminderRequest, ScheduledNotification,
};
use crate::models::{ReminderTime, Weekday};

/// Capacity of the fired-reminder channel. Slow subscribers lag past this.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A reminder whose time came up, published by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiredReminder {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: NotificationData,
    pub fire_at: DateTime<Local>,
}

/// In-process recurring alert scheduler.
///
/// Holds the live schedule and, once [`spawn_dispatcher`](Self::spawn_dispatcher)
/// is running, publishes every alert that comes due on a broadcast channel.
pub struct LocalScheduler {
    alerts: RwLock<HashMap<String, ReminderRequest>>,
    permission_granted: AtomicBool,
    events: broadcast::Sender<FiredReminder>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            alerts: RwLock::new(HashMap::new()),
            permission_granted: AtomicBool::new(true),
            events,
        }
    }

    /// Grant or revoke permission (mirrors the OS-level toggle).
    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
        tracing::info!(granted, "Notification permission changed");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FiredReminder> {
        self.events.subscribe()
    }

    /// Alerts whose next fire time after `from` is no later than `to`.
    pub fn due_between<Tz: TimeZone>(
        &self,
        from: &DateTime<Tz>,
        to: &DateTime<Tz>,
    ) -> Result<Vec<FiredReminder>, NotificationError> {
        let alerts = self.alerts.read().map_err(|_| NotificationError::LockPoisoned)?;
        let mut due: Vec<FiredReminder> = alerts
            .iter()
            .filter_map(|(token, request)| {
                let next = next_fire_after(request.time, &request.days, from)?;
                (next <= *to).then(|| FiredReminder {
                    token: token.clone(),
                    title: request.title.clone(),
                    body: request.body.clone(),
                    data: request.data.clone(),
                    fire_at: next.with_timezone(&Local),
                })
            })
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.token.cmp(&b.token)));
        Ok(due)
    }

    /// Publish every alert due in `(from, to]`. Returns how many fired.
    pub fn dispatch_due(
        &self,
        from: &DateTime<Local>,
        to: &DateTime<Local>,
    ) -> Result<usize, NotificationError> {
        let due = self.due_between(from, to)?;
        let count = due.len();
        for fired in due {
            tracing::debug!(
                token = %fired.token,
                medicine_id = %fired.data.medicine_id,
                "Reminder fired"
            );
            // No subscribers is fine; the alert is simply not shown.
            let _ = self.events.send(fired);
        }
        Ok(count)
    }

    /// Start the background task that fires alerts every `tick`.
    pub fn spawn_dispatcher(self: &Arc<Self>, tick: Duration) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tracing::info!(tick_secs = tick.as_secs(), "Starting reminder dispatcher");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            let mut last = Local::now();
            loop {
                interval.tick().await;
                let now = Local::now();
                if let Err(e) = scheduler.dispatch_due(&last, &now) {
                    tracing::error!(error = %e, "Reminder dispatch failed");
                }
                last = now;
            }
        })
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Next instant strictly after `now` that falls on one of `days` at `time`,
/// in `now`'s timezone. `None` when `days` is empty.
pub fn next_fire_after<Tz: TimeZone>(
    time: ReminderTime,
    days: &BTreeSet<Weekday>,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    // eight days covers "same weekday, but earlier today"
    (0..=7u64).find_map(|offset| {
        let date = today.checked_add_days(Days::new(offset))?;
        if !days.contains(&Weekday::from(chrono::Datelike::weekday(&date))) {
            return None;
        }
        let candidate = tz
            .from_local_datetime(&date.and_time(time.to_naive_time()))
            .earliest()?;
        (candidate > *now).then_some(candidate)
    })
}

#[async_trait]
impl Notifier for LocalScheduler {
    async fn request_permission(&self) -> Result<bool, NotificationError> {
        Ok(self.permission_granted.load(Ordering::SeqCst))
    }

    async fn schedule(&self, request: ReminderRequest) -> Result<String, NotificationError> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(NotificationError::PermissionDenied);
        }
        if request.days.is_empty() {
            return Err(NotificationError::InvalidSchedule(
                "reminder has no weekdays".into(),
            ));
        }

        let token = Uuid::new_v4().to_string();
        tracing::info!(
            token = %token,
            medicine_id = %request.data.medicine_id,
            time = %request.time,
            days = request.days.len(),
            "Reminder scheduled"
        );
        let mut alerts = self.alerts.write().map_err(|_| NotificationError::LockPoisoned)?;
        alerts.insert(token.clone(), request);
        Ok(token)
    }

    async fn cancel(&self, token: &str) -> Result<(), NotificationError> {
        let mut alerts = self.alerts.write().map_err(|_| NotificationError::LockPoisoned)?;
        if alerts.remove(token).is_some() {
            tracing::info!(token, "Reminder cancelled");
        } else {
            tracing::debug!(token, "Cancel for unknown reminder token ignored");
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), NotificationError> {
        let mut alerts = self.alerts.write().map_err(|_| NotificationError::LockPoisoned)?;
        let count = alerts.len();
        alerts.clear();
        tracing::info!(count, "All reminders cancelled");
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        let alerts = self.alerts.read().map_err(|_| NotificationError::LockPoisoned)?;
        let mut scheduled: Vec<ScheduledNotification> = alerts
            .iter()
            .map(|(token, request)| ScheduledNotification {
                token: token.clone(),
                data: request.data.clone(),
            })
            .collect();
        scheduled.sort_by(|a, b| a.token.cmp(&b.token));
        Ok(scheduled)
    }

    fn set_enabled(&self, enabled: bool) {
        self.set_permission(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

    fn request(medicine_id: Uuid, hour: u8, minute: u8, days: &[Weekday]) -> ReminderRequest {
        ReminderRequest {
            title: "Medicine reminder".into(),
            body: "Time to take Aspirin".into(),
            time: ReminderTime::new(hour, minute).unwrap(),
            days: days.iter().copied().collect(),
            data: NotificationData::medicine_reminder(medicine_id),
        }
    }

    /// 2025-01-06 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_utc()
    }

    // ───────────────────────────────────────
    // next_fire_after tests
    // ───────────────────────────────────────

    #[test]
    fn next_fire_later_same_day() {
        let days: BTreeSet<_> = [Weekday::Monday].into();
        let next = next_fire_after(ReminderTime::new(9, 0).unwrap(), &days, &monday_at(8, 0));
        assert_eq!(next, Some(monday_at(9, 0)));
    }

    #[test]
    fn next_fire_wraps_to_next_week() {
        let days: BTreeSet<_> = [Weekday::Monday].into();
        let next = next_fire_after(ReminderTime::new(9, 0).unwrap(), &days, &monday_at(9, 0));
        assert_eq!(next, Some(monday_at(9, 0) + ChronoDuration::days(7)));
    }

    #[test]
    fn next_fire_skips_unlisted_days() {
        let days: BTreeSet<_> = [Weekday::Thursday, Weekday::Saturday].into();
        let next = next_fire_after(ReminderTime::new(20, 30).unwrap(), &days, &monday_at(12, 0));
        assert_eq!(next, Some(monday_at(20, 30) + ChronoDuration::days(3)));
    }

    #[test]
    fn next_fire_none_without_days() {
        let next = next_fire_after(ReminderTime::new(8, 0).unwrap(), &BTreeSet::new(), &monday_at(7, 0));
        assert!(next.is_none());
    }

    // ───────────────────────────────────────
    // Notifier tests
    // ───────────────────────────────────────

    #[tokio::test]
    async fn schedule_then_list() {
        let scheduler = LocalScheduler::new();
        let med = Uuid::new_v4();
        let token = scheduler
            .schedule(request(med, 8, 0, &[Weekday::Monday]))
            .await
            .unwrap();

        let listed = scheduler.list_scheduled().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].token, token);
        assert_eq!(listed[0].data.medicine_id, med);
    }

    #[tokio::test]
    async fn schedule_denied_without_permission() {
        let scheduler = LocalScheduler::new();
        scheduler.set_permission(false);
        assert!(!scheduler.request_permission().await.unwrap());

        let err = scheduler
            .schedule(request(Uuid::new_v4(), 8, 0, &[Weekday::Monday]))
            .await
            .unwrap_err();
        assert_eq!(err, NotificationError::PermissionDenied);
        assert!(scheduler.list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_rejects_empty_days() {
        let scheduler = LocalScheduler::new();
        let err = scheduler
            .schedule(request(Uuid::new_v4(), 8, 0, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::InvalidSchedule(_)));
    }

    #[tokio::test]
    async fn cancel_removes_only_that_token() {
        let scheduler = LocalScheduler::new();
        let a = scheduler
            .schedule(request(Uuid::new_v4(), 8, 0, &[Weekday::Monday]))
            .await
            .unwrap();
        let b = scheduler
            .schedule(request(Uuid::new_v4(), 9, 0, &[Weekday::Monday]))
            .await
            .unwrap();

        scheduler.cancel(&a).await.unwrap();
        scheduler.cancel("not-a-token").await.unwrap();

        let listed = scheduler.list_scheduled().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].token, b);
    }

    #[tokio::test]
    async fn cancel_all_empties_schedule() {
        let scheduler = LocalScheduler::new();
        for hour in [7, 12, 19] {
            scheduler
                .schedule(request(Uuid::new_v4(), hour, 0, &Weekday::ALL))
                .await
                .unwrap();
        }
        scheduler.cancel_all().await.unwrap();
        assert!(scheduler.list_scheduled().await.unwrap().is_empty());
    }

    // ───────────────────────────────────────
    // dispatch tests
    // ───────────────────────────────────────

    #[tokio::test]
    async fn due_between_picks_alerts_in_window() {
        let scheduler = LocalScheduler::new();
        let med = Uuid::new_v4();
        scheduler
            .schedule(request(med, 9, 0, &[Weekday::Monday]))
            .await
            .unwrap();
        scheduler
            .schedule(request(Uuid::new_v4(), 15, 0, &[Weekday::Monday]))
            .await
            .unwrap();

        let due = scheduler
            .due_between(&monday_at(8, 59), &monday_at(9, 1))
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].data.medicine_id, med);
    }

    #[tokio::test]
    async fn dispatch_publishes_to_subscribers() {
        let scheduler = LocalScheduler::new();
        let mut rx = scheduler.subscribe();
        let med = Uuid::new_v4();
        scheduler
            .schedule(request(med, 10, 30, &Weekday::ALL))
            .await
            .unwrap();

        let from = Local::now();
        let to = from + ChronoDuration::days(1);
        let fired = scheduler.dispatch_due(&from, &to).unwrap();
        assert_eq!(fired, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data.medicine_id, med);
        assert_eq!(event.body, "Time to take Aspirin");
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_is_ok() {
        let scheduler = LocalScheduler::new();
        scheduler
            .schedule(request(Uuid::new_v4(), 10, 30, &Weekday::ALL))
            .await
            .unwrap();
        let from = Local::now();
        let fired = scheduler
            .dispatch_due(&from, &(from + ChronoDuration::days(1)))
            .unwrap();
        assert_eq!(fired, 1);
    }
}
