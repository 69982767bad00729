use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ADHERENCE_WINDOW_DAYS;
use crate::models::{HistoryEntry, Medicine};

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_medicines: u32,
    pub active_medicines: u32,
    pub total_taken_today: u32,
    /// Whole percent, 0..=100.
    pub adherence_rate: u32,
}

/// Computes statistics as seen at `now`. "Today" is `now`'s calendar date
/// in `now`'s timezone.
pub fn compute_statistics<Tz: TimeZone>(
    medicines: &[Medicine],
    history: &[HistoryEntry],
    now: &DateTime<Tz>,
) -> Statistics {
    let tz = now.timezone();
    let today = now.date_naive();
    let window_start = (now.clone() - Duration::days(ADHERENCE_WINDOW_DAYS)).with_timezone(&Utc);

    let active = medicines.iter().filter(|m| m.is_active).count() as u32;
    let taken_today = history
        .iter()
        .filter(|e| e.taken_at.with_timezone(&tz).date_naive() == today)
        .count() as u32;
    let recent = history
        .iter()
        .filter(|e| e.taken_at > window_start)
        .count() as u32;

    Statistics {
        total_medicines: medicines.len() as u32,
        active_medicines: active,
        total_taken_today: taken_today,
        adherence_rate: adherence_rate(recent, active),
    }
}

/// Doses logged in the window over doses expected (one per active
/// medicine per day), floored and capped at 100.
pub fn adherence_rate(recent_doses: u32, active_medicines: u32) -> u32 {
    if active_medicines == 0 {
        return 0;
    }
    let expected = u64::from(active_medicines) * ADHERENCE_WINDOW_DAYS as u64;
    let rate = u64::from(recent_doses) * 100 / expected;
    rate.min(100) as u32
}
