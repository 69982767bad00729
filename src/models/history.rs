use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one dose being taken.
///
/// `medicine_name` is a snapshot taken when the dose was logged, so the
/// entry still reads correctly after the medicine is renamed or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub taken_at: DateTime<Utc>,
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
