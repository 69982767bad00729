use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::enums::Weekday;
use super::ModelError;

/// Time of day a reminder fires, stored as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ModelError> {
        if hour > 23 || minute > 59 {
            return Err(ModelError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        // hour/minute are range-checked on construction
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for ReminderTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for ReminderTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReminderTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Recurring time-of-day trigger owned by one medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub time: ReminderTime,
    pub days: BTreeSet<Weekday>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_taken: Option<DateTime<Utc>>,
}

impl Reminder {
    /// New active reminder with a fresh id.
    pub fn new(time: ReminderTime, days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            days: days.into_iter().collect(),
            is_active: true,
            last_taken: None,
        }
    }

    /// Reminder firing every day of the week.
    pub fn daily(time: ReminderTime) -> Self {
        Self::new(time, Weekday::ALL)
    }
}

/// A tracked medicine regimen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a medicine: everything but identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

fn default_true() -> bool {
    true
}

impl NewMedicine {
    pub fn into_medicine(self, id: Uuid, now: DateTime<Utc>) -> Medicine {
        Medicine {
            id,
            name: self.name,
            dosage: self.dosage,
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self.notes,
            is_active: self.is_active,
            reminders: self.reminders,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves a field untouched; for the nullable
/// fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub reminders: Option<Vec<Reminder>>,
}

/// A key that is present maps to `Some`, even when its value is null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl MedicineUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge present fields into `medicine`. Timestamps are left to the caller.
    pub fn apply_to(self, medicine: &mut Medicine) {
        if let Some(name) = self.name {
            medicine.name = name;
        }
        if let Some(dosage) = self.dosage {
            medicine.dosage = dosage;
        }
        if let Some(frequency) = self.frequency {
            medicine.frequency = frequency;
        }
        if let Some(start_date) = self.start_date {
            medicine.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            medicine.end_date = end_date;
        }
        if let Some(notes) = self.notes {
            medicine.notes = notes;
        }
        if let Some(is_active) = self.is_active {
            medicine.is_active = is_active;
        }
        if let Some(reminders) = self.reminders {
            medicine.reminders = reminders;
        }
    }
}
