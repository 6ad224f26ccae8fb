//! Reminder records and the payload carried through an alarm firing.
//!
//! A `Reminder` is a single-shot medication instruction: one absolute
//! scheduled instant inside a bounded active date window. Each reminder can
//! produce at most two alarm firings -- the main firing at the scheduled
//! instant and an optional early firing placed by the gap policy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which of a reminder's two possible firings an alarm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmKind {
    Main,
    Early,
}

impl AlarmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmKind::Main => "main",
            AlarmKind::Early => "early",
        }
    }
}

/// Deterministic request key for one (reminder, kind) pair.
///
/// Re-arming the same key replaces the prior registration, and cancellation
/// reconstructs the key without needing to know what was armed.
pub fn request_key(reminder_id: &str, kind: AlarmKind) -> String {
    format!("{reminder_id}:{}", kind.as_str())
}

/// Spoken-message language, resolved from the stored preference code.
///
/// Unknown or missing codes parse to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ml")]
    Malayalam,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "ml" => Language::Malayalam,
            "hi" => Language::Hindi,
            _ => Language::English,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Malayalam => "ml",
            Language::Hindi => "hi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Malayalam => "Malayalam",
            Language::Hindi => "Hindi",
        }
    }
}

/// A scheduled medication instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub medicine_name: String,
    /// Free-text dosage instruction (e.g. "2 tablets").
    pub dosage: String,
    /// Absolute firing instant, minute precision.
    pub scheduled_time: DateTime<Utc>,
    /// Active window start (inclusive). Open-ended when unset.
    pub start_date: Option<NaiveDate>,
    /// Active window end (inclusive). Open-ended when unset.
    pub end_date: Option<NaiveDate>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Last instant of the active window: end of day on the end date.
    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
    }

    /// Whether the active window has already elapsed at `now`.
    pub fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.window_end().is_some_and(|end| now > end)
    }
}

/// Input for creating a reminder. The store assigns the id and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub medicine_name: String,
    pub dosage: String,
    pub scheduled_time: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewReminder {
    /// Validate the active window: the end date, if present, must not
    /// precede the start date.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.medicine_name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "medicine_name".to_string(),
                message: "medicine name must not be empty".to_string(),
            });
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }
}

/// A derived alarm registration: where and when one firing is armed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRegistration {
    pub reminder_id: String,
    pub kind: AlarmKind,
    pub fire_at: DateTime<Utc>,
    pub request_key: String,
}

impl AlarmRegistration {
    pub fn new(reminder_id: &str, kind: AlarmKind, fire_at: DateTime<Utc>) -> Self {
        Self {
            reminder_id: reminder_id.to_string(),
            kind,
            fire_at,
            request_key: request_key(reminder_id, kind),
        }
    }
}

/// The payload a dispatcher carries from arm time to fire time.
///
/// `minutes_remaining` is the literal count of minutes until the medicine is
/// due, as it must be announced. For the main firing it is always 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringPayload {
    pub reminder_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub kind: AlarmKind,
    pub minutes_remaining: i64,
    pub end_date: Option<NaiveDate>,
}

impl FiringPayload {
    pub fn for_reminder(reminder: &Reminder, kind: AlarmKind, minutes_remaining: i64) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            medicine_name: reminder.medicine_name.clone(),
            dosage: reminder.dosage.clone(),
            kind,
            minutes_remaining,
            end_date: reminder.end_date,
        }
    }

    pub fn is_early(&self) -> bool {
        self.kind == AlarmKind::Early
    }

    /// Utterance id for this firing, same shape as the alarm request key.
    pub fn request_key(&self) -> String {
        request_key(&self.reminder_id, self.kind)
    }
}
