//! Gap-dependent early-alert timing.
//!
//! Given the gap between now and the main firing, decides whether an early
//! firing happens at all, when it fires, and which minutes-remaining value it
//! announces. The defining property: the spoken message always states the
//! true remaining time, never a rounded constant.

use chrono::{DateTime, Duration, Utc};

/// Standard early-alert lead time in minutes.
pub const EARLY_WINDOW_MINUTES: i64 = 10;

/// When the gap is shorter than the standard window, the early firing is
/// placed this many minutes from now instead.
pub const SHORT_DELAY_MINUTES: i64 = 2;

/// A planned early firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyAlert {
    pub fire_at: DateTime<Utc>,
    /// Literal minutes until the medicine is due, announced to the patient.
    pub minutes_remaining: i64,
}

/// Plan the early firing for a main firing at `scheduled`, as seen from `now`.
///
/// - gap >= 10 min: fire 10 minutes before, announce 10.
/// - 2 < gap < 10 min: fire 2 minutes from now, announce the actual gap.
/// - gap <= 2 min: no early firing.
pub fn plan_early_alert(now: DateTime<Utc>, scheduled: DateTime<Utc>) -> Option<EarlyAlert> {
    let gap_minutes = (scheduled - now).num_minutes();

    if gap_minutes >= EARLY_WINDOW_MINUTES {
        Some(EarlyAlert {
            fire_at: scheduled - Duration::minutes(EARLY_WINDOW_MINUTES),
            minutes_remaining: EARLY_WINDOW_MINUTES,
        })
    } else if gap_minutes > SHORT_DELAY_MINUTES {
        Some(EarlyAlert {
            fire_at: now + Duration::minutes(SHORT_DELAY_MINUTES),
            minutes_remaining: gap_minutes,
        })
    } else {
        None
    }
}
