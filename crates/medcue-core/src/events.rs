//! Delivery transition events.
//!
//! Every state transition in a delivery produces an event; the ordered log
//! ends up in the DeliveryReport, where callers (and tests) can replay what
//! happened and in which order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeliveryEvent {
    /// Preferred language resolved (English on any lookup failure).
    PreferencesRead {
        language: Language,
        at: DateTime<Utc>,
    },
    /// One full playback of the alert cue finished.
    CuePlaybackCompleted { play_count: u32, at: DateTime<Utc> },
    /// The cue asset could not be played; skipped straight to the message.
    CueUnavailable { at: DateTime<Utc> },
    /// Cue playbacks done but the message was still resolving.
    AwaitingMessage { at: DateTime<Utc> },
    /// The spoken message is ready, generated or fallback.
    MessageResolved {
        used_fallback: bool,
        at: DateTime<Utc>,
    },
    /// The resolved message was handed to the speech sink.
    SpeechStarted {
        utterance_id: String,
        at: DateTime<Utc>,
    },
    /// Terminal: resources released, the firing is over.
    DeliveryCompleted { at: DateTime<Utc> },
}

impl DeliveryEvent {
    /// Discriminant name, convenient for ordering assertions.
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryEvent::PreferencesRead { .. } => "preferences_read",
            DeliveryEvent::CuePlaybackCompleted { .. } => "cue_playback_completed",
            DeliveryEvent::CueUnavailable { .. } => "cue_unavailable",
            DeliveryEvent::AwaitingMessage { .. } => "awaiting_message",
            DeliveryEvent::MessageResolved { .. } => "message_resolved",
            DeliveryEvent::SpeechStarted { .. } => "speech_started",
            DeliveryEvent::DeliveryCompleted { .. } => "delivery_completed",
        }
    }
}
