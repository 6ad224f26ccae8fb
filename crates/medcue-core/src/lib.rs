//! # Medcue Core Library
//!
//! Core reminder-to-delivery pipeline for time-critical medication
//! reminders. A reminder is armed as up to two alarm registrations (the main
//! firing plus a gap-dependent early firing); when a registration fires, the
//! delivery pipeline plays an attention cue while a localized spoken message
//! is generated in the background, then speaks the resolved message exactly
//! once.
//!
//! ## Architecture
//!
//! - **TimeGapPolicy**: pure early-alert timing given the gap between now
//!   and the scheduled instant
//! - **ReminderScheduler**: turns a reminder into armed registrations over
//!   the [`AlarmDispatcher`] contract
//! - **MessageGenerator**: outbound generation call with a deterministic
//!   localized fallback, so resolution never fails
//! - **DeliveryPipeline**: state machine sequencing cue playback, background
//!   resolution, and speech output
//! - **Storage**: SQLite reminder store and TOML configuration
//!
//! UI, account management, and platform timer/audio facilities are external
//! collaborators; this crate only defines their seams.

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod generator;
pub mod orchestrator;
pub mod policy;
pub mod reminder;
pub mod scheduler;
pub mod storage;

pub use dispatcher::{AlarmDispatcher, TokioAlarmDispatcher};
pub use error::{
    ConfigError, CoreError, DeliveryError, DispatchError, GenerationError, PlaybackError,
    SpeechError, StorageError, ValidationError,
};
pub use events::DeliveryEvent;
pub use generator::{
    MessageGenerator, MessageRequest, MessageSource, OfflineMessageSource, ResolvedMessage,
};
pub use orchestrator::{
    on_alarm_fired, AudioCueSink, DeliveryPipeline, DeliveryReport, DeliveryState,
    PreferenceSource, SpeechSink, ALARM_REPEAT_COUNT,
};
pub use policy::{plan_early_alert, EarlyAlert, EARLY_WINDOW_MINUTES, SHORT_DELAY_MINUTES};
pub use reminder::{
    request_key, AlarmKind, AlarmRegistration, FiringPayload, Language, NewReminder, Reminder,
};
pub use scheduler::ReminderScheduler;
pub use storage::{Config, DeliveryConfig, GeneratorConfig, ReminderDb};
