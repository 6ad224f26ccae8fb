//! Delivery orchestration: cue playback, concurrent message resolution,
//! speech output.
//!
//! ## State Transitions
//!
//! ```text
//! ReadingPreferences -> PlayingCue(n) -> [AwaitingMessage] -> Speaking -> Done
//! ```
//!
//! The cue plays on the sequential orchestration context while the message
//! resolves on a background task; the two are intentionally overlapped so the
//! cue's duration doubles as the generation call's perceived timeout budget.
//! Resolution always completes (fallback guarantee), so AwaitingMessage is a
//! bounded wait. Cue failure skips ahead; speech failure is terminal for the
//! firing.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, DeliveryError, PlaybackError, SpeechError};
use crate::events::DeliveryEvent;
use crate::generator::{MessageGenerator, MessageRequest, MessageSource, ResolvedMessage};
use crate::reminder::{FiringPayload, Language};

/// Number of complete cue playbacks before moving on to speech.
pub const ALARM_REPEAT_COUNT: u32 = 2;

/// One complete playback of the alert cue per call. Blocking from the
/// orchestrator's point of view; returning means the playback finished.
pub trait AudioCueSink: Send + Sync {
    fn play_cue(&self) -> Result<(), PlaybackError>;
}

/// Speech output. Returning `Ok` means the utterance was delivered.
pub trait SpeechSink: Send + Sync {
    fn speak(&self, utterance_id: &str, message: &str) -> Result<(), SpeechError>;
}

/// Stored alarm-language lookup. Failures fall back to English.
pub trait PreferenceSource: Send + Sync {
    fn alarm_language(&self) -> Result<String, CoreError>;
}

/// Orchestration states, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    ReadingPreferences,
    PlayingCue(u32),
    AwaitingMessage,
    Speaking,
    Done,
    Error,
}

/// Ephemeral per-firing state, owned exclusively by the pipeline. Never
/// shared between concurrent firings.
#[derive(Debug)]
pub struct DeliveryContext {
    pub payload: FiringPayload,
    pub language: Language,
    pub message: Option<String>,
    pub cue_playbacks: u32,
    pub state: DeliveryState,
    pub events: Vec<DeliveryEvent>,
}

impl DeliveryContext {
    fn new(payload: FiringPayload) -> Self {
        Self {
            payload,
            language: Language::English,
            message: None,
            cue_playbacks: 0,
            state: DeliveryState::ReadingPreferences,
            events: Vec::new(),
        }
    }

    fn push(&mut self, event: DeliveryEvent) {
        self.events.push(event);
    }
}

/// What a completed delivery looked like.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub utterance_id: String,
    pub message: String,
    pub language: Language,
    pub used_fallback: bool,
    pub cue_playbacks: u32,
    pub events: Vec<DeliveryEvent>,
}

/// Owns the collaborator seams for delivery. One pipeline serves many
/// firings; each firing gets its own [`DeliveryContext`].
pub struct DeliveryPipeline {
    messages: Arc<dyn MessageSource>,
    preferences: Arc<dyn PreferenceSource>,
    cue: Arc<dyn AudioCueSink>,
    speech: Arc<dyn SpeechSink>,
    /// Serializes speech output FIFO across concurrent firings of different
    /// reminders (tokio's Mutex hands the lock out in request order).
    speech_queue: Mutex<()>,
}

impl DeliveryPipeline {
    pub fn new(
        messages: Arc<dyn MessageSource>,
        preferences: Arc<dyn PreferenceSource>,
        cue: Arc<dyn AudioCueSink>,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        Self {
            messages,
            preferences,
            cue,
            speech,
            speech_queue: Mutex::new(()),
        }
    }

    /// Run one firing through the full state machine.
    pub async fn deliver(&self, payload: FiringPayload) -> Result<DeliveryReport, DeliveryError> {
        let mut ctx = DeliveryContext::new(payload);
        info!(
            id = %ctx.payload.reminder_id,
            kind = %ctx.payload.kind.as_str(),
            "delivering reminder firing"
        );

        // ReadingPreferences: a single short-circuit read gating prompt language.
        ctx.language = match self.preferences.alarm_language() {
            Ok(code) => Language::from_code(&code),
            Err(e) => {
                warn!(error = %e, "language lookup failed, defaulting to English");
                Language::English
            }
        };
        ctx.push(DeliveryEvent::PreferencesRead {
            language: ctx.language,
            at: Utc::now(),
        });

        // Kick off resolution on the background path before the cue starts.
        let request = MessageRequest::from_payload(&ctx.payload, ctx.language);
        let mut resolution = self.messages.start_resolve(request.clone());

        // PlayingCue: repeat until the cue has completed its playbacks.
        // Cue unavailability skips straight ahead; it never blocks delivery.
        ctx.state = DeliveryState::PlayingCue(0);
        for _ in 0..ALARM_REPEAT_COUNT {
            match self.cue.play_cue() {
                Ok(()) => {
                    ctx.cue_playbacks += 1;
                    ctx.state = DeliveryState::PlayingCue(ctx.cue_playbacks);
                    ctx.push(DeliveryEvent::CuePlaybackCompleted {
                        play_count: ctx.cue_playbacks,
                        at: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "audio cue unavailable, skipping to message");
                    ctx.push(DeliveryEvent::CueUnavailable { at: Utc::now() });
                    break;
                }
            }
        }

        // Leave PlayingCue: speak immediately when the message beat the cue,
        // otherwise keep waiting -- resolution always completes.
        let resolved = match resolution.try_recv() {
            Ok(resolved) => resolved,
            Err(TryRecvError::Empty) => {
                ctx.state = DeliveryState::AwaitingMessage;
                ctx.push(DeliveryEvent::AwaitingMessage { at: Utc::now() });
                match resolution.await {
                    Ok(resolved) => resolved,
                    Err(_) => Self::lost_resolution(&request),
                }
            }
            Err(TryRecvError::Closed) => Self::lost_resolution(&request),
        };
        ctx.message = Some(resolved.text.clone());
        ctx.push(DeliveryEvent::MessageResolved {
            used_fallback: resolved.used_fallback,
            at: Utc::now(),
        });

        // Speaking: FIFO across concurrent firings.
        ctx.state = DeliveryState::Speaking;
        let utterance_id = ctx.payload.request_key();
        {
            let _slot = self.speech_queue.lock().await;
            ctx.push(DeliveryEvent::SpeechStarted {
                utterance_id: utterance_id.clone(),
                at: Utc::now(),
            });
            if let Err(e) = self.speech.speak(&utterance_id, &resolved.text) {
                ctx.state = DeliveryState::Error;
                error!(error = %e, "speech output failed, firing ends");
                return Err(DeliveryError::Speech(e));
            }
        }

        ctx.state = DeliveryState::Done;
        ctx.push(DeliveryEvent::DeliveryCompleted { at: Utc::now() });
        debug!(id = %ctx.payload.reminder_id, "delivery completed");

        Ok(DeliveryReport {
            utterance_id,
            message: resolved.text,
            language: ctx.language,
            used_fallback: resolved.used_fallback,
            cue_playbacks: ctx.cue_playbacks,
            events: ctx.events,
        })
    }

    /// The resolution task was lost; resolve locally. Offline path, cannot fail.
    fn lost_resolution(request: &MessageRequest) -> ResolvedMessage {
        warn!("resolution channel dropped, falling back locally");
        ResolvedMessage {
            text: MessageGenerator::fallback(request),
            used_fallback: true,
        }
    }
}

/// The single entry function any scheduler implementation invokes when an
/// armed alarm fires.
pub async fn on_alarm_fired(
    pipeline: &DeliveryPipeline,
    payload: FiringPayload,
) -> Result<DeliveryReport, DeliveryError> {
    pipeline.deliver(payload).await
}
