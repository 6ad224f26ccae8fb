//! Alarm dispatch: the platform timer contract and an in-process
//! implementation.
//!
//! The scheduler only depends on the [`AlarmDispatcher`] trait. A platform
//! integration is expected to back it with an exact, wake-capable one-shot
//! timer facility that survives process death; [`TokioAlarmDispatcher`] is
//! the in-process stand-in used by the CLI run loop and does not.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::DispatchError;
use crate::reminder::{AlarmRegistration, FiringPayload};

/// One-shot, key-addressed alarm scheduling.
///
/// Contract: arming an existing request key replaces the prior registration
/// (no duplicate firings for one key); a firing delivers the payload exactly
/// once per armed instant; disarming an unknown key is a no-op.
pub trait AlarmDispatcher: Send + Sync {
    fn arm(
        &self,
        registration: &AlarmRegistration,
        payload: FiringPayload,
    ) -> Result<(), DispatchError>;

    fn disarm(&self, request_key: &str) -> Result<(), DispatchError>;
}

/// In-process dispatcher backed by `tokio::time` sleeps.
///
/// Firings are delivered as payloads on the channel returned by [`new`].
/// Must be used from within a tokio runtime. Armed state lives only in this
/// process; a registration armed for a past instant fires immediately.
///
/// [`new`]: TokioAlarmDispatcher::new
pub struct TokioAlarmDispatcher {
    fired_tx: mpsc::UnboundedSender<FiringPayload>,
    armed: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioAlarmDispatcher {
    /// Create a dispatcher and the receiver its firings arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiringPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                fired_tx: tx,
                armed: Mutex::new(HashMap::new()),
            },
            rx,
        )
    }

    /// Number of currently armed registrations.
    pub fn armed_count(&self) -> usize {
        self.armed
            .lock()
            .map(|armed| armed.len())
            .unwrap_or_default()
    }
}

impl AlarmDispatcher for TokioAlarmDispatcher {
    fn arm(
        &self,
        registration: &AlarmRegistration,
        payload: FiringPayload,
    ) -> Result<(), DispatchError> {
        // Take the lock before spawning: a failed arm must arm nothing.
        let mut armed = self.armed.lock().map_err(|_| DispatchError::LockPoisoned)?;

        let delay = (registration.fire_at - Utc::now()).to_std().unwrap_or_default();
        let tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(payload);
        });

        if let Some(previous) = armed.insert(registration.request_key.clone(), handle) {
            previous.abort();
            debug!(key = %registration.request_key, "replaced armed registration");
        } else {
            debug!(
                key = %registration.request_key,
                fire_at = %registration.fire_at,
                "armed registration"
            );
        }
        Ok(())
    }

    fn disarm(&self, request_key: &str) -> Result<(), DispatchError> {
        let mut armed = self.armed.lock().map_err(|_| DispatchError::LockPoisoned)?;
        if let Some(handle) = armed.remove(request_key) {
            handle.abort();
            debug!(key = %request_key, "disarmed registration");
        }
        Ok(())
    }
}
