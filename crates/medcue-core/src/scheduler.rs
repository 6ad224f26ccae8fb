//! Converts reminders into armed alarm registrations.
//!
//! A reminder yields zero, one, or two registrations: the main firing at the
//! scheduled instant (rolled forward a day if already past) and an optional
//! early firing placed by the gap policy. Cancellation reconstructs both
//! possible request keys and disarms them unconditionally.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::dispatcher::AlarmDispatcher;
use crate::error::DispatchError;
use crate::policy::plan_early_alert;
use crate::reminder::{request_key, AlarmKind, AlarmRegistration, FiringPayload, Reminder};

pub struct ReminderScheduler {
    dispatcher: Arc<dyn AlarmDispatcher>,
}

impl ReminderScheduler {
    pub fn new(dispatcher: Arc<dyn AlarmDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Schedule a reminder's firings relative to the current wall clock.
    pub fn schedule(&self, reminder: &Reminder) -> Result<Vec<AlarmRegistration>, DispatchError> {
        self.schedule_at(reminder, Utc::now())
    }

    /// Schedule a reminder's firings as seen from `now`.
    ///
    /// Returns the registrations that were actually armed. Elapsed windows
    /// and disabled reminders are skipped silently (logged, non-fatal), and
    /// an early instant that is not in the future is skipped rather than
    /// back-filled.
    pub fn schedule_at(
        &self,
        reminder: &Reminder,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlarmRegistration>, DispatchError> {
        if !reminder.enabled {
            debug!(id = %reminder.id, "skipping disabled reminder");
            return Ok(Vec::new());
        }
        if reminder.window_elapsed(now) {
            warn!(
                id = %reminder.id,
                medicine = %reminder.medicine_name,
                "skipping reminder: end date passed"
            );
            return Ok(Vec::new());
        }

        // First-occurrence rollover: a scheduled instant already in the past
        // fires at the same time of day tomorrow.
        let mut main_fire = reminder.scheduled_time;
        if main_fire <= now {
            main_fire = main_fire + Duration::days(1);
        }

        let mut armed = Vec::with_capacity(2);

        let main = AlarmRegistration::new(&reminder.id, AlarmKind::Main, main_fire);
        self.dispatcher
            .arm(&main, FiringPayload::for_reminder(reminder, AlarmKind::Main, 0))?;
        armed.push(main);

        if let Some(early) = plan_early_alert(now, main_fire) {
            if early.fire_at > now {
                let reg = AlarmRegistration::new(&reminder.id, AlarmKind::Early, early.fire_at);
                self.dispatcher.arm(
                    &reg,
                    FiringPayload::for_reminder(reminder, AlarmKind::Early, early.minutes_remaining),
                )?;
                armed.push(reg);
            } else {
                debug!(id = %reminder.id, "early instant not in the future, skipping");
            }
        } else {
            debug!(id = %reminder.id, "gap too short, no early firing");
        }

        debug!(id = %reminder.id, count = armed.len(), "reminder scheduled");
        Ok(armed)
    }

    /// Cancel both possible firings of a reminder.
    ///
    /// Safe to call whether or not anything is armed; disarming an unknown
    /// key is a no-op.
    pub fn cancel(&self, reminder_id: &str) -> Result<(), DispatchError> {
        for kind in [AlarmKind::Main, AlarmKind::Early] {
            self.dispatcher.disarm(&request_key(reminder_id, kind))?;
        }
        debug!(id = %reminder_id, "reminder cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records arm/disarm calls, keyed like a real timer facility.
    #[derive(Default)]
    struct RecordingDispatcher {
        armed: Mutex<HashMap<String, (AlarmRegistration, FiringPayload)>>,
        disarmed: Mutex<Vec<String>>,
    }

    impl RecordingDispatcher {
        fn armed_map(&self) -> HashMap<String, (AlarmRegistration, FiringPayload)> {
            self.armed.lock().unwrap().clone()
        }

        fn disarmed_keys(&self) -> Vec<String> {
            self.disarmed.lock().unwrap().clone()
        }
    }

    impl AlarmDispatcher for RecordingDispatcher {
        fn arm(
            &self,
            registration: &AlarmRegistration,
            payload: FiringPayload,
        ) -> Result<(), DispatchError> {
            self.armed
                .lock()
                .unwrap()
                .insert(registration.request_key.clone(), (registration.clone(), payload));
            Ok(())
        }

        fn disarm(&self, request_key: &str) -> Result<(), DispatchError> {
            self.armed.lock().unwrap().remove(request_key);
            self.disarmed.lock().unwrap().push(request_key.to_string());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn reminder(id: &str, scheduled: DateTime<Utc>) -> Reminder {
        Reminder {
            id: id.to_string(),
            medicine_name: "Aspirin".to_string(),
            dosage: "100mg".to_string(),
            scheduled_time: scheduled,
            start_date: None,
            end_date: None,
            enabled: true,
            created_at: now(),
        }
    }

    fn scheduler() -> (ReminderScheduler, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        (ReminderScheduler::new(dispatcher.clone()), dispatcher)
    }

    #[test]
    fn due_in_fifteen_minutes_arms_early_at_t_minus_ten() {
        let (scheduler, dispatcher) = scheduler();
        let scheduled = now() + Duration::minutes(15);
        let armed = scheduler.schedule_at(&reminder("r-1", scheduled), now()).unwrap();

        assert_eq!(armed.len(), 2);
        let map = dispatcher.armed_map();
        let (main_reg, main_payload) = &map["r-1:main"];
        assert_eq!(main_reg.fire_at, scheduled);
        assert_eq!(main_payload.minutes_remaining, 0);

        let (early_reg, early_payload) = &map["r-1:early"];
        assert_eq!(early_reg.fire_at, scheduled - Duration::minutes(10));
        assert_eq!(early_payload.minutes_remaining, 10);
    }

    #[test]
    fn due_in_five_minutes_arms_early_two_minutes_out_announcing_five() {
        let (scheduler, dispatcher) = scheduler();
        let scheduled = now() + Duration::minutes(5);
        scheduler.schedule_at(&reminder("r-1", scheduled), now()).unwrap();

        let map = dispatcher.armed_map();
        let (early_reg, early_payload) = &map["r-1:early"];
        assert_eq!(early_reg.fire_at, now() + Duration::minutes(2));
        assert_eq!(early_payload.minutes_remaining, 5);
    }

    #[test]
    fn due_in_one_minute_arms_only_the_main_firing() {
        let (scheduler, dispatcher) = scheduler();
        let scheduled = now() + Duration::minutes(1);
        let armed = scheduler.schedule_at(&reminder("r-1", scheduled), now()).unwrap();

        assert_eq!(armed.len(), 1);
        let map = dispatcher.armed_map();
        assert!(map.contains_key("r-1:main"));
        assert!(!map.contains_key("r-1:early"));
    }

    #[test]
    fn scheduling_twice_replaces_instead_of_duplicating() {
        let (scheduler, dispatcher) = scheduler();
        let r = reminder("r-1", now() + Duration::minutes(30));
        scheduler.schedule_at(&r, now()).unwrap();
        scheduler.schedule_at(&r, now()).unwrap();

        // Exactly one main and one early registration.
        assert_eq!(dispatcher.armed_map().len(), 2);
    }

    #[test]
    fn past_scheduled_time_rolls_over_to_the_next_day() {
        let (scheduler, dispatcher) = scheduler();
        let scheduled = now() - Duration::hours(2);
        scheduler.schedule_at(&reminder("r-1", scheduled), now()).unwrap();

        let map = dispatcher.armed_map();
        let (main_reg, _) = &map["r-1:main"];
        assert_eq!(main_reg.fire_at, scheduled + Duration::days(1));
        // Rolled-over gap is ~22h, so the early firing uses the standard window.
        let (early_reg, early_payload) = &map["r-1:early"];
        assert_eq!(early_reg.fire_at, main_reg.fire_at - Duration::minutes(10));
        assert_eq!(early_payload.minutes_remaining, 10);
    }

    #[test]
    fn elapsed_window_arms_nothing() {
        let (scheduler, dispatcher) = scheduler();
        let mut r = reminder("r-1", now() + Duration::minutes(30));
        r.end_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        let armed = scheduler.schedule_at(&r, now()).unwrap();

        assert!(armed.is_empty());
        assert!(dispatcher.armed_map().is_empty());
    }

    #[test]
    fn disabled_reminder_arms_nothing() {
        let (scheduler, dispatcher) = scheduler();
        let mut r = reminder("r-1", now() + Duration::minutes(30));
        r.enabled = false;
        let armed = scheduler.schedule_at(&r, now()).unwrap();

        assert!(armed.is_empty());
        assert!(dispatcher.armed_map().is_empty());
    }

    #[test]
    fn cancel_disarms_both_kinds() {
        let (scheduler, dispatcher) = scheduler();
        scheduler
            .schedule_at(&reminder("r-1", now() + Duration::minutes(30)), now())
            .unwrap();
        scheduler.cancel("r-1").unwrap();

        assert!(dispatcher.armed_map().is_empty());
        assert_eq!(dispatcher.disarmed_keys(), vec!["r-1:main", "r-1:early"]);
    }

    #[test]
    fn cancel_is_safe_when_nothing_is_armed() {
        let (scheduler, dispatcher) = scheduler();
        assert!(scheduler.cancel("never-scheduled").is_ok());
        assert_eq!(
            dispatcher.disarmed_keys(),
            vec!["never-scheduled:main", "never-scheduled:early"]
        );
    }

    #[test]
    fn payload_carries_reminder_identity_and_end_date() {
        let (scheduler, dispatcher) = scheduler();
        let mut r = reminder("r-1", now() + Duration::minutes(30));
        r.end_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        scheduler.schedule_at(&r, now()).unwrap();

        let map = dispatcher.armed_map();
        let (_, payload) = &map["r-1:main"];
        assert_eq!(payload.reminder_id, "r-1");
        assert_eq!(payload.medicine_name, "Aspirin");
        assert_eq!(payload.dosage, "100mg");
        assert_eq!(payload.end_date, NaiveDate::from_ymd_opt(2026, 4, 1));
    }
}
