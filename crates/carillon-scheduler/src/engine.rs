//! Reminder engine — the poll loop that ties evaluation, dedup, and
//! dispatch together.
//!
//! One background worker runs the loop; it is the sole mutator of the
//! dedup ledger and the sole writer of the activity log, so there are no
//! concurrent-write races to manage. Manual passes share the timed path's
//! single-flight cycle lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use tokio::sync::{Mutex, RwLock};

use carillon_core::{
    Appointment, AppointmentSource, CarillonConfig, ChannelKind, ClinicIdentity, RuleKind,
    SchedulerSettings,
};
use carillon_core::error::Result;

use crate::activity::{ActivityEntry, ActivityLog, LogStatus};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::hours;
use crate::ledger::{DedupKey, DedupLedger};
use crate::window;

/// Pause before resuming the normal interval after a failed cycle.
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// What one evaluation cycle did.
#[derive(Debug, Default)]
pub struct CycleStats {
    /// Appointments with a parsable instant that were evaluated.
    pub evaluated: usize,
    /// (appointment, rule) pairs newly marked as handled.
    pub dispatched: usize,
    /// True when the business-hours gate skipped the whole cycle.
    pub skipped_gate: bool,
}

/// What one manual pass did.
#[derive(Debug, Default)]
pub struct ManualStats {
    /// Today's reminder-enabled appointments considered.
    pub targeted: usize,
    /// Pairs newly delivered (or already-handled ones are skipped).
    pub delivered: usize,
    pub skipped_gate: bool,
}

/// The reminder scheduler. `Stopped` until [`start`](Self::start) is
/// called; both `start` and `stop` are idempotent.
pub struct ReminderEngine {
    source: Arc<dyn AppointmentSource>,
    dispatcher: Dispatcher,
    ledger: Mutex<DedupLedger>,
    activity: ActivityLog,
    settings: RwLock<SchedulerSettings>,
    clinic: ClinicIdentity,
    config_path: PathBuf,
    running: AtomicBool,
    // Bumped on every start; a stale loop from a previous start/stop pair
    // sees a newer epoch and exits instead of running alongside its
    // replacement.
    epoch: AtomicU64,
    // Timed cycles and manual passes must not overlap.
    cycle_lock: Mutex<()>,
}

impl ReminderEngine {
    pub fn new(
        config: CarillonConfig,
        config_path: impl Into<PathBuf>,
        source: Arc<dyn AppointmentSource>,
        dispatcher: Dispatcher,
        ledger: DedupLedger,
        activity: ActivityLog,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            dispatcher,
            ledger: Mutex::new(ledger),
            activity,
            settings: RwLock::new(config.scheduler),
            clinic: config.clinic,
            config_path: config_path.into(),
            running: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            cycle_lock: Mutex::new(()),
        })
    }

    /// Spawn the poll loop. No-op when already running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.log_system("Reminder system started", LogStatus::Info);
        tracing::info!("⏰ Reminder scheduler started");

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let interval = engine.settings.read().await.poll_interval_secs;
                tokio::time::sleep(Duration::from_secs(interval)).await;
                if !engine.running.load(Ordering::SeqCst)
                    || engine.epoch.load(Ordering::SeqCst) != epoch
                {
                    break;
                }
                if !engine.settings.read().await.enabled {
                    continue;
                }
                match engine.run_cycle().await {
                    Ok(stats) if stats.dispatched > 0 => {
                        tracing::info!(
                            "🔔 Cycle done: {} reminder(s) dispatched across {} appointment(s)",
                            stats.dispatched,
                            stats.evaluated
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        engine.log_system(&format!("Error: {e}"), LogStatus::Error);
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
            tracing::info!("⏰ Reminder scheduler loop exited");
        });
    }

    /// Signal the loop to exit after its current iteration. An in-flight
    /// dispatch (including its pacing delay) always completes. No-op when
    /// already stopped.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.log_system("Reminder system stopped", LogStatus::Info);
            tracing::info!("⏰ Reminder scheduler stopping after current iteration");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One timed evaluation cycle: gate, snapshot, evaluate, dedup,
    /// dispatch, record.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let _cycle = self.cycle_lock.lock().await;
        let settings = self.settings.read().await.clone();
        let now = Local::now().naive_local();

        let mut stats = CycleStats::default();
        if !hours::gate_open(
            now.time(),
            &settings.business_hours_start,
            &settings.business_hours_end,
        ) {
            tracing::debug!("outside business hours, cycle skipped");
            stats.skipped_gate = true;
            return Ok(stats);
        }

        // Loop-level failure: propagate so the caller backs off.
        let appointments = self.source.snapshot().await?;

        for appointment in &appointments {
            // A malformed record skips this appointment only.
            let Some(appointment_at) = appointment.instant() else {
                tracing::debug!(
                    id = appointment.id,
                    date = %appointment.date,
                    "unparsable appointment date, skipped"
                );
                continue;
            };
            stats.evaluated += 1;

            for rule in window::due_rules(&settings, now, appointment_at) {
                let key = dedup_key(appointment, rule, &settings);
                if self.ledger.lock().await.has_sent(&key) {
                    continue;
                }
                let outcome = self.dispatcher.dispatch(appointment, rule, &settings).await;
                self.record_attempts(appointment, &outcome);
                if outcome.delivered() {
                    self.mark_sent(key).await;
                    stats.dispatched += 1;
                }
            }
        }

        Ok(stats)
    }

    /// One manual pass over today's reminder-enabled appointments,
    /// executed immediately. Shares the cycle lock with the timed path and
    /// respects both the business-hours gate and the ledger; dedup runs in
    /// the `manual` namespace so it cannot collide with scheduled rules.
    pub async fn run_now(&self) -> Result<ManualStats> {
        let _cycle = self.cycle_lock.lock().await;
        let settings = self.settings.read().await.clone();
        let now = Local::now().naive_local();

        let mut stats = ManualStats::default();
        if !hours::gate_open(
            now.time(),
            &settings.business_hours_start,
            &settings.business_hours_end,
        ) {
            self.log_system("Manual pass skipped: outside business hours", LogStatus::Info);
            stats.skipped_gate = true;
            return Ok(stats);
        }

        let appointments = self.source.snapshot().await?;
        for appointment in &appointments {
            let Some(appointment_at) = appointment.instant() else {
                continue;
            };
            if appointment_at.date() != now.date() || !appointment.reminders_enabled {
                continue;
            }
            stats.targeted += 1;

            let key = dedup_key(appointment, RuleKind::Manual, &settings);
            if self.ledger.lock().await.has_sent(&key) {
                continue;
            }
            let outcome = self
                .dispatcher
                .dispatch(appointment, RuleKind::Manual, &settings)
                .await;
            self.record_attempts(appointment, &outcome);
            if outcome.delivered() {
                self.mark_sent(key).await;
                stats.delivered += 1;
            }
        }

        Ok(stats)
    }

    /// Replace the settings wholesale and persist them. Guarded by the
    /// cycle lock: a running cycle finishes against its own snapshot and
    /// the change takes effect on the next one.
    pub async fn apply_settings(&self, new: SchedulerSettings) {
        let _cycle = self.cycle_lock.lock().await;
        *self.settings.write().await = new;
        self.persist_settings().await;
    }

    /// Flip one channel's auto-send flag and persist.
    pub async fn toggle_channel(&self, channel: ChannelKind, enabled: bool) {
        let _cycle = self.cycle_lock.lock().await;
        {
            let mut settings = self.settings.write().await;
            match channel {
                ChannelKind::WhatsApp => settings.auto_send_whatsapp = enabled,
                ChannelKind::Email => settings.auto_send_email = enabled,
            }
        }
        self.persist_settings().await;
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> SchedulerSettings {
        self.settings.read().await.clone()
    }

    /// The most recent `limit` activity entries, newest first.
    pub fn snapshot_log(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.tail(limit)
    }

    /// Truncate the activity log (operator action).
    pub fn clear_log(&self) -> Result<()> {
        self.activity.clear()
    }

    /// Write the current settings to the config file. Failures are
    /// reported but never fatal.
    pub async fn persist_settings(&self) {
        let config = CarillonConfig {
            scheduler: self.settings.read().await.clone(),
            clinic: self.clinic.clone(),
        };
        if let Err(e) = config.save_to(&self.config_path) {
            tracing::warn!("⚠️ Failed to save settings: {e}");
            self.log_system(&format!("Failed to save settings: {e}"), LogStatus::Error);
        }
    }

    async fn mark_sent(&self, key: DedupKey) {
        let result = self.ledger.lock().await.mark_sent(key, Local::now());
        if let Err(e) = result {
            // The in-memory mark holds; only durability suffered.
            tracing::warn!("⚠️ Failed to persist dedup ledger: {e}");
            self.log_system(&format!("Failed to persist ledger: {e}"), LogStatus::Error);
        }
    }

    fn record_attempts(&self, appointment: &Appointment, outcome: &DispatchOutcome) {
        for attempt in &outcome.attempts {
            if let Err(e) = self.activity.record(
                &appointment.patient_name,
                &attempt.target,
                &attempt.detail,
                attempt.status.into(),
            ) {
                tracing::warn!("⚠️ Failed to write activity log: {e}");
            }
        }
    }

    fn log_system(&self, description: &str, status: LogStatus) {
        if let Err(e) = self.activity.record("System", "", description, status) {
            tracing::warn!("⚠️ Failed to write activity log: {e}");
        }
    }
}

fn dedup_key(
    appointment: &Appointment,
    rule: RuleKind,
    settings: &SchedulerSettings,
) -> DedupKey {
    if settings.reset_on_reschedule {
        match appointment.instant() {
            Some(at) => DedupKey::pinned(appointment.id, rule, at),
            None => DedupKey::new(appointment.id, rule),
        }
    } else {
        DedupKey::new(appointment.id, rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carillon_core::error::{CarillonError, Result};
    use carillon_core::Notifier;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Mutex as StdMutex;

    struct FixedSource(Vec<Appointment>);

    #[async_trait]
    impl AppointmentSource for FixedSource {
        async fn snapshot(&self) -> Result<Vec<Appointment>> {
            Ok(self.0.clone())
        }
    }

    // Lets a test play the upstream store editing appointments between
    // cycles.
    struct SwappableSource(StdMutex<Vec<Appointment>>);

    #[async_trait]
    impl AppointmentSource for SwappableSource {
        async fn snapshot(&self) -> Result<Vec<Appointment>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl AppointmentSource for FailingSource {
        async fn snapshot(&self) -> Result<Vec<Appointment>> {
            Err(CarillonError::Source("store offline".into()))
        }
    }

    struct CountingNotifier {
        channel: ChannelKind,
        fail: bool,
        sent: StdMutex<Vec<String>>,
    }

    impl CountingNotifier {
        fn new(channel: ChannelKind, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                channel,
                fail,
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn channel(&self) -> ChannelKind {
            self.channel
        }

        async fn send(&self, address: &str, _subject: Option<&str>, _body: &str) -> Result<()> {
            if self.fail {
                return Err(CarillonError::Channel("down".into()));
            }
            self.sent.lock().unwrap().push(address.to_string());
            Ok(())
        }
    }

    fn appointment_in(offset: ChronoDuration) -> Appointment {
        let at = Local::now().naive_local() + offset;
        Appointment {
            id: 1,
            patient_name: "Ada Lovelace".into(),
            procedure: "Checkup".into(),
            phone: "+1 555 0100".into(),
            alt_phone: None,
            email: None,
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M").to_string(),
            reminders_enabled: true,
            email_enabled: true,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    // Unparsable bounds fail open, making tests independent of the wall
    // clock; delays zeroed so cycles return promptly.
    fn open_settings() -> SchedulerSettings {
        SchedulerSettings {
            business_hours_start: String::new(),
            business_hours_end: String::new(),
            whatsapp_delay_secs: 0,
            email_delay_secs: 0,
            ..SchedulerSettings::default()
        }
    }

    struct Harness {
        engine: Arc<ReminderEngine>,
        whatsapp: Arc<CountingNotifier>,
        email: Arc<CountingNotifier>,
        _dir: tempfile::TempDir,
    }

    fn harness(appointments: Vec<Appointment>, settings: SchedulerSettings) -> Harness {
        harness_with(
            Arc::new(FixedSource(appointments)),
            settings,
            false,
            false,
        )
    }

    fn harness_with(
        source: Arc<dyn AppointmentSource>,
        settings: SchedulerSettings,
        whatsapp_fails: bool,
        email_fails: bool,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let whatsapp = CountingNotifier::new(ChannelKind::WhatsApp, whatsapp_fails);
        let email = CountingNotifier::new(ChannelKind::Email, email_fails);
        let dispatcher = Dispatcher::new(
            whatsapp.clone(),
            email.clone(),
            ClinicIdentity::default(),
        );
        let config = CarillonConfig {
            scheduler: settings,
            clinic: ClinicIdentity::default(),
        };
        let engine = ReminderEngine::new(
            config,
            dir.path().join("config.toml"),
            source,
            dispatcher,
            DedupLedger::open(dir.path().join("sent.json")),
            ActivityLog::new(dir.path().join("reminder_log.txt")),
        );
        Harness {
            engine,
            whatsapp,
            email,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn one_day_reminder_end_to_end() {
        // 24h01m out: inside the 1_day window, outside every other rule.
        let h = harness(
            vec![appointment_in(ChronoDuration::minutes(24 * 60 + 1))],
            open_settings(),
        );

        let stats = h.engine.run_cycle().await.unwrap();
        assert_eq!(stats.evaluated, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(h.whatsapp.count(), 1);
        assert_eq!(h.email.count(), 0);

        let log = h.engine.snapshot_log(10);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, "SENT");
        assert!(log[0].description.contains("1 Day"));
    }

    #[tokio::test]
    async fn rerunning_a_cycle_is_idempotent() {
        let h = harness(
            vec![appointment_in(ChronoDuration::hours(24))],
            open_settings(),
        );

        let first = h.engine.run_cycle().await.unwrap();
        assert_eq!(first.dispatched, 1);
        let second = h.engine.run_cycle().await.unwrap();
        assert_eq!(second.dispatched, 0);
        assert_eq!(h.whatsapp.count(), 1);
        assert_eq!(h.engine.snapshot_log(10).len(), 1);
    }

    #[tokio::test]
    async fn one_failing_channel_still_marks_the_pair() {
        let mut apt = appointment_in(ChronoDuration::hours(24));
        apt.email = Some("ada@example.com".into());
        let h = harness_with(
            Arc::new(FixedSource(vec![apt])),
            open_settings(),
            false,
            true,
        );

        let stats = h.engine.run_cycle().await.unwrap();
        assert_eq!(stats.dispatched, 1);

        let log = h.engine.snapshot_log(10);
        assert_eq!(log.len(), 2);
        let statuses: Vec<&str> = log.iter().map(|e| e.status.as_str()).collect();
        assert!(statuses.contains(&"SENT"));
        assert!(statuses.contains(&"FAILED"));

        // Handled: the next cycle does not retry.
        let again = h.engine.run_cycle().await.unwrap();
        assert_eq!(again.dispatched, 0);
    }

    #[tokio::test]
    async fn failed_pair_is_retried_next_cycle() {
        let h = harness_with(
            Arc::new(FixedSource(vec![appointment_in(ChronoDuration::hours(24))])),
            open_settings(),
            true,
            true,
        );

        let first = h.engine.run_cycle().await.unwrap();
        assert_eq!(first.dispatched, 0);
        let second = h.engine.run_cycle().await.unwrap();
        assert_eq!(second.dispatched, 0);
        // Two failed attempts logged, one per cycle.
        assert_eq!(h.engine.snapshot_log(10).len(), 2);
    }

    #[tokio::test]
    async fn closed_gate_skips_the_cycle() {
        let settings = SchedulerSettings {
            // Inverted window: start > end can never contain now.
            business_hours_start: "23:59".into(),
            business_hours_end: "00:00".into(),
            whatsapp_delay_secs: 0,
            email_delay_secs: 0,
            ..SchedulerSettings::default()
        };
        let h = harness(vec![appointment_in(ChronoDuration::hours(24))], settings);

        let stats = h.engine.run_cycle().await.unwrap();
        assert!(stats.skipped_gate);
        assert_eq!(stats.evaluated, 0);
        assert_eq!(h.whatsapp.count(), 0);
    }

    #[tokio::test]
    async fn malformed_appointment_skips_only_itself() {
        let mut bad = appointment_in(ChronoDuration::hours(24));
        bad.id = 2;
        bad.date = "someday".into();
        let good = appointment_in(ChronoDuration::hours(24));
        let h = harness(vec![bad, good], open_settings());

        let stats = h.engine.run_cycle().await.unwrap();
        assert_eq!(stats.evaluated, 1);
        assert_eq!(stats.dispatched, 1);
    }

    #[tokio::test]
    async fn source_failure_propagates_for_backoff() {
        let h = harness_with(Arc::new(FailingSource), open_settings(), false, false);
        assert!(h.engine.run_cycle().await.is_err());
    }

    #[tokio::test]
    async fn manual_pass_targets_today_in_its_own_namespace() {
        // Dated today; the manual path cares about the date, not windows.
        let h = harness(
            vec![appointment_in(ChronoDuration::zero())],
            open_settings(),
        );

        let stats = h.engine.run_now().await.unwrap();
        assert_eq!(stats.targeted, 1);
        assert_eq!(stats.delivered, 1);

        // Manual dedup holds on a second pass.
        let again = h.engine.run_now().await.unwrap();
        assert_eq!(again.targeted, 1);
        assert_eq!(again.delivered, 0);
        assert_eq!(h.whatsapp.count(), 1);
    }

    #[tokio::test]
    async fn manual_pass_ignores_other_days() {
        let h = harness(
            vec![appointment_in(ChronoDuration::hours(48))],
            open_settings(),
        );
        let stats = h.engine.run_now().await.unwrap();
        assert_eq!(stats.targeted, 0);
    }

    #[tokio::test]
    async fn reschedule_rearms_only_when_policy_enabled() {
        let apt = appointment_in(ChronoDuration::hours(24));
        // Moved two hours: still inside the 1_day window, different instant.
        let moved_at = Local::now().naive_local() + ChronoDuration::hours(26);
        let mut moved = apt.clone();
        moved.time = moved_at.format("%H:%M").to_string();
        moved.date = moved_at.format("%Y-%m-%d").to_string();

        // Default policy: the (id, rule) key survives the edit, no resend.
        let source = Arc::new(SwappableSource(StdMutex::new(vec![apt.clone()])));
        let h = harness_with(source.clone(), open_settings(), false, false);
        assert_eq!(h.engine.run_cycle().await.unwrap().dispatched, 1);
        *source.0.lock().unwrap() = vec![moved.clone()];
        assert_eq!(h.engine.run_cycle().await.unwrap().dispatched, 0);

        // Pinned policy: the new instant yields a fresh key and fires.
        let mut settings = open_settings();
        settings.reset_on_reschedule = true;
        let source = Arc::new(SwappableSource(StdMutex::new(vec![apt])));
        let h = harness_with(source.clone(), settings, false, false);
        assert_eq!(h.engine.run_cycle().await.unwrap().dispatched, 1);
        *source.0.lock().unwrap() = vec![moved];
        assert_eq!(h.engine.run_cycle().await.unwrap().dispatched, 1);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let h = harness(Vec::new(), open_settings());
        assert!(!h.engine.is_running());
        h.engine.start();
        h.engine.start();
        assert!(h.engine.is_running());
        h.engine.stop();
        h.engine.stop();
        assert!(!h.engine.is_running());
    }

    #[tokio::test]
    async fn toggle_channel_updates_and_persists_settings() {
        let h = harness(Vec::new(), open_settings());
        h.engine.toggle_channel(ChannelKind::WhatsApp, false).await;
        let settings = h.engine.settings().await;
        assert!(!settings.auto_send_whatsapp);
        assert!(settings.auto_send_email);

        let saved = CarillonConfig::load_from(&h._dir.path().join("config.toml")).unwrap();
        assert!(!saved.scheduler.auto_send_whatsapp);
    }

    #[tokio::test]
    async fn disabled_channel_attempt_marks_pair_as_logged() {
        let mut settings = open_settings();
        settings.auto_send_whatsapp = false;
        let h = harness(vec![appointment_in(ChronoDuration::hours(24))], settings);

        let stats = h.engine.run_cycle().await.unwrap();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(h.whatsapp.count(), 0);
        let log = h.engine.snapshot_log(10);
        assert_eq!(log[0].status, "LOGGED");
    }
}
