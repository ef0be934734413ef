//! Channel dispatcher — per-channel send attempts for one due pair.
//!
//! Channels are independent: a failure on one never blocks the other. The
//! pair counts as handled when at least one attempt succeeds, so a patient
//! with one broken address still gets reminded on the other channel and
//! the rule is not retried forever once any channel got through.

use std::sync::Arc;
use std::time::Duration;

use carillon_channels::{address, templates};
use carillon_core::{
    Appointment, AttemptStatus, ChannelKind, ClinicIdentity, DispatchAttempt, Notifier, RuleKind,
    SchedulerSettings,
};

/// Result of dispatching one (appointment, rule) pair.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub attempts: Vec<DispatchAttempt>,
}

impl DispatchOutcome {
    /// At-least-one-success: the pair is handled if any channel got through.
    pub fn delivered(&self) -> bool {
        self.attempts.iter().any(|a| a.status.is_success())
    }
}

/// Orchestrates channel attempts for due reminders.
pub struct Dispatcher {
    whatsapp: Arc<dyn Notifier>,
    email: Arc<dyn Notifier>,
    clinic: ClinicIdentity,
}

impl Dispatcher {
    pub fn new(
        whatsapp: Arc<dyn Notifier>,
        email: Arc<dyn Notifier>,
        clinic: ClinicIdentity,
    ) -> Self {
        Self {
            whatsapp,
            email,
            clinic,
        }
    }

    /// Attempt every eligible channel for a due pair. Delays after
    /// successful sends run inline: the caller processes no further
    /// appointment until this pair (including its pacing) completes.
    pub async fn dispatch(
        &self,
        appointment: &Appointment,
        rule: RuleKind,
        settings: &SchedulerSettings,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if appointment.reminders_enabled {
            let attempt = self.attempt_whatsapp(appointment, rule, settings).await;
            outcome.attempts.push(attempt);
        }

        if appointment.email_enabled {
            // An absent or malformed address excludes the channel for this
            // attempt without recording a failure against the patient.
            if let Some(email) = appointment.email.as_deref() {
                if address::is_valid_email(email) {
                    let attempt = self.attempt_email(email, appointment, rule, settings).await;
                    outcome.attempts.push(attempt);
                }
            }
        }

        outcome
    }

    async fn attempt_whatsapp(
        &self,
        appointment: &Appointment,
        rule: RuleKind,
        settings: &SchedulerSettings,
    ) -> DispatchAttempt {
        let label = rule.label();
        let Some(addr) =
            address::normalize_phone(&appointment.phone, &settings.default_country_code)
        else {
            return DispatchAttempt::new(
                ChannelKind::WhatsApp,
                appointment.phone.trim(),
                AttemptStatus::Failed,
                format!("Invalid phone number for {label} reminder"),
            );
        };

        if !settings.auto_send_whatsapp {
            return DispatchAttempt::new(
                ChannelKind::WhatsApp,
                &addr,
                AttemptStatus::Logged,
                format!("{label} reminder (auto-send disabled)"),
            );
        }

        let body = templates::whatsapp_message(rule, appointment, &self.clinic);
        match self.whatsapp.send(&addr, None, &body).await {
            Ok(()) => {
                let attempt = DispatchAttempt::new(
                    ChannelKind::WhatsApp,
                    &addr,
                    AttemptStatus::Sent,
                    format!("{label} reminder sent via WhatsApp"),
                );
                tokio::time::sleep(Duration::from_secs(settings.whatsapp_delay_secs)).await;
                attempt
            }
            Err(e) => DispatchAttempt::new(
                ChannelKind::WhatsApp,
                &addr,
                AttemptStatus::Failed,
                format!("Failed to send {label} reminder: {e}"),
            ),
        }
    }

    async fn attempt_email(
        &self,
        email: &str,
        appointment: &Appointment,
        rule: RuleKind,
        settings: &SchedulerSettings,
    ) -> DispatchAttempt {
        let label = rule.label();

        if !settings.auto_send_email {
            return DispatchAttempt::new(
                ChannelKind::Email,
                email,
                AttemptStatus::Logged,
                format!("{label} email reminder (auto-send disabled)"),
            );
        }

        let subject = templates::email_subject(rule, appointment, &self.clinic);
        let body = templates::email_body(rule, appointment, &self.clinic);
        match self.email.send(email, Some(&subject), &body).await {
            Ok(()) => {
                let attempt = DispatchAttempt::new(
                    ChannelKind::Email,
                    email,
                    AttemptStatus::Sent,
                    format!("{label} email reminder sent"),
                );
                tokio::time::sleep(Duration::from_secs(settings.email_delay_secs)).await;
                attempt
            }
            Err(e) => DispatchAttempt::new(
                ChannelKind::Email,
                email,
                AttemptStatus::Failed,
                format!("Error sending {label} email: {e}"),
            ),
        }
    }
}
