//! Core data model: appointments, reminder rules, channels, dispatch records.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient appointment, as handed over by the upstream store.
///
/// The engine treats this as a read-only snapshot record: date and time are
/// kept in their stored string form and combined lazily via [`Appointment::instant`],
/// so a malformed record degrades to "never due" instead of failing a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Upstream-assigned id, unique and monotonically increasing.
    pub id: u64,
    pub patient_name: String,
    pub procedure: String,
    /// Primary phone — the chat channel address before normalization.
    pub phone: String,
    #[serde(default)]
    pub alt_phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM`.
    #[serde(default = "default_time")]
    pub time: String,
    /// Chat channel opt-in.
    #[serde(default = "bool_true")]
    pub reminders_enabled: bool,
    /// Email channel opt-in.
    #[serde(default = "bool_true")]
    pub email_enabled: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

fn default_time() -> String {
    "09:00".into()
}

fn bool_true() -> bool {
    true
}

impl Appointment {
    /// Combine `date` and `time` into the appointment instant (local wall clock).
    ///
    /// An unparsable date yields `None`. An unparsable time falls back to
    /// midday rather than dropping the appointment.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        Some(date.and_time(time))
    }
}

/// A reminder lead-time category.
///
/// The four scheduled kinds are evaluated by the poll loop; `Manual` is the
/// operator-triggered kind and deliberately dedups in its own namespace so a
/// manual send never suppresses a scheduled one (or vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    #[serde(rename = "3_days")]
    ThreeDays,
    #[serde(rename = "1_day")]
    OneDay,
    #[serde(rename = "morning")]
    Morning,
    #[serde(rename = "1_hour")]
    OneHour,
    #[serde(rename = "manual")]
    Manual,
}

impl RuleKind {
    /// The kinds the poll loop evaluates, in dispatch order.
    pub const SCHEDULED: [RuleKind; 4] = [
        RuleKind::ThreeDays,
        RuleKind::OneDay,
        RuleKind::Morning,
        RuleKind::OneHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::ThreeDays => "3_days",
            RuleKind::OneDay => "1_day",
            RuleKind::Morning => "morning",
            RuleKind::OneHour => "1_hour",
            RuleKind::Manual => "manual",
        }
    }

    /// Human form used in activity log lines ("3 Days reminder sent ...").
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::ThreeDays => "3 Days",
            RuleKind::OneDay => "1 Day",
            RuleKind::Morning => "Morning",
            RuleKind::OneHour => "1 Hour",
            RuleKind::Manual => "Manual",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    WhatsApp,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::WhatsApp => "whatsapp",
            ChannelKind::Email => "email",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of one channel attempt.
///
/// `Logged` is an attempt suppressed by the channel's auto-send flag: the
/// message was rendered and recorded but not handed to the transport. It
/// counts as handled for dedup purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Sent,
    Logged,
    Failed,
}

impl AttemptStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Sent | AttemptStatus::Logged)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::Sent => "SENT",
            AttemptStatus::Logged => "LOGGED",
            AttemptStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Record of one channel send attempt for one (appointment, rule) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchAttempt {
    pub channel: ChannelKind,
    /// Address the attempt targeted (normalized phone or email).
    pub target: String,
    pub status: AttemptStatus,
    /// Human-readable description or failure reason.
    pub detail: String,
    pub at: DateTime<Local>,
}

impl DispatchAttempt {
    pub fn new(channel: ChannelKind, target: &str, status: AttemptStatus, detail: String) -> Self {
        Self {
            channel,
            target: target.to_string(),
            status,
            detail,
            at: Local::now(),
        }
    }
}
