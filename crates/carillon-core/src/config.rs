//! Carillon configuration: scheduler settings and clinic identity.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CarillonError, Result};
use crate::types::{ChannelKind, RuleKind};

/// Root configuration, persisted as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarillonConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub clinic: ClinicIdentity,
}

impl CarillonConfig {
    /// Load config from the default path (~/.carillon/config.toml).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| CarillonError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CarillonError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path, overwriting in full.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CarillonError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Carillon home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".carillon")
    }
}

/// Reminder scheduler settings.
///
/// Owned by the engine; mutated only through its `apply_settings` /
/// `toggle_channel` operations and written back to disk on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Master switch for the poll loop.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "bool_true")]
    pub remind_3_days: bool,
    #[serde(default = "bool_true")]
    pub remind_1_day: bool,
    #[serde(default = "bool_true")]
    pub remind_morning: bool,
    #[serde(default = "bool_true")]
    pub remind_1_hour: bool,
    /// Dispatch window start, `HH:MM`. Unparsable bounds fail open.
    #[serde(default = "default_hours_start")]
    pub business_hours_start: String,
    /// Dispatch window end, `HH:MM`, inclusive.
    #[serde(default = "default_hours_end")]
    pub business_hours_end: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// When off, chat attempts are recorded but not handed to the transport.
    #[serde(default = "bool_true")]
    pub auto_send_whatsapp: bool,
    #[serde(default = "bool_true")]
    pub auto_send_email: bool,
    /// Pause after a successful chat send, to pace the transport.
    #[serde(default = "default_whatsapp_delay")]
    pub whatsapp_delay_secs: u64,
    #[serde(default = "default_email_delay")]
    pub email_delay_secs: u64,
    /// Prepended to phone numbers that carry no country prefix.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    /// When true, dedup keys include the appointment instant, so editing an
    /// appointment's date/time re-arms every rule for it.
    #[serde(default)]
    pub reset_on_reschedule: bool,
}

fn bool_true() -> bool {
    true
}
fn default_hours_start() -> String {
    "09:00".into()
}
fn default_hours_end() -> String {
    "18:00".into()
}
fn default_poll_interval() -> u64 {
    300
}
fn default_whatsapp_delay() -> u64 {
    3
}
fn default_email_delay() -> u64 {
    2
}
fn default_country_code() -> String {
    "1".into()
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            remind_3_days: true,
            remind_1_day: true,
            remind_morning: true,
            remind_1_hour: true,
            business_hours_start: default_hours_start(),
            business_hours_end: default_hours_end(),
            poll_interval_secs: default_poll_interval(),
            auto_send_whatsapp: true,
            auto_send_email: true,
            whatsapp_delay_secs: default_whatsapp_delay(),
            email_delay_secs: default_email_delay(),
            default_country_code: default_country_code(),
            reset_on_reschedule: false,
        }
    }
}

impl SchedulerSettings {
    /// Whether a rule kind is enabled. `Manual` is always allowed — it is
    /// gated by the operator's explicit action, not by a setting.
    pub fn rule_enabled(&self, rule: RuleKind) -> bool {
        match rule {
            RuleKind::ThreeDays => self.remind_3_days,
            RuleKind::OneDay => self.remind_1_day,
            RuleKind::Morning => self.remind_morning,
            RuleKind::OneHour => self.remind_1_hour,
            RuleKind::Manual => true,
        }
    }

    /// The auto-send flag for a channel.
    pub fn auto_send(&self, channel: ChannelKind) -> bool {
        match channel {
            ChannelKind::WhatsApp => self.auto_send_whatsapp,
            ChannelKind::Email => self.auto_send_email,
        }
    }
}

/// Clinic identity fields interpolated into reminder messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicIdentity {
    #[serde(default = "default_clinic_name")]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

fn default_clinic_name() -> String {
    "Carillon Clinic".into()
}

impl Default for ClinicIdentity {
    fn default() -> Self {
        Self {
            name: default_clinic_name(),
            address: String::new(),
            phone: String::new(),
        }
    }
}
