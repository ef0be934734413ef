//! Due-window evaluation — pure time math, no clock access.
//!
//! Windows are deliberately generous (±6h for the day-scale rules) because
//! the evaluator runs on a coarse poll interval and must not miss a rule
//! when the process was briefly stopped.

use chrono::{NaiveDateTime, TimeDelta, Timelike};

use carillon_core::{RuleKind, SchedulerSettings};

/// Whether `rule` is currently due for an appointment at `appointment_at`.
///
/// Past appointments (negative offset) are never due, for any rule.
pub fn is_due(rule: RuleKind, now: NaiveDateTime, appointment_at: NaiveDateTime) -> bool {
    let offset = appointment_at - now;
    if offset < TimeDelta::zero() {
        return false;
    }
    match rule {
        RuleKind::ThreeDays => near_target(offset, TimeDelta::hours(72)),
        RuleKind::OneDay => near_target(offset, TimeDelta::hours(24)),
        RuleKind::Morning => {
            appointment_at.date() == now.date() && (8..=10).contains(&now.hour())
        }
        RuleKind::OneHour => {
            offset >= TimeDelta::minutes(30) && offset <= TimeDelta::minutes(90)
        }
        // Manual sends are operator-triggered, never window-driven.
        RuleKind::Manual => false,
    }
}

// Day-scale rules fire within ±6h of their target offset.
fn near_target(offset: TimeDelta, target: TimeDelta) -> bool {
    (offset - target).abs() <= TimeDelta::hours(6)
}

/// The enabled scheduled rules currently due for an appointment.
pub fn due_rules(
    settings: &SchedulerSettings,
    now: NaiveDateTime,
    appointment_at: NaiveDateTime,
) -> Vec<RuleKind> {
    RuleKind::SCHEDULED
        .into_iter()
        .filter(|rule| settings.rule_enabled(*rule))
        .filter(|rule| is_due(*rule, now, appointment_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(time.parse().unwrap())
    }

    #[test]
    fn past_appointments_are_never_due() {
        let now = dt("2026-08-10", "10:00:00");
        let past = dt("2026-08-10", "09:59:00");
        for rule in RuleKind::SCHEDULED {
            assert!(!is_due(rule, now, past), "{rule} fired for a past instant");
        }
    }

    #[test]
    fn one_hour_boundaries_are_inclusive() {
        let now = dt("2026-08-10", "10:00:00");
        assert!(is_due(RuleKind::OneHour, now, dt("2026-08-10", "10:30:00")));
        assert!(is_due(RuleKind::OneHour, now, dt("2026-08-10", "11:30:00")));
        assert!(!is_due(RuleKind::OneHour, now, dt("2026-08-10", "10:29:00")));
        assert!(!is_due(RuleKind::OneHour, now, dt("2026-08-10", "11:31:00")));
    }

    #[test]
    fn three_days_tolerance_is_six_hours() {
        let now = dt("2026-08-10", "10:00:00");
        // offset 66h: |72 - 66| = 6h, inside.
        assert!(is_due(RuleKind::ThreeDays, now, dt("2026-08-13", "04:00:00")));
        // offset 65h59m: one minute outside.
        assert!(!is_due(RuleKind::ThreeDays, now, dt("2026-08-13", "03:59:00")));
        // offset 78h, upper edge.
        assert!(is_due(RuleKind::ThreeDays, now, dt("2026-08-13", "16:00:00")));
        assert!(!is_due(RuleKind::ThreeDays, now, dt("2026-08-13", "16:01:00")));
    }

    #[test]
    fn one_day_tolerance_is_six_hours() {
        let now = dt("2026-08-10", "10:00:00");
        assert!(is_due(RuleKind::OneDay, now, dt("2026-08-11", "04:00:00")));
        assert!(is_due(RuleKind::OneDay, now, dt("2026-08-11", "16:00:00")));
        assert!(!is_due(RuleKind::OneDay, now, dt("2026-08-11", "16:01:00")));
        // offset 24h01m sits well inside the window.
        assert!(is_due(RuleKind::OneDay, now, dt("2026-08-11", "10:01:00")));
    }

    #[test]
    fn morning_fires_only_today_between_8_and_10() {
        let apt = dt("2026-08-10", "15:00:00");
        assert!(is_due(RuleKind::Morning, dt("2026-08-10", "08:00:00"), apt));
        assert!(is_due(RuleKind::Morning, dt("2026-08-10", "10:59:00"), apt));
        assert!(!is_due(RuleKind::Morning, dt("2026-08-10", "07:59:00"), apt));
        assert!(!is_due(RuleKind::Morning, dt("2026-08-10", "11:00:00"), apt));
        // Tomorrow's appointment is not "today".
        assert!(!is_due(
            RuleKind::Morning,
            dt("2026-08-09", "09:00:00"),
            apt
        ));
    }

    #[test]
    fn manual_never_fires_from_the_window() {
        let now = dt("2026-08-10", "09:00:00");
        assert!(!is_due(RuleKind::Manual, now, dt("2026-08-10", "10:00:00")));
    }

    #[test]
    fn due_rules_respects_enable_flags() {
        let now = dt("2026-08-10", "10:00:00");
        let apt = dt("2026-08-11", "10:01:00"); // 1_day window
        let mut settings = SchedulerSettings::default();
        assert_eq!(due_rules(&settings, now, apt), vec![RuleKind::OneDay]);
        settings.remind_1_day = false;
        assert!(due_rules(&settings, now, apt).is_empty());
    }
}
