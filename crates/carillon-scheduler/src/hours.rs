//! Business-hours gate.
//!
//! A closed gate skips the entire dispatch cycle. Unparsable bounds fail
//! open: a broken settings value must never silently stop reminding.

use chrono::{NaiveTime, Timelike};

/// Parse an `HH:MM` time-of-day string.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Whether dispatch is permitted at `now`. Bounds are inclusive on both
/// ends and compared at minute resolution.
pub fn gate_open(now: NaiveTime, start: &str, end: &str) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
        return true;
    };
    let now = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    start <= now && now <= end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert!(!gate_open(t("08:59:00"), "09:00", "18:00"));
        assert!(gate_open(t("09:00:00"), "09:00", "18:00"));
        assert!(gate_open(t("18:00:00"), "09:00", "18:00"));
        assert!(!gate_open(t("18:01:00"), "09:00", "18:00"));
    }

    #[test]
    fn seconds_do_not_push_past_the_end_bound() {
        assert!(gate_open(t("18:00:45"), "09:00", "18:00"));
    }

    #[test]
    fn unparsable_bounds_fail_open() {
        assert!(gate_open(t("03:00:00"), "", "18:00"));
        assert!(gate_open(t("03:00:00"), "09:00", "late"));
        assert!(gate_open(t("03:00:00"), "9 am", "6 pm"));
    }
}
