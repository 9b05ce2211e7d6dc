use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use thiserror::Error;

use crate::services::date_window::{day_range, is_between};

/// Selections are accepted strictly before this hour of the day.
pub const SELECTION_CUTOFF_HOUR: u32 = 11;

/// Why a selection attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotForToday,
    PastCutoff,
}

impl RejectionReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectionReason::NotForToday => "selected menu is not for today",
            RejectionReason::PastCutoff => "cannot select a menu after the cutoff hour",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Every reason a selection was refused, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("menu selection rejected: {}", self.messages().join("; "))]
pub struct SelectionRejected {
    pub reasons: Vec<RejectionReason>,
}

impl SelectionRejected {
    pub fn messages(&self) -> Vec<&'static str> {
        self.reasons.iter().map(|r| r.message()).collect()
    }
}

/// Decides whether a menu prepared at `prepared_for` can be selected at `now`.
///
/// The menu must fall inside today's window and `now` must be before
/// `cutoff_hour`. Both conditions are always evaluated so the caller can
/// report every failure at once.
pub fn check_selection(
    now: NaiveDateTime,
    prepared_for: NaiveDateTime,
    cutoff_hour: u32,
) -> Result<(), SelectionRejected> {
    let (day_start, day_end) = day_range(now);
    let within_today = is_between(&day_start, &prepared_for, &day_end);
    let before_cutoff = now.hour() < cutoff_hour;

    let mut reasons = Vec::new();
    // An unknown ordering counts as "not today".
    if within_today != Some(true) {
        reasons.push(RejectionReason::NotForToday);
    }
    if !before_cutoff {
        reasons.push(RejectionReason::PastCutoff);
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(SelectionRejected { reasons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn today_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_accepts_todays_menu_before_cutoff() {
        let menu = today_at(13, 0);
        assert_eq!(check_selection(today_at(10, 0), menu, SELECTION_CUTOFF_HOUR), Ok(()));
    }

    #[test]
    fn test_rejects_after_cutoff() {
        let menu = today_at(13, 0);
        let err = check_selection(today_at(12, 0), menu, SELECTION_CUTOFF_HOUR).unwrap_err();
        assert_eq!(err.messages(), vec!["cannot select a menu after the cutoff hour"]);
    }

    #[test]
    fn test_cutoff_hour_itself_is_rejected() {
        let menu = today_at(13, 0);
        let err = check_selection(today_at(11, 0), menu, SELECTION_CUTOFF_HOUR).unwrap_err();
        assert_eq!(err.reasons, vec![RejectionReason::PastCutoff]);

        assert!(check_selection(today_at(10, 59), menu, SELECTION_CUTOFF_HOUR).is_ok());
    }

    #[test]
    fn test_rejects_yesterdays_menu() {
        let menu = today_at(13, 0) - Duration::days(1);
        let err = check_selection(today_at(10, 0), menu, SELECTION_CUTOFF_HOUR).unwrap_err();
        assert_eq!(err.messages(), vec!["selected menu is not for today"]);
    }

    #[test]
    fn test_collects_both_reasons_in_order() {
        let menu = today_at(13, 0) - Duration::days(1);
        let err = check_selection(today_at(12, 0), menu, SELECTION_CUTOFF_HOUR).unwrap_err();
        assert_eq!(
            err.reasons,
            vec![RejectionReason::NotForToday, RejectionReason::PastCutoff]
        );
        assert_eq!(
            err.to_string(),
            "menu selection rejected: selected menu is not for today; \
             cannot select a menu after the cutoff hour"
        );
    }

    #[test]
    fn test_configured_cutoff() {
        let menu = today_at(19, 0);
        assert!(check_selection(today_at(16, 30), menu, 17).is_ok());
        assert!(check_selection(today_at(16, 30), menu, SELECTION_CUTOFF_HOUR).is_err());
    }

    #[test]
    fn test_same_inputs_same_answer() {
        let now = today_at(12, 0);
        let menu = today_at(8, 0) + Duration::days(2);
        let first = check_selection(now, menu, SELECTION_CUTOFF_HOUR);
        let second = check_selection(now, menu, SELECTION_CUTOFF_HOUR);
        assert_eq!(first, second);
    }
}
