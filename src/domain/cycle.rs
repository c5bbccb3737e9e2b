use crate::domain::models::{ChallengeCycle, DailySummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CYCLE_DAYS: u32 = 30;

/// 1-indexed day number within the running 30-day challenge, clamped to
/// `[1, CYCLE_DAYS]`. Day 30 is a steady terminal value; nothing advances
/// past it without an explicit restart or archival.
pub fn resolve_cycle_day(start_date: NaiveDate, today: NaiveDate) -> u32 {
    let diff_days = (today - start_date).num_days();
    diff_days.saturating_add(1).clamp(1, i64::from(CYCLE_DAYS)) as u32
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissedDayState {
    Normal,
    AwaitingResolution,
    Restarted,
    Continued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissedDayEvidence {
    pub yesterday_has_completions: bool,
    pub yesterday_summary_complete: bool,
    pub yesterday_acknowledged_missed: bool,
}

/// Gate evaluated on every dashboard load. A gap is only detectable once a
/// full day has elapsed, so day 1 never trips it. A past "continue"
/// acknowledgment counts as resolving evidence; the gap never re-prompts.
pub fn evaluate_missed_day(cycle_day: u32, evidence: MissedDayEvidence) -> MissedDayState {
    if cycle_day <= 1 {
        return MissedDayState::Normal;
    }
    if evidence.yesterday_has_completions
        || evidence.yesterday_summary_complete
        || evidence.yesterday_acknowledged_missed
    {
        MissedDayState::Normal
    } else {
        MissedDayState::AwaitingResolution
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissedDayResolution {
    Restart,
    Continue,
}

/// Restart transition: the cycle rebases onto today and the reset counter
/// advances by exactly one. Status and identity stay untouched.
pub fn restart_cycle(cycle: &ChallengeCycle, today: NaiveDate) -> ChallengeCycle {
    ChallengeCycle {
        start_date: today,
        total_resets: cycle.total_resets + 1,
        ..cycle.clone()
    }
}

/// Continue transition: the gap day is acknowledged as missed and the cycle
/// record itself is left alone.
pub fn continue_acknowledgment(missed_date: NaiveDate) -> DailySummary {
    DailySummary {
        date: missed_date,
        is_complete: false,
        was_missed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CycleStatus;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn sample_cycle() -> ChallengeCycle {
        ChallengeCycle {
            id: "cyc-1".to_string(),
            start_date: date("2026-03-01"),
            total_resets: 3,
            status: CycleStatus::Active,
            end_date: None,
            template_id: None,
            playlist_id: None,
        }
    }

    #[test]
    fn cycle_day_starts_at_one() {
        assert_eq!(resolve_cycle_day(date("2026-03-01"), date("2026-03-01")), 1);
    }

    #[test]
    fn cycle_day_counts_elapsed_days() {
        assert_eq!(resolve_cycle_day(date("2026-03-01"), date("2026-03-05")), 5);
        assert_eq!(resolve_cycle_day(date("2026-03-01"), date("2026-03-30")), 30);
    }

    #[test]
    fn cycle_day_clamps_at_terminal_day() {
        assert_eq!(resolve_cycle_day(date("2026-03-01"), date("2026-04-15")), 30);
    }

    #[test]
    fn cycle_day_clamps_before_start() {
        assert_eq!(resolve_cycle_day(date("2026-03-10"), date("2026-03-01")), 1);
    }

    #[test]
    fn missed_day_gate_is_closed_on_day_one() {
        let state = evaluate_missed_day(1, MissedDayEvidence::default());
        assert_eq!(state, MissedDayState::Normal);
    }

    #[test]
    fn missed_day_gate_opens_without_evidence() {
        let state = evaluate_missed_day(5, MissedDayEvidence::default());
        assert_eq!(state, MissedDayState::AwaitingResolution);
    }

    #[test]
    fn missed_day_gate_accepts_any_evidence() {
        let with_completions = MissedDayEvidence {
            yesterday_has_completions: true,
            ..MissedDayEvidence::default()
        };
        let with_summary = MissedDayEvidence {
            yesterday_summary_complete: true,
            ..MissedDayEvidence::default()
        };
        let with_acknowledgment = MissedDayEvidence {
            yesterday_acknowledged_missed: true,
            ..MissedDayEvidence::default()
        };
        assert_eq!(evaluate_missed_day(9, with_completions), MissedDayState::Normal);
        assert_eq!(evaluate_missed_day(9, with_summary), MissedDayState::Normal);
        assert_eq!(
            evaluate_missed_day(9, with_acknowledgment),
            MissedDayState::Normal
        );
    }

    #[test]
    fn restart_rebases_start_and_increments_resets() {
        let cycle = sample_cycle();
        let today = date("2026-03-14");

        let updated = restart_cycle(&cycle, today);

        assert_eq!(updated.start_date, today);
        assert_eq!(updated.total_resets, cycle.total_resets + 1);
        assert_eq!(updated.id, cycle.id);
        assert_eq!(resolve_cycle_day(updated.start_date, today), 1);
    }

    #[test]
    fn continue_acknowledgment_marks_the_gap_day() {
        let summary = continue_acknowledgment(date("2026-03-13"));
        assert_eq!(summary.date, date("2026-03-13"));
        assert!(!summary.is_complete);
        assert!(summary.was_missed);
        assert!(summary.validate().is_ok());
    }

    // Feature: dawnblock, Property 4: the cycle day never decreases and never leaves [1, 30]
    proptest! {
        #[test]
        fn property4_cycle_day_monotone_and_clamped(
            start_offset in 0i64..400i64,
            step in 0i64..400i64
        ) {
            let start = date("2026-01-01");
            let today = start + chrono::Duration::days(start_offset);
            let later = today + chrono::Duration::days(step);

            let day_now = resolve_cycle_day(start, today);
            let day_later = resolve_cycle_day(start, later);

            prop_assert!(day_now >= 1 && day_now <= CYCLE_DAYS);
            prop_assert!(day_later >= day_now);
        }
    }

    // Feature: dawnblock, Property 5: restart always advances the reset counter by one
    proptest! {
        #[test]
        fn property5_restart_increments_resets_by_one(prior_resets in 0u32..10_000u32) {
            let mut cycle = sample_cycle();
            cycle.total_resets = prior_resets;

            let updated = restart_cycle(&cycle, date("2026-06-01"));

            prop_assert_eq!(updated.total_resets, prior_resets + 1);
            prop_assert_eq!(updated.start_date, date("2026-06-01"));
        }
    }
}
