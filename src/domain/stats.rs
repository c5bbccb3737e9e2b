use crate::domain::cycle::CYCLE_DAYS;
use crate::domain::models::{ChallengeCycle, CycleStatus, DailySummary, RestartEvent};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dates whose summary says the whole routine was finished.
pub fn completed_dates(summaries: &[DailySummary]) -> BTreeSet<NaiveDate> {
    summaries
        .iter()
        .filter(|summary| summary.is_complete)
        .map(|summary| summary.date)
        .collect()
}

/// Consecutive completed days ending at today, or at yesterday when today
/// has not been finished yet. An unfinished today never zeroes the walk on
/// its own.
pub fn current_streak(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if completed.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while completed.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Share of the 7 calendar days ending today that were completed, rounded
/// to a whole percent.
pub fn weekly_completion_pct(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let complete_count = (0..7)
        .filter(|offset| completed.contains(&(today - Duration::days(*offset))))
        .count();
    ((complete_count as f64 / 7.0) * 100.0).round() as u32
}

pub fn total_completed_days(
    completed: &BTreeSet<NaiveDate>,
    window_start: NaiveDate,
    today: NaiveDate,
) -> u32 {
    completed.range(window_start..=today).count() as u32
}

/// Longest run of calendar-consecutive completed dates: a one-day step
/// extends the run, any wider gap restarts it at 1.
pub fn longest_streak_ever(completed: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in completed {
        current = match previous {
            Some(prior) if date - prior == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }
    longest
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    Completed,
    MissedContinued,
    MissedRestarted,
    AssumedMissed,
    Future,
}

/// State of each of the 30 calendar days in a cycle window. Explicit
/// evidence wins first; a day with no verdict yet (today or later) stays
/// `Future`; a past day swallowed by a recorded reset is
/// `MissedRestarted`; any other past day without evidence is
/// `AssumedMissed`.
pub fn day_states(
    window_start: NaiveDate,
    today: NaiveDate,
    summaries: &[DailySummary],
    restarts: &[RestartEvent],
) -> Vec<DayState> {
    (0..CYCLE_DAYS)
        .map(|offset| {
            let date = window_start + Duration::days(i64::from(offset));
            let summary = summaries.iter().find(|summary| summary.date == date);

            if summary.is_some_and(|summary| summary.is_complete) {
                DayState::Completed
            } else if summary.is_some_and(|summary| summary.was_missed) {
                DayState::MissedContinued
            } else if date >= today {
                DayState::Future
            } else if restarts
                .iter()
                .any(|event| event.prior_start_date <= date && date < event.occurred_on)
            {
                DayState::MissedRestarted
            } else {
                DayState::AssumedMissed
            }
        })
        .collect()
}

pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 5 {
        "Rise and grind"
    } else if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleCardStats {
    pub bounded_days: u32,
    pub days_completed: u32,
    pub completion_pct: u32,
}

/// Card numbers for one cycle: how many of its 30 days have elapsed
/// (bounded), how many were completed, and the completion percentage
/// against the full 30.
pub fn cycle_card_stats(
    cycle: &ChallengeCycle,
    today: NaiveDate,
    completed: &BTreeSet<NaiveDate>,
) -> CycleCardStats {
    let window_end = cycle.end_date.unwrap_or(today);
    let elapsed = (window_end - cycle.start_date).num_days().max(0) + 1;
    let bounded_days = elapsed.min(i64::from(CYCLE_DAYS)) as u32;

    let last_counted = cycle.start_date + Duration::days(i64::from(bounded_days) - 1);
    let days_completed = completed.range(cycle.start_date..=last_counted).count() as u32;
    let completion_pct =
        ((f64::from(days_completed) / f64::from(CYCLE_DAYS)) * 100.0).round() as u32;

    CycleCardStats {
        bounded_days,
        days_completed,
        completion_pct,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifetimeStats {
    pub total_cycles: u32,
    pub completed_cycles: u32,
    pub success_rate_pct: u32,
    pub total_completed_days: u32,
    pub longest_streak: u32,
    pub total_resets: u32,
}

pub fn lifetime_stats(
    cycles: &[ChallengeCycle],
    completed: &BTreeSet<NaiveDate>,
) -> LifetimeStats {
    let total_cycles = cycles.len() as u32;
    let completed_cycles = cycles
        .iter()
        .filter(|cycle| cycle.status == CycleStatus::Completed)
        .count() as u32;
    let success_rate_pct = if total_cycles == 0 {
        0
    } else {
        ((f64::from(completed_cycles) / f64::from(total_cycles)) * 100.0).round() as u32
    };

    LifetimeStats {
        total_cycles,
        completed_cycles,
        success_rate_pct,
        total_completed_days: completed.len() as u32,
        longest_streak: longest_streak_ever(completed),
        total_resets: cycles.iter().map(|cycle| cycle.total_resets).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn dates(values: &[&str]) -> BTreeSet<NaiveDate> {
        values.iter().map(|value| date(value)).collect()
    }

    fn summary(value: &str, is_complete: bool, was_missed: bool) -> DailySummary {
        DailySummary {
            date: date(value),
            is_complete,
            was_missed,
        }
    }

    #[test]
    fn streak_counts_backward_over_consecutive_days() {
        let completed = dates(&["2026-03-10", "2026-03-11", "2026-03-12"]);
        assert_eq!(current_streak(&completed, date("2026-03-12")), 3);
    }

    #[test]
    fn streak_survives_an_unfinished_today() {
        let completed = dates(&["2026-03-10", "2026-03-11"]);
        assert_eq!(current_streak(&completed, date("2026-03-12")), 2);
    }

    #[test]
    fn streak_stops_at_the_first_gap() {
        let completed = dates(&["2026-03-08", "2026-03-10", "2026-03-11"]);
        assert_eq!(current_streak(&completed, date("2026-03-11")), 2);
    }

    #[test]
    fn streak_is_zero_without_recent_evidence() {
        let completed = dates(&["2026-03-01"]);
        assert_eq!(current_streak(&completed, date("2026-03-12")), 0);
        assert_eq!(current_streak(&BTreeSet::new(), date("2026-03-12")), 0);
    }

    #[test]
    fn weekly_pct_rounds_three_of_seven_to_43() {
        let completed = dates(&["2026-03-12", "2026-03-10", "2026-03-07"]);
        assert_eq!(weekly_completion_pct(&completed, date("2026-03-12")), 43);
    }

    #[test]
    fn weekly_pct_ignores_days_outside_the_window() {
        let completed = dates(&["2026-03-01", "2026-03-02", "2026-03-03"]);
        assert_eq!(weekly_completion_pct(&completed, date("2026-03-12")), 0);
    }

    #[test]
    fn total_completed_days_is_window_bounded() {
        let completed = dates(&["2026-02-28", "2026-03-01", "2026-03-05", "2026-03-12"]);
        assert_eq!(
            total_completed_days(&completed, date("2026-03-01"), date("2026-03-10")),
            2
        );
    }

    #[test]
    fn longest_streak_resets_on_wide_gaps() {
        let completed = dates(&[
            "2026-01-01",
            "2026-01-02",
            "2026-01-03",
            "2026-01-10",
            "2026-01-11",
        ]);
        assert_eq!(longest_streak_ever(&completed), 3);
        assert_eq!(longest_streak_ever(&BTreeSet::new()), 0);
    }

    #[test]
    fn day_states_follow_evidence_then_time() {
        let window_start = date("2026-03-01");
        let today = date("2026-03-05");
        let summaries = vec![
            summary("2026-03-01", true, false),
            summary("2026-03-02", false, true),
            summary("2026-03-03", false, false),
        ];

        let states = day_states(window_start, today, &summaries, &[]);

        assert_eq!(states.len(), CYCLE_DAYS as usize);
        assert_eq!(states[0], DayState::Completed);
        assert_eq!(states[1], DayState::MissedContinued);
        assert_eq!(states[2], DayState::AssumedMissed);
        assert_eq!(states[3], DayState::AssumedMissed);
        assert_eq!(states[4], DayState::Future);
        assert_eq!(states[29], DayState::Future);
    }

    #[test]
    fn day_states_color_reset_gaps_from_recorded_events() {
        let window_start = date("2026-03-01");
        let today = date("2026-03-20");
        let restarts = vec![RestartEvent {
            id: "rst-1".to_string(),
            cycle_id: "cyc-1".to_string(),
            occurred_on: date("2026-03-06"),
            prior_start_date: date("2026-03-03"),
        }];
        let summaries = vec![summary("2026-03-01", true, false)];

        let states = day_states(window_start, today, &summaries, &restarts);

        assert_eq!(states[0], DayState::Completed);
        assert_eq!(states[1], DayState::AssumedMissed);
        assert_eq!(states[2], DayState::MissedRestarted);
        assert_eq!(states[4], DayState::MissedRestarted);
        assert_eq!(states[5], DayState::AssumedMissed);
    }

    #[test]
    fn greeting_buckets_by_hour() {
        assert_eq!(greeting_for_hour(4), "Rise and grind");
        assert_eq!(greeting_for_hour(5), "Good morning");
        assert_eq!(greeting_for_hour(11), "Good morning");
        assert_eq!(greeting_for_hour(12), "Good afternoon");
        assert_eq!(greeting_for_hour(16), "Good afternoon");
        assert_eq!(greeting_for_hour(17), "Good evening");
        assert_eq!(greeting_for_hour(23), "Good evening");
    }

    #[test]
    fn cycle_card_stats_bound_the_window() {
        let cycle = ChallengeCycle {
            id: "cyc-1".to_string(),
            start_date: date("2026-01-01"),
            total_resets: 1,
            status: CycleStatus::Completed,
            end_date: Some(date("2026-03-01")),
            template_id: None,
            playlist_id: None,
        };
        let completed = dates(&["2026-01-01", "2026-01-02", "2026-02-15"]);

        let stats = cycle_card_stats(&cycle, date("2026-03-10"), &completed);

        assert_eq!(stats.bounded_days, 30);
        assert_eq!(stats.days_completed, 2);
        assert_eq!(stats.completion_pct, 7);
    }

    #[test]
    fn cycle_card_stats_use_today_for_active_cycles() {
        let cycle = ChallengeCycle {
            id: "cyc-2".to_string(),
            start_date: date("2026-03-01"),
            total_resets: 0,
            status: CycleStatus::Active,
            end_date: None,
            template_id: None,
            playlist_id: None,
        };
        let completed = dates(&["2026-03-01", "2026-03-02", "2026-03-03"]);

        let stats = cycle_card_stats(&cycle, date("2026-03-04"), &completed);

        assert_eq!(stats.bounded_days, 4);
        assert_eq!(stats.days_completed, 3);
        assert_eq!(stats.completion_pct, 10);
    }

    #[test]
    fn lifetime_stats_aggregate_across_cycles() {
        let cycles = vec![
            ChallengeCycle {
                id: "cyc-1".to_string(),
                start_date: date("2026-01-01"),
                total_resets: 2,
                status: CycleStatus::Completed,
                end_date: Some(date("2026-01-30")),
                template_id: None,
                playlist_id: None,
            },
            ChallengeCycle {
                id: "cyc-2".to_string(),
                start_date: date("2026-02-01"),
                total_resets: 1,
                status: CycleStatus::Abandoned,
                end_date: Some(date("2026-02-10")),
                template_id: None,
                playlist_id: None,
            },
            ChallengeCycle {
                id: "cyc-3".to_string(),
                start_date: date("2026-03-01"),
                total_resets: 0,
                status: CycleStatus::Active,
                end_date: None,
                template_id: None,
                playlist_id: None,
            },
        ];
        let completed = dates(&["2026-01-01", "2026-01-02", "2026-02-01"]);

        let stats = lifetime_stats(&cycles, &completed);

        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.completed_cycles, 1);
        assert_eq!(stats.success_rate_pct, 33);
        assert_eq!(stats.total_completed_days, 3);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.total_resets, 3);
    }

    #[test]
    fn lifetime_stats_of_nothing_are_zero() {
        let stats = lifetime_stats(&[], &BTreeSet::new());
        assert_eq!(stats.total_cycles, 0);
        assert_eq!(stats.success_rate_pct, 0);
        assert_eq!(stats.longest_streak, 0);
    }

    // Feature: dawnblock, Property 6: k consecutive completed days ending today yield streak k
    proptest! {
        #[test]
        fn property6_streak_matches_consecutive_run(k in 1u32..120u32) {
            let today = date("2026-06-30");
            let completed: BTreeSet<NaiveDate> = (0..k)
                .map(|offset| today - Duration::days(i64::from(offset)))
                .collect();

            prop_assert_eq!(current_streak(&completed, today), k);
        }
    }
}
