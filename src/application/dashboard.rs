use crate::application::{default_id_provider, IdProvider, NowProvider};
use crate::domain::cycle::{
    continue_acknowledgment, evaluate_missed_day, resolve_cycle_day, restart_cycle,
    MissedDayEvidence, MissedDayResolution, MissedDayState,
};
use crate::domain::models::{
    Block, ChallengeCycle, DailyCompletion, DailySummary, Playlist, PlaylistVideo, Profile,
    RestartEvent, TimedBlock,
};
use crate::domain::playlists::video_for_day;
use crate::domain::schedule::{block_in_progress, compute_schedule};
use crate::domain::stats::{
    completed_dates, current_streak, day_states, greeting_for_hour, total_completed_days,
    weekly_completion_pct, DayState,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::ledger_cache::{DashboardLedger, LedgerCacheRepository};
use crate::infrastructure::store_client::RoutineStore;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{timeout, Duration as TokioDuration};

const DEFAULT_LOAD_BUDGET_SECS: u64 = 20;
pub(crate) const STREAK_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub greeting: String,
    pub today: NaiveDate,
    pub cycle_day: u32,
    pub total_resets: u32,
    pub schedule: Vec<TimedBlock>,
    pub active_block_index: Option<usize>,
    pub completed_block_ids: Vec<String>,
    pub day_complete: bool,
    pub current_streak: u32,
    pub weekly_completion_pct: u32,
    pub total_completed_days: u32,
    pub day_states: Vec<DayState>,
    pub video_of_day: Option<PlaylistVideo>,
    pub missed_day: MissedDayState,
    pub missed_date: Option<NaiveDate>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardLoadOutcome {
    Ready(DashboardSnapshot),
    NeedsOnboarding,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockToggleOutcome {
    pub completed_block_ids: Vec<String>,
    pub day_complete: bool,
}

pub struct DashboardService<S, L>
where
    S: RoutineStore,
    L: LedgerCacheRepository,
{
    store: Arc<S>,
    ledger_cache: Arc<L>,
    timezone: Tz,
    load_budget: TokioDuration,
    now_provider: NowProvider,
    id_provider: IdProvider,
}

impl<S, L> DashboardService<S, L>
where
    S: RoutineStore,
    L: LedgerCacheRepository,
{
    pub fn new(store: Arc<S>, ledger_cache: Arc<L>, timezone: Tz) -> Self {
        Self {
            store,
            ledger_cache,
            timezone,
            load_budget: TokioDuration::from_secs(DEFAULT_LOAD_BUDGET_SECS),
            now_provider: Arc::new(Utc::now),
            id_provider: default_id_provider(),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn with_id_provider(mut self, id_provider: IdProvider) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn with_load_budget(mut self, load_budget: TokioDuration) -> Self {
        self.load_budget = load_budget;
        self
    }

    fn local_now(&self) -> DateTime<Tz> {
        (self.now_provider)().with_timezone(&self.timezone)
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    pub async fn load(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<DashboardLoadOutcome, InfraError> {
        let today = self.today();
        let gathered = timeout(self.load_budget, self.gather(access_token, user_id, today))
            .await
            .map_err(|_| InfraError::StoreUnavailable("dashboard load timed out".to_string()))??;

        let state = match gathered {
            Gathered::Ready(state) => state,
            Gathered::NeedsOnboarding => return Ok(DashboardLoadOutcome::NeedsOnboarding),
        };

        let ledger = DashboardLedger {
            profile: state.profile.clone(),
            blocks: state.blocks.clone(),
            cycle: state.cycle.clone(),
            summaries: state.summaries.clone(),
            completions: state.completions.clone(),
            restart_events: state.restart_events.clone(),
            cached_at: (self.now_provider)(),
        };
        self.ledger_cache.save(user_id, &ledger)?;

        let snapshot = self.assemble(state, false)?;
        Ok(DashboardLoadOutcome::Ready(snapshot))
    }

    /// Rebuilds a snapshot from the last ledger that loaded successfully.
    /// Day numbers and the schedule clock still follow the current time.
    pub fn last_cached(&self, user_id: &str) -> Result<Option<DashboardSnapshot>, InfraError> {
        let Some(ledger) = self.ledger_cache.load(user_id)? else {
            return Ok(None);
        };

        let state = GatheredState {
            profile: ledger.profile,
            blocks: ledger.blocks,
            cycle: ledger.cycle,
            summaries: ledger.summaries,
            completions: ledger.completions,
            restart_events: ledger.restart_events,
            playlist: None,
        };
        Ok(Some(self.assemble(state, true)?))
    }

    pub async fn resolve_missed_day(
        &self,
        access_token: &str,
        user_id: &str,
        resolution: MissedDayResolution,
    ) -> Result<(), InfraError> {
        let today = self.today();
        let cycle = self
            .store
            .get_active_cycle(access_token, user_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState("no active challenge cycle to resolve".to_string())
            })?;

        match resolution {
            MissedDayResolution::Restart => {
                let event = RestartEvent {
                    id: (self.id_provider)("rst"),
                    cycle_id: cycle.id.clone(),
                    occurred_on: today,
                    prior_start_date: cycle.start_date,
                };
                self.store
                    .insert_restart_event(access_token, user_id, &event)
                    .await?;

                let rebased = restart_cycle(&cycle, today);
                self.store
                    .update_cycle(access_token, user_id, &rebased)
                    .await?;
            }
            MissedDayResolution::Continue => {
                let yesterday = today - Duration::days(1);
                let acknowledged = continue_acknowledgment(yesterday);
                self.store
                    .upsert_summary(access_token, user_id, &acknowledged)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn set_block_complete(
        &self,
        access_token: &str,
        user_id: &str,
        block_id: &str,
        complete: bool,
    ) -> Result<BlockToggleOutcome, InfraError> {
        let today = self.today();
        let blocks = self.store.list_blocks(access_token, user_id).await?;
        if !blocks.iter().any(|block| block.id == block_id) {
            return Err(InfraError::InconsistentState(format!(
                "block {block_id} is not part of the current routine"
            )));
        }

        let completion = DailyCompletion {
            block_id: block_id.to_string(),
            date: today,
        };
        if complete {
            self.store
                .insert_completion(access_token, user_id, &completion)
                .await?;
        } else {
            self.store
                .delete_completion(access_token, user_id, block_id, today)
                .await?;
        }

        let completions = self
            .store
            .list_completions(access_token, user_id, today, today)
            .await?;
        let completed_block_ids: Vec<String> = blocks
            .iter()
            .filter(|block| {
                completions
                    .iter()
                    .any(|entry| entry.block_id == block.id)
            })
            .map(|block| block.id.clone())
            .collect();
        let day_complete = completed_block_ids.len() == blocks.len();

        let summary = DailySummary {
            date: today,
            is_complete: day_complete,
            was_missed: false,
        };
        if let Err(error) = self
            .store
            .upsert_summary(access_token, user_id, &summary)
            .await
        {
            // Roll the completion row back; the summary failure is what gets reported.
            if complete {
                let _ = self
                    .store
                    .delete_completion(access_token, user_id, block_id, today)
                    .await;
            } else {
                let _ = self
                    .store
                    .insert_completion(access_token, user_id, &completion)
                    .await;
            }
            return Err(error);
        }

        Ok(BlockToggleOutcome {
            completed_block_ids,
            day_complete,
        })
    }

    async fn gather(
        &self,
        access_token: &str,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Gathered, InfraError> {
        let Some(profile) = self.store.get_profile(access_token, user_id).await? else {
            return Ok(Gathered::NeedsOnboarding);
        };
        if !profile.onboarding_complete {
            return Ok(Gathered::NeedsOnboarding);
        }

        let blocks = self.store.list_blocks(access_token, user_id).await?;
        if blocks.is_empty() {
            return Ok(Gathered::NeedsOnboarding);
        }

        let Some(cycle) = self.store.get_active_cycle(access_token, user_id).await? else {
            return Ok(Gathered::NeedsOnboarding);
        };

        let since = today - Duration::days(STREAK_LOOKBACK_DAYS);
        let summaries = self
            .store
            .list_summaries(access_token, user_id, since)
            .await?;
        let yesterday = today - Duration::days(1);
        let completions = self
            .store
            .list_completions(access_token, user_id, yesterday, today)
            .await?;
        let restart_events = self.store.list_restart_events(access_token, user_id).await?;

        // Playlist fetch is best effort.
        let playlist = match cycle.playlist_id.as_deref() {
            Some(playlist_id) => self
                .store
                .get_playlist(access_token, playlist_id)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Gathered::Ready(GatheredState {
            profile,
            blocks,
            cycle,
            summaries,
            completions,
            restart_events,
            playlist,
        }))
    }

    fn assemble(
        &self,
        state: GatheredState,
        from_cache: bool,
    ) -> Result<DashboardSnapshot, InfraError> {
        let local_now = self.local_now();
        let today = local_now.date_naive();
        let yesterday = today - Duration::days(1);

        let GatheredState {
            profile,
            blocks,
            cycle,
            summaries,
            completions,
            restart_events,
            playlist,
        } = state;

        let schedule =
            compute_schedule(&profile.arrival_time, &blocks).map_err(InfraError::InvalidTimeFormat)?;
        let now_minutes = i64::from(local_now.hour()) * 60 + i64::from(local_now.minute());
        let active_block_index = block_in_progress(&schedule, now_minutes);

        let completed_block_ids: Vec<String> = blocks
            .iter()
            .filter(|block| {
                completions
                    .iter()
                    .any(|entry| entry.date == today && entry.block_id == block.id)
            })
            .map(|block| block.id.clone())
            .collect();
        let day_complete = summaries
            .iter()
            .any(|summary| summary.date == today && summary.is_complete);

        let cycle_day = resolve_cycle_day(cycle.start_date, today);
        let evidence = MissedDayEvidence {
            yesterday_has_completions: completions.iter().any(|entry| entry.date == yesterday),
            yesterday_summary_complete: summaries
                .iter()
                .any(|summary| summary.date == yesterday && summary.is_complete),
            yesterday_acknowledged_missed: summaries
                .iter()
                .any(|summary| summary.date == yesterday && summary.was_missed),
        };
        let missed_day = evaluate_missed_day(cycle_day, evidence);
        let missed_date = match missed_day {
            MissedDayState::AwaitingResolution => Some(yesterday),
            _ => None,
        };

        let completed = completed_dates(&summaries);
        let video_of_day = playlist
            .as_ref()
            .and_then(|playlist| video_for_day(playlist, cycle_day))
            .cloned();

        Ok(DashboardSnapshot {
            greeting: greeting_for_hour(local_now.hour()).to_string(),
            today,
            cycle_day,
            total_resets: cycle.total_resets,
            schedule,
            active_block_index,
            completed_block_ids,
            day_complete,
            current_streak: current_streak(&completed, today),
            weekly_completion_pct: weekly_completion_pct(&completed, today),
            total_completed_days: total_completed_days(&completed, cycle.start_date, today),
            day_states: day_states(cycle.start_date, today, &summaries, &restart_events),
            video_of_day,
            missed_day,
            missed_date,
            from_cache,
        })
    }
}

struct GatheredState {
    profile: Profile,
    blocks: Vec<Block>,
    cycle: ChallengeCycle,
    summaries: Vec<DailySummary>,
    completions: Vec<DailyCompletion>,
    restart_events: Vec<RestartEvent>,
    playlist: Option<Playlist>,
}

enum Gathered {
    Ready(GatheredState),
    NeedsOnboarding,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BlockCategory, CycleStatus};
    use crate::infrastructure::ledger_cache::InMemoryLedgerCacheRepository;
    use crate::infrastructure::memory_store::InMemoryRoutineStore;
    use std::sync::atomic::Ordering;

    const ACCESS: &str = "token-1";
    const USER: &str = "user-1";

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T08:40:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn timed_block(id: &str, name: &str, category: BlockCategory, minutes: u32, order: u32) -> Block {
        Block {
            id: id.to_string(),
            name: name.to_string(),
            category,
            duration_min: Some(minutes),
            sets: None,
            reps_per_set: None,
            order,
        }
    }

    fn sample_blocks() -> Vec<Block> {
        vec![
            timed_block("blk-1", "Cold Shower", BlockCategory::Hygiene, 30, 0),
            timed_block("blk-2", "Breakfast", BlockCategory::Food, 20, 1),
            Block {
                id: "blk-3".to_string(),
                name: "Push-ups".to_string(),
                category: BlockCategory::Workout,
                duration_min: None,
                sets: Some(5),
                reps_per_set: Some(10),
                order: 2,
            },
        ]
    }

    fn sample_profile() -> Profile {
        Profile {
            arrival_time: "09:00".to_string(),
            onboarding_complete: true,
            updated_at: fixed_now(),
        }
    }

    fn sample_cycle(start: &str) -> ChallengeCycle {
        ChallengeCycle {
            id: "cyc-1".to_string(),
            start_date: date(start),
            total_resets: 0,
            status: CycleStatus::Active,
            end_date: None,
            template_id: None,
            playlist_id: None,
        }
    }

    fn complete_summary(value: &str) -> DailySummary {
        DailySummary {
            date: date(value),
            is_complete: true,
            was_missed: false,
        }
    }

    async fn seed_routine(store: &InMemoryRoutineStore) {
        store
            .save_profile(ACCESS, USER, &sample_profile())
            .await
            .expect("seed profile");
        store
            .replace_blocks(ACCESS, USER, &sample_blocks())
            .await
            .expect("seed blocks");
        store
            .insert_cycle(ACCESS, USER, &sample_cycle("2026-03-06"))
            .await
            .expect("seed cycle");
    }

    async fn seed_recent_history(store: &InMemoryRoutineStore) {
        for day in ["2026-03-07", "2026-03-08", "2026-03-09"] {
            store
                .upsert_summary(ACCESS, USER, &complete_summary(day))
                .await
                .expect("seed summary");
        }
        store
            .insert_completion(
                ACCESS,
                USER,
                &DailyCompletion {
                    block_id: "blk-1".to_string(),
                    date: date("2026-03-10"),
                },
            )
            .await
            .expect("seed completion");
    }

    fn service(
        store: &Arc<InMemoryRoutineStore>,
        cache: &Arc<InMemoryLedgerCacheRepository>,
    ) -> DashboardService<InMemoryRoutineStore, InMemoryLedgerCacheRepository> {
        DashboardService::new(Arc::clone(store), Arc::clone(cache), chrono_tz::UTC)
            .with_now_provider(Arc::new(fixed_now))
            .with_id_provider(Arc::new(|prefix: &str| format!("{prefix}-test")))
    }

    #[tokio::test]
    async fn load_builds_complete_snapshot() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        seed_recent_history(&store).await;

        let outcome = service(&store, &cache)
            .load(ACCESS, USER)
            .await
            .expect("load");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };

        assert_eq!(snapshot.greeting, "Good morning");
        assert_eq!(snapshot.today, date("2026-03-10"));
        assert_eq!(snapshot.cycle_day, 5);
        assert_eq!(snapshot.schedule.len(), 3);
        assert_eq!(snapshot.schedule[0].start_time, "08:00");
        assert_eq!(snapshot.schedule[1].start_time, "08:30");
        assert_eq!(snapshot.schedule[2].start_time, "08:50");
        assert_eq!(snapshot.active_block_index, Some(1));
        assert_eq!(snapshot.completed_block_ids, vec!["blk-1".to_string()]);
        assert!(!snapshot.day_complete);
        assert_eq!(snapshot.current_streak, 3);
        assert_eq!(snapshot.weekly_completion_pct, 43);
        assert_eq!(snapshot.total_completed_days, 3);
        assert_eq!(snapshot.day_states.len(), 30);
        assert_eq!(snapshot.day_states[0], DayState::AssumedMissed);
        assert_eq!(snapshot.day_states[1], DayState::Completed);
        assert_eq!(snapshot.day_states[3], DayState::Completed);
        assert_eq!(snapshot.day_states[4], DayState::Future);
        assert_eq!(snapshot.missed_day, MissedDayState::Normal);
        assert_eq!(snapshot.missed_date, None);
        assert!(snapshot.video_of_day.is_none());
        assert!(!snapshot.from_cache);
    }

    #[tokio::test]
    async fn load_reports_onboarding_needed_without_profile() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());

        let outcome = service(&store, &cache)
            .load(ACCESS, USER)
            .await
            .expect("load");

        assert_eq!(outcome, DashboardLoadOutcome::NeedsOnboarding);
    }

    #[tokio::test]
    async fn load_flags_missed_day_for_resolution() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;

        let outcome = service(&store, &cache)
            .load(ACCESS, USER)
            .await
            .expect("load");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };

        assert_eq!(snapshot.missed_day, MissedDayState::AwaitingResolution);
        assert_eq!(snapshot.missed_date, Some(date("2026-03-09")));
    }

    #[tokio::test]
    async fn restart_resolution_rebases_cycle_and_records_event() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        let service = service(&store, &cache);

        service
            .resolve_missed_day(ACCESS, USER, MissedDayResolution::Restart)
            .await
            .expect("restart");

        let cycle = store
            .get_active_cycle(ACCESS, USER)
            .await
            .expect("read cycle")
            .expect("cycle exists");
        assert_eq!(cycle.start_date, date("2026-03-10"));
        assert_eq!(cycle.total_resets, 1);

        let events = store
            .list_restart_events(ACCESS, USER)
            .await
            .expect("read events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "rst-test");
        assert_eq!(events[0].cycle_id, "cyc-1");
        assert_eq!(events[0].occurred_on, date("2026-03-10"));
        assert_eq!(events[0].prior_start_date, date("2026-03-06"));

        let outcome = service.load(ACCESS, USER).await.expect("load after restart");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };
        assert_eq!(snapshot.cycle_day, 1);
        assert_eq!(snapshot.missed_day, MissedDayState::Normal);
        assert_eq!(snapshot.day_states[0], DayState::Future);
    }

    #[tokio::test]
    async fn continue_resolution_acknowledges_gap_permanently() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        let service = service(&store, &cache);

        service
            .resolve_missed_day(ACCESS, USER, MissedDayResolution::Continue)
            .await
            .expect("continue");

        let summaries = store
            .list_summaries(ACCESS, USER, date("2026-03-01"))
            .await
            .expect("read summaries");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].date, date("2026-03-09"));
        assert!(!summaries[0].is_complete);
        assert!(summaries[0].was_missed);

        let outcome = service.load(ACCESS, USER).await.expect("load after continue");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };
        assert_eq!(snapshot.cycle_day, 5);
        assert_eq!(snapshot.missed_day, MissedDayState::Normal);
        assert_eq!(snapshot.day_states[3], DayState::MissedContinued);
    }

    #[tokio::test]
    async fn marking_final_block_completes_day() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        let service = service(&store, &cache);
        for block_id in ["blk-1", "blk-2"] {
            service
                .set_block_complete(ACCESS, USER, block_id, true)
                .await
                .expect("mark block");
        }

        let outcome = service
            .set_block_complete(ACCESS, USER, "blk-3", true)
            .await
            .expect("mark final block");

        assert!(outcome.day_complete);
        assert_eq!(outcome.completed_block_ids.len(), 3);
        let summaries = store
            .list_summaries(ACCESS, USER, date("2026-03-10"))
            .await
            .expect("read summaries");
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].is_complete);
    }

    #[tokio::test]
    async fn unmarking_block_reopens_day() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        let service = service(&store, &cache);
        for block_id in ["blk-1", "blk-2", "blk-3"] {
            service
                .set_block_complete(ACCESS, USER, block_id, true)
                .await
                .expect("mark block");
        }

        let outcome = service
            .set_block_complete(ACCESS, USER, "blk-2", false)
            .await
            .expect("unmark block");

        assert!(!outcome.day_complete);
        assert_eq!(
            outcome.completed_block_ids,
            vec!["blk-1".to_string(), "blk-3".to_string()]
        );
        let summaries = store
            .list_summaries(ACCESS, USER, date("2026-03-10"))
            .await
            .expect("read summaries");
        assert!(!summaries[0].is_complete);
    }

    #[tokio::test]
    async fn marking_unknown_block_is_rejected() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;

        let error = service(&store, &cache)
            .set_block_complete(ACCESS, USER, "blk-99", true)
            .await
            .expect_err("unknown block");

        assert!(matches!(error, InfraError::InconsistentState(_)));
    }

    #[tokio::test]
    async fn completion_rolls_back_when_summary_write_fails() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        store.fail_next("upsert_summary", "store offline");

        let error = service(&store, &cache)
            .set_block_complete(ACCESS, USER, "blk-1", true)
            .await
            .expect_err("summary failure surfaces");

        assert!(matches!(error, InfraError::StoreUnavailable(_)));
        assert_eq!(store.completion_deletes.load(Ordering::SeqCst), 1);
        let completions = store
            .list_completions(ACCESS, USER, date("2026-03-10"), date("2026-03-10"))
            .await
            .expect("read completions");
        assert!(completions.is_empty());
    }

    #[tokio::test]
    async fn cached_snapshot_served_after_successful_load() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        seed_recent_history(&store).await;
        let service = service(&store, &cache);

        service.load(ACCESS, USER).await.expect("load");
        let cached = service
            .last_cached(USER)
            .expect("cache read")
            .expect("cached snapshot");

        assert!(cached.from_cache);
        assert_eq!(cached.cycle_day, 5);
        assert_eq!(cached.current_streak, 3);
        assert_eq!(cached.completed_block_ids, vec!["blk-1".to_string()]);
    }

    #[tokio::test]
    async fn video_of_day_follows_cycle_day() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        seed_recent_history(&store).await;

        let videos: Vec<PlaylistVideo> = (1..=30)
            .map(|day| PlaylistVideo {
                url: format!("https://youtu.be/vid{day:08}"),
                video_id: format!("vid{day:08}"),
                day_number: day,
            })
            .collect();
        store
            .insert_playlist(
                ACCESS,
                USER,
                &Playlist {
                    id: "pls-1".to_string(),
                    name: "Morning Motivation".to_string(),
                    is_public: false,
                    videos,
                    times_used: 0,
                    created_at: fixed_now(),
                },
            )
            .await
            .expect("seed playlist");
        let mut cycle = sample_cycle("2026-03-06");
        cycle.playlist_id = Some("pls-1".to_string());
        store
            .update_cycle(ACCESS, USER, &cycle)
            .await
            .expect("link playlist");

        let outcome = service(&store, &cache)
            .load(ACCESS, USER)
            .await
            .expect("load");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };

        let video = snapshot.video_of_day.expect("video of day");
        assert_eq!(video.day_number, 5);
        assert_eq!(video.video_id, "vid00000005");
    }

    #[tokio::test]
    async fn greeting_follows_configured_timezone() {
        let store = Arc::new(InMemoryRoutineStore::new());
        let cache = Arc::new(InMemoryLedgerCacheRepository::default());
        seed_routine(&store).await;
        seed_recent_history(&store).await;

        let evening = Arc::new(|| {
            DateTime::parse_from_rfc3339("2026-03-11T02:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc)
        });
        let service = DashboardService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            chrono_tz::America::New_York,
        )
        .with_now_provider(evening);

        let outcome = service.load(ACCESS, USER).await.expect("load");
        let DashboardLoadOutcome::Ready(snapshot) = outcome else {
            panic!("expected ready dashboard");
        };

        assert_eq!(snapshot.today, date("2026-03-10"));
        assert_eq!(snapshot.greeting, "Good evening");
    }
}
