use crate::application::{default_id_provider, IdProvider, NowProvider};
use crate::domain::models::{ChallengeCycle, CycleStatus, Playlist};
use crate::domain::playlists::build_playlist_videos;
use crate::domain::stats::{
    completed_dates, cycle_card_stats, day_states, lifetime_stats, CycleCardStats, DayState,
    LifetimeStats,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store_client::RoutineStore;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CycleCard {
    pub cycle: ChallengeCycle,
    pub stats: CycleCardStats,
}

pub struct HistoryService<S>
where
    S: RoutineStore,
{
    store: Arc<S>,
    timezone: Tz,
    now_provider: NowProvider,
    id_provider: IdProvider,
}

impl<S> HistoryService<S>
where
    S: RoutineStore,
{
    pub fn new(store: Arc<S>, timezone: Tz) -> Self {
        Self {
            store,
            timezone,
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

    fn today(&self) -> NaiveDate {
        (self.now_provider)().with_timezone(&self.timezone).date_naive()
    }

    /// Every cycle newest first, scored against the completion ledger.
    pub async fn cycle_history(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<CycleCard>, InfraError> {
        let cycles = self.store.list_cycles(access_token, user_id).await?;
        let Some(earliest) = cycles.iter().map(|cycle| cycle.start_date).min() else {
            return Ok(Vec::new());
        };
        let summaries = self
            .store
            .list_summaries(access_token, user_id, earliest)
            .await?;
        let completed = completed_dates(&summaries);
        let today = self.today();

        Ok(cycles
            .into_iter()
            .map(|cycle| {
                let stats = cycle_card_stats(&cycle, today, &completed);
                CycleCard { cycle, stats }
            })
            .collect())
    }

    pub async fn lifetime(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<LifetimeStats, InfraError> {
        let cycles = self.store.list_cycles(access_token, user_id).await?;
        let completed = match cycles.iter().map(|cycle| cycle.start_date).min() {
            Some(earliest) => {
                let summaries = self
                    .store
                    .list_summaries(access_token, user_id, earliest)
                    .await?;
                completed_dates(&summaries)
            }
            None => BTreeSet::new(),
        };
        Ok(lifetime_stats(&cycles, &completed))
    }

    /// The 30 day states of one cycle's calendar, colored only by that
    /// cycle's own restart events.
    pub async fn cycle_calendar(
        &self,
        access_token: &str,
        user_id: &str,
        cycle_id: &str,
    ) -> Result<Vec<DayState>, InfraError> {
        let cycles = self.store.list_cycles(access_token, user_id).await?;
        let Some(cycle) = cycles.into_iter().find(|cycle| cycle.id == cycle_id) else {
            return Err(InfraError::InconsistentState(format!(
                "cycle {cycle_id} not found"
            )));
        };

        let summaries = self
            .store
            .list_summaries(access_token, user_id, cycle.start_date)
            .await?;
        let events: Vec<_> = self
            .store
            .list_restart_events(access_token, user_id)
            .await?
            .into_iter()
            .filter(|event| event.cycle_id == cycle.id)
            .collect();

        Ok(day_states(cycle.start_date, self.today(), &summaries, &events))
    }

    /// Stamps the active cycle as finished and opens a fresh one starting
    /// today. Template and playlist links carry over; the reset counter
    /// starts again at zero.
    pub async fn finish_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        status: CycleStatus,
    ) -> Result<ChallengeCycle, InfraError> {
        if status == CycleStatus::Active {
            return Err(InfraError::InvalidRecord(
                "a cycle can only be finished as completed or abandoned".to_string(),
            ));
        }
        let active = self
            .store
            .get_active_cycle(access_token, user_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState("no active challenge cycle to finish".to_string())
            })?;

        let today = self.today();
        let finished = ChallengeCycle {
            status,
            end_date: Some(today),
            ..active
        };
        self.store
            .update_cycle(access_token, user_id, &finished)
            .await?;

        let fresh = ChallengeCycle {
            id: (self.id_provider)("cyc"),
            start_date: today,
            total_resets: 0,
            status: CycleStatus::Active,
            end_date: None,
            template_id: finished.template_id.clone(),
            playlist_id: finished.playlist_id.clone(),
        };
        self.store.insert_cycle(access_token, user_id, &fresh).await?;
        Ok(fresh)
    }

    pub async fn save_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
        urls: &[String],
        is_public: bool,
    ) -> Result<Playlist, InfraError> {
        let videos = build_playlist_videos(urls).map_err(InfraError::InvalidRecord)?;
        let playlist = Playlist {
            id: (self.id_provider)("pls"),
            name: name.trim().to_string(),
            is_public,
            videos,
            times_used: 0,
            created_at: (self.now_provider)(),
        };
        playlist.validate().map_err(InfraError::InvalidRecord)?;
        self.store
            .insert_playlist(access_token, user_id, &playlist)
            .await?;
        Ok(playlist)
    }

    /// Copies a public playlist into the user's own collection. The source
    /// keeps ownership; its popularity counter is bumped best effort.
    pub async fn copy_community_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Playlist, InfraError> {
        let source = self
            .store
            .get_playlist(access_token, playlist_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState(format!("playlist {playlist_id} not found"))
            })?;
        let own = self.store.list_playlists(access_token, user_id).await?;
        if own.iter().any(|playlist| playlist.id == source.id) {
            return Err(InfraError::InconsistentState(
                "this playlist is already in your collection".to_string(),
            ));
        }
        if !source.is_public {
            return Err(InfraError::InconsistentState(
                "only public playlists can be copied".to_string(),
            ));
        }

        let copy = Playlist {
            id: (self.id_provider)("pls"),
            name: format!("{} (copy)", source.name),
            is_public: false,
            videos: source.videos.clone(),
            times_used: 0,
            created_at: (self.now_provider)(),
        };
        self.store
            .insert_playlist(access_token, user_id, &copy)
            .await?;
        let _ = self
            .store
            .set_playlist_times_used(access_token, &source.id, source.times_used + 1)
            .await;
        Ok(copy)
    }

    pub async fn set_active_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist_id: Option<&str>,
    ) -> Result<ChallengeCycle, InfraError> {
        let active = self
            .store
            .get_active_cycle(access_token, user_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState("no active challenge cycle".to_string())
            })?;

        let linked = match playlist_id {
            Some(id) => {
                let own = self.store.list_playlists(access_token, user_id).await?;
                if !own.iter().any(|playlist| playlist.id == id) {
                    match self.store.get_playlist(access_token, id).await? {
                        Some(playlist) if playlist.is_public => {}
                        Some(_) => {
                            return Err(InfraError::InconsistentState(format!(
                                "playlist {id} is not shared publicly"
                            )));
                        }
                        None => {
                            return Err(InfraError::InconsistentState(format!(
                                "playlist {id} not found"
                            )));
                        }
                    }
                }
                Some(id.to_string())
            }
            None => None,
        };

        let updated = ChallengeCycle {
            playlist_id: linked,
            ..active
        };
        self.store
            .update_cycle(access_token, user_id, &updated)
            .await?;
        Ok(updated)
    }
}
