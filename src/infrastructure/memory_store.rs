use crate::domain::models::{
    Block, ChallengeCycle, CycleStatus, DailyCompletion, DailySummary, Notification, Partnership,
    Playlist, Profile, RestartEvent, RoutineTemplate,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store_client::RoutineStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const COMMUNITY_PAGE_SIZE: usize = 20;
const NOTIFICATION_PAGE_SIZE: usize = 20;

#[derive(Debug, Default)]
struct InMemoryState {
    profiles: HashMap<String, Profile>,
    blocks: HashMap<String, Vec<Block>>,
    completions: HashMap<String, Vec<DailyCompletion>>,
    summaries: HashMap<String, Vec<DailySummary>>,
    cycles: HashMap<String, Vec<ChallengeCycle>>,
    restart_events: HashMap<String, Vec<RestartEvent>>,
    templates: HashMap<String, Vec<RoutineTemplate>>,
    playlists: HashMap<String, Vec<Playlist>>,
    partnerships: Vec<Partnership>,
    notifications: HashMap<String, Vec<Notification>>,
}

#[derive(Debug, Default)]
pub struct InMemoryRoutineStore {
    state: Mutex<InMemoryState>,
    scripted_failures: Mutex<HashMap<&'static str, String>>,
    pub completion_inserts: AtomicUsize,
    pub completion_deletes: AtomicUsize,
    pub summary_upserts: AtomicUsize,
}

impl InMemoryRoutineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, method: &'static str, message: &str) {
        if let Ok(mut failures) = self.scripted_failures.lock() {
            failures.insert(method, message.to_string());
        }
    }

    fn take_scripted_failure(&self, method: &str) -> Result<(), InfraError> {
        let mut failures = self
            .scripted_failures
            .lock()
            .map_err(|error| InfraError::StoreUnavailable(format!("store lock poisoned: {error}")))?;
        if let Some(message) = failures.remove(method) {
            return Err(InfraError::StoreUnavailable(message));
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::StoreUnavailable(format!("store lock poisoned: {error}")))
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::StoreUnavailable(format!(
                "{field} must not be empty"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoutineStore for InMemoryRoutineStore {
    async fn get_profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Profile>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn save_profile(
        &self,
        access_token: &str,
        user_id: &str,
        profile: &Profile,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("save_profile")?;

        let mut state = self.lock_state()?;
        state
            .profiles
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn list_blocks(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Block>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut blocks = state.blocks.get(user_id).cloned().unwrap_or_default();
        blocks.sort_by_key(|block| block.order);
        Ok(blocks)
    }

    async fn replace_blocks(
        &self,
        access_token: &str,
        user_id: &str,
        blocks: &[Block],
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("replace_blocks")?;

        let mut state = self.lock_state()?;
        state.blocks.insert(user_id.to_string(), blocks.to_vec());
        Ok(())
    }

    async fn list_completions(
        &self,
        access_token: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletion>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        Ok(state
            .completions
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.date >= from && entry.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_completion(
        &self,
        access_token: &str,
        user_id: &str,
        completion: &DailyCompletion,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_completion")?;
        self.completion_inserts.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock_state()?;
        let entries = state.completions.entry(user_id.to_string()).or_default();
        let already_present = entries
            .iter()
            .any(|entry| entry.block_id == completion.block_id && entry.date == completion.date);
        if !already_present {
            entries.push(completion.clone());
        }
        Ok(())
    }

    async fn delete_completion(
        &self,
        access_token: &str,
        user_id: &str,
        block_id: &str,
        date: NaiveDate,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(block_id, "block id")?;
        self.take_scripted_failure("delete_completion")?;
        self.completion_deletes.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock_state()?;
        if let Some(entries) = state.completions.get_mut(user_id) {
            entries.retain(|entry| !(entry.block_id == block_id && entry.date == date));
        }
        Ok(())
    }

    async fn list_summaries(
        &self,
        access_token: &str,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut summaries: Vec<DailySummary> = state
            .summaries
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.date >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        summaries.sort_by_key(|entry| entry.date);
        Ok(summaries)
    }

    async fn upsert_summary(
        &self,
        access_token: &str,
        user_id: &str,
        summary: &DailySummary,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("upsert_summary")?;
        self.summary_upserts.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock_state()?;
        let entries = state.summaries.entry(user_id.to_string()).or_default();
        if let Some(existing) = entries.iter_mut().find(|entry| entry.date == summary.date) {
            *existing = summary.clone();
        } else {
            entries.push(summary.clone());
        }
        Ok(())
    }

    async fn get_active_cycle(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeCycle>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        Ok(state.cycles.get(user_id).and_then(|cycles| {
            cycles
                .iter()
                .find(|cycle| cycle.status == CycleStatus::Active)
                .cloned()
        }))
    }

    async fn list_cycles(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<ChallengeCycle>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut cycles = state.cycles.get(user_id).cloned().unwrap_or_default();
        cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(cycles)
    }

    async fn insert_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_cycle")?;

        let mut state = self.lock_state()?;
        state
            .cycles
            .entry(user_id.to_string())
            .or_default()
            .push(cycle.clone());
        Ok(())
    }

    async fn update_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("update_cycle")?;

        let mut state = self.lock_state()?;
        if let Some(cycles) = state.cycles.get_mut(user_id) {
            if let Some(existing) = cycles.iter_mut().find(|entry| entry.id == cycle.id) {
                *existing = cycle.clone();
            }
        }
        Ok(())
    }

    async fn insert_restart_event(
        &self,
        access_token: &str,
        user_id: &str,
        event: &RestartEvent,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_restart_event")?;

        let mut state = self.lock_state()?;
        state
            .restart_events
            .entry(user_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn list_restart_events(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RestartEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut events = state
            .restart_events
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        events.sort_by_key(|event| event.occurred_on);
        Ok(events)
    }

    async fn list_templates(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RoutineTemplate>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut templates = state.templates.get(user_id).cloned().unwrap_or_default();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn get_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<Option<RoutineTemplate>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(template_id, "template id")?;

        let state = self.lock_state()?;
        Ok(state.templates.get(user_id).and_then(|templates| {
            templates
                .iter()
                .find(|template| template.id == template_id)
                .cloned()
        }))
    }

    async fn insert_template(
        &self,
        access_token: &str,
        user_id: &str,
        template: &RoutineTemplate,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_template")?;

        let mut state = self.lock_state()?;
        state
            .templates
            .entry(user_id.to_string())
            .or_default()
            .push(template.clone());
        Ok(())
    }

    async fn delete_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(template_id, "template id")?;
        self.take_scripted_failure("delete_template")?;

        let mut state = self.lock_state()?;
        if let Some(templates) = state.templates.get_mut(user_id) {
            templates.retain(|template| template.id != template_id);
        }
        Ok(())
    }

    async fn list_playlists(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Playlist>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut playlists = state.playlists.get(user_id).cloned().unwrap_or_default();
        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(playlists)
    }

    async fn get_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Option<Playlist>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(playlist_id, "playlist id")?;

        let state = self.lock_state()?;
        Ok(state
            .playlists
            .values()
            .flat_map(|playlists| playlists.iter())
            .find(|playlist| playlist.id == playlist_id)
            .cloned())
    }

    async fn insert_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &Playlist,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_playlist")?;

        let mut state = self.lock_state()?;
        state
            .playlists
            .entry(user_id.to_string())
            .or_default()
            .push(playlist.clone());
        Ok(())
    }

    async fn delete_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(playlist_id, "playlist id")?;
        self.take_scripted_failure("delete_playlist")?;

        let mut state = self.lock_state()?;
        if let Some(playlists) = state.playlists.get_mut(user_id) {
            playlists.retain(|playlist| playlist.id != playlist_id);
        }
        Ok(())
    }

    async fn list_community_playlists(
        &self,
        access_token: &str,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Playlist>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let needle = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let state = self.lock_state()?;
        let mut community: Vec<Playlist> = state
            .playlists
            .iter()
            .filter(|(owner, _)| owner.as_str() != user_id)
            .flat_map(|(_, playlists)| playlists.iter())
            .filter(|playlist| playlist.is_public)
            .filter(|playlist| match needle.as_deref() {
                Some(term) => playlist.name.to_lowercase().contains(term),
                None => true,
            })
            .cloned()
            .collect();
        community.sort_by(|a, b| b.times_used.cmp(&a.times_used));
        community.truncate(COMMUNITY_PAGE_SIZE);
        Ok(community)
    }

    async fn set_playlist_times_used(
        &self,
        access_token: &str,
        playlist_id: &str,
        times_used: u32,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(playlist_id, "playlist id")?;
        self.take_scripted_failure("set_playlist_times_used")?;

        let mut state = self.lock_state()?;
        for playlists in state.playlists.values_mut() {
            if let Some(playlist) = playlists
                .iter_mut()
                .find(|playlist| playlist.id == playlist_id)
            {
                playlist.times_used = times_used;
            }
        }
        Ok(())
    }

    async fn list_partnerships(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Partnership>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut partnerships: Vec<Partnership> = state
            .partnerships
            .iter()
            .filter(|entry| entry.user_id == user_id || entry.partner_id == user_id)
            .cloned()
            .collect();
        partnerships.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(partnerships)
    }

    async fn insert_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.take_scripted_failure("insert_partnership")?;

        let mut state = self.lock_state()?;
        state.partnerships.push(partnership.clone());
        Ok(())
    }

    async fn update_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.take_scripted_failure("update_partnership")?;

        let mut state = self.lock_state()?;
        if let Some(existing) = state
            .partnerships
            .iter_mut()
            .find(|entry| entry.id == partnership.id)
        {
            *existing = partnership.clone();
        }
        Ok(())
    }

    async fn delete_partnership(
        &self,
        access_token: &str,
        partnership_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(partnership_id, "partnership id")?;
        self.take_scripted_failure("delete_partnership")?;

        let mut state = self.lock_state()?;
        state.partnerships.retain(|entry| entry.id != partnership_id);
        Ok(())
    }

    async fn list_notifications(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Notification>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;

        let state = self.lock_state()?;
        let mut notifications = state
            .notifications
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(NOTIFICATION_PAGE_SIZE);
        Ok(notifications)
    }

    async fn insert_notification(
        &self,
        access_token: &str,
        user_id: &str,
        notification: &Notification,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("insert_notification")?;

        let mut state = self.lock_state()?;
        state
            .notifications
            .entry(user_id.to_string())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    async fn mark_notification_read(
        &self,
        access_token: &str,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(notification_id, "notification id")?;
        self.take_scripted_failure("mark_notification_read")?;

        let mut state = self.lock_state()?;
        if let Some(notifications) = state.notifications.get_mut(user_id) {
            if let Some(notification) = notifications
                .iter_mut()
                .find(|entry| entry.id == notification_id)
            {
                notification.is_read = true;
            }
        }
        Ok(())
    }

    async fn delete_user_data(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(user_id, "user id")?;
        self.take_scripted_failure("delete_user_data")?;

        let mut state = self.lock_state()?;
        state.profiles.remove(user_id);
        state.blocks.remove(user_id);
        state.completions.remove(user_id);
        state.summaries.remove(user_id);
        state.cycles.remove(user_id);
        state.restart_events.remove(user_id);
        state.templates.remove(user_id);
        state.playlists.remove(user_id);
        state.notifications.remove(user_id);
        state
            .partnerships
            .retain(|entry| entry.user_id != user_id && entry.partner_id != user_id);
        Ok(())
    }
}
