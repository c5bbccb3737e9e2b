use crate::domain::models::{
    Block, ChallengeCycle, DailyCompletion, DailySummary, Notification, Partnership, Playlist,
    Profile, RestartEvent, RoutineTemplate,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::record_mapper::{
    decode_block, decode_completion, decode_cycle, decode_notification, decode_partnership,
    decode_playlist, decode_profile, decode_restart_event, decode_summary, decode_template,
    encode_block, encode_completion, encode_cycle, encode_notification, encode_partnership,
    encode_playlist, encode_profile, encode_restart_event, encode_summary, encode_template,
    BlockRow, CompletionRow, CycleRow, NotificationRow, PartnershipRow, PlaylistRow, ProfileRow,
    RestartEventRow, SummaryRow, TemplateRow,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const API_KEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "Prefer";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const COMMUNITY_PAGE_SIZE: u32 = 20;
const NOTIFICATION_PAGE_SIZE: u32 = 20;

const TABLE_PROFILES: &str = "profiles";
const TABLE_BLOCKS: &str = "routine_blocks";
const TABLE_COMPLETIONS: &str = "daily_completions";
const TABLE_SUMMARIES: &str = "daily_summaries";
const TABLE_CYCLES: &str = "challenge_cycles";
const TABLE_RESTARTS: &str = "cycle_restarts";
const TABLE_TEMPLATES: &str = "routine_templates";
const TABLE_PLAYLISTS: &str = "playlists";
const TABLE_PARTNERSHIPS: &str = "partnerships";
const TABLE_NOTIFICATIONS: &str = "notifications";

#[async_trait]
pub trait RoutineStore: Send + Sync {
    async fn get_profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Profile>, InfraError>;

    async fn save_profile(
        &self,
        access_token: &str,
        user_id: &str,
        profile: &Profile,
    ) -> Result<(), InfraError>;

    async fn list_blocks(&self, access_token: &str, user_id: &str)
        -> Result<Vec<Block>, InfraError>;

    async fn replace_blocks(
        &self,
        access_token: &str,
        user_id: &str,
        blocks: &[Block],
    ) -> Result<(), InfraError>;

    async fn list_completions(
        &self,
        access_token: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletion>, InfraError>;

    async fn insert_completion(
        &self,
        access_token: &str,
        user_id: &str,
        completion: &DailyCompletion,
    ) -> Result<(), InfraError>;

    async fn delete_completion(
        &self,
        access_token: &str,
        user_id: &str,
        block_id: &str,
        date: NaiveDate,
    ) -> Result<(), InfraError>;

    async fn list_summaries(
        &self,
        access_token: &str,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, InfraError>;

    async fn upsert_summary(
        &self,
        access_token: &str,
        user_id: &str,
        summary: &DailySummary,
    ) -> Result<(), InfraError>;

    async fn get_active_cycle(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeCycle>, InfraError>;

    async fn list_cycles(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<ChallengeCycle>, InfraError>;

    async fn insert_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError>;

    async fn update_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError>;

    async fn insert_restart_event(
        &self,
        access_token: &str,
        user_id: &str,
        event: &RestartEvent,
    ) -> Result<(), InfraError>;

    async fn list_restart_events(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RestartEvent>, InfraError>;

    async fn list_templates(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RoutineTemplate>, InfraError>;

    async fn get_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<Option<RoutineTemplate>, InfraError>;

    async fn insert_template(
        &self,
        access_token: &str,
        user_id: &str,
        template: &RoutineTemplate,
    ) -> Result<(), InfraError>;

    async fn delete_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<(), InfraError>;

    async fn list_playlists(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Playlist>, InfraError>;

    async fn get_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Option<Playlist>, InfraError>;

    async fn insert_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &Playlist,
    ) -> Result<(), InfraError>;

    async fn delete_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<(), InfraError>;

    async fn list_community_playlists(
        &self,
        access_token: &str,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Playlist>, InfraError>;

    async fn set_playlist_times_used(
        &self,
        access_token: &str,
        playlist_id: &str,
        times_used: u32,
    ) -> Result<(), InfraError>;

    async fn list_partnerships(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Partnership>, InfraError>;

    async fn insert_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError>;

    async fn update_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError>;

    async fn delete_partnership(
        &self,
        access_token: &str,
        partnership_id: &str,
    ) -> Result<(), InfraError>;

    async fn list_notifications(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Notification>, InfraError>;

    async fn insert_notification(
        &self,
        access_token: &str,
        user_id: &str,
        notification: &Notification,
    ) -> Result<(), InfraError>;

    async fn mark_notification_read(
        &self,
        access_token: &str,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), InfraError>;

    async fn delete_user_data(&self, access_token: &str, user_id: &str)
        -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct RestRoutineStore {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl RestRoutineStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, InfraError> {
        Self::ensure_non_empty(base_url, "store base url")?;
        Self::ensure_non_empty(api_key, "store api key")?;

        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            InfraError::StoreUnavailable(format!("invalid store base url: {error}"))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| {
                InfraError::StoreUnavailable(format!("failed building store http client: {error}"))
            })?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_string(),
            client,
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::StoreUnavailable(format!(
                "{field} must not be empty"
            )));
        }
        Ok(())
    }

    fn store_http_error(table: &str, status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("store error on {table}: http {}", status.as_u16())
        } else {
            format!(
                "store error on {table}: http {}; body={body}",
                status.as_u16()
            )
        };
        InfraError::StoreUnavailable(message)
    }

    fn table_endpoint(&self, table: &str) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::StoreUnavailable("store base URL cannot be a base".to_string())
            })?;
            segments.push("rest");
            segments.push("v1");
            segments.push(table);
        }
        Ok(url)
    }

    async fn fetch_rows<T>(
        &self,
        access_token: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, InfraError>
    where
        T: serde::de::DeserializeOwned,
    {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.table_endpoint(table)?;
        let response = self
            .client
            .get(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|error| {
                InfraError::StoreUnavailable(format!("network error while reading {table}: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::StoreUnavailable(format!("failed reading {table} response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::StoreUnavailable(format!("invalid {table} payload: {error}; body={body}"))
        })
    }

    async fn insert_rows<T>(
        &self,
        access_token: &str,
        table: &str,
        on_conflict: Option<&str>,
        rows: &T,
    ) -> Result<(), InfraError>
    where
        T: serde::Serialize + ?Sized,
    {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.table_endpoint(table)?;
        let mut request = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token)
            .json(rows);
        if let Some(keys) = on_conflict {
            request = request
                .header(PREFER_HEADER, UPSERT_PREFERENCE)
                .query(&[("on_conflict", keys)]);
        }

        let response = request.send().await.map_err(|error| {
            InfraError::StoreUnavailable(format!("network error while writing {table}: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::StoreUnavailable(format!("failed reading {table} write response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }

    async fn patch_rows<T>(
        &self,
        access_token: &str,
        table: &str,
        query: &[(&str, String)],
        patch: &T,
    ) -> Result<(), InfraError>
    where
        T: serde::Serialize + ?Sized,
    {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.table_endpoint(table)?;
        let response = self
            .client
            .patch(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token)
            .query(query)
            .json(patch)
            .send()
            .await
            .map_err(|error| {
                InfraError::StoreUnavailable(format!(
                    "network error while updating {table}: {error}"
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::StoreUnavailable(format!("failed reading {table} update response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }

    async fn delete_rows(
        &self,
        access_token: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.table_endpoint(table)?;
        let response = self
            .client
            .delete(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|error| {
                InfraError::StoreUnavailable(format!(
                    "network error while deleting from {table}: {error}"
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::StoreUnavailable(format!("failed reading {table} delete response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::store_http_error(table, status, &body));
        }
        Ok(())
    }

    fn user_filter(user_id: &str) -> (&'static str, String) {
        ("user_id", format!("eq.{user_id}"))
    }
}

#[derive(Debug, serde::Serialize)]
struct TimesUsedPatch {
    times_used: u32,
}

#[derive(Debug, serde::Serialize)]
struct ReadFlagPatch {
    is_read: bool,
}

#[async_trait]
impl RoutineStore for RestRoutineStore {
    async fn get_profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Profile>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<ProfileRow> = self
            .fetch_rows(access_token, TABLE_PROFILES, &query)
            .await?;
        rows.into_iter().next().map(decode_profile).transpose()
    }

    async fn save_profile(
        &self,
        access_token: &str,
        user_id: &str,
        profile: &Profile,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_profile(user_id, profile);
        self.insert_rows(access_token, TABLE_PROFILES, Some("user_id"), &row)
            .await
    }

    async fn list_blocks(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Block>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "order.asc".to_string()),
        ];
        let rows: Vec<BlockRow> = self.fetch_rows(access_token, TABLE_BLOCKS, &query).await?;
        rows.into_iter().map(decode_block).collect()
    }

    async fn replace_blocks(
        &self,
        access_token: &str,
        user_id: &str,
        blocks: &[Block],
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let filter = [Self::user_filter(user_id)];
        self.delete_rows(access_token, TABLE_BLOCKS, &filter).await?;

        if blocks.is_empty() {
            return Ok(());
        }
        let rows: Vec<BlockRow> = blocks
            .iter()
            .map(|block| encode_block(user_id, block))
            .collect();
        self.insert_rows(access_token, TABLE_BLOCKS, None, &rows)
            .await
    }

    async fn list_completions(
        &self,
        access_token: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCompletion>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("date", format!("gte.{from}")),
            ("date", format!("lte.{to}")),
        ];
        let rows: Vec<CompletionRow> = self
            .fetch_rows(access_token, TABLE_COMPLETIONS, &query)
            .await?;
        rows.into_iter().map(decode_completion).collect()
    }

    async fn insert_completion(
        &self,
        access_token: &str,
        user_id: &str,
        completion: &DailyCompletion,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_completion(user_id, completion);
        self.insert_rows(
            access_token,
            TABLE_COMPLETIONS,
            Some("user_id,block_id,date"),
            &row,
        )
        .await
    }

    async fn delete_completion(
        &self,
        access_token: &str,
        user_id: &str,
        block_id: &str,
        date: NaiveDate,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(block_id, "block id")?;

        let query = [
            Self::user_filter(user_id),
            ("block_id", format!("eq.{block_id}")),
            ("date", format!("eq.{date}")),
        ];
        self.delete_rows(access_token, TABLE_COMPLETIONS, &query)
            .await
    }

    async fn list_summaries(
        &self,
        access_token: &str,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("date", format!("gte.{since}")),
            ("order", "date.asc".to_string()),
        ];
        let rows: Vec<SummaryRow> = self
            .fetch_rows(access_token, TABLE_SUMMARIES, &query)
            .await?;
        rows.into_iter().map(decode_summary).collect()
    }

    async fn upsert_summary(
        &self,
        access_token: &str,
        user_id: &str,
        summary: &DailySummary,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_summary(user_id, summary);
        self.insert_rows(access_token, TABLE_SUMMARIES, Some("user_id,date"), &row)
            .await
    }

    async fn get_active_cycle(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeCycle>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("status", "eq.active".to_string()),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<CycleRow> = self.fetch_rows(access_token, TABLE_CYCLES, &query).await?;
        rows.into_iter().next().map(decode_cycle).transpose()
    }

    async fn list_cycles(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<ChallengeCycle>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "start_date.desc".to_string()),
        ];
        let rows: Vec<CycleRow> = self.fetch_rows(access_token, TABLE_CYCLES, &query).await?;
        rows.into_iter().map(decode_cycle).collect()
    }

    async fn insert_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_cycle(user_id, cycle);
        self.insert_rows(access_token, TABLE_CYCLES, None, &row)
            .await
    }

    async fn update_cycle(
        &self,
        access_token: &str,
        user_id: &str,
        cycle: &ChallengeCycle,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(&cycle.id, "cycle id")?;

        let query = [
            ("id", format!("eq.{}", cycle.id)),
            Self::user_filter(user_id),
        ];
        let row = encode_cycle(user_id, cycle);
        self.patch_rows(access_token, TABLE_CYCLES, &query, &row)
            .await
    }

    async fn insert_restart_event(
        &self,
        access_token: &str,
        user_id: &str,
        event: &RestartEvent,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_restart_event(user_id, event);
        self.insert_rows(access_token, TABLE_RESTARTS, None, &row)
            .await
    }

    async fn list_restart_events(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RestartEvent>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "occurred_on.asc".to_string()),
        ];
        let rows: Vec<RestartEventRow> = self
            .fetch_rows(access_token, TABLE_RESTARTS, &query)
            .await?;
        rows.into_iter().map(decode_restart_event).collect()
    }

    async fn list_templates(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<RoutineTemplate>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "created_at.desc".to_string()),
        ];
        let rows: Vec<TemplateRow> = self
            .fetch_rows(access_token, TABLE_TEMPLATES, &query)
            .await?;
        rows.into_iter().map(decode_template).collect()
    }

    async fn get_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<Option<RoutineTemplate>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(template_id, "template id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("id", format!("eq.{template_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<TemplateRow> = self
            .fetch_rows(access_token, TABLE_TEMPLATES, &query)
            .await?;
        rows.into_iter().next().map(decode_template).transpose()
    }

    async fn insert_template(
        &self,
        access_token: &str,
        user_id: &str,
        template: &RoutineTemplate,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_template(user_id, template);
        self.insert_rows(access_token, TABLE_TEMPLATES, None, &row)
            .await
    }

    async fn delete_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(template_id, "template id")?;

        let query = [
            ("id", format!("eq.{template_id}")),
            Self::user_filter(user_id),
        ];
        self.delete_rows(access_token, TABLE_TEMPLATES, &query)
            .await
    }

    async fn list_playlists(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Playlist>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "created_at.desc".to_string()),
        ];
        let rows: Vec<PlaylistRow> = self
            .fetch_rows(access_token, TABLE_PLAYLISTS, &query)
            .await?;
        rows.into_iter().map(decode_playlist).collect()
    }

    async fn get_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Option<Playlist>, InfraError> {
        Self::ensure_non_empty(playlist_id, "playlist id")?;

        let query = [
            ("select", "*".to_string()),
            ("id", format!("eq.{playlist_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<PlaylistRow> = self
            .fetch_rows(access_token, TABLE_PLAYLISTS, &query)
            .await?;
        rows.into_iter().next().map(decode_playlist).transpose()
    }

    async fn insert_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &Playlist,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_playlist(user_id, playlist);
        self.insert_rows(access_token, TABLE_PLAYLISTS, None, &row)
            .await
    }

    async fn delete_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(playlist_id, "playlist id")?;

        let query = [
            ("id", format!("eq.{playlist_id}")),
            Self::user_filter(user_id),
        ];
        self.delete_rows(access_token, TABLE_PLAYLISTS, &query)
            .await
    }

    async fn list_community_playlists(
        &self,
        access_token: &str,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Playlist>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let mut query = vec![
            ("select", "*".to_string()),
            ("is_public", "eq.true".to_string()),
            ("user_id", format!("neq.{user_id}")),
            ("order", "times_used.desc".to_string()),
            ("limit", COMMUNITY_PAGE_SIZE.to_string()),
        ];
        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            query.push(("name", format!("ilike.*{term}*")));
        }

        let rows: Vec<PlaylistRow> = self
            .fetch_rows(access_token, TABLE_PLAYLISTS, &query)
            .await?;
        rows.into_iter().map(decode_playlist).collect()
    }

    async fn set_playlist_times_used(
        &self,
        access_token: &str,
        playlist_id: &str,
        times_used: u32,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(playlist_id, "playlist id")?;

        let query = [("id", format!("eq.{playlist_id}"))];
        let patch = TimesUsedPatch { times_used };
        self.patch_rows(access_token, TABLE_PLAYLISTS, &query, &patch)
            .await
    }

    async fn list_partnerships(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Partnership>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            (
                "or",
                format!("(user_id.eq.{user_id},partner_id.eq.{user_id})"),
            ),
            ("order", "created_at.asc".to_string()),
        ];
        let rows: Vec<PartnershipRow> = self
            .fetch_rows(access_token, TABLE_PARTNERSHIPS, &query)
            .await?;
        rows.into_iter().map(decode_partnership).collect()
    }

    async fn insert_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        let row = encode_partnership(partnership);
        self.insert_rows(access_token, TABLE_PARTNERSHIPS, None, &row)
            .await
    }

    async fn update_partnership(
        &self,
        access_token: &str,
        partnership: &Partnership,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(&partnership.id, "partnership id")?;

        let query = [("id", format!("eq.{}", partnership.id))];
        let row = encode_partnership(partnership);
        self.patch_rows(access_token, TABLE_PARTNERSHIPS, &query, &row)
            .await
    }

    async fn delete_partnership(
        &self,
        access_token: &str,
        partnership_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(partnership_id, "partnership id")?;

        let query = [("id", format!("eq.{partnership_id}"))];
        self.delete_rows(access_token, TABLE_PARTNERSHIPS, &query)
            .await
    }

    async fn list_notifications(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Notification>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let query = [
            ("select", "*".to_string()),
            Self::user_filter(user_id),
            ("order", "created_at.desc".to_string()),
            ("limit", NOTIFICATION_PAGE_SIZE.to_string()),
        ];
        let rows: Vec<NotificationRow> = self
            .fetch_rows(access_token, TABLE_NOTIFICATIONS, &query)
            .await?;
        rows.into_iter().map(decode_notification).collect()
    }

    async fn insert_notification(
        &self,
        access_token: &str,
        user_id: &str,
        notification: &Notification,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let row = encode_notification(user_id, notification);
        self.insert_rows(access_token, TABLE_NOTIFICATIONS, None, &row)
            .await
    }

    async fn mark_notification_read(
        &self,
        access_token: &str,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        Self::ensure_non_empty(notification_id, "notification id")?;

        let query = [
            ("id", format!("eq.{notification_id}")),
            Self::user_filter(user_id),
        ];
        let patch = ReadFlagPatch { is_read: true };
        self.patch_rows(access_token, TABLE_NOTIFICATIONS, &query, &patch)
            .await
    }

    async fn delete_user_data(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;

        let owned = [
            TABLE_NOTIFICATIONS,
            TABLE_RESTARTS,
            TABLE_COMPLETIONS,
            TABLE_SUMMARIES,
            TABLE_CYCLES,
            TABLE_TEMPLATES,
            TABLE_PLAYLISTS,
            TABLE_BLOCKS,
            TABLE_PROFILES,
        ];
        for table in owned {
            let filter = [Self::user_filter(user_id)];
            self.delete_rows(access_token, table, &filter).await?;
        }

        let either_side = [(
            "or",
            format!("(user_id.eq.{user_id},partner_id.eq.{user_id})"),
        )];
        self.delete_rows(access_token, TABLE_PARTNERSHIPS, &either_side)
            .await
    }
}
