use crate::application::bootstrap::bootstrap_workspace;
use crate::application::dashboard::{
    BlockToggleOutcome, DashboardLoadOutcome, DashboardService, DashboardSnapshot,
    STREAK_LOOKBACK_DAYS,
};
use crate::application::history::{CycleCard, HistoryService};
use crate::application::onboarding::{FirstTemplateOutcome, OnboardingOutcome, OnboardingService};
use crate::application::partners::{PartnerEvent, PartnerService, PartnerSummary};
use crate::domain::cycle::{resolve_cycle_day, MissedDayResolution};
use crate::domain::models::{
    default_routine_seeds, Block, BlockCategory, BlockSeed, ChallengeCycle, CycleStatus,
    Notification, Partnership, Playlist, Profile, RoutineTemplate,
};
use crate::domain::stats::{completed_dates, current_streak, DayState, LifetimeStats};
use crate::infrastructure::config::{
    read_account_id, read_default_arrival, read_store_settings, read_timezone, read_token_service,
    save_account_id, save_store_settings,
};
use crate::infrastructure::credential_store::{
    CredentialStore, KeyringCredentialStore, StoreToken,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::ledger_cache::{LedgerCacheRepository, SqliteLedgerCacheRepository};
use crate::infrastructure::store_client::{RestRoutineStore, RoutineStore};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const STREAK_MILESTONES: [u32; 4] = [7, 14, 21, 30];

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    ledger_cache: Arc<SqliteLedgerCacheRepository>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let paths = bootstrap_workspace(&workspace_root)?;
        let ledger_cache = Arc::new(SqliteLedgerCacheRepository::new(&paths.database_path));

        Ok(Self {
            config_dir: paths.config_dir,
            database_path: paths.database_path,
            logs_dir: paths.logs_dir,
            ledger_cache,
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountStatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub store_configured: bool,
}

pub fn configure_store_impl(
    state: &AppState,
    base_url: String,
    api_key: String,
) -> Result<(), InfraError> {
    // Reject settings the client constructor would choke on later.
    let _ = RestRoutineStore::new(&base_url, &api_key)?;
    save_store_settings(state.config_dir(), &base_url, &api_key)?;

    state.log_info("configure_store", "saved store connection settings");
    Ok(())
}

pub fn connect_account_impl(
    state: &AppState,
    access_token: String,
    user_id: String,
) -> Result<AccountStatusResponse, InfraError> {
    let access_token = access_token.trim();
    let user_id = user_id.trim();
    if access_token.is_empty() {
        return Err(InfraError::InvalidConfig(
            "access_token must not be empty".to_string(),
        ));
    }
    if user_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "user_id must not be empty".to_string(),
        ));
    }

    save_account_id(state.config_dir(), user_id)?;
    credential_store(state)?.save_token(&StoreToken {
        access_token: access_token.to_string(),
        user_id: user_id.to_string(),
    })?;

    state.log_info(
        "connect_account",
        &format!("stored session for user_id={user_id}"),
    );
    Ok(AccountStatusResponse {
        connected: true,
        user_id: Some(user_id.to_string()),
        store_configured: read_store_settings(state.config_dir())?.is_some(),
    })
}

pub fn account_status_impl(state: &AppState) -> Result<AccountStatusResponse, InfraError> {
    let store_configured = read_store_settings(state.config_dir())?.is_some();
    let token = credential_store(state)?.load_token()?;

    Ok(AccountStatusResponse {
        connected: token.is_some(),
        user_id: token.map(|token| token.user_id),
        store_configured,
    })
}

pub fn sign_out_impl(state: &AppState) -> Result<(), InfraError> {
    let credentials = credential_store(state)?;
    if let Some(token) = credentials.load_token()? {
        state.ledger_cache.clear(&token.user_id)?;
    }
    credentials.delete_token()?;

    state.log_info("sign_out", "cleared session and cached ledger");
    Ok(())
}

pub async fn load_dashboard_impl(state: &AppState) -> Result<DashboardLoadOutcome, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let dashboard = dashboard_service(state, store)?;

    match dashboard.load(&session.access_token, &session.user_id).await {
        Ok(outcome) => {
            state.log_info(
                "load_dashboard",
                &format!("loaded dashboard for user_id={}", session.user_id),
            );
            Ok(outcome)
        }
        Err(InfraError::StoreUnavailable(message)) => {
            state.log_error(
                "load_dashboard",
                &format!("store unavailable, serving cached ledger: {message}"),
            );
            match dashboard.last_cached(&session.user_id)? {
                Some(snapshot) => Ok(DashboardLoadOutcome::Ready(snapshot)),
                None => Err(InfraError::StoreUnavailable(message)),
            }
        }
        Err(error) => Err(error),
    }
}

pub fn cached_dashboard_impl(state: &AppState) -> Result<Option<DashboardSnapshot>, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let dashboard = dashboard_service(state, store)?;
    dashboard.last_cached(&session.user_id)
}

pub async fn toggle_block_impl(
    state: &AppState,
    block_id: String,
    complete: bool,
) -> Result<BlockToggleOutcome, InfraError> {
    let block_id = block_id.trim();
    if block_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "block_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let dashboard = dashboard_service(state, Arc::clone(&store))?;
    let outcome = dashboard
        .set_block_complete(&session.access_token, &session.user_id, block_id, complete)
        .await?;

    if complete && outcome.day_complete {
        if let Err(error) = announce_day_completed(state, Arc::clone(&store), &session).await {
            state.log_error(
                "toggle_block",
                &format!("partner notification failed: {error}"),
            );
        }
    }

    state.log_info(
        "toggle_block",
        &format!(
            "block_id={block_id} complete={complete} day_complete={}",
            outcome.day_complete
        ),
    );
    Ok(outcome)
}

pub async fn resolve_missed_day_impl(
    state: &AppState,
    resolution: String,
) -> Result<(), InfraError> {
    let resolution = parse_missed_day_resolution(&resolution)?;
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let dashboard = dashboard_service(state, Arc::clone(&store))?;
    dashboard
        .resolve_missed_day(&session.access_token, &session.user_id, resolution)
        .await?;

    if resolution == MissedDayResolution::Continue {
        let partners = PartnerService::new(Arc::clone(&store), configured_timezone(state)?);
        if let Err(error) = partners
            .notify_partner(
                &session.access_token,
                &session.user_id,
                PartnerEvent::MissedDay,
            )
            .await
        {
            state.log_error(
                "resolve_missed_day",
                &format!("partner notification failed: {error}"),
            );
        }
    }

    state.log_info(
        "resolve_missed_day",
        &format!("resolved missed day with {resolution:?}"),
    );
    Ok(())
}

pub async fn complete_onboarding_impl(
    state: &AppState,
    arrival_time: Option<String>,
    seeds: Option<Vec<BlockSeed>>,
) -> Result<OnboardingOutcome, InfraError> {
    let arrival_time = match arrival_time {
        Some(value) => value.trim().to_string(),
        None => read_default_arrival(state.config_dir())?,
    };
    let seeds = seeds.unwrap_or_else(default_routine_seeds);

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let outcome = onboarding
        .complete_onboarding(
            &session.access_token,
            &session.user_id,
            &arrival_time,
            &seeds,
        )
        .await?;

    if outcome.first_template == FirstTemplateOutcome::Failed {
        state.log_error(
            "complete_onboarding",
            "auto-saving the first template failed; continuing",
        );
    }
    state.log_info(
        "complete_onboarding",
        &format!("saved routine with {} blocks", outcome.blocks.len()),
    );
    Ok(outcome)
}

pub async fn add_block_impl(
    state: &AppState,
    name: String,
    category: String,
    duration_min: Option<u32>,
    sets: Option<u32>,
    reps_per_set: Option<u32>,
) -> Result<Vec<Block>, InfraError> {
    let seed = BlockSeed {
        name: name.trim().to_string(),
        category: parse_block_category(&category)?,
        duration_min,
        sets,
        reps_per_set,
    };

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let blocks = onboarding
        .add_block(&session.access_token, &session.user_id, seed)
        .await?;

    state.log_info(
        "add_block",
        &format!("routine now has {} blocks", blocks.len()),
    );
    Ok(blocks)
}

pub async fn delete_block_impl(
    state: &AppState,
    block_id: String,
) -> Result<Vec<Block>, InfraError> {
    let block_id = block_id.trim();
    if block_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "block_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let blocks = onboarding
        .delete_block(&session.access_token, &session.user_id, block_id)
        .await?;

    state.log_info("delete_block", &format!("deleted block_id={block_id}"));
    Ok(blocks)
}

pub async fn reorder_blocks_impl(
    state: &AppState,
    ordered_ids: Vec<String>,
) -> Result<Vec<Block>, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let blocks = onboarding
        .reorder_blocks(&session.access_token, &session.user_id, &ordered_ids)
        .await?;

    state.log_info(
        "reorder_blocks",
        &format!("reordered {} blocks", blocks.len()),
    );
    Ok(blocks)
}

pub async fn update_arrival_time_impl(
    state: &AppState,
    arrival_time: String,
) -> Result<Profile, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let profile = onboarding
        .update_arrival_time(&session.access_token, &session.user_id, arrival_time.trim())
        .await?;

    state.log_info(
        "update_arrival_time",
        &format!("arrival time set to {}", profile.arrival_time),
    );
    Ok(profile)
}

pub async fn save_template_impl(
    state: &AppState,
    name: String,
) -> Result<RoutineTemplate, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let template = onboarding
        .save_current_as_template(&session.access_token, &session.user_id, name.trim())
        .await?;

    state.log_info(
        "save_template",
        &format!("saved template template_id={}", template.id),
    );
    Ok(template)
}

pub async fn list_templates_impl(state: &AppState) -> Result<Vec<RoutineTemplate>, InfraError> {
    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .list_templates(&session.access_token, &session.user_id)
        .await
}

pub async fn apply_template_impl(
    state: &AppState,
    template_id: String,
) -> Result<ChallengeCycle, InfraError> {
    let template_id = template_id.trim();
    if template_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "template_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let onboarding = onboarding_service(state, store)?;
    let cycle = onboarding
        .apply_template(&session.access_token, &session.user_id, template_id)
        .await?;

    state.log_info(
        "apply_template",
        &format!(
            "applied template_id={template_id}; fresh cycle_id={}",
            cycle.id
        ),
    );
    Ok(cycle)
}

pub async fn delete_template_impl(
    state: &AppState,
    template_id: String,
) -> Result<(), InfraError> {
    let template_id = template_id.trim();
    if template_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "template_id must not be empty".to_string(),
        ));
    }

    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .delete_template(&session.access_token, &session.user_id, template_id)
        .await?;

    state.log_info(
        "delete_template",
        &format!("deleted template_id={template_id}"),
    );
    Ok(())
}

pub async fn save_playlist_impl(
    state: &AppState,
    name: String,
    urls: Vec<String>,
    is_public: bool,
) -> Result<Playlist, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    let playlist = history
        .save_playlist(
            &session.access_token,
            &session.user_id,
            &name,
            &urls,
            is_public,
        )
        .await?;

    state.log_info(
        "save_playlist",
        &format!("saved playlist_id={} public={is_public}", playlist.id),
    );
    Ok(playlist)
}

pub async fn list_playlists_impl(state: &AppState) -> Result<Vec<Playlist>, InfraError> {
    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .list_playlists(&session.access_token, &session.user_id)
        .await
}

pub async fn community_playlists_impl(
    state: &AppState,
    search: Option<String>,
) -> Result<Vec<Playlist>, InfraError> {
    let store = routine_store(state)?;
    let session = active_session(state)?;
    let search = search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    store
        .list_community_playlists(&session.access_token, &session.user_id, search)
        .await
}

pub async fn copy_playlist_impl(
    state: &AppState,
    playlist_id: String,
) -> Result<Playlist, InfraError> {
    let playlist_id = playlist_id.trim();
    if playlist_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "playlist_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    let copy = history
        .copy_community_playlist(&session.access_token, &session.user_id, playlist_id)
        .await?;

    state.log_info(
        "copy_playlist",
        &format!("copied playlist_id={playlist_id} into playlist_id={}", copy.id),
    );
    Ok(copy)
}

pub async fn delete_playlist_impl(
    state: &AppState,
    playlist_id: String,
) -> Result<(), InfraError> {
    let playlist_id = playlist_id.trim();
    if playlist_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "playlist_id must not be empty".to_string(),
        ));
    }

    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .delete_playlist(&session.access_token, &session.user_id, playlist_id)
        .await?;

    state.log_info(
        "delete_playlist",
        &format!("deleted playlist_id={playlist_id}"),
    );
    Ok(())
}

pub async fn set_active_playlist_impl(
    state: &AppState,
    playlist_id: Option<String>,
) -> Result<ChallengeCycle, InfraError> {
    let playlist_id = playlist_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    let cycle = history
        .set_active_playlist(&session.access_token, &session.user_id, playlist_id)
        .await?;

    match &cycle.playlist_id {
        Some(playlist_id) => state.log_info(
            "set_active_playlist",
            &format!("cycle_id={} now follows playlist_id={playlist_id}", cycle.id),
        ),
        None => state.log_info(
            "set_active_playlist",
            &format!("cycle_id={} detached from its playlist", cycle.id),
        ),
    }
    Ok(cycle)
}

pub async fn invite_partner_impl(
    state: &AppState,
    partner_id: String,
) -> Result<Partnership, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    let partnership = partners
        .invite_partner(&session.access_token, &session.user_id, partner_id.trim())
        .await?;

    state.log_info(
        "invite_partner",
        &format!("invited partner partnership_id={}", partnership.id),
    );
    Ok(partnership)
}

pub async fn pending_invites_impl(state: &AppState) -> Result<Vec<Partnership>, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    partners
        .pending_invites(&session.access_token, &session.user_id)
        .await
}

pub async fn accept_invite_impl(
    state: &AppState,
    partnership_id: String,
) -> Result<Partnership, InfraError> {
    let partnership_id = partnership_id.trim();
    if partnership_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "partnership_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    let partnership = partners
        .accept_invite(&session.access_token, &session.user_id, partnership_id)
        .await?;

    state.log_info(
        "accept_invite",
        &format!("accepted partnership_id={partnership_id}"),
    );
    Ok(partnership)
}

pub async fn decline_invite_impl(
    state: &AppState,
    partnership_id: String,
) -> Result<(), InfraError> {
    let partnership_id = partnership_id.trim();
    if partnership_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "partnership_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    partners
        .decline_invite(&session.access_token, &session.user_id, partnership_id)
        .await?;

    state.log_info(
        "decline_invite",
        &format!("declined partnership_id={partnership_id}"),
    );
    Ok(())
}

pub async fn remove_partner_impl(state: &AppState) -> Result<(), InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    partners
        .remove_partner(&session.access_token, &session.user_id)
        .await?;

    state.log_info("remove_partner", "removed accepted partnership");
    Ok(())
}

pub async fn partner_summary_impl(
    state: &AppState,
) -> Result<Option<PartnerSummary>, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let partners = partner_service(state, store)?;
    partners
        .partner_summary(&session.access_token, &session.user_id)
        .await
}

pub async fn list_notifications_impl(state: &AppState) -> Result<Vec<Notification>, InfraError> {
    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .list_notifications(&session.access_token, &session.user_id)
        .await
}

pub async fn mark_notification_read_impl(
    state: &AppState,
    notification_id: String,
) -> Result<(), InfraError> {
    let notification_id = notification_id.trim();
    if notification_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "notification_id must not be empty".to_string(),
        ));
    }

    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .mark_notification_read(&session.access_token, &session.user_id, notification_id)
        .await
}

pub async fn cycle_history_impl(state: &AppState) -> Result<Vec<CycleCard>, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    history
        .cycle_history(&session.access_token, &session.user_id)
        .await
}

pub async fn lifetime_stats_impl(state: &AppState) -> Result<LifetimeStats, InfraError> {
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    history
        .lifetime(&session.access_token, &session.user_id)
        .await
}

pub async fn cycle_calendar_impl(
    state: &AppState,
    cycle_id: String,
) -> Result<Vec<DayState>, InfraError> {
    let cycle_id = cycle_id.trim();
    if cycle_id.is_empty() {
        return Err(InfraError::InvalidConfig(
            "cycle_id must not be empty".to_string(),
        ));
    }

    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    history
        .cycle_calendar(&session.access_token, &session.user_id, cycle_id)
        .await
}

pub async fn finish_cycle_impl(
    state: &AppState,
    status: String,
) -> Result<ChallengeCycle, InfraError> {
    let status = parse_finished_status(&status)?;
    let store = Arc::new(routine_store(state)?);
    let session = active_session(state)?;
    let history = history_service(state, store)?;
    let fresh = history
        .finish_cycle(&session.access_token, &session.user_id, status)
        .await?;

    state.log_info(
        "finish_cycle",
        &format!("finished cycle as {status:?}; fresh cycle_id={}", fresh.id),
    );
    Ok(fresh)
}

pub async fn delete_account_data_impl(state: &AppState) -> Result<(), InfraError> {
    let store = routine_store(state)?;
    let session = active_session(state)?;
    store
        .delete_user_data(&session.access_token, &session.user_id)
        .await?;
    state.ledger_cache.clear(&session.user_id)?;
    credential_store(state)?.delete_token()?;

    state.log_info(
        "delete_account_data",
        &format!("wiped store records for user_id={}", session.user_id),
    );
    Ok(())
}

async fn announce_day_completed(
    state: &AppState,
    store: Arc<RestRoutineStore>,
    session: &StoreToken,
) -> Result<(), InfraError> {
    let timezone = configured_timezone(state)?;
    let Some(cycle) = store
        .get_active_cycle(&session.access_token, &session.user_id)
        .await?
    else {
        return Ok(());
    };

    let today = Utc::now().with_timezone(&timezone).date_naive();
    let partners = PartnerService::new(Arc::clone(&store), timezone);
    let cycle_day = resolve_cycle_day(cycle.start_date, today);
    let sent = partners
        .notify_partner(
            &session.access_token,
            &session.user_id,
            PartnerEvent::CompletedDay { cycle_day },
        )
        .await?;
    if !sent {
        return Ok(());
    }

    let since = today - Duration::days(STREAK_LOOKBACK_DAYS);
    let summaries = store
        .list_summaries(&session.access_token, &session.user_id, since)
        .await?;
    let streak = current_streak(&completed_dates(&summaries), today);
    if STREAK_MILESTONES.contains(&streak) {
        partners
            .notify_partner(
                &session.access_token,
                &session.user_id,
                PartnerEvent::StreakReached { days: streak },
            )
            .await?;
    }
    Ok(())
}

fn dashboard_service(
    state: &AppState,
    store: Arc<RestRoutineStore>,
) -> Result<DashboardService<RestRoutineStore, SqliteLedgerCacheRepository>, InfraError> {
    Ok(DashboardService::new(
        store,
        Arc::clone(&state.ledger_cache),
        configured_timezone(state)?,
    ))
}

fn onboarding_service(
    state: &AppState,
    store: Arc<RestRoutineStore>,
) -> Result<OnboardingService<RestRoutineStore>, InfraError> {
    Ok(OnboardingService::new(store, configured_timezone(state)?))
}

fn partner_service(
    state: &AppState,
    store: Arc<RestRoutineStore>,
) -> Result<PartnerService<RestRoutineStore>, InfraError> {
    Ok(PartnerService::new(store, configured_timezone(state)?))
}

fn history_service(
    state: &AppState,
    store: Arc<RestRoutineStore>,
) -> Result<HistoryService<RestRoutineStore>, InfraError> {
    Ok(HistoryService::new(store, configured_timezone(state)?))
}

fn routine_store(state: &AppState) -> Result<RestRoutineStore, InfraError> {
    let Some(settings) = read_store_settings(state.config_dir())? else {
        return Err(InfraError::InvalidConfig(
            "store connection is not configured; set baseUrl and apiKey in config/store.json"
                .to_string(),
        ));
    };
    RestRoutineStore::new(&settings.base_url, &settings.api_key)
}

fn credential_store(state: &AppState) -> Result<KeyringCredentialStore, InfraError> {
    let service = read_token_service(state.config_dir())?;
    let account = read_account_id(state.config_dir())?;
    Ok(KeyringCredentialStore::new(service, account))
}

fn active_session(state: &AppState) -> Result<StoreToken, InfraError> {
    credential_store(state)?.load_token()?.ok_or_else(|| {
        InfraError::Credential("no active session; call connect_account first".to_string())
    })
}

fn configured_timezone(state: &AppState) -> Result<Tz, InfraError> {
    let Some(raw) = read_timezone(state.config_dir())? else {
        return Ok(Tz::UTC);
    };
    raw.parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone identifier: {raw}")))
}

fn parse_block_category(value: &str) -> Result<BlockCategory, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "hygiene" => Ok(BlockCategory::Hygiene),
        "food" => Ok(BlockCategory::Food),
        "workout" => Ok(BlockCategory::Workout),
        "breathwork" => Ok(BlockCategory::Breathwork),
        "wellness" => Ok(BlockCategory::Wellness),
        "mindset" => Ok(BlockCategory::Mindset),
        "travel" => Ok(BlockCategory::Travel),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported block category: {}",
            other
        ))),
    }
}

fn parse_missed_day_resolution(value: &str) -> Result<MissedDayResolution, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "restart" => Ok(MissedDayResolution::Restart),
        "continue" => Ok(MissedDayResolution::Continue),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported missed-day resolution: {}",
            other
        ))),
    }
}

fn parse_finished_status(value: &str) -> Result<CycleStatus, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "completed" => Ok(CycleStatus::Completed),
        "abandoned" => Ok(CycleStatus::Abandoned),
        other => Err(InfraError::InvalidConfig(format!(
            "a cycle can only be finished as completed or abandoned, got: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dawnblock-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            AppState::new(self.path.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn app_state_bootstraps_workspace_layout() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert!(state.config_dir().join("app.json").exists());
        assert!(state.config_dir().join("store.json").exists());
        assert!(state.config_dir().join("defaults.json").exists());
        assert!(state.database_path().exists());
        assert!(workspace.path.join("logs").exists());
    }

    #[test]
    fn command_error_logs_and_returns_message() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let error = InfraError::InvalidConfig("bad input".to_string());
        let message = state.command_error("load_dashboard", &error);
        assert_eq!(message, error.to_string());

        let log = fs::read_to_string(workspace.path.join("logs").join("commands.log"))
            .expect("read command log");
        let line = log.lines().last().expect("at least one log line");
        let entry: serde_json::Value = serde_json::from_str(line).expect("json log line");
        assert_eq!(entry["level"], "error");
        assert_eq!(entry["command"], "load_dashboard");
        assert_eq!(entry["message"], error.to_string());
    }

    #[tokio::test]
    async fn store_commands_require_store_configuration() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        match load_dashboard_impl(&state).await {
            Err(InfraError::InvalidConfig(message)) => {
                assert!(message.contains("not configured"));
            }
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn configure_store_rejects_invalid_url() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let result = configure_store_impl(
            &state,
            "not a base url".to_string(),
            "service-key".to_string(),
        );
        assert!(matches!(result, Err(InfraError::StoreUnavailable(_))));
    }

    #[test]
    fn configure_store_persists_settings() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        configure_store_impl(
            &state,
            "https://store.example.com".to_string(),
            "service-key".to_string(),
        )
        .expect("configure store");

        let settings = read_store_settings(state.config_dir())
            .expect("read settings")
            .expect("settings saved");
        assert_eq!(settings.base_url, "https://store.example.com");
        assert_eq!(settings.api_key, "service-key");
    }

    #[test]
    fn connect_account_rejects_blank_credentials() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let blank_token = connect_account_impl(&state, "   ".to_string(), "user-1".to_string());
        assert!(blank_token.is_err());

        let blank_user = connect_account_impl(&state, "token-1".to_string(), "".to_string());
        assert!(blank_user.is_err());
    }

    #[test]
    fn configured_timezone_defaults_to_utc() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert_eq!(configured_timezone(&state).expect("timezone"), Tz::UTC);
    }

    #[test]
    fn unknown_timezone_identifier_is_rejected() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let app_json = serde_json::json!({
            "schema": 1,
            "appName": "DawnBlock",
            "timezone": "Atlantis/Nowhere",
            "accountId": "default"
        });
        fs::write(
            state.config_dir().join("app.json"),
            serde_json::to_string_pretty(&app_json).expect("serialize app.json"),
        )
        .expect("write app.json");

        assert!(matches!(
            configured_timezone(&state),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parse_block_category_covers_known_names() {
        assert_eq!(
            parse_block_category("Workout").expect("category"),
            BlockCategory::Workout
        );
        assert_eq!(
            parse_block_category(" mindset ").expect("category"),
            BlockCategory::Mindset
        );
        assert!(parse_block_category("gaming").is_err());
    }

    #[test]
    fn parse_missed_day_resolution_accepts_both_choices() {
        assert_eq!(
            parse_missed_day_resolution("restart").expect("resolution"),
            MissedDayResolution::Restart
        );
        assert_eq!(
            parse_missed_day_resolution("Continue").expect("resolution"),
            MissedDayResolution::Continue
        );
        assert!(parse_missed_day_resolution("skip").is_err());
    }

    #[test]
    fn parse_finished_status_rejects_active() {
        assert_eq!(
            parse_finished_status("completed").expect("status"),
            CycleStatus::Completed
        );
        assert_eq!(
            parse_finished_status("abandoned").expect("status"),
            CycleStatus::Abandoned
        );
        assert!(parse_finished_status("active").is_err());
    }

    #[test]
    fn default_seeds_back_onboarding_when_none_are_given() {
        let seeds = default_routine_seeds();
        assert_eq!(seeds.len(), 10);
        assert_eq!(seeds[0].name, "Morning Hygiene");
        assert!(seeds.iter().all(|seed| seed.validate().is_ok()));
    }
}
