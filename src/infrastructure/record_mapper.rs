use crate::domain::models::{
    Block, BlockCategory, BlockSeed, ChallengeCycle, CycleStatus, DailyCompletion, DailySummary,
    Notification, NotificationKind, Partnership, PartnershipStatus, Playlist, PlaylistVideo,
    Profile, RestartEvent, RoutineTemplate,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: BlockCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps_per_set: Option<u32>,
    pub order: u32,
}

pub fn encode_block(user_id: &str, block: &Block) -> BlockRow {
    BlockRow {
        id: block.id.clone(),
        user_id: user_id.to_string(),
        name: block.name.clone(),
        category: block.category,
        duration_min: block.duration_min,
        sets: block.sets,
        reps_per_set: block.reps_per_set,
        order: block.order,
    }
}

pub fn decode_block(row: BlockRow) -> Result<Block, InfraError> {
    let block = Block {
        id: row.id,
        name: row.name,
        category: row.category,
        duration_min: row.duration_min,
        sets: row.sets,
        reps_per_set: row.reps_per_set,
        order: row.order,
    };
    block.validate().map_err(InfraError::InvalidRecord)?;
    Ok(block)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRow {
    pub user_id: String,
    pub arrival_time: String,
    pub onboarding_complete: bool,
    pub updated_at: DateTime<Utc>,
}

pub fn encode_profile(user_id: &str, profile: &Profile) -> ProfileRow {
    ProfileRow {
        user_id: user_id.to_string(),
        arrival_time: profile.arrival_time.clone(),
        onboarding_complete: profile.onboarding_complete,
        updated_at: profile.updated_at,
    }
}

pub fn decode_profile(row: ProfileRow) -> Result<Profile, InfraError> {
    let profile = Profile {
        arrival_time: row.arrival_time,
        onboarding_complete: row.onboarding_complete,
        updated_at: row.updated_at,
    };
    profile.validate().map_err(InfraError::InvalidRecord)?;
    Ok(profile)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRow {
    pub user_id: String,
    pub block_id: String,
    pub date: NaiveDate,
}

pub fn encode_completion(user_id: &str, completion: &DailyCompletion) -> CompletionRow {
    CompletionRow {
        user_id: user_id.to_string(),
        block_id: completion.block_id.clone(),
        date: completion.date,
    }
}

pub fn decode_completion(row: CompletionRow) -> Result<DailyCompletion, InfraError> {
    let completion = DailyCompletion {
        block_id: row.block_id,
        date: row.date,
    };
    completion.validate().map_err(InfraError::InvalidRecord)?;
    Ok(completion)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub user_id: String,
    pub date: NaiveDate,
    pub is_complete: bool,
    pub was_missed: bool,
}

pub fn encode_summary(user_id: &str, summary: &DailySummary) -> SummaryRow {
    SummaryRow {
        user_id: user_id.to_string(),
        date: summary.date,
        is_complete: summary.is_complete,
        was_missed: summary.was_missed,
    }
}

pub fn decode_summary(row: SummaryRow) -> Result<DailySummary, InfraError> {
    let summary = DailySummary {
        date: row.date,
        is_complete: row.is_complete,
        was_missed: row.was_missed,
    };
    summary.validate().map_err(InfraError::InvalidRecord)?;
    Ok(summary)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleRow {
    pub id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub total_resets: u32,
    pub status: CycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

pub fn encode_cycle(user_id: &str, cycle: &ChallengeCycle) -> CycleRow {
    CycleRow {
        id: cycle.id.clone(),
        user_id: user_id.to_string(),
        start_date: cycle.start_date,
        total_resets: cycle.total_resets,
        status: cycle.status,
        end_date: cycle.end_date,
        template_id: cycle.template_id.clone(),
        playlist_id: cycle.playlist_id.clone(),
    }
}

pub fn decode_cycle(row: CycleRow) -> Result<ChallengeCycle, InfraError> {
    let cycle = ChallengeCycle {
        id: row.id,
        start_date: row.start_date,
        total_resets: row.total_resets,
        status: row.status,
        end_date: row.end_date,
        template_id: row.template_id,
        playlist_id: row.playlist_id,
    };
    cycle.validate().map_err(InfraError::InvalidRecord)?;
    Ok(cycle)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartEventRow {
    pub id: String,
    pub user_id: String,
    pub cycle_id: String,
    pub occurred_on: NaiveDate,
    pub prior_start_date: NaiveDate,
}

pub fn encode_restart_event(user_id: &str, event: &RestartEvent) -> RestartEventRow {
    RestartEventRow {
        id: event.id.clone(),
        user_id: user_id.to_string(),
        cycle_id: event.cycle_id.clone(),
        occurred_on: event.occurred_on,
        prior_start_date: event.prior_start_date,
    }
}

pub fn decode_restart_event(row: RestartEventRow) -> Result<RestartEvent, InfraError> {
    let event = RestartEvent {
        id: row.id,
        cycle_id: row.cycle_id,
        occurred_on: row.occurred_on,
        prior_start_date: row.prior_start_date,
    };
    event.validate().map_err(InfraError::InvalidRecord)?;
    Ok(event)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub arrival_time: String,
    pub blocks: Vec<BlockSeed>,
    pub created_at: DateTime<Utc>,
}

pub fn encode_template(user_id: &str, template: &RoutineTemplate) -> TemplateRow {
    TemplateRow {
        id: template.id.clone(),
        user_id: user_id.to_string(),
        name: template.name.clone(),
        arrival_time: template.arrival_time.clone(),
        blocks: template.blocks.clone(),
        created_at: template.created_at,
    }
}

pub fn decode_template(row: TemplateRow) -> Result<RoutineTemplate, InfraError> {
    let template = RoutineTemplate {
        id: row.id,
        name: row.name,
        arrival_time: row.arrival_time,
        blocks: row.blocks,
        created_at: row.created_at,
    };
    template.validate().map_err(InfraError::InvalidRecord)?;
    Ok(template)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_public: bool,
    pub videos: Vec<PlaylistVideo>,
    pub times_used: u32,
    pub created_at: DateTime<Utc>,
}

pub fn encode_playlist(user_id: &str, playlist: &Playlist) -> PlaylistRow {
    PlaylistRow {
        id: playlist.id.clone(),
        user_id: user_id.to_string(),
        name: playlist.name.clone(),
        is_public: playlist.is_public,
        videos: playlist.videos.clone(),
        times_used: playlist.times_used,
        created_at: playlist.created_at,
    }
}

pub fn decode_playlist(row: PlaylistRow) -> Result<Playlist, InfraError> {
    let playlist = Playlist {
        id: row.id,
        name: row.name,
        is_public: row.is_public,
        videos: row.videos,
        times_used: row.times_used,
        created_at: row.created_at,
    };
    playlist.validate().map_err(InfraError::InvalidRecord)?;
    Ok(playlist)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartnershipRow {
    pub id: String,
    pub user_id: String,
    pub partner_id: String,
    pub status: PartnershipStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

pub fn encode_partnership(partnership: &Partnership) -> PartnershipRow {
    PartnershipRow {
        id: partnership.id.clone(),
        user_id: partnership.user_id.clone(),
        partner_id: partnership.partner_id.clone(),
        status: partnership.status,
        created_at: partnership.created_at,
        accepted_at: partnership.accepted_at,
    }
}

pub fn decode_partnership(row: PartnershipRow) -> Result<Partnership, InfraError> {
    let partnership = Partnership {
        id: row.id,
        user_id: row.user_id,
        partner_id: row.partner_id,
        status: row.status,
        created_at: row.created_at,
        accepted_at: row.accepted_at,
    };
    partnership.validate().map_err(InfraError::InvalidRecord)?;
    Ok(partnership)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub fn encode_notification(user_id: &str, notification: &Notification) -> NotificationRow {
    NotificationRow {
        id: notification.id.clone(),
        user_id: user_id.to_string(),
        kind: notification.kind,
        message: notification.message.clone(),
        is_read: notification.is_read,
        created_at: notification.created_at,
    }
}

pub fn decode_notification(row: NotificationRow) -> Result<Notification, InfraError> {
    let notification = Notification {
        id: row.id,
        kind: row.kind,
        message: row.message,
        is_read: row.is_read,
        created_at: row.created_at,
    };
    notification.validate().map_err(InfraError::InvalidRecord)?;
    Ok(notification)
}
