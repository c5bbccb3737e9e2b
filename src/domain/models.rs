use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Hygiene,
    Food,
    Workout,
    Breathwork,
    Wellness,
    Mindset,
    Travel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub name: String,
    pub category: BlockCategory,
    pub duration_min: Option<u32>,
    pub sets: Option<u32>,
    pub reps_per_set: Option<u32>,
    pub order: u32,
}

impl Block {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        validate_non_empty(&self.name, "block.name")?;
        validate_duration_rule(
            self.duration_min,
            self.sets,
            self.reps_per_set,
            "block",
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimedBlock {
    pub block: Block,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockSeed {
    pub name: String,
    pub category: BlockCategory,
    pub duration_min: Option<u32>,
    pub sets: Option<u32>,
    pub reps_per_set: Option<u32>,
}

impl BlockSeed {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "seed.name")?;
        validate_duration_rule(self.duration_min, self.sets, self.reps_per_set, "seed")
    }
}

pub fn default_routine_seeds() -> Vec<BlockSeed> {
    fn timed(name: &str, category: BlockCategory, minutes: u32) -> BlockSeed {
        BlockSeed {
            name: name.to_string(),
            category,
            duration_min: Some(minutes),
            sets: None,
            reps_per_set: None,
        }
    }

    fn repped(name: &str, category: BlockCategory, sets: u32, reps: u32) -> BlockSeed {
        BlockSeed {
            name: name.to_string(),
            category,
            duration_min: None,
            sets: Some(sets),
            reps_per_set: Some(reps),
        }
    }

    vec![
        timed("Morning Hygiene", BlockCategory::Hygiene, 30),
        timed("Breakfast", BlockCategory::Food, 20),
        timed("HIIT Sprints", BlockCategory::Workout, 20),
        repped("Push-ups", BlockCategory::Workout, 5, 10),
        repped("Bodyweight Squats", BlockCategory::Workout, 5, 10),
        timed("Breathwork", BlockCategory::Breathwork, 20),
        timed("Meditation", BlockCategory::Wellness, 10),
        timed("Journaling", BlockCategory::Mindset, 10),
        timed("Reading", BlockCategory::Mindset, 10),
        timed("Commute", BlockCategory::Travel, 20),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub arrival_time: String,
    pub onboarding_complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.arrival_time, "profile.arrival_time")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCompletion {
    pub block_id: String,
    pub date: NaiveDate,
}

impl DailyCompletion {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.block_id, "completion.block_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub is_complete: bool,
    pub was_missed: bool,
}

impl DailySummary {
    pub fn validate(&self) -> Result<(), String> {
        if self.is_complete && self.was_missed {
            return Err("summary.is_complete and summary.was_missed are exclusive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeCycle {
    pub id: String,
    pub start_date: NaiveDate,
    pub total_resets: u32,
    pub status: CycleStatus,
    pub end_date: Option<NaiveDate>,
    pub template_id: Option<String>,
    pub playlist_id: Option<String>,
}

impl ChallengeCycle {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "cycle.id")?;
        match (self.status, self.end_date) {
            (CycleStatus::Active, Some(_)) => {
                Err("cycle.end_date must be absent while the cycle is active".to_string())
            }
            (CycleStatus::Completed | CycleStatus::Abandoned, None) => {
                Err("cycle.end_date is required once the cycle is finished".to_string())
            }
            (_, Some(end)) if end < self.start_date => {
                Err("cycle.end_date must not precede cycle.start_date".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartEvent {
    pub id: String,
    pub cycle_id: String,
    pub occurred_on: NaiveDate,
    pub prior_start_date: NaiveDate,
}

impl RestartEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "restart.id")?;
        validate_non_empty(&self.cycle_id, "restart.cycle_id")?;
        if self.occurred_on < self.prior_start_date {
            return Err("restart.occurred_on must not precede the abandoned start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineTemplate {
    pub id: String,
    pub name: String,
    pub arrival_time: String,
    pub blocks: Vec<BlockSeed>,
    pub created_at: DateTime<Utc>,
}

impl RoutineTemplate {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "template.id")?;
        validate_non_empty(&self.name, "template.name")?;
        validate_hhmm(&self.arrival_time, "template.arrival_time")?;
        if self.blocks.is_empty() {
            return Err("template.blocks must not be empty".to_string());
        }
        for seed in &self.blocks {
            seed.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistVideo {
    pub url: String,
    pub video_id: String,
    pub day_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub is_public: bool,
    pub videos: Vec<PlaylistVideo>,
    pub times_used: u32,
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "playlist.id")?;
        validate_non_empty(&self.name, "playlist.name")?;
        if self.videos.len() != crate::domain::cycle::CYCLE_DAYS as usize {
            return Err(format!(
                "playlist.videos must hold exactly {} entries",
                crate::domain::cycle::CYCLE_DAYS
            ));
        }
        for video in &self.videos {
            validate_non_empty(&video.video_id, "playlist.videos[].video_id")?;
            if video.day_number < 1 || video.day_number > crate::domain::cycle::CYCLE_DAYS {
                return Err("playlist.videos[].day_number must be within the cycle".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartnershipStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partnership {
    pub id: String,
    pub user_id: String,
    pub partner_id: String,
    pub status: PartnershipStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Partnership {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "partnership.id")?;
        validate_non_empty(&self.user_id, "partnership.user_id")?;
        validate_non_empty(&self.partner_id, "partnership.partner_id")?;
        if self.user_id == self.partner_id {
            return Err("partnership.partner_id must differ from partnership.user_id".to_string());
        }
        if self.status == PartnershipStatus::Pending && self.accepted_at.is_some() {
            return Err("partnership.accepted_at must be absent while pending".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PartnerCompleted,
    PartnerMissed,
    PartnerStreak,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "notification.id")?;
        validate_non_empty(&self.message, "notification.message")
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

fn validate_duration_rule(
    duration_min: Option<u32>,
    sets: Option<u32>,
    reps_per_set: Option<u32>,
    prefix: &str,
) -> Result<(), String> {
    if duration_min.is_some() && sets.is_some() {
        return Err(format!(
            "{prefix}.duration_min and {prefix}.sets are mutually exclusive"
        ));
    }
    if let Some(minutes) = duration_min {
        if minutes == 0 {
            return Err(format!("{prefix}.duration_min must be > 0"));
        }
    }
    if let Some(set_count) = sets {
        if set_count == 0 {
            return Err(format!("{prefix}.sets must be > 0"));
        }
    }
    if reps_per_set.is_some() && sets.is_none() {
        return Err(format!("{prefix}.reps_per_set requires {prefix}.sets"));
    }
    if let Some(reps) = reps_per_set {
        if reps == 0 {
            return Err(format!("{prefix}.reps_per_set must be > 0"));
        }
    }
    Ok(())
}
