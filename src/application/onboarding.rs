use crate::application::{default_id_provider, IdProvider, NowProvider};
use crate::domain::models::{
    Block, BlockSeed, ChallengeCycle, CycleStatus, Profile, RoutineTemplate,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store_client::RoutineStore;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

const FIRST_TEMPLATE_NAME: &str = "My First Routine";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "cycle_id", rename_all = "snake_case")]
pub enum EnsureCycleResult {
    Reused(String),
    Created(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FirstTemplateOutcome {
    Saved,
    AlreadyPresent,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OnboardingOutcome {
    pub blocks: Vec<Block>,
    pub cycle: EnsureCycleResult,
    pub first_template: FirstTemplateOutcome,
}

pub struct OnboardingService<S>
where
    S: RoutineStore,
{
    store: Arc<S>,
    timezone: Tz,
    now_provider: NowProvider,
    id_provider: IdProvider,
}

impl<S> OnboardingService<S>
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

    /// Writes the profile, the routine blocks, and an active cycle in one
    /// pass. The first-template snapshot is auxiliary and never fails the
    /// onboarding itself.
    pub async fn complete_onboarding(
        &self,
        access_token: &str,
        user_id: &str,
        arrival_time: &str,
        seeds: &[BlockSeed],
    ) -> Result<OnboardingOutcome, InfraError> {
        if seeds.is_empty() {
            return Err(InfraError::InvalidRecord(
                "routine must contain at least one block".to_string(),
            ));
        }
        let profile = Profile {
            arrival_time: arrival_time.to_string(),
            onboarding_complete: true,
            updated_at: (self.now_provider)(),
        };
        profile.validate().map_err(InfraError::InvalidRecord)?;
        let blocks = self.blocks_from_seeds(seeds)?;

        self.store
            .save_profile(access_token, user_id, &profile)
            .await?;
        self.store
            .replace_blocks(access_token, user_id, &blocks)
            .await?;
        let cycle = self.ensure_active_cycle(access_token, user_id).await?;
        let first_template = self
            .auto_save_first_template(access_token, user_id, arrival_time, seeds)
            .await;

        Ok(OnboardingOutcome {
            blocks,
            cycle,
            first_template,
        })
    }

    pub async fn ensure_active_cycle(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<EnsureCycleResult, InfraError> {
        if let Some(cycle) = self.store.get_active_cycle(access_token, user_id).await? {
            return Ok(EnsureCycleResult::Reused(cycle.id));
        }

        let cycle = ChallengeCycle {
            id: (self.id_provider)("cyc"),
            start_date: self.today(),
            total_resets: 0,
            status: CycleStatus::Active,
            end_date: None,
            template_id: None,
            playlist_id: None,
        };
        self.store.insert_cycle(access_token, user_id, &cycle).await?;
        Ok(EnsureCycleResult::Created(cycle.id))
    }

    pub async fn add_block(
        &self,
        access_token: &str,
        user_id: &str,
        seed: BlockSeed,
    ) -> Result<Vec<Block>, InfraError> {
        seed.validate().map_err(InfraError::InvalidRecord)?;

        let mut blocks = self.store.list_blocks(access_token, user_id).await?;
        let order = blocks.len() as u32;
        blocks.push(Block {
            id: (self.id_provider)("blk"),
            name: seed.name,
            category: seed.category,
            duration_min: seed.duration_min,
            sets: seed.sets,
            reps_per_set: seed.reps_per_set,
            order,
        });
        reindex(&mut blocks);
        self.store
            .replace_blocks(access_token, user_id, &blocks)
            .await?;
        Ok(blocks)
    }

    pub async fn delete_block(
        &self,
        access_token: &str,
        user_id: &str,
        block_id: &str,
    ) -> Result<Vec<Block>, InfraError> {
        let mut blocks = self.store.list_blocks(access_token, user_id).await?;
        let before = blocks.len();
        blocks.retain(|block| block.id != block_id);
        if blocks.len() == before {
            return Err(InfraError::InconsistentState(format!(
                "block {block_id} is not part of the current routine"
            )));
        }
        reindex(&mut blocks);
        self.store
            .replace_blocks(access_token, user_id, &blocks)
            .await?;
        Ok(blocks)
    }

    pub async fn reorder_blocks(
        &self,
        access_token: &str,
        user_id: &str,
        ordered_ids: &[String],
    ) -> Result<Vec<Block>, InfraError> {
        let blocks = self.store.list_blocks(access_token, user_id).await?;
        let known: BTreeSet<&str> = blocks.iter().map(|block| block.id.as_str()).collect();
        let requested: BTreeSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        if requested.len() != ordered_ids.len() || requested != known {
            return Err(InfraError::InconsistentState(
                "reorder list must name every routine block exactly once".to_string(),
            ));
        }

        let mut reordered: Vec<Block> = ordered_ids
            .iter()
            .filter_map(|id| blocks.iter().find(|block| &block.id == id).cloned())
            .collect();
        reindex(&mut reordered);
        self.store
            .replace_blocks(access_token, user_id, &reordered)
            .await?;
        Ok(reordered)
    }

    pub async fn update_arrival_time(
        &self,
        access_token: &str,
        user_id: &str,
        arrival_time: &str,
    ) -> Result<Profile, InfraError> {
        let existing = self
            .store
            .get_profile(access_token, user_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState("no profile exists for this user".to_string())
            })?;

        let profile = Profile {
            arrival_time: arrival_time.to_string(),
            onboarding_complete: existing.onboarding_complete,
            updated_at: (self.now_provider)(),
        };
        profile.validate().map_err(InfraError::InvalidRecord)?;
        self.store
            .save_profile(access_token, user_id, &profile)
            .await?;
        Ok(profile)
    }

    pub async fn save_current_as_template(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<RoutineTemplate, InfraError> {
        let profile = self
            .store
            .get_profile(access_token, user_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState("no profile exists for this user".to_string())
            })?;
        let blocks = self.store.list_blocks(access_token, user_id).await?;
        if blocks.is_empty() {
            return Err(InfraError::InconsistentState(
                "no routine blocks to snapshot".to_string(),
            ));
        }

        let template = RoutineTemplate {
            id: (self.id_provider)("tpl"),
            name: name.to_string(),
            arrival_time: profile.arrival_time,
            blocks: seeds_from_blocks(&blocks),
            created_at: (self.now_provider)(),
        };
        template.validate().map_err(InfraError::InvalidRecord)?;
        self.store
            .insert_template(access_token, user_id, &template)
            .await?;
        Ok(template)
    }

    /// Replaces the routine wholesale and starts a fresh cycle linked to
    /// the template. A cycle already underway is closed as abandoned.
    pub async fn apply_template(
        &self,
        access_token: &str,
        user_id: &str,
        template_id: &str,
    ) -> Result<ChallengeCycle, InfraError> {
        let template = self
            .store
            .get_template(access_token, user_id, template_id)
            .await?
            .ok_or_else(|| {
                InfraError::InconsistentState(format!("template {template_id} not found"))
            })?;

        let blocks = self.blocks_from_seeds(&template.blocks)?;
        self.store
            .replace_blocks(access_token, user_id, &blocks)
            .await?;

        let onboarding_complete = self
            .store
            .get_profile(access_token, user_id)
            .await?
            .map_or(true, |existing| existing.onboarding_complete);
        let profile = Profile {
            arrival_time: template.arrival_time.clone(),
            onboarding_complete,
            updated_at: (self.now_provider)(),
        };
        profile.validate().map_err(InfraError::InvalidRecord)?;
        self.store
            .save_profile(access_token, user_id, &profile)
            .await?;

        let today = self.today();
        if let Some(active) = self.store.get_active_cycle(access_token, user_id).await? {
            let closed = ChallengeCycle {
                status: CycleStatus::Abandoned,
                end_date: Some(today),
                ..active
            };
            self.store.update_cycle(access_token, user_id, &closed).await?;
        }

        let cycle = ChallengeCycle {
            id: (self.id_provider)("cyc"),
            start_date: today,
            total_resets: 0,
            status: CycleStatus::Active,
            end_date: None,
            template_id: Some(template.id.clone()),
            playlist_id: None,
        };
        self.store.insert_cycle(access_token, user_id, &cycle).await?;
        Ok(cycle)
    }

    async fn auto_save_first_template(
        &self,
        access_token: &str,
        user_id: &str,
        arrival_time: &str,
        seeds: &[BlockSeed],
    ) -> FirstTemplateOutcome {
        match self.store.list_templates(access_token, user_id).await {
            Ok(existing) if !existing.is_empty() => return FirstTemplateOutcome::AlreadyPresent,
            Ok(_) => {}
            Err(_) => return FirstTemplateOutcome::Failed,
        }

        let template = RoutineTemplate {
            id: (self.id_provider)("tpl"),
            name: FIRST_TEMPLATE_NAME.to_string(),
            arrival_time: arrival_time.to_string(),
            blocks: seeds.to_vec(),
            created_at: (self.now_provider)(),
        };
        match self
            .store
            .insert_template(access_token, user_id, &template)
            .await
        {
            Ok(()) => FirstTemplateOutcome::Saved,
            Err(_) => FirstTemplateOutcome::Failed,
        }
    }

    fn blocks_from_seeds(&self, seeds: &[BlockSeed]) -> Result<Vec<Block>, InfraError> {
        let mut blocks = Vec::with_capacity(seeds.len());
        for (index, seed) in seeds.iter().enumerate() {
            seed.validate().map_err(InfraError::InvalidRecord)?;
            blocks.push(Block {
                id: (self.id_provider)("blk"),
                name: seed.name.clone(),
                category: seed.category,
                duration_min: seed.duration_min,
                sets: seed.sets,
                reps_per_set: seed.reps_per_set,
                order: index as u32,
            });
        }
        Ok(blocks)
    }
}

fn reindex(blocks: &mut [Block]) {
    for (index, block) in blocks.iter_mut().enumerate() {
        block.order = index as u32;
    }
}

fn seeds_from_blocks(blocks: &[Block]) -> Vec<BlockSeed> {
    blocks
        .iter()
        .map(|block| BlockSeed {
            name: block.name.clone(),
            category: block.category,
            duration_min: block.duration_min,
            sets: block.sets,
            reps_per_set: block.reps_per_set,
        })
        .collect()
}
