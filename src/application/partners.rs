use crate::application::{default_id_provider, IdProvider, NowProvider};
use crate::domain::cycle::resolve_cycle_day;
use crate::domain::models::{Notification, NotificationKind, Partnership, PartnershipStatus};
use crate::domain::stats::{completed_dates, current_streak};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::store_client::RoutineStore;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerEvent {
    CompletedDay { cycle_day: u32 },
    MissedDay,
    StreakReached { days: u32 },
}

impl PartnerEvent {
    fn kind(self) -> NotificationKind {
        match self {
            PartnerEvent::CompletedDay { .. } => NotificationKind::PartnerCompleted,
            PartnerEvent::MissedDay => NotificationKind::PartnerMissed,
            PartnerEvent::StreakReached { .. } => NotificationKind::PartnerStreak,
        }
    }

    fn message(self) -> String {
        match self {
            PartnerEvent::CompletedDay { cycle_day } => {
                format!("Your partner completed day {cycle_day} of their routine")
            }
            PartnerEvent::MissedDay => {
                "Your partner missed a day and chose to continue".to_string()
            }
            PartnerEvent::StreakReached { days } => {
                format!("Your partner is on a {days}-day streak")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartnerProgress {
    pub cycle_day: u32,
    pub current_streak: u32,
    pub today_complete: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartnerSummary {
    pub partner_user_id: String,
    pub partners_since: DateTime<Utc>,
    pub progress: Option<PartnerProgress>,
}

pub struct PartnerService<S>
where
    S: RoutineStore,
{
    store: Arc<S>,
    timezone: Tz,
    now_provider: NowProvider,
    id_provider: IdProvider,
}

impl<S> PartnerService<S>
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

    pub async fn invite_partner(
        &self,
        access_token: &str,
        user_id: &str,
        partner_id: &str,
    ) -> Result<Partnership, InfraError> {
        if partner_id.trim().is_empty() {
            return Err(InfraError::InvalidRecord(
                "partnership.partner_id must not be empty".to_string(),
            ));
        }
        if partner_id == user_id {
            return Err(InfraError::InvalidRecord(
                "you cannot invite yourself".to_string(),
            ));
        }

        let existing = self.store.list_partnerships(access_token, user_id).await?;
        if existing.iter().any(|pair| involves(pair, partner_id)) {
            return Err(InfraError::InconsistentState(
                "a pending or active partnership with this user already exists".to_string(),
            ));
        }

        let partnership = Partnership {
            id: (self.id_provider)("par"),
            user_id: user_id.to_string(),
            partner_id: partner_id.to_string(),
            status: PartnershipStatus::Pending,
            created_at: (self.now_provider)(),
            accepted_at: None,
        };
        self.store
            .insert_partnership(access_token, &partnership)
            .await?;
        Ok(partnership)
    }

    /// Invitations addressed to this user that nobody has answered yet.
    pub async fn pending_invites(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Partnership>, InfraError> {
        let partnerships = self.store.list_partnerships(access_token, user_id).await?;
        Ok(partnerships
            .into_iter()
            .filter(|pair| {
                pair.status == PartnershipStatus::Pending && pair.partner_id == user_id
            })
            .collect())
    }

    pub async fn accept_invite(
        &self,
        access_token: &str,
        user_id: &str,
        partnership_id: &str,
    ) -> Result<Partnership, InfraError> {
        let pending = self
            .find_pending(access_token, user_id, partnership_id)
            .await?;
        if pending.partner_id != user_id {
            return Err(InfraError::InconsistentState(
                "only the invited user can accept an invitation".to_string(),
            ));
        }

        let accepted = Partnership {
            status: PartnershipStatus::Accepted,
            accepted_at: Some((self.now_provider)()),
            ..pending
        };
        self.store
            .update_partnership(access_token, &accepted)
            .await?;
        Ok(accepted)
    }

    pub async fn decline_invite(
        &self,
        access_token: &str,
        user_id: &str,
        partnership_id: &str,
    ) -> Result<(), InfraError> {
        let pending = self
            .find_pending(access_token, user_id, partnership_id)
            .await?;
        self.store
            .delete_partnership(access_token, &pending.id)
            .await
    }

    pub async fn remove_partner(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<(), InfraError> {
        let Some(accepted) = self.current_partner(access_token, user_id).await? else {
            return Err(InfraError::InconsistentState(
                "no accepted partnership to remove".to_string(),
            ));
        };
        self.store
            .delete_partnership(access_token, &accepted.id)
            .await
    }

    pub async fn current_partner(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Partnership>, InfraError> {
        let partnerships = self.store.list_partnerships(access_token, user_id).await?;
        Ok(partnerships
            .into_iter()
            .find(|pair| pair.status == PartnershipStatus::Accepted))
    }

    /// Where the partner stands today: cycle day, streak within the current
    /// cycle, and whether their routine is already done. No progress is
    /// reported while the partner has no active cycle.
    pub async fn partner_summary(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<PartnerSummary>, InfraError> {
        let Some(partnership) = self.current_partner(access_token, user_id).await? else {
            return Ok(None);
        };
        let partner_user_id = other_side(&partnership, user_id).to_string();

        let Some(cycle) = self
            .store
            .get_active_cycle(access_token, &partner_user_id)
            .await?
        else {
            return Ok(Some(PartnerSummary {
                partner_user_id,
                partners_since: partnership.created_at,
                progress: None,
            }));
        };

        let today = self.today();
        let summaries = self
            .store
            .list_summaries(access_token, &partner_user_id, cycle.start_date)
            .await?;
        let completed = completed_dates(&summaries);

        Ok(Some(PartnerSummary {
            partner_user_id,
            partners_since: partnership.created_at,
            progress: Some(PartnerProgress {
                cycle_day: resolve_cycle_day(cycle.start_date, today),
                current_streak: current_streak(&completed, today),
                today_complete: completed.contains(&today),
            }),
        }))
    }

    /// Records the event on the accepted partner's notification feed.
    /// Returns false when there is no partner to notify.
    pub async fn notify_partner(
        &self,
        access_token: &str,
        user_id: &str,
        event: PartnerEvent,
    ) -> Result<bool, InfraError> {
        let Some(partnership) = self.current_partner(access_token, user_id).await? else {
            return Ok(false);
        };
        let partner_user_id = other_side(&partnership, user_id).to_string();

        let notification = Notification {
            id: (self.id_provider)("ntf"),
            kind: event.kind(),
            message: event.message(),
            is_read: false,
            created_at: (self.now_provider)(),
        };
        self.store
            .insert_notification(access_token, &partner_user_id, &notification)
            .await?;
        Ok(true)
    }

    async fn find_pending(
        &self,
        access_token: &str,
        user_id: &str,
        partnership_id: &str,
    ) -> Result<Partnership, InfraError> {
        let partnerships = self.store.list_partnerships(access_token, user_id).await?;
        let Some(found) = partnerships
            .into_iter()
            .find(|pair| pair.id == partnership_id)
        else {
            return Err(InfraError::InconsistentState(format!(
                "partnership {partnership_id} not found"
            )));
        };
        if found.status != PartnershipStatus::Pending {
            return Err(InfraError::InconsistentState(
                "only a pending invitation can be answered".to_string(),
            ));
        }
        Ok(found)
    }
}

fn involves(pair: &Partnership, candidate: &str) -> bool {
    pair.user_id == candidate || pair.partner_id == candidate
}

fn other_side<'a>(pair: &'a Partnership, user_id: &str) -> &'a str {
    if pair.user_id == user_id {
        &pair.partner_id
    } else {
        &pair.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ChallengeCycle, CycleStatus, DailySummary};
    use crate::infrastructure::memory_store::InMemoryRoutineStore;

    const ACCESS: &str = "token-1";
    const USER: &str = "user-1";
    const PARTNER: &str = "user-2";

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T08:40:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn service(store: &Arc<InMemoryRoutineStore>) -> PartnerService<InMemoryRoutineStore> {
        PartnerService::new(Arc::clone(store), chrono_tz::UTC)
            .with_now_provider(Arc::new(fixed_now))
            .with_id_provider(Arc::new(|prefix: &str| format!("{prefix}-test")))
    }

    async fn seed_accepted_pair(store: &Arc<InMemoryRoutineStore>) {
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-1".to_string(),
                    user_id: USER.to_string(),
                    partner_id: PARTNER.to_string(),
                    status: PartnershipStatus::Accepted,
                    created_at: fixed_now(),
                    accepted_at: Some(fixed_now()),
                },
            )
            .await
            .expect("seed partnership");
    }

    #[tokio::test]
    async fn invite_creates_pending_partnership() {
        let store = Arc::new(InMemoryRoutineStore::new());

        let partnership = service(&store)
            .invite_partner(ACCESS, USER, PARTNER)
            .await
            .expect("invite");

        assert_eq!(partnership.id, "par-test");
        assert_eq!(partnership.user_id, USER);
        assert_eq!(partnership.partner_id, PARTNER);
        assert_eq!(partnership.status, PartnershipStatus::Pending);
        assert_eq!(partnership.accepted_at, None);

        let stored = store
            .list_partnerships(ACCESS, USER)
            .await
            .expect("read partnerships");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn invite_rejects_self_invitation() {
        let store = Arc::new(InMemoryRoutineStore::new());

        let error = service(&store)
            .invite_partner(ACCESS, USER, USER)
            .await
            .expect_err("self invite");

        assert!(matches!(error, InfraError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn invite_rejects_duplicate_in_either_direction() {
        let store = Arc::new(InMemoryRoutineStore::new());
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-reverse".to_string(),
                    user_id: PARTNER.to_string(),
                    partner_id: USER.to_string(),
                    status: PartnershipStatus::Pending,
                    created_at: fixed_now(),
                    accepted_at: None,
                },
            )
            .await
            .expect("seed reverse pair");

        let error = service(&store)
            .invite_partner(ACCESS, USER, PARTNER)
            .await
            .expect_err("duplicate invite");

        assert!(matches!(error, InfraError::InconsistentState(_)));
    }

    #[tokio::test]
    async fn pending_invites_lists_only_incoming_invitations() {
        let store = Arc::new(InMemoryRoutineStore::new());
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-incoming".to_string(),
                    user_id: PARTNER.to_string(),
                    partner_id: USER.to_string(),
                    status: PartnershipStatus::Pending,
                    created_at: fixed_now(),
                    accepted_at: None,
                },
            )
            .await
            .expect("seed incoming");
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-outgoing".to_string(),
                    user_id: USER.to_string(),
                    partner_id: "user-3".to_string(),
                    status: PartnershipStatus::Pending,
                    created_at: fixed_now(),
                    accepted_at: None,
                },
            )
            .await
            .expect("seed outgoing");

        let invites = service(&store)
            .pending_invites(ACCESS, USER)
            .await
            .expect("list invites");

        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].id, "par-incoming");
    }

    #[tokio::test]
    async fn accepting_invite_stamps_acceptance_time() {
        let store = Arc::new(InMemoryRoutineStore::new());
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-1".to_string(),
                    user_id: PARTNER.to_string(),
                    partner_id: USER.to_string(),
                    status: PartnershipStatus::Pending,
                    created_at: fixed_now(),
                    accepted_at: None,
                },
            )
            .await
            .expect("seed invite");

        let accepted = service(&store)
            .accept_invite(ACCESS, USER, "par-1")
            .await
            .expect("accept");

        assert_eq!(accepted.status, PartnershipStatus::Accepted);
        assert_eq!(accepted.accepted_at, Some(fixed_now()));

        let stored = store
            .list_partnerships(ACCESS, USER)
            .await
            .expect("read partnerships");
        assert_eq!(stored[0].status, PartnershipStatus::Accepted);
    }

    #[tokio::test]
    async fn inviter_cannot_accept_own_invitation() {
        let store = Arc::new(InMemoryRoutineStore::new());
        service(&store)
            .invite_partner(ACCESS, USER, PARTNER)
            .await
            .expect("invite");

        let error = service(&store)
            .accept_invite(ACCESS, USER, "par-test")
            .await
            .expect_err("inviter accepting");

        assert!(matches!(error, InfraError::InconsistentState(_)));
    }

    #[tokio::test]
    async fn declining_invite_deletes_pending_record() {
        let store = Arc::new(InMemoryRoutineStore::new());
        store
            .insert_partnership(
                ACCESS,
                &Partnership {
                    id: "par-1".to_string(),
                    user_id: PARTNER.to_string(),
                    partner_id: USER.to_string(),
                    status: PartnershipStatus::Pending,
                    created_at: fixed_now(),
                    accepted_at: None,
                },
            )
            .await
            .expect("seed invite");

        service(&store)
            .decline_invite(ACCESS, USER, "par-1")
            .await
            .expect("decline");

        let stored = store
            .list_partnerships(ACCESS, USER)
            .await
            .expect("read partnerships");
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn remove_partner_deletes_accepted_pair_from_either_side() {
        let store = Arc::new(InMemoryRoutineStore::new());
        seed_accepted_pair(&store).await;

        service(&store)
            .remove_partner(ACCESS, PARTNER)
            .await
            .expect("remove from invited side");

        let stored = store
            .list_partnerships(ACCESS, USER)
            .await
            .expect("read partnerships");
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn remove_partner_requires_accepted_pair() {
        let store = Arc::new(InMemoryRoutineStore::new());
        service(&store)
            .invite_partner(ACCESS, USER, PARTNER)
            .await
            .expect("invite");

        let error = service(&store)
            .remove_partner(ACCESS, USER)
            .await
            .expect_err("pending only");

        assert!(matches!(error, InfraError::InconsistentState(_)));
    }

    #[tokio::test]
    async fn partner_summary_reports_cycle_progress() {
        let store = Arc::new(InMemoryRoutineStore::new());
        seed_accepted_pair(&store).await;
        store
            .insert_cycle(
                ACCESS,
                PARTNER,
                &ChallengeCycle {
                    id: "cyc-partner".to_string(),
                    start_date: date("2026-03-06"),
                    total_resets: 0,
                    status: CycleStatus::Active,
                    end_date: None,
                    template_id: None,
                    playlist_id: None,
                },
            )
            .await
            .expect("seed partner cycle");
        for day in ["2026-03-08", "2026-03-09", "2026-03-10"] {
            store
                .upsert_summary(
                    ACCESS,
                    PARTNER,
                    &DailySummary {
                        date: date(day),
                        is_complete: true,
                        was_missed: false,
                    },
                )
                .await
                .expect("seed partner summary");
        }

        let summary = service(&store)
            .partner_summary(ACCESS, USER)
            .await
            .expect("summary")
            .expect("partner present");

        assert_eq!(summary.partner_user_id, PARTNER);
        assert_eq!(summary.partners_since, fixed_now());
        let progress = summary.progress.expect("progress");
        assert_eq!(progress.cycle_day, 5);
        assert_eq!(progress.current_streak, 3);
        assert!(progress.today_complete);
    }

    #[tokio::test]
    async fn partner_summary_without_cycle_reports_no_progress() {
        let store = Arc::new(InMemoryRoutineStore::new());
        seed_accepted_pair(&store).await;

        let summary = service(&store)
            .partner_summary(ACCESS, USER)
            .await
            .expect("summary")
            .expect("partner present");

        assert_eq!(summary.partner_user_id, PARTNER);
        assert_eq!(summary.progress, None);
    }

    #[tokio::test]
    async fn partner_summary_is_none_without_partner() {
        let store = Arc::new(InMemoryRoutineStore::new());

        let summary = service(&store)
            .partner_summary(ACCESS, USER)
            .await
            .expect("summary");

        assert_eq!(summary, None);
    }

    #[tokio::test]
    async fn notify_partner_lands_on_partner_feed() {
        let store = Arc::new(InMemoryRoutineStore::new());
        seed_accepted_pair(&store).await;

        let notified = service(&store)
            .notify_partner(ACCESS, USER, PartnerEvent::CompletedDay { cycle_day: 5 })
            .await
            .expect("notify");

        assert!(notified);
        let own = store
            .list_notifications(ACCESS, USER)
            .await
            .expect("own feed");
        assert!(own.is_empty());
        let partner_feed = store
            .list_notifications(ACCESS, PARTNER)
            .await
            .expect("partner feed");
        assert_eq!(partner_feed.len(), 1);
        assert_eq!(partner_feed[0].kind, NotificationKind::PartnerCompleted);
        assert_eq!(
            partner_feed[0].message,
            "Your partner completed day 5 of their routine"
        );
        assert!(!partner_feed[0].is_read);
    }

    #[tokio::test]
    async fn notify_partner_without_partner_is_a_noop() {
        let store = Arc::new(InMemoryRoutineStore::new());

        let notified = service(&store)
            .notify_partner(ACCESS, USER, PartnerEvent::MissedDay)
            .await
            .expect("notify");

        assert!(!notified);
    }
}
