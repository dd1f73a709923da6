//! Round lifecycle and deed verification on top of [`Store`].
//!
//! Opening a round is a resumable sequence:
//!
//! 1. insert the successor as `pending` (or find the one already there),
//! 2. pair members and store its assignments (unless already stored),
//! 3. retire the group's active round,
//! 4. promote the successor to `active`.
//!
//! Every step is a no-op when already done, so a caller that failed halfway
//! can simply call again.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use deed_core::{
    draft_assignments, new_round, next_round_name, round_name_for, should_show_celebration,
    summarize, Assignment, CompletionSummary, DeedError, GroupId, Round, RoundId, RoundStatus,
    UserId, VerificationStatus,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::store::{GroupRecord, Store, UserRecord};

/// One row of a round's progress board.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberStatus {
    pub id: UserId,
    pub name: String,
    pub completed: bool,
    pub deed_description: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    pub proof: Option<String>,
}

#[derive(Clone)]
pub struct Exchange {
    store: Store,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl Exchange {
    /// Pairings are reproducible when a `seed` is given.
    pub fn new(store: Store, seed: Option<u64>) -> Self {
        let rng = seed
            .map(ChaCha8Rng::seed_from_u64)
            .unwrap_or_else(ChaCha8Rng::from_entropy);
        Self {
            store,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn create_user(&self, username: &str, name: &str) -> Result<UserRecord, ServiceError> {
        let user = self.store.insert_user(username, name, Utc::now()).await?;
        info!(user_id = %user.id, username, "user created");
        Ok(user)
    }

    /// Creates a group together with its first round.
    pub async fn create_group(&self, name: &str) -> Result<(GroupRecord, Round), ServiceError> {
        let group = self.store.insert_group(name, Utc::now()).await;
        info!(group_id = %group.id, name, "group created");
        let round = self.start_round(&group.id, None).await?;
        Ok((group, round))
    }

    pub async fn join_group(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool, ServiceError> {
        self.store
            .group(group_id)
            .await
            .ok_or(ServiceError::NotFound("group"))?;
        self.store
            .user(user_id)
            .await
            .ok_or(ServiceError::NotFound("user"))?;
        let joined = self.store.add_member(group_id, user_id, Utc::now()).await;
        if joined {
            info!(group_id = %group_id, user_id = %user_id, "member joined");
        }
        Ok(joined)
    }

    pub async fn round(&self, round_id: &RoundId) -> Result<Round, ServiceError> {
        self.store
            .round(round_id)
            .await
            .ok_or(ServiceError::NotFound("round"))
    }

    pub async fn current_round(&self, group_id: &GroupId) -> Result<Round, ServiceError> {
        self.store
            .rounds_with_status(group_id, RoundStatus::Active)
            .await
            .into_iter()
            .max_by_key(|r| r.created_at)
            .ok_or(ServiceError::NotFound("active round"))
    }

    /// Starts a fresh round for `group_id`, retiring whatever round is active.
    /// A round left pending by an earlier call is finished instead of opening
    /// a second one; an explicit `name` is applied to it.
    pub async fn start_round(
        &self,
        group_id: &GroupId,
        name: Option<String>,
    ) -> Result<Round, ServiceError> {
        self.store
            .group(group_id)
            .await
            .ok_or(ServiceError::NotFound("group"))?;
        let now = Utc::now();
        let previous = self.current_round(group_id).await.ok().map(|r| r.id);
        let rename = name.is_some();
        let name = name.unwrap_or_else(|| round_name_for(now.date_naive()));
        self.open_round(new_round(group_id.clone(), name, previous, now), rename)
            .await
    }

    /// Retires `round_id` and opens the next round. Advancing a round that was
    /// already retired returns its existing successor.
    pub async fn advance_round(&self, round_id: &RoundId) -> Result<Round, ServiceError> {
        let round = self.round(round_id).await?;
        match round.status {
            RoundStatus::Active => {
                let now = Utc::now();
                let draft = new_round(
                    round.group_id.clone(),
                    next_round_name(now),
                    Some(round.id.clone()),
                    now,
                );
                self.open_round(draft, false).await
            }
            RoundStatus::Completed => {
                let successor = self.store.successor_of(&round.id).await.ok_or(
                    DeedError::InvalidState {
                        action: "advance",
                        status: RoundStatus::Completed.as_str().to_string(),
                    },
                )?;
                debug!(round_id = %round.id, successor_id = %successor.id, "round already advanced");
                if successor.status == RoundStatus::Pending {
                    return self.open_round(successor, false).await;
                }
                Ok(successor)
            }
            RoundStatus::Pending => Err(DeedError::InvalidState {
                action: "advance",
                status: RoundStatus::Pending.as_str().to_string(),
            }
            .into()),
        }
    }

    async fn open_round(&self, draft: Round, rename: bool) -> Result<Round, ServiceError> {
        let wanted = rename.then(|| draft.name.clone());
        let mut round = self.store.insert_round_once(draft).await;
        if round.status != RoundStatus::Pending {
            return Ok(round);
        }
        if let Some(name) = wanted.filter(|name| name != &round.name) {
            round = self.store.rename_pending_round(&round.id, name).await?;
        }

        let assignments = self.ensure_assignments(&round).await?;

        for active in self
            .store
            .rounds_with_status(&round.group_id, RoundStatus::Active)
            .await
        {
            self.store
                .transition_round(&active.id, RoundStatus::Active, RoundStatus::Completed)
                .await?;
            info!(round_id = %active.id, "round retired");
        }

        let opened = self
            .store
            .transition_round(&round.id, RoundStatus::Pending, RoundStatus::Active)
            .await?;
        info!(
            round_id = %opened.id,
            group_id = %opened.group_id,
            name = %opened.name,
            deeds = assignments.len(),
            "round opened"
        );
        Ok(opened)
    }

    async fn ensure_assignments(&self, round: &Round) -> Result<Vec<Assignment>, ServiceError> {
        let existing = self.store.assignments_for_round(&round.id).await;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let members = self.store.group_members(&round.group_id).await;
        if members.len() < 2 {
            warn!(
                round_id = %round.id,
                members = members.len(),
                "not enough members to pair, round has no deeds"
            );
            return Ok(Vec::new());
        }

        let templates = self
            .store
            .templates()
            .await
            .into_iter()
            .map(|t| t.description)
            .collect::<Vec<_>>();
        let drafted = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            draft_assignments(&round.id, &members, &templates, &mut *rng, Utc::now())?
        };
        Ok(self.store.insert_assignments_once(&round.id, drafted).await)
    }

    pub async fn assignment_for(
        &self,
        round_id: &RoundId,
        user_id: &UserId,
    ) -> Result<Assignment, ServiceError> {
        self.store
            .assignment_for(round_id, user_id)
            .await
            .ok_or(ServiceError::NotFound("assignment"))
    }

    pub async fn submit(
        &self,
        round_id: &RoundId,
        giver_id: &UserId,
        proof: String,
    ) -> Result<Assignment, ServiceError> {
        let mut assignment = self.assignment_for(round_id, giver_id).await?;
        let expected = assignment.verification_status;
        deed_core::submit(&mut assignment, proof, Utc::now())?;
        let saved = self.store.replace_assignment(expected, assignment).await?;
        info!(round_id = %round_id, giver_id = %giver_id, "deed submitted");
        Ok(saved)
    }

    pub async fn verify(
        &self,
        round_id: &RoundId,
        giver_id: &UserId,
        verifier_id: &UserId,
        approve: bool,
    ) -> Result<Assignment, ServiceError> {
        let mut assignment = self.assignment_for(round_id, giver_id).await?;
        let expected = assignment.verification_status;
        if let Err(err) = deed_core::verify(&mut assignment, verifier_id, approve, Utc::now()) {
            if err == DeedError::Forbidden {
                warn!(round_id = %round_id, giver_id = %giver_id, verifier_id = %verifier_id, "verification by non-receiver refused");
            }
            return Err(err.into());
        }
        let saved = self.store.replace_assignment(expected, assignment).await?;
        info!(
            round_id = %round_id,
            giver_id = %giver_id,
            status = saved.verification_status.as_str(),
            "deed verified"
        );
        Ok(saved)
    }

    /// Deeds awaiting a verdict from `receiver_id`.
    pub async fn pending_verifications(
        &self,
        round_id: &RoundId,
        receiver_id: &UserId,
    ) -> Result<Vec<Assignment>, ServiceError> {
        self.round(round_id).await?;
        Ok(self
            .store
            .assignments_for_receiver(round_id, receiver_id, VerificationStatus::Pending)
            .await)
    }

    pub async fn member_statuses(&self, round_id: &RoundId) -> Result<Vec<MemberStatus>, ServiceError> {
        let round = self.round(round_id).await?;
        let assignments = self.store.assignments_for_round(round_id).await;
        let members = self.store.group_members(&round.group_id).await;
        Ok(members
            .into_iter()
            .map(|m| {
                let deed = assignments.iter().find(|a| a.user_id == m.id);
                MemberStatus {
                    completed: deed.map(|a| a.completed).unwrap_or(false),
                    deed_description: deed.map(|a| a.deed_description.clone()),
                    verification_status: deed.map(|a| a.verification_status),
                    proof: deed.and_then(|a| a.proof.clone()),
                    id: m.id,
                    name: m.name,
                }
            })
            .collect())
    }

    pub async fn check_complete(&self, round_id: &RoundId) -> Result<CompletionSummary, ServiceError> {
        let round = self.round(round_id).await?;
        let total = self.store.group_members(&round.group_id).await.len();
        let assignments = self.store.assignments_for_round(round_id).await;
        Ok(summarize(total, &assignments))
    }

    /// Returns whether `user_id` had already seen this round's celebration.
    pub async fn mark_seen(&self, round_id: &RoundId, user_id: &UserId) -> Result<bool, ServiceError> {
        self.round(round_id).await?;
        self.store
            .user(user_id)
            .await
            .ok_or(ServiceError::NotFound("user"))?;
        Ok(self.store.mark_seen(round_id, user_id, Utc::now()).await)
    }

    pub async fn should_show_celebration(
        &self,
        round_id: &RoundId,
        user_id: &UserId,
    ) -> Result<bool, ServiceError> {
        self.store
            .user(user_id)
            .await
            .ok_or(ServiceError::NotFound("user"))?;
        let summary = self.check_complete(round_id).await?;
        let seen = self.store.has_seen(round_id, user_id).await;
        Ok(should_show_celebration(&summary, seen))
    }
}
