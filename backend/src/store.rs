//! In-memory collections with an optional JSON snapshot on disk.
//!
//! Every mutating call takes the write lock once, so checks and writes within
//! one call cannot interleave with another caller. Status changes go through
//! conditional updates that fail with [`ServiceError::Conflict`] when the
//! stored status is not the one the caller read.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use deed_core::{
    Assignment, AssignmentId, CelebrationId, CelebrationSeen, GroupId, Member, Round, RoundId,
    RoundStatus, TemplateId, UserId, VerificationStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{ServiceError, SnapshotError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRecord {
    pub id: TemplateId,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Collections {
    pub users: HashMap<UserId, UserRecord>,
    pub groups: HashMap<GroupId, GroupRecord>,
    pub memberships: Vec<Membership>,
    pub rounds: HashMap<RoundId, Round>,
    pub assignments: HashMap<AssignmentId, Assignment>,
    pub celebrations: Vec<CelebrationSeen>,
    pub templates: Vec<TemplateRecord>,
}

#[derive(Clone, Default)]
pub struct Store {
    data: Arc<RwLock<Collections>>,
    persist_path: Option<PathBuf>,
    persist_lock: Arc<Mutex<()>>,
}

impl Store {
    /// Loads the snapshot at `path` if there is one. A missing file starts an
    /// empty store; a file that cannot be read or parsed is an error so that
    /// the next write does not replace it.
    pub async fn with_persistence(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let saved = serde_json::from_slice::<Collections>(&bytes)?;
                debug!(path = %path.display(), rounds = saved.rounds.len(), "loaded snapshot");
                saved
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
            persist_path: Some(path),
            persist_lock: Arc::default(),
        })
    }

    /// Writes the current collections to a sibling temp file and renames it
    /// over the snapshot. Writers are serialized and each one reads the data
    /// after taking its turn, so the last rename always carries the newest
    /// state.
    async fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let _turn = self.persist_lock.lock().await;
        let json = {
            let data = self.data.read().await;
            serde_json::to_vec_pretty(&*data)
        };
        let json = match json {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "snapshot serialization failed");
                return;
            }
        };
        let tmp = path.with_extension("json.tmp");
        if let Err(err) = tokio::fs::write(&tmp, json).await {
            warn!(path = %tmp.display(), %err, "persist failed");
            return;
        }
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            warn!(path = %path.display(), %err, "persist failed");
        }
    }

    // ---- users & groups -------------------------------------------------

    pub async fn insert_user(
        &self,
        username: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, ServiceError> {
        let mut data = self.data.write().await;
        if data.users.values().any(|u| u.username == username) {
            return Err(ServiceError::AlreadyExists("username"));
        }
        let user = UserRecord {
            id: UserId::generate(),
            username: username.to_string(),
            name: name.to_string(),
            created_at: now,
        };
        data.users.insert(user.id.clone(), user.clone());
        drop(data);
        self.persist().await;
        Ok(user)
    }

    pub async fn user(&self, id: &UserId) -> Option<UserRecord> {
        self.data.read().await.users.get(id).cloned()
    }

    pub async fn user_by_username(&self, username: &str) -> Option<UserRecord> {
        let data = self.data.read().await;
        data.users.values().find(|u| u.username == username).cloned()
    }

    pub async fn users(&self) -> Vec<UserRecord> {
        let data = self.data.read().await;
        let mut users = data.users.values().cloned().collect::<Vec<_>>();
        users.sort_by_key(|u| u.created_at);
        users
    }

    pub async fn insert_group(&self, name: &str, now: DateTime<Utc>) -> GroupRecord {
        let group = GroupRecord {
            id: GroupId::generate(),
            name: name.to_string(),
            created_at: now,
        };
        self.data
            .write()
            .await
            .groups
            .insert(group.id.clone(), group.clone());
        self.persist().await;
        group
    }

    pub async fn group(&self, id: &GroupId) -> Option<GroupRecord> {
        self.data.read().await.groups.get(id).cloned()
    }

    pub async fn groups(&self) -> Vec<GroupRecord> {
        let data = self.data.read().await;
        let mut groups = data.groups.values().cloned().collect::<Vec<_>>();
        groups.sort_by_key(|g| g.created_at);
        groups
    }

    pub async fn groups_for_user(&self, user: &UserId) -> Vec<GroupRecord> {
        let data = self.data.read().await;
        data.memberships
            .iter()
            .filter(|m| &m.user_id == user)
            .filter_map(|m| data.groups.get(&m.group_id).cloned())
            .collect()
    }

    /// Adds `user` to `group` unless already a member. Returns whether a new
    /// membership was created.
    pub async fn add_member(&self, group: &GroupId, user: &UserId, now: DateTime<Utc>) -> bool {
        let mut data = self.data.write().await;
        if data
            .memberships
            .iter()
            .any(|m| &m.group_id == group && &m.user_id == user)
        {
            return false;
        }
        data.memberships.push(Membership {
            group_id: group.clone(),
            user_id: user.clone(),
            joined_at: now,
        });
        drop(data);
        self.persist().await;
        true
    }

    /// Current members of `group` in join order.
    pub async fn group_members(&self, group: &GroupId) -> Vec<Member> {
        let data = self.data.read().await;
        data.memberships
            .iter()
            .filter(|m| &m.group_id == group)
            .filter_map(|m| {
                data.users.get(&m.user_id).map(|u| Member {
                    id: u.id.clone(),
                    name: u.name.clone(),
                })
            })
            .collect()
    }

    // ---- rounds ---------------------------------------------------------

    pub async fn round(&self, id: &RoundId) -> Option<Round> {
        self.data.read().await.rounds.get(id).cloned()
    }

    /// Rounds of `group`, newest first.
    pub async fn rounds_for_group(&self, group: &GroupId) -> Vec<Round> {
        let data = self.data.read().await;
        let mut rounds = data
            .rounds
            .values()
            .filter(|r| &r.group_id == group)
            .cloned()
            .collect::<Vec<_>>();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rounds
    }

    pub async fn rounds_with_status(&self, group: &GroupId, status: RoundStatus) -> Vec<Round> {
        let data = self.data.read().await;
        data.rounds
            .values()
            .filter(|r| &r.group_id == group && r.status == status)
            .cloned()
            .collect()
    }

    pub async fn successor_of(&self, id: &RoundId) -> Option<Round> {
        let data = self.data.read().await;
        data.rounds
            .values()
            .find(|r| r.predecessor_id.as_ref() == Some(id))
            .cloned()
    }

    /// Inserts `round` unless the group already has a round being opened:
    /// one that succeeds the same predecessor, or any pending round. The
    /// existing round is returned in that case.
    pub async fn insert_round_once(&self, round: Round) -> Round {
        let mut data = self.data.write().await;
        let existing = data.rounds.values().find(|r| {
            r.group_id == round.group_id
                && ((round.predecessor_id.is_some() && r.predecessor_id == round.predecessor_id)
                    || r.status == RoundStatus::Pending)
        });
        if let Some(existing) = existing {
            debug!(round_id = %existing.id, "reusing round already being opened");
            return existing.clone();
        }
        data.rounds.insert(round.id.clone(), round.clone());
        drop(data);
        self.persist().await;
        round
    }

    /// Renames a round that has not been promoted yet.
    pub async fn rename_pending_round(
        &self,
        id: &RoundId,
        name: String,
    ) -> Result<Round, ServiceError> {
        let mut data = self.data.write().await;
        let round = data
            .rounds
            .get_mut(id)
            .ok_or(ServiceError::NotFound("round"))?;
        if round.status != RoundStatus::Pending {
            return Err(ServiceError::Conflict);
        }
        round.name = name;
        let updated = round.clone();
        drop(data);
        self.persist().await;
        Ok(updated)
    }

    /// Moves a round from `from` to `to`. Succeeds without writing when the
    /// round is already in `to`.
    pub async fn transition_round(
        &self,
        id: &RoundId,
        from: RoundStatus,
        to: RoundStatus,
    ) -> Result<Round, ServiceError> {
        let mut data = self.data.write().await;
        let round = data
            .rounds
            .get_mut(id)
            .ok_or(ServiceError::NotFound("round"))?;
        if round.status == to {
            return Ok(round.clone());
        }
        if round.status != from {
            return Err(ServiceError::Conflict);
        }
        deed_core::transition(round, to)?;
        let updated = round.clone();
        drop(data);
        self.persist().await;
        Ok(updated)
    }

    // ---- assignments ----------------------------------------------------

    /// Stores the drafted assignments for a round that has none yet, keeping
    /// one per giver. If the round already has assignments they are returned
    /// unchanged.
    pub async fn insert_assignments_once(
        &self,
        round_id: &RoundId,
        drafted: Vec<Assignment>,
    ) -> Vec<Assignment> {
        let mut data = self.data.write().await;
        let existing = data
            .assignments
            .values()
            .filter(|a| &a.round_id == round_id)
            .cloned()
            .collect::<Vec<_>>();
        if !existing.is_empty() {
            return existing;
        }

        let mut inserted: Vec<Assignment> = Vec::with_capacity(drafted.len());
        for assignment in drafted {
            if &assignment.round_id != round_id
                || inserted.iter().any(|a| a.user_id == assignment.user_id)
            {
                continue;
            }
            data.assignments
                .insert(assignment.id.clone(), assignment.clone());
            inserted.push(assignment);
        }
        drop(data);
        self.persist().await;
        inserted
    }

    pub async fn assignments_for_round(&self, round: &RoundId) -> Vec<Assignment> {
        let data = self.data.read().await;
        let mut assignments = data
            .assignments
            .values()
            .filter(|a| &a.round_id == round)
            .cloned()
            .collect::<Vec<_>>();
        assignments.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        assignments
    }

    pub async fn assignment_for(&self, round: &RoundId, user: &UserId) -> Option<Assignment> {
        let data = self.data.read().await;
        data.assignments
            .values()
            .find(|a| &a.round_id == round && &a.user_id == user)
            .cloned()
    }

    pub async fn assignments_for_receiver(
        &self,
        round: &RoundId,
        receiver: &UserId,
        status: VerificationStatus,
    ) -> Vec<Assignment> {
        let data = self.data.read().await;
        data.assignments
            .values()
            .filter(|a| {
                &a.round_id == round && &a.receiver_id == receiver && a.verification_status == status
            })
            .cloned()
            .collect()
    }

    /// Writes `updated` only if the stored copy still has `expected` status.
    pub async fn replace_assignment(
        &self,
        expected: VerificationStatus,
        updated: Assignment,
    ) -> Result<Assignment, ServiceError> {
        let mut data = self.data.write().await;
        let current = data
            .assignments
            .get_mut(&updated.id)
            .ok_or(ServiceError::NotFound("assignment"))?;
        if current.verification_status != expected {
            return Err(ServiceError::Conflict);
        }
        *current = updated.clone();
        drop(data);
        self.persist().await;
        Ok(updated)
    }

    // ---- celebrations ---------------------------------------------------

    /// Records that `user` has seen the celebration for `round`. Returns
    /// whether a record was already present.
    pub async fn mark_seen(&self, round: &RoundId, user: &UserId, now: DateTime<Utc>) -> bool {
        let mut data = self.data.write().await;
        if data
            .celebrations
            .iter()
            .any(|c| &c.round_id == round && &c.user_id == user)
        {
            return true;
        }
        data.celebrations.push(CelebrationSeen {
            id: CelebrationId::generate(),
            round_id: round.clone(),
            user_id: user.clone(),
            seen_at: now,
        });
        drop(data);
        self.persist().await;
        false
    }

    pub async fn has_seen(&self, round: &RoundId, user: &UserId) -> bool {
        let data = self.data.read().await;
        data.celebrations
            .iter()
            .any(|c| &c.round_id == round && &c.user_id == user)
    }

    // ---- templates ------------------------------------------------------

    pub async fn templates(&self) -> Vec<TemplateRecord> {
        self.data.read().await.templates.clone()
    }

    pub async fn insert_template(&self, description: &str, now: DateTime<Utc>) -> TemplateRecord {
        let template = TemplateRecord {
            id: TemplateId::generate(),
            description: description.to_string(),
            created_at: now,
        };
        self.data.write().await.templates.push(template.clone());
        self.persist().await;
        template
    }
}
