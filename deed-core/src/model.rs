use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssignmentId, CelebrationId, GroupId, RoundId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub group_id: GroupId,
    pub name: String,
    pub status: RoundStatus,
    /// The round this one replaced, if any. Used to find the successor of a
    /// retired round without creating a second one.
    pub predecessor_id: Option<RoundId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Active,
    Pending,
    Approved,
    Rejected,
}

/// A giver's deed for one round.
///
/// `completed` mirrors `verification_status == Approved`; only the
/// transitions in [`crate::verification`] touch either field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub round_id: RoundId,
    pub user_id: UserId,
    pub receiver_id: UserId,
    pub deed_description: String,
    pub verification_status: VerificationStatus,
    pub proof: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        round_id: RoundId,
        user_id: UserId,
        receiver_id: UserId,
        deed_description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssignmentId::generate(),
            round_id,
            user_id,
            receiver_id,
            deed_description,
            verification_status: VerificationStatus::Active,
            proof: None,
            completed: false,
            completed_at: None,
            submitted_at: None,
            verified_by: None,
            verified_at: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CelebrationSeen {
    pub id: CelebrationId,
    pub round_id: RoundId,
    pub user_id: UserId,
    pub seen_at: DateTime<Utc>,
}
