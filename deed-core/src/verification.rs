//! Giver submissions and receiver verdicts.
//!
//! ```text
//! active ──submit──▶ pending ──verify(true)──▶ approved
//!                      ▲   └───verify(false)─▶ rejected
//!                      └──────────submit──────────┘
//! ```
//!
//! A rejected deed may also be verified again directly.

use chrono::{DateTime, Utc};

use crate::ids::UserId;
use crate::model::{Assignment, VerificationStatus};
use crate::DeedError;

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Active => "active",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn accepts_submission(self) -> bool {
        matches!(self, VerificationStatus::Active | VerificationStatus::Rejected)
    }

    pub fn accepts_verdict(self) -> bool {
        matches!(self, VerificationStatus::Pending | VerificationStatus::Rejected)
    }
}

pub fn submit(
    assignment: &mut Assignment,
    proof: String,
    now: DateTime<Utc>,
) -> Result<(), DeedError> {
    if !assignment.verification_status.accepts_submission() {
        return Err(DeedError::InvalidState {
            action: "submit",
            status: assignment.verification_status.as_str().to_string(),
        });
    }

    assignment.verification_status = VerificationStatus::Pending;
    assignment.proof = Some(proof);
    assignment.submitted_at = Some(now);
    Ok(())
}

/// Records the receiver's verdict. Only the receiver captured at pairing time
/// may call this.
pub fn verify(
    assignment: &mut Assignment,
    verifier: &UserId,
    approve: bool,
    now: DateTime<Utc>,
) -> Result<(), DeedError> {
    if verifier != &assignment.receiver_id {
        return Err(DeedError::Forbidden);
    }
    if !assignment.verification_status.accepts_verdict() {
        return Err(DeedError::InvalidState {
            action: "verify",
            status: assignment.verification_status.as_str().to_string(),
        });
    }

    if approve {
        assignment.verification_status = VerificationStatus::Approved;
        assignment.completed = true;
        assignment.completed_at = Some(now);
    } else {
        assignment.verification_status = VerificationStatus::Rejected;
        assignment.completed = false;
        assignment.completed_at = None;
        assignment.proof = None;
    }
    assignment.verified_by = Some(verifier.clone());
    assignment.verified_at = Some(now);
    Ok(())
}
