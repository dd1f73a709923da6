//! Round status transitions and the assignment set a round starts with.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;

use crate::ids::{GroupId, RoundId, UserId};
use crate::model::{Assignment, Member, Round, RoundStatus};
use crate::pairing::pair;
use crate::templates::{pick_template, render_template};
use crate::DeedError;

pub const ROUND_LENGTH_DAYS: i64 = 7;

impl RoundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
        }
    }

    /// Rounds only move forward: pending → active → completed.
    pub fn can_advance_to(self, next: RoundStatus) -> bool {
        matches!(
            (self, next),
            (RoundStatus::Pending, RoundStatus::Active)
                | (RoundStatus::Active, RoundStatus::Completed)
        )
    }
}

pub fn transition(round: &mut Round, next: RoundStatus) -> Result<(), DeedError> {
    if !round.status.can_advance_to(next) {
        return Err(DeedError::InvalidState {
            action: "transition round",
            status: round.status.as_str().to_string(),
        });
    }
    round.status = next;
    Ok(())
}

pub fn new_round(
    group_id: GroupId,
    name: String,
    predecessor_id: Option<RoundId>,
    now: DateTime<Utc>,
) -> Round {
    Round {
        id: RoundId::generate(),
        group_id,
        name,
        status: RoundStatus::Pending,
        predecessor_id,
        created_at: now,
    }
}

pub fn round_name_for(date: NaiveDate) -> String {
    format!("Week of {}", date.format("%b %-d, %Y"))
}

/// Name for the round that follows one retired at `now`.
pub fn next_round_name(now: DateTime<Utc>) -> String {
    round_name_for((now + Duration::days(ROUND_LENGTH_DAYS)).date_naive())
}

/// Pairs `members` and renders one deed per giver.
///
/// Returns an empty set for groups with fewer than two members; such a round
/// simply has no deeds.
pub fn draft_assignments<R: Rng + ?Sized>(
    round_id: &RoundId,
    members: &[Member],
    templates: &[String],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Vec<Assignment>, DeedError> {
    if members.len() < 2 {
        return Ok(Vec::new());
    }

    let ids = members.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
    let names: HashMap<&UserId, &str> = members.iter().map(|m| (&m.id, m.name.as_str())).collect();
    let pairs = pair(&ids, rng)?;

    Ok(pairs
        .into_iter()
        .map(|p| {
            let target_name = names.get(&p.receiver).copied().unwrap_or_default();
            let deed = render_template(pick_template(templates, rng), target_name);
            Assignment::new(round_id.clone(), p.giver, p.receiver, deed, now)
        })
        .collect())
}
