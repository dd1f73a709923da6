//! Giver → receiver pairing.
//!
//! Every member gives exactly once and receives exactly once, and nobody is
//! paired with themselves.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::DeedError;

pub const MAX_SHUFFLE_ATTEMPTS: usize = 10;

/// Source of randomness for [`pair`].
pub trait Shuffler {
    fn shuffle_ids(&mut self, ids: &mut [UserId]);
}

impl<R: Rng + ?Sized> Shuffler for R {
    fn shuffle_ids(&mut self, ids: &mut [UserId]) {
        ids.shuffle(self);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pairing {
    pub giver: UserId,
    pub receiver: UserId,
}

/// Pairs each member with a different member.
///
/// Tries up to [`MAX_SHUFFLE_ATTEMPTS`] shuffles; if none is free of fixed
/// points, falls back to rotating the list by one. Results are in the order of
/// `members`.
pub fn pair<S: Shuffler + ?Sized>(
    members: &[UserId],
    shuffler: &mut S,
) -> Result<Vec<Pairing>, DeedError> {
    if members.len() < 2 {
        return Err(DeedError::InsufficientMembers {
            count: members.len(),
        });
    }

    let mut targets = members.to_vec();
    let mut found = false;
    for _ in 0..MAX_SHUFFLE_ATTEMPTS {
        targets.clone_from_slice(members);
        shuffler.shuffle_ids(&mut targets);
        if is_derangement(members, &targets) {
            found = true;
            break;
        }
    }

    if !found {
        targets.clone_from_slice(members);
        targets.rotate_left(1);
    }

    Ok(members
        .iter()
        .cloned()
        .zip(targets)
        .map(|(giver, receiver)| Pairing { giver, receiver })
        .collect())
}

fn is_derangement(members: &[UserId], targets: &[UserId]) -> bool {
    members.iter().zip(targets).all(|(m, t)| m != t)
}
