//! Rules for a recurring good-deed exchange: who gives to whom, how rounds
//! move forward, and how a deed gets verified.

use thiserror::Error;

pub mod completion;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod pairing;
pub mod templates;
pub mod verification;

pub use completion::{should_show_celebration, summarize, CompletionSummary};
pub use ids::{AssignmentId, CelebrationId, GroupId, RoundId, TemplateId, UserId};
pub use lifecycle::{draft_assignments, new_round, next_round_name, round_name_for, transition};
pub use model::{Assignment, CelebrationSeen, Member, Round, RoundStatus, VerificationStatus};
pub use pairing::{pair, Pairing, Shuffler, MAX_SHUFFLE_ATTEMPTS};
pub use templates::{pick_template, render_template, DEFAULT_TEMPLATES, TARGET_PLACEHOLDER};
pub use verification::{submit, verify};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeedError {
    #[error("cannot {action} while {status}")]
    InvalidState {
        action: &'static str,
        status: String,
    },
    #[error("only the receiver may verify this deed")]
    Forbidden,
    #[error("need at least 2 members to pair, got {count}")]
    InsufficientMembers { count: usize },
}
