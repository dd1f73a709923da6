use serde::{Deserialize, Serialize};

use crate::model::Assignment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub total_members: usize,
    pub completed_count: usize,
    pub all_complete: bool,
}

/// Compares group size against approved deeds in one round's assignments.
pub fn summarize(total_members: usize, assignments: &[Assignment]) -> CompletionSummary {
    let completed_count = assignments.iter().filter(|a| a.completed).count();
    CompletionSummary {
        total_members,
        completed_count,
        all_complete: total_members > 0 && total_members == completed_count,
    }
}

pub fn should_show_celebration(summary: &CompletionSummary, already_seen: bool) -> bool {
    summary.all_complete && !already_seen
}
