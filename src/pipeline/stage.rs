//! Stage identifiers and routing for the drafting pipeline.
//!
//! ```text
//! Draft -> Verify -> Audit -+-> HumanReview -> Export -> (done)
//!                           +-----------------> Export
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Verify,
    Audit,
    HumanReview,
    Export,
}

impl Stage {
    /// All stages in declaration order.
    pub const ALL: [Stage; 5] = [
        Stage::Draft,
        Stage::Verify,
        Stage::Audit,
        Stage::HumanReview,
        Stage::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Verify => "verify",
            Stage::Audit => "audit",
            Stage::HumanReview => "human_review",
            Stage::Export => "export",
        }
    }

    /// Execution pauses after an interrupt stage until a resume call arrives.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Stage::HumanReview)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide where a session goes once Audit has finished.
pub fn route_after_audit(state: &SessionState) -> Stage {
    if state.needs_human_review {
        Stage::HumanReview
    } else {
        Stage::Export
    }
}

/// The stage that follows `current`, or `None` when the pipeline is done.
pub fn next_stage(current: Stage, state: &SessionState) -> Option<Stage> {
    match current {
        Stage::Draft => Some(Stage::Verify),
        Stage::Verify => Some(Stage::Audit),
        Stage::Audit => Some(route_after_audit(state)),
        Stage::HumanReview => Some(Stage::Export),
        Stage::Export => None,
    }
}
