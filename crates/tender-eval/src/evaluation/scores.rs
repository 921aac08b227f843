use serde::{Deserialize, Serialize};

use crate::domain::{CriterionId, EntityId, ReviewerId};

/// Lifecycle of a reviewer's score sheet for one (reviewer, entity) pair.
///
/// The engine never drives transitions; the caller marks submission and later
/// locks the sheet when the session closes. Eligibility for aggregation is the
/// pure predicate [`ScoreStatus::is_eligible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Draft,
    Submitted,
    Locked,
}

impl ScoreStatus {
    /// Draft scores never count; submitted and locked scores both do.
    pub fn is_eligible(self) -> bool {
        matches!(self, ScoreStatus::Submitted | ScoreStatus::Locked)
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreStatus::Draft => "draft",
            ScoreStatus::Submitted => "submitted",
            ScoreStatus::Locked => "locked",
        }
    }
}

/// One reviewer's raw score for one leaf criterion of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerScore {
    pub reviewer_id: ReviewerId,
    pub entity_id: EntityId,
    pub criterion_id: CriterionId,
    pub raw_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub status: ScoreStatus,
}
