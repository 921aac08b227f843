use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::criteria::CriteriaTree;
use super::scores::ReviewerScore;
use crate::domain::{CriterionId, EntityId, ReviewerId};

/// Per-record rejections scoped to a single entity's aggregation. A batch keeps
/// aggregating the other entities when one of these fires.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputError {
    #[error("no submitted score for criterion '{criterion_id}'")]
    MissingCriterionScore { criterion_id: CriterionId },
    #[error("score {raw_score} for criterion '{criterion_id}' outside 0-{max_score}")]
    ScoreOutOfRange {
        criterion_id: CriterionId,
        raw_score: f64,
        max_score: f64,
    },
    #[error("score references unknown criterion '{criterion_id}'")]
    UnknownCriterion { criterion_id: CriterionId },
    #[error("criterion '{criterion_id}' has sub-criteria and cannot be scored directly")]
    UnscorableCriterion { criterion_id: CriterionId },
    #[error("reviewer '{reviewer_id}' scored criterion '{criterion_id}' more than once")]
    DuplicateReviewerScore {
        reviewer_id: ReviewerId,
        criterion_id: CriterionId,
    },
    #[error("score for entity '{found}' supplied while aggregating '{expected}'")]
    ForeignEntityScore { expected: EntityId, found: EntityId },
}

/// Weighted total for one entity, always a projection of the reviewer scores
/// and the criteria tree, never a source of truth of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub entity_id: EntityId,
    /// 0-100, rounded to one decimal (round half up).
    pub total_score: f64,
    /// Each leaf's weighted, normalized contribution; the values sum to the
    /// total (up to per-leaf rounding), which is the audit trail.
    pub per_criterion_score: BTreeMap<CriterionId, f64>,
    /// Distinct reviewers whose eligible scores participated.
    pub reviewer_count: usize,
}

/// Round to one decimal, half up. Scores are non-negative, so rounding half
/// away from zero coincides with half up.
pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Combine eligible reviewer scores for one entity into a weighted total.
///
/// Draft scores are excluded by the status predicate. Every leaf of the tree
/// must carry at least one eligible score; a gap is a typed rejection, never a
/// silent zero. Grouping uses ordered maps and the tree's declaration order, so
/// repeated calls over the same input produce bit-identical output.
pub fn aggregate(
    entity_id: &EntityId,
    scores: &[ReviewerScore],
    tree: &CriteriaTree,
) -> Result<AggregatedResult, InputError> {
    let mut by_criterion: BTreeMap<&CriterionId, Vec<f64>> = BTreeMap::new();
    let mut seen_pairs: BTreeSet<(&ReviewerId, &CriterionId)> = BTreeSet::new();
    let mut reviewers: BTreeSet<&ReviewerId> = BTreeSet::new();

    for score in scores {
        if !score.status.is_eligible() {
            continue;
        }
        if &score.entity_id != entity_id {
            return Err(InputError::ForeignEntityScore {
                expected: entity_id.clone(),
                found: score.entity_id.clone(),
            });
        }

        let criterion = tree
            .find(&score.criterion_id)
            .ok_or_else(|| InputError::UnknownCriterion {
                criterion_id: score.criterion_id.clone(),
            })?;
        if !tree.is_leaf(&criterion.id) {
            return Err(InputError::UnscorableCriterion {
                criterion_id: criterion.id.clone(),
            });
        }
        if score.raw_score < 0.0 || score.raw_score > criterion.max_score {
            return Err(InputError::ScoreOutOfRange {
                criterion_id: criterion.id.clone(),
                raw_score: score.raw_score,
                max_score: criterion.max_score,
            });
        }
        if !seen_pairs.insert((&score.reviewer_id, &score.criterion_id)) {
            return Err(InputError::DuplicateReviewerScore {
                reviewer_id: score.reviewer_id.clone(),
                criterion_id: score.criterion_id.clone(),
            });
        }

        reviewers.insert(&score.reviewer_id);
        by_criterion
            .entry(&score.criterion_id)
            .or_default()
            .push(score.raw_score);
    }

    let mut per_criterion_score = BTreeMap::new();
    let mut total = 0.0;

    for leaf in tree.leaves() {
        let raw = by_criterion
            .get(&leaf.id)
            .ok_or_else(|| InputError::MissingCriterionScore {
                criterion_id: leaf.id.clone(),
            })?;
        let mean: f64 = raw.iter().sum::<f64>() / raw.len() as f64;
        let normalized = mean / leaf.max_score * 100.0;
        let contribution = normalized * tree.effective_weight(leaf) / 100.0;

        per_criterion_score.insert(leaf.id.clone(), round_one_decimal(contribution));
        total += contribution;
    }

    Ok(AggregatedResult {
        entity_id: entity_id.clone(),
        total_score: round_one_decimal(total),
        per_criterion_score,
        reviewer_count: reviewers.len(),
    })
}
