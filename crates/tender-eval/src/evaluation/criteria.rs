use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::CriterionId;

/// Tolerance applied when checking that a sibling group's weights sum to 100.
///
/// Weights are `f64` percentages; the epsilon is fixed here so every caller and
/// every policy document is held to the same rule.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// One weighted scoring dimension, optionally nested one level below a parent.
///
/// A criterion that has children is never scored directly; only leaves carry a
/// usable `max_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    /// Percentage weight relative to siblings. Every sibling group sums to 100.
    pub weight: f64,
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CriterionId>,
}

/// Versioned schema document an evaluation session is opened with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaDocument {
    pub version: String,
    pub criteria: Vec<Criterion>,
}

/// Configuration failures that invalidate the whole schema. Any of these blocks
/// the session; none are silently corrected.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaError {
    #[error("criteria document declares no criteria")]
    EmptySchema,
    #[error("duplicate criterion id '{id}'")]
    DuplicateCriterionId { id: CriterionId },
    #[error("criterion '{child}' references missing parent '{parent}'")]
    OrphanReference { child: CriterionId, parent: CriterionId },
    #[error("criterion '{id}' nests deeper than the supported two levels")]
    NestingTooDeep { id: CriterionId },
    #[error("criterion '{id}' has weight {weight} outside 0-100")]
    WeightOutOfRange { id: CriterionId, weight: f64 },
    #[error("leaf criterion '{id}' has non-positive max score {max_score}")]
    InvalidMaxScore { id: CriterionId, max_score: f64 },
    #[error("sibling weights under {parent_id:?} sum to {actual_sum}, expected 100")]
    WeightSumInvalid {
        parent_id: Option<CriterionId>,
        actual_sum: f64,
    },
}

/// Validated scoring schema held for the duration of one evaluation session.
///
/// Construction runs the full validation pass, so any reachable tree upholds
/// the sibling-sum invariant and, by extension, leaf effective weights that sum
/// to 100 within [`WEIGHT_EPSILON`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaTree {
    version: String,
    criteria: Vec<Criterion>,
}

impl CriteriaTree {
    pub fn from_document(document: CriteriaDocument) -> Result<Self, SchemaError> {
        Self::new(document.version, document.criteria)
    }

    pub fn new(version: String, criteria: Vec<Criterion>) -> Result<Self, SchemaError> {
        validate(&criteria)?;
        Ok(Self { version, criteria })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn find(&self, id: &CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|criterion| &criterion.id == id)
    }

    /// Scorable leaves, depth-first in declaration order. This ordering is what
    /// makes repeated aggregation runs reproducible.
    pub fn leaves(&self) -> Vec<&Criterion> {
        let branch_ids = self.branch_ids();
        let mut leaves = Vec::new();
        for root in self
            .criteria
            .iter()
            .filter(|criterion| criterion.parent_id.is_none())
        {
            if branch_ids.contains(&root.id) {
                leaves.extend(
                    self.criteria
                        .iter()
                        .filter(|criterion| criterion.parent_id.as_ref() == Some(&root.id)),
                );
            } else {
                leaves.push(root);
            }
        }
        leaves
    }

    pub fn is_leaf(&self, id: &CriterionId) -> bool {
        !self.branch_ids().contains(id) && self.find(id).is_some()
    }

    /// Effective 0-100 weight of a leaf after multiplying through its parent.
    pub fn effective_weight(&self, leaf: &Criterion) -> f64 {
        match &leaf.parent_id {
            Some(parent_id) => {
                let parent_weight = self
                    .find(parent_id)
                    .map(|parent| parent.weight)
                    .unwrap_or(0.0);
                parent_weight * leaf.weight / 100.0
            }
            None => leaf.weight,
        }
    }

    fn branch_ids(&self) -> BTreeSet<CriterionId> {
        self.criteria
            .iter()
            .filter_map(|criterion| criterion.parent_id.clone())
            .collect()
    }
}

fn validate(criteria: &[Criterion]) -> Result<(), SchemaError> {
    if criteria.is_empty() {
        return Err(SchemaError::EmptySchema);
    }

    let mut seen = BTreeSet::new();
    for criterion in criteria {
        if !seen.insert(&criterion.id) {
            return Err(SchemaError::DuplicateCriterionId {
                id: criterion.id.clone(),
            });
        }
    }

    for criterion in criteria {
        if let Some(parent_id) = &criterion.parent_id {
            let parent = criteria
                .iter()
                .find(|candidate| &candidate.id == parent_id)
                .ok_or_else(|| SchemaError::OrphanReference {
                    child: criterion.id.clone(),
                    parent: parent_id.clone(),
                })?;
            if parent.parent_id.is_some() {
                return Err(SchemaError::NestingTooDeep {
                    id: criterion.id.clone(),
                });
            }
        }
    }

    for criterion in criteria {
        if !(0.0..=100.0).contains(&criterion.weight) {
            return Err(SchemaError::WeightOutOfRange {
                id: criterion.id.clone(),
                weight: criterion.weight,
            });
        }
    }

    let branch_ids: BTreeSet<&CriterionId> = criteria
        .iter()
        .filter_map(|criterion| criterion.parent_id.as_ref())
        .collect();
    for criterion in criteria {
        let is_branch = branch_ids.contains(&criterion.id);
        if !is_branch && criterion.max_score <= 0.0 {
            return Err(SchemaError::InvalidMaxScore {
                id: criterion.id.clone(),
                max_score: criterion.max_score,
            });
        }
    }

    let mut sums: BTreeMap<Option<&CriterionId>, f64> = BTreeMap::new();
    for criterion in criteria {
        *sums.entry(criterion.parent_id.as_ref()).or_insert(0.0) += criterion.weight;
    }
    for (parent_id, actual_sum) in sums {
        if (actual_sum - 100.0).abs() > WEIGHT_EPSILON {
            return Err(SchemaError::WeightSumInvalid {
                parent_id: parent_id.cloned(),
                actual_sum,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(id: &str, weight: f64, parent: Option<&str>) -> Criterion {
        Criterion {
            id: CriterionId(id.to_string()),
            name: id.to_string(),
            weight,
            max_score: 100.0,
            parent_id: parent.map(|p| CriterionId(p.to_string())),
        }
    }

    #[test]
    fn accepts_flat_schema_summing_to_hundred() {
        let tree = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("technical", 40.0, None),
                criterion("commercial", 30.0, None),
                criterion("qualifications", 30.0, None),
            ],
        )
        .expect("valid schema");

        assert_eq!(tree.leaves().len(), 3);
    }

    #[test]
    fn rejects_sibling_sum_of_101() {
        let result = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("a", 40.0, None),
                criterion("b", 30.0, None),
                criterion("c", 31.0, None),
            ],
        );

        match result {
            Err(SchemaError::WeightSumInvalid {
                parent_id: None,
                actual_sum,
            }) => assert!((actual_sum - 101.0).abs() < WEIGHT_EPSILON),
            other => panic!("expected weight sum violation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = CriteriaTree::new(
            "v1".to_string(),
            vec![criterion("a", 50.0, None), criterion("a", 50.0, None)],
        );

        assert!(matches!(
            result,
            Err(SchemaError::DuplicateCriterionId { id }) if id.0 == "a"
        ));
    }

    #[test]
    fn rejects_orphaned_child() {
        let result = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("a", 100.0, None),
                criterion("b", 100.0, Some("ghost")),
            ],
        );

        assert!(matches!(
            result,
            Err(SchemaError::OrphanReference { parent, .. }) if parent.0 == "ghost"
        ));
    }

    #[test]
    fn rejects_third_nesting_level() {
        let result = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("top", 100.0, None),
                criterion("mid", 100.0, Some("top")),
                criterion("deep", 100.0, Some("mid")),
            ],
        );

        assert!(matches!(
            result,
            Err(SchemaError::NestingTooDeep { id }) if id.0 == "deep"
        ));
    }

    #[test]
    fn rejects_invalid_child_group_sum() {
        let result = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("top", 100.0, None),
                criterion("left", 60.0, Some("top")),
                criterion("right", 30.0, Some("top")),
            ],
        );

        match result {
            Err(SchemaError::WeightSumInvalid {
                parent_id: Some(parent),
                actual_sum,
            }) => {
                assert_eq!(parent.0, "top");
                assert!((actual_sum - 90.0).abs() < WEIGHT_EPSILON);
            }
            other => panic!("expected child weight sum violation, got {other:?}"),
        }
    }

    #[test]
    fn leaf_effective_weights_sum_to_hundred() {
        let tree = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("technical", 60.0, None),
                criterion("design", 50.0, Some("technical")),
                criterion("delivery", 50.0, Some("technical")),
                criterion("commercial", 40.0, None),
            ],
        )
        .expect("valid schema");

        let total: f64 = tree
            .leaves()
            .iter()
            .map(|leaf| tree.effective_weight(leaf))
            .sum();
        assert!((total - 100.0).abs() < WEIGHT_EPSILON);

        let design = tree.find(&CriterionId("design".to_string())).expect("leaf");
        assert!((tree.effective_weight(design) - 30.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn leaves_follow_declaration_order_depth_first() {
        let tree = CriteriaTree::new(
            "v1".to_string(),
            vec![
                criterion("technical", 60.0, None),
                criterion("commercial", 40.0, None),
                criterion("design", 50.0, Some("technical")),
                criterion("delivery", 50.0, Some("technical")),
            ],
        )
        .expect("valid schema");

        let order: Vec<&str> = tree.leaves().iter().map(|leaf| leaf.id.0.as_str()).collect();
        assert_eq!(order, vec!["design", "delivery", "commercial"]);
    }

    #[test]
    fn rejects_zero_max_score_on_leaf() {
        let mut bad = criterion("a", 100.0, None);
        bad.max_score = 0.0;
        let result = CriteriaTree::new("v1".to_string(), vec![bad]);

        assert!(matches!(result, Err(SchemaError::InvalidMaxScore { .. })));
    }
}
