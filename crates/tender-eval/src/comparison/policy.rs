use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AttributeRecord, FieldValue};
use crate::evaluation::aggregate::round_one_decimal;
use crate::evaluation::criteria::WEIGHT_EPSILON;

/// Pluggable comparability scoring. The diff algorithm never hardcodes what
/// makes one bidder "stronger"; hosts inject the rule set that applies to
/// their domain.
pub trait ScoringPolicy: Send + Sync {
    /// Comparability score on a 0-100 scale for one entity's attribute record.
    fn comparability(&self, record: &AttributeRecord) -> f64;
}

/// Versioned policy document a comparison engine is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub version: String,
    pub components: Vec<PolicyComponent>,
}

/// One weighted sub-scorer bound to an attribute field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyComponent {
    pub field: String,
    /// Percentage weight; component weights sum to 100 like criteria siblings.
    pub weight: f64,
    pub scorer: SubScorer,
}

/// Tagged sub-scorer variants covering the tier, status, and count shaped
/// attributes that qualification records carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubScorer {
    /// Qualitative tier mapped to a fixed numeric scale.
    TierScale {
        scale: BTreeMap<String, f64>,
        #[serde(default)]
        default: f64,
    },
    /// Operational status mapped to a fixed numeric scale.
    StatusScale {
        scale: BTreeMap<String, f64>,
        #[serde(default)]
        default: f64,
    },
    /// Count-based sub-score, capped so a long list cannot dominate.
    CountCapped { per_item: f64, cap: f64 },
}

impl SubScorer {
    fn sub_score(&self, value: Option<&FieldValue>) -> f64 {
        match self {
            SubScorer::TierScale { scale, default }
            | SubScorer::StatusScale { scale, default } => match value {
                Some(FieldValue::Text(text)) => scale.get(text).copied().unwrap_or(*default),
                _ => *default,
            },
            SubScorer::CountCapped { per_item, cap } => match value {
                Some(FieldValue::Set(items)) => (items.len() as f64 * per_item).min(*cap),
                Some(FieldValue::Number(count)) => (count * per_item).min(*cap),
                _ => 0.0,
            },
        }
    }
}

/// Malformed policy documents. Like schema errors these are fatal for the
/// engine being configured, never silently patched.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyError {
    #[error("policy document declares no components")]
    NoComponents,
    #[error("component weights sum to {actual_sum}, expected 100")]
    WeightSumInvalid { actual_sum: f64 },
    #[error("component '{field}' declares an empty scale")]
    EmptyScale { field: String },
    #[error("component '{field}' maps to sub-score {value} outside 0-100")]
    SubScoreOutOfRange { field: String, value: f64 },
    #[error("component '{field}' caps at {cap}, outside 0-100")]
    CapOutOfRange { field: String, cap: f64 },
}

/// The standard [`ScoringPolicy`]: a weighted combination of validated
/// sub-scorers, built from a [`PolicyDocument`].
#[derive(Debug, Clone)]
pub struct WeightedPolicy {
    components: Vec<PolicyComponent>,
}

impl WeightedPolicy {
    pub fn from_document(document: PolicyDocument) -> Result<Self, PolicyError> {
        if document.components.is_empty() {
            return Err(PolicyError::NoComponents);
        }

        let mut weight_sum = 0.0;
        for component in &document.components {
            weight_sum += component.weight;
            match &component.scorer {
                SubScorer::TierScale { scale, default }
                | SubScorer::StatusScale { scale, default } => {
                    if scale.is_empty() {
                        return Err(PolicyError::EmptyScale {
                            field: component.field.clone(),
                        });
                    }
                    for value in scale.values().chain(std::iter::once(default)) {
                        if !(0.0..=100.0).contains(value) {
                            return Err(PolicyError::SubScoreOutOfRange {
                                field: component.field.clone(),
                                value: *value,
                            });
                        }
                    }
                }
                SubScorer::CountCapped { cap, .. } => {
                    if !(0.0..=100.0).contains(cap) {
                        return Err(PolicyError::CapOutOfRange {
                            field: component.field.clone(),
                            cap: *cap,
                        });
                    }
                }
            }
        }

        if (weight_sum - 100.0).abs() > WEIGHT_EPSILON {
            return Err(PolicyError::WeightSumInvalid {
                actual_sum: weight_sum,
            });
        }

        Ok(Self {
            components: document.components,
        })
    }
}

impl ScoringPolicy for WeightedPolicy {
    fn comparability(&self, record: &AttributeRecord) -> f64 {
        let total: f64 = self
            .components
            .iter()
            .map(|component| {
                let value = record.fields.get(&component.field);
                component.scorer.sub_score(value) * component.weight / 100.0
            })
            .sum();
        round_one_decimal(total.clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use std::collections::BTreeSet;

    fn tier_scale() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("特级".to_string(), 100.0),
            ("一级".to_string(), 80.0),
            ("二级".to_string(), 60.0),
        ])
    }

    fn document() -> PolicyDocument {
        PolicyDocument {
            version: "v1".to_string(),
            components: vec![
                PolicyComponent {
                    field: "qualification_level".to_string(),
                    weight: 50.0,
                    scorer: SubScorer::TierScale {
                        scale: tier_scale(),
                        default: 0.0,
                    },
                },
                PolicyComponent {
                    field: "status".to_string(),
                    weight: 20.0,
                    scorer: SubScorer::StatusScale {
                        scale: BTreeMap::from([
                            ("active".to_string(), 100.0),
                            ("suspended".to_string(), 20.0),
                        ]),
                        default: 0.0,
                    },
                },
                PolicyComponent {
                    field: "certifications".to_string(),
                    weight: 30.0,
                    scorer: SubScorer::CountCapped {
                        per_item: 25.0,
                        cap: 100.0,
                    },
                },
            ],
        }
    }

    fn record(tier: &str, status: &str, certifications: &[&str]) -> AttributeRecord {
        AttributeRecord {
            entity_id: EntityId("company-a".to_string()),
            fields: BTreeMap::from([
                (
                    "qualification_level".to_string(),
                    FieldValue::Text(tier.to_string()),
                ),
                ("status".to_string(), FieldValue::Text(status.to_string())),
                (
                    "certifications".to_string(),
                    FieldValue::Set(
                        certifications
                            .iter()
                            .map(|item| item.to_string())
                            .collect::<BTreeSet<String>>(),
                    ),
                ),
            ]),
        }
    }

    #[test]
    fn combines_weighted_sub_scores() {
        let policy = WeightedPolicy::from_document(document()).expect("valid policy");

        let score = policy.comparability(&record("特级", "active", &["iso9001", "iso14001"]));

        // 0.5*100 + 0.2*100 + 0.3*min(2*25, 100)
        assert_eq!(score, 85.0);
    }

    #[test]
    fn caps_count_based_sub_score() {
        let policy = WeightedPolicy::from_document(document()).expect("valid policy");

        let many = ["a", "b", "c", "d", "e", "f"];
        let score = policy.comparability(&record("特级", "active", &many));

        // count contribution saturates at the cap
        assert_eq!(score, 100.0);
    }

    #[test]
    fn unknown_tier_falls_back_to_default() {
        let policy = WeightedPolicy::from_document(document()).expect("valid policy");

        let score = policy.comparability(&record("unrated", "active", &[]));

        assert_eq!(score, 20.0);
    }

    #[test]
    fn rejects_weights_not_summing_to_hundred() {
        let mut doc = document();
        doc.components[0].weight = 55.0;

        match WeightedPolicy::from_document(doc) {
            Err(PolicyError::WeightSumInvalid { actual_sum }) => {
                assert!((actual_sum - 105.0).abs() < 1e-9)
            }
            other => panic!("expected weight sum rejection, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_scale_values() {
        let mut doc = document();
        doc.components[0].scorer = SubScorer::TierScale {
            scale: BTreeMap::from([("特级".to_string(), 120.0)]),
            default: 0.0,
        };

        assert!(matches!(
            WeightedPolicy::from_document(doc),
            Err(PolicyError::SubScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn policy_document_round_trips_through_json() {
        let doc = document();
        let raw = serde_json::to_string(&doc).expect("serializes");
        let parsed: PolicyDocument = serde_json::from_str(&raw).expect("deserializes");

        assert_eq!(parsed, doc);
    }
}
