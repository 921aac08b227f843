//! Structural comparison of entity attribute records: field-level diffs plus a
//! policy-defined comparability score per entity.
//!
//! The diff runs independently of score aggregation; it consumes raw attribute
//! records, not reviewer scores. Output ordering follows the declared field
//! specs so rendering downstream stays stable.

pub mod policy;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EntityId;
use crate::summary::format_timestamp;
use policy::ScoringPolicy;

pub use policy::{PolicyComponent, PolicyDocument, PolicyError, SubScorer, WeightedPolicy};

/// Ceiling on how many entities one comparison may span.
pub const DEFAULT_MAX_COMPARED: usize = 5;

/// A value carried by one attribute field. Dates deserialize from ISO calendar
/// dates and compare canonically; sets compare by membership only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Set(BTreeSet<String>),
    Text(String),
}

/// Kind declaration for a compared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Date,
    Set,
}

impl FieldKind {
    /// Scalar admits text and numbers; date and set fields are exact.
    pub fn matches(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::Scalar, FieldValue::Text(_) | FieldValue::Number(_))
                | (FieldKind::Date, FieldValue::Date(_))
                | (FieldKind::Set, FieldValue::Set(_))
        )
    }
}

/// Declares one field to diff: name, display label, and value kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

/// One entity's raw attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub entity_id: EntityId,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Computed per-field diff across all compared entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDifference {
    pub field_name: String,
    pub label: String,
    pub values_by_entity: BTreeMap<EntityId, FieldValue>,
    pub is_different: bool,
}

/// Header statistics for a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub entity_count: usize,
    pub difference_count: usize,
    pub recommended_entity: Option<EntityId>,
    pub generated_at: String,
}

/// Full comparison output: ordered diffs, per-entity comparability, summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub differences: Vec<FieldDifference>,
    pub comparability: BTreeMap<EntityId, f64>,
    pub summary: ComparisonSummary,
}

/// Structural rejections raised before any field is diffed.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonError {
    #[error("comparison needs at least 2 entities, got {actual}")]
    InsufficientEntities { actual: usize },
    #[error("comparison supports at most {max} entities, got {actual}")]
    TooManyEntities { actual: usize, max: usize },
    #[error("entity '{entity_id}' appears more than once")]
    DuplicateEntity { entity_id: EntityId },
    #[error("field '{field_name}' of entity '{entity_id}' does not match its declared {expected:?} kind")]
    FieldKindMismatch {
        entity_id: EntityId,
        field_name: String,
        expected: FieldKind,
    },
}

/// Diff engine configured with an entity ceiling and an injected scoring
/// policy. The engine itself is stateless; `compare` is a pure function of its
/// arguments.
pub struct ComparisonEngine {
    max_compared: usize,
    policy: Arc<dyn ScoringPolicy>,
}

impl ComparisonEngine {
    pub fn new(max_compared: usize, policy: Arc<dyn ScoringPolicy>) -> Self {
        Self {
            max_compared,
            policy,
        }
    }

    pub fn max_compared(&self) -> usize {
        self.max_compared
    }

    /// Compare 2..=max entities field by field.
    ///
    /// Scalar and date fields differ when any two values are unequal (dates in
    /// canonical calendar form); set fields differ on any membership mismatch.
    /// A field absent from some records counts as a differing value; a value
    /// present under the wrong kind is rejected outright. The caller supplies
    /// `generated_at` so output stays reproducible.
    pub fn compare(
        &self,
        records: &[AttributeRecord],
        field_specs: &[FieldSpec],
        generated_at: DateTime<Utc>,
    ) -> Result<ComparisonReport, ComparisonError> {
        if records.len() < 2 {
            return Err(ComparisonError::InsufficientEntities {
                actual: records.len(),
            });
        }
        if records.len() > self.max_compared {
            return Err(ComparisonError::TooManyEntities {
                actual: records.len(),
                max: self.max_compared,
            });
        }
        let mut seen = BTreeSet::new();
        for record in records {
            if !seen.insert(&record.entity_id) {
                return Err(ComparisonError::DuplicateEntity {
                    entity_id: record.entity_id.clone(),
                });
            }
        }
        for spec in field_specs {
            for record in records {
                if let Some(value) = record.fields.get(&spec.name) {
                    if !spec.kind.matches(value) {
                        return Err(ComparisonError::FieldKindMismatch {
                            entity_id: record.entity_id.clone(),
                            field_name: spec.name.clone(),
                            expected: spec.kind,
                        });
                    }
                }
            }
        }

        let differences: Vec<FieldDifference> = field_specs
            .iter()
            .map(|spec| diff_field(spec, records))
            .collect();
        let difference_count = differences
            .iter()
            .filter(|difference| difference.is_different)
            .count();

        let mut comparability = BTreeMap::new();
        for record in records {
            comparability.insert(record.entity_id.clone(), self.policy.comparability(record));
        }

        let recommended_entity = recommend(&comparability);

        Ok(ComparisonReport {
            differences,
            comparability,
            summary: ComparisonSummary {
                entity_count: records.len(),
                difference_count,
                recommended_entity,
                generated_at: format_timestamp(generated_at),
            },
        })
    }
}

fn diff_field(spec: &FieldSpec, records: &[AttributeRecord]) -> FieldDifference {
    let mut values_by_entity = BTreeMap::new();
    for record in records {
        if let Some(value) = record.fields.get(&spec.name) {
            values_by_entity.insert(record.entity_id.clone(), value.clone());
        }
    }

    let all_present = values_by_entity.len() == records.len();
    let mut iter = values_by_entity.values();
    let all_equal = match iter.next() {
        Some(first) => iter.all(|value| value == first),
        None => true,
    };
    // a field nobody declares is trivially identical; a partial gap is a diff
    let is_different = if values_by_entity.is_empty() {
        false
    } else {
        !all_present || !all_equal
    };

    FieldDifference {
        field_name: spec.name.clone(),
        label: spec.label.clone(),
        values_by_entity,
        is_different,
    }
}

/// Highest comparability wins; ties resolve to the ascending entity id.
fn recommend(comparability: &BTreeMap<EntityId, f64>) -> Option<EntityId> {
    let mut best: Option<(&EntityId, f64)> = None;
    for (entity_id, score) in comparability {
        match best {
            Some((_, best_score)) if *score <= best_score => {}
            _ => best = Some((entity_id, *score)),
        }
    }
    best.map(|(entity_id, _)| entity_id.clone())
}
