//! Final report assembly: simple reductions over ranking and comparison
//! outputs, nothing more.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::comparison::ComparisonReport;
use crate::domain::EntityId;
use crate::evaluation::aggregate::round_one_decimal;
use crate::evaluation::ranking::RankedEntity;

/// Every timestamp the engine emits uses this one format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Aggregate statistics over a ranked result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub entity_count: usize,
    pub highest_score: Option<f64>,
    pub lowest_score: Option<f64>,
    pub mean_score: Option<f64>,
    /// The rank-1 entity, when any entity was ranked.
    pub recommended_entity: Option<EntityId>,
    pub generated_at: String,
}

/// The final report object: summary header, the full ranked list, and the
/// qualification comparison when one was run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub ranked: Vec<RankedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
}

/// Reduce a ranked list to its header statistics. The caller supplies the
/// instant so the builder stays a pure function.
pub fn build_summary(ranked: &[RankedEntity], generated_at: DateTime<Utc>) -> EvaluationSummary {
    let totals: Vec<f64> = ranked.iter().map(|entry| entry.result.total_score).collect();
    let highest_score = totals.iter().copied().fold(None, |best: Option<f64>, score| {
        Some(best.map_or(score, |value| value.max(score)))
    });
    let lowest_score = totals.iter().copied().fold(None, |worst: Option<f64>, score| {
        Some(worst.map_or(score, |value| value.min(score)))
    });
    let mean_score = if totals.is_empty() {
        None
    } else {
        Some(round_one_decimal(
            totals.iter().sum::<f64>() / totals.len() as f64,
        ))
    };
    let recommended_entity = ranked
        .iter()
        .find(|entry| entry.rank == 1)
        .map(|entry| entry.result.entity_id.clone());

    EvaluationSummary {
        entity_count: ranked.len(),
        highest_score,
        lowest_score,
        mean_score,
        recommended_entity,
        generated_at: format_timestamp(generated_at),
    }
}

pub fn build_report(
    ranked: Vec<RankedEntity>,
    comparison: Option<ComparisonReport>,
    generated_at: DateTime<Utc>,
) -> EvaluationReport {
    EvaluationReport {
        summary: build_summary(&ranked, generated_at),
        ranked,
        comparison,
    }
}
