use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::aggregate::AggregatedResult;

/// An aggregated result with its assigned position. Ranks are recomputed from
/// the full result set; they are never owned independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    #[serde(flatten)]
    pub result: AggregatedResult,
    pub rank: usize,
}

/// Order results by total score descending and assign unique, consecutive
/// ranks starting at 1.
///
/// Ties on total score fall back to reviewer count descending (more
/// corroboration ranks higher), then entity id ascending. Tied entities still
/// receive distinct ranks; shared ranks are deliberately not produced.
pub fn rank(results: Vec<AggregatedResult>) -> Vec<RankedEntity> {
    let mut ordered = results;
    ordered.sort_by(compare_results);
    ordered
        .into_iter()
        .enumerate()
        .map(|(index, result)| RankedEntity {
            result,
            rank: index + 1,
        })
        .collect()
}

fn compare_results(a: &AggregatedResult, b: &AggregatedResult) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| b.reviewer_count.cmp(&a.reviewer_count))
        .then_with(|| a.entity_id.cmp(&b.entity_id))
}
