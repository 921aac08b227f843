use std::io::Read;

use serde::Deserialize;

use super::scores::{ReviewerScore, ScoreStatus};
use crate::domain::{CriterionId, EntityId, ReviewerId};

/// Failures while ingesting a bulk reviewer-score export.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("csv parse failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unknown score status '{value}'")]
    UnknownStatus { row: usize, value: String },
}

/// Parse reviewer scores from a CSV export with the columns
/// `Reviewer,Entity,Criterion,Score,Status,Comment`.
///
/// Status is matched case-insensitively; an empty status defaults to draft so
/// half-filled sheets never sneak into aggregation.
pub fn scores_from_reader<R: Read>(reader: R) -> Result<Vec<ReviewerScore>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut scores = Vec::new();
    for (index, record) in csv_reader.deserialize::<ScoreRow>().enumerate() {
        let row = record?;
        // header occupies the first line of the file
        let row_number = index + 2;
        let status = parse_status(row.status.as_deref(), row_number)?;

        scores.push(ReviewerScore {
            reviewer_id: ReviewerId(row.reviewer),
            entity_id: EntityId(row.entity),
            criterion_id: CriterionId(row.criterion),
            raw_score: row.score,
            comment: row.comment.filter(|comment| !comment.is_empty()),
            status,
        });
    }

    Ok(scores)
}

fn parse_status(value: Option<&str>, row: usize) -> Result<ScoreStatus, ImportError> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(ScoreStatus::Draft);
    };

    match raw.to_ascii_lowercase().as_str() {
        "draft" => Ok(ScoreStatus::Draft),
        "submitted" => Ok(ScoreStatus::Submitted),
        "locked" => Ok(ScoreStatus::Locked),
        _ => Err(ImportError::UnknownStatus {
            row,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    #[serde(rename = "Reviewer")]
    reviewer: String,
    #[serde(rename = "Entity")]
    entity: String,
    #[serde(rename = "Criterion")]
    criterion: String,
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_reviewer_scores_with_statuses() {
        let csv = "Reviewer,Entity,Criterion,Score,Status,Comment\n\
                   r1,company-a,technical,88,submitted,solid proposal\n\
                   r1,company-a,commercial,85,LOCKED,\n\
                   r2,company-a,technical,80,,\n";

        let scores = scores_from_reader(Cursor::new(csv)).expect("parses");

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].status, ScoreStatus::Submitted);
        assert_eq!(scores[0].comment.as_deref(), Some("solid proposal"));
        assert_eq!(scores[1].status, ScoreStatus::Locked);
        assert_eq!(scores[1].comment, None);
        assert_eq!(scores[2].status, ScoreStatus::Draft);
    }

    #[test]
    fn rejects_unknown_status_with_row_number() {
        let csv = "Reviewer,Entity,Criterion,Score,Status,Comment\n\
                   r1,company-a,technical,88,finalized,\n";

        match scores_from_reader(Cursor::new(csv)) {
            Err(ImportError::UnknownStatus { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "finalized");
            }
            other => panic!("expected unknown status error, got {other:?}"),
        }
    }
}
