//! Weighted evaluation pipeline: criteria schema validation, reviewer score
//! aggregation, and rank assignment.
//!
//! Everything here is a pure function over its inputs; the only state is the
//! criteria tree a session was opened with, held read-only behind the
//! [`SessionStore`]. Entities aggregate independently of one another, so
//! callers are free to fan batches out; ranking is the join point that needs
//! the complete result set.

pub mod aggregate;
pub mod criteria;
pub mod import;
pub mod ranking;
pub mod router;
pub mod scores;
pub mod session;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate, AggregatedResult, InputError};
pub use criteria::{
    CriteriaDocument, CriteriaTree, Criterion, SchemaError, WEIGHT_EPSILON,
};
pub use import::{scores_from_reader, ImportError};
pub use ranking::{rank, RankedEntity};
pub use router::evaluation_router;
pub use scores::{ReviewerScore, ScoreStatus};
pub use session::{
    aggregate_batch, AggregationBatch, EntityFailure, EvaluationService, EvaluationServiceError,
    EvaluationSession, SessionError, SessionStore, SessionView,
};
