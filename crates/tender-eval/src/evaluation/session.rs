use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate, AggregatedResult, InputError};
use super::criteria::{CriteriaDocument, CriteriaTree, SchemaError};
use super::ranking::{rank, RankedEntity};
use super::scores::ReviewerScore;
use crate::domain::{EntityId, SessionId};

/// A validated criteria tree pinned to a session for its whole lifetime.
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    pub id: SessionId,
    pub tree: CriteriaTree,
    pub opened_at: DateTime<Utc>,
}

impl EvaluationSession {
    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            criteria_version: self.tree.version().to_string(),
            leaf_count: self.tree.leaves().len(),
            opened_at: self.opened_at,
        }
    }
}

/// Session snapshot returned over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub criteria_version: String,
    pub leaf_count: usize,
    pub opened_at: DateTime<Utc>,
}

/// Storage abstraction so the service module can be exercised in isolation.
/// The engine itself stays stateless; hosts decide where sessions live.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: EvaluationSession) -> Result<(), SessionError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<EvaluationSession>, SessionError>;
}

/// Error enumeration for session store failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// One entity's scoped rejection inside a batch response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub entity_id: EntityId,
    pub error: InputError,
}

/// Batch envelope: successfully aggregated and ranked entities alongside the
/// entities whose score sets were rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBatch {
    pub results: Vec<AggregatedResult>,
    pub ranked: Vec<RankedEntity>,
    pub failures: Vec<EntityFailure>,
}

/// Aggregate a mixed score batch, grouping by entity.
///
/// An [`InputError`] is scoped to its entity and lands in the failure list
/// while the remaining entities still aggregate and rank. Entity computations
/// are independent; ranking is the join point that needs the full result set.
pub fn aggregate_batch(tree: &CriteriaTree, scores: &[ReviewerScore]) -> AggregationBatch {
    let mut by_entity: BTreeMap<EntityId, Vec<ReviewerScore>> = BTreeMap::new();
    for score in scores {
        by_entity
            .entry(score.entity_id.clone())
            .or_default()
            .push(score.clone());
    }

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (entity_id, entity_scores) in &by_entity {
        match aggregate(entity_id, entity_scores, tree) {
            Ok(result) => results.push(result),
            Err(error) => failures.push(EntityFailure {
                entity_id: entity_id.clone(),
                error,
            }),
        }
    }

    let ranked = rank(results.clone());
    AggregationBatch {
        results,
        ranked,
        failures,
    }
}

/// Service composing the session store with the pure aggregation pipeline.
pub struct EvaluationService<S> {
    store: Arc<S>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl<S> EvaluationService<S>
where
    S: SessionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate a criteria document and pin it to a new session. A schema
    /// violation is fatal here; no scoring is accepted for an unopened session.
    pub fn open_session(
        &self,
        id: SessionId,
        document: CriteriaDocument,
    ) -> Result<SessionView, EvaluationServiceError> {
        let tree = CriteriaTree::from_document(document)?;
        let session = EvaluationSession {
            id,
            tree,
            opened_at: Utc::now(),
        };
        let view = session.view();
        self.store.insert(session)?;
        Ok(view)
    }

    pub fn session(&self, id: &SessionId) -> Result<SessionView, EvaluationServiceError> {
        let session = self
            .store
            .fetch(id)?
            .ok_or(SessionError::NotFound)?;
        Ok(session.view())
    }

    /// Aggregate and rank a score batch against the session's criteria tree.
    pub fn aggregate_batch(
        &self,
        id: &SessionId,
        scores: &[ReviewerScore],
    ) -> Result<AggregationBatch, EvaluationServiceError> {
        let session = self
            .store
            .fetch(id)?
            .ok_or(SessionError::NotFound)?;
        Ok(aggregate_batch(&session.tree, scores))
    }
}
