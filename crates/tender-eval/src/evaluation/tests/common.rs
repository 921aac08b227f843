use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::domain::{CriterionId, EntityId, ReviewerId, SessionId};
use crate::evaluation::criteria::{CriteriaDocument, Criterion};
use crate::evaluation::router::evaluation_router;
use crate::evaluation::scores::{ReviewerScore, ScoreStatus};
use crate::evaluation::session::{
    EvaluationService, EvaluationSession, SessionError, SessionStore,
};

pub(super) fn criteria_document() -> CriteriaDocument {
    CriteriaDocument {
        version: "2026-07".to_string(),
        criteria: vec![
            criterion("technical", 40.0, 100.0, None),
            criterion("commercial", 30.0, 100.0, None),
            criterion("service", 30.0, 100.0, None),
        ],
    }
}

pub(super) fn criterion(
    id: &str,
    weight: f64,
    max_score: f64,
    parent: Option<&str>,
) -> Criterion {
    Criterion {
        id: CriterionId(id.to_string()),
        name: id.to_string(),
        weight,
        max_score,
        parent_id: parent.map(|p| CriterionId(p.to_string())),
    }
}

pub(super) fn submitted_score(
    reviewer: &str,
    entity: &str,
    criterion: &str,
    raw: f64,
) -> ReviewerScore {
    ReviewerScore {
        reviewer_id: ReviewerId(reviewer.to_string()),
        entity_id: EntityId(entity.to_string()),
        criterion_id: CriterionId(criterion.to_string()),
        raw_score: raw,
        comment: None,
        status: ScoreStatus::Submitted,
    }
}

pub(super) fn full_sheet(reviewer: &str, entity: &str, scores: [f64; 3]) -> Vec<ReviewerScore> {
    vec![
        submitted_score(reviewer, entity, "technical", scores[0]),
        submitted_score(reviewer, entity, "commercial", scores[1]),
        submitted_score(reviewer, entity, "service", scores[2]),
    ]
}

pub(super) fn session_id(raw: &str) -> SessionId {
    SessionId(raw.to_string())
}

pub(super) fn build_service() -> (EvaluationService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = EvaluationService::new(store.clone());
    (service, store)
}

pub(super) fn evaluation_router_with_service(
    service: EvaluationService<MemoryStore>,
) -> axum::Router {
    evaluation_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    sessions: Arc<Mutex<HashMap<SessionId, EvaluationSession>>>,
}

impl SessionStore for MemoryStore {
    fn insert(&self, session: EvaluationSession) -> Result<(), SessionError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(SessionError::Conflict);
        }
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<EvaluationSession>, SessionError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableStore;

impl SessionStore for UnavailableStore {
    fn insert(&self, _session: EvaluationSession) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<EvaluationSession>, SessionError> {
        Err(SessionError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
