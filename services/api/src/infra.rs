use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tender_eval::comparison::{
    ComparisonEngine, FieldKind, FieldSpec, PolicyComponent, PolicyDocument, SubScorer,
    WeightedPolicy,
};
use tender_eval::domain::SessionId;
use tender_eval::error::AppError;
use tender_eval::evaluation::{EvaluationSession, SessionError, SessionStore};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Comparison dependencies carried separately from the operational state so
/// the compare endpoint can be exercised without a metrics recorder.
#[derive(Clone)]
pub(crate) struct CompareState {
    pub(crate) engine: Arc<ComparisonEngine>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, EvaluationSession>>>,
}

impl SessionStore for InMemorySessionStore {
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

/// Comparability policy for construction-style qualification records: the
/// qualification tier dominates, operational status and held certifications
/// round it out.
pub(crate) fn default_policy() -> WeightedPolicy {
    let document = PolicyDocument {
        version: "qualifications-v1".to_string(),
        components: vec![
            PolicyComponent {
                field: "qualification_level".to_string(),
                weight: 50.0,
                scorer: SubScorer::TierScale {
                    scale: BTreeMap::from([
                        ("特级".to_string(), 100.0),
                        ("一级".to_string(), 80.0),
                        ("二级".to_string(), 60.0),
                        ("三级".to_string(), 40.0),
                    ]),
                    default: 0.0,
                },
            },
            PolicyComponent {
                field: "status".to_string(),
                weight: 20.0,
                scorer: SubScorer::StatusScale {
                    scale: BTreeMap::from([
                        ("active".to_string(), 100.0),
                        ("probation".to_string(), 50.0),
                        ("suspended".to_string(), 10.0),
                    ]),
                    default: 0.0,
                },
            },
            PolicyComponent {
                field: "certifications".to_string(),
                weight: 30.0,
                scorer: SubScorer::CountCapped {
                    per_item: 20.0,
                    cap: 100.0,
                },
            },
        ],
    };

    WeightedPolicy::from_document(document).expect("bundled policy document is valid")
}

/// Fields compared when a request does not declare its own specs.
pub(crate) fn default_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("qualification_level", "Qualification level", FieldKind::Scalar),
        FieldSpec::new("status", "Operating status", FieldKind::Scalar),
        FieldSpec::new("registered_capital", "Registered capital", FieldKind::Scalar),
        FieldSpec::new("established_on", "Established on", FieldKind::Date),
        FieldSpec::new("certifications", "Certifications", FieldKind::Set),
    ]
}

/// Build the comparison engine, preferring a deployment-supplied policy over
/// the bundled one.
pub(crate) fn comparison_engine(
    max_compared: usize,
    policy: Option<WeightedPolicy>,
) -> ComparisonEngine {
    let policy = policy.unwrap_or_else(default_policy);
    ComparisonEngine::new(max_compared, Arc::new(policy))
}

/// Load and validate a comparability policy document from disk.
pub(crate) fn policy_from_file(path: &Path) -> Result<WeightedPolicy, AppError> {
    let document: PolicyDocument = serde_json::from_reader(File::open(path)?)?;
    Ok(WeightedPolicy::from_document(document)?)
}
