//! Integration scenarios for qualification comparison: policy configuration
//! from JSON, field diffing, and embedding the comparison into the final
//! evaluation report.

mod common {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tender_eval::comparison::{
        AttributeRecord, ComparisonEngine, FieldKind, FieldSpec, FieldValue, PolicyDocument,
        WeightedPolicy, DEFAULT_MAX_COMPARED,
    };
    use tender_eval::domain::EntityId;

    pub(super) fn policy_document() -> PolicyDocument {
        serde_json::from_str(
            r#"{
                "version": "qual-2026",
                "components": [
                    {
                        "field": "qualification_level",
                        "weight": 50.0,
                        "scorer": {
                            "type": "tier_scale",
                            "scale": { "特级": 100.0, "一级": 80.0, "二级": 60.0 },
                            "default": 20.0
                        }
                    },
                    {
                        "field": "status",
                        "weight": 20.0,
                        "scorer": {
                            "type": "status_scale",
                            "scale": { "active": 100.0, "probation": 50.0 },
                            "default": 0.0
                        }
                    },
                    {
                        "field": "certifications",
                        "weight": 30.0,
                        "scorer": { "type": "count_capped", "per_item": 20.0, "cap": 100.0 }
                    }
                ]
            }"#,
        )
        .expect("policy document parses")
    }

    pub(super) fn engine() -> ComparisonEngine {
        let policy = WeightedPolicy::from_document(policy_document()).expect("policy is valid");
        ComparisonEngine::new(DEFAULT_MAX_COMPARED, Arc::new(policy))
    }

    pub(super) fn field_specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("qualification_level", "Qualification level", FieldKind::Scalar),
            FieldSpec::new("status", "Operational status", FieldKind::Scalar),
            FieldSpec::new("established_on", "Established", FieldKind::Date),
            FieldSpec::new("certifications", "Certifications", FieldKind::Set),
        ]
    }

    pub(super) fn record(
        entity: &str,
        tier: &str,
        status: &str,
        established: NaiveDate,
        certifications: &[&str],
    ) -> AttributeRecord {
        AttributeRecord {
            entity_id: EntityId(entity.to_string()),
            fields: BTreeMap::from([
                (
                    "qualification_level".to_string(),
                    FieldValue::Text(tier.to_string()),
                ),
                ("status".to_string(), FieldValue::Text(status.to_string())),
                ("established_on".to_string(), FieldValue::Date(established)),
                (
                    "certifications".to_string(),
                    FieldValue::Set(certifications.iter().map(|item| item.to_string()).collect()),
                ),
            ]),
        }
    }

    pub(super) fn founded(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 1, 15).expect("valid date")
    }

    pub(super) fn entity_id(raw: &str) -> EntityId {
        EntityId(raw.to_string())
    }
}

mod diffing {
    use super::common::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn diff_reports_differing_fields_and_scores_comparability() {
        let records = vec![
            record("huacheng", "特级", "active", founded(1998), &["iso9001", "iso14001", "ohsas18001"]),
            record("lvdi", "一级", "probation", founded(1998), &["iso9001"]),
        ];
        let generated_at = Utc
            .with_ymd_and_hms(2026, 8, 28, 10, 0, 0)
            .single()
            .expect("valid timestamp");

        let report = engine()
            .compare(&records, &field_specs(), generated_at)
            .expect("records compare");

        // established_on matches, the other three fields differ.
        assert_eq!(report.differences.len(), 4);
        let by_name: Vec<(&str, bool)> = report
            .differences
            .iter()
            .map(|diff| (diff.field_name.as_str(), diff.is_different))
            .collect();
        assert_eq!(
            by_name,
            vec![
                ("qualification_level", true),
                ("status", true),
                ("established_on", false),
                ("certifications", true),
            ]
        );
        assert_eq!(report.summary.difference_count, 3);

        // 特级(100)*0.5 + active(100)*0.2 + 3 certs capped at 60*0.3
        assert_eq!(report.comparability[&entity_id("huacheng")], 88.0);
        // 一级(80)*0.5 + probation(50)*0.2 + 1 cert 20*0.3
        assert_eq!(report.comparability[&entity_id("lvdi")], 56.0);
        assert_eq!(report.summary.recommended_entity, Some(entity_id("huacheng")));
        assert_eq!(report.summary.generated_at, "2026-08-28T10:00:00Z");
    }

    #[test]
    fn unknown_tier_falls_back_to_the_policy_default() {
        let records = vec![
            record("huacheng", "特级", "active", founded(1998), &["iso9001"]),
            record("wild-card", "未评级", "active", founded(2020), &["iso9001"]),
        ];

        let report = engine()
            .compare(&records, &field_specs(), chrono::Utc::now())
            .expect("records compare");

        // default tier 20*0.5 + active 100*0.2 + 1 cert 20*0.3
        assert_eq!(report.comparability[&entity_id("wild-card")], 36.0);
    }

    #[test]
    fn comparison_rejects_a_single_record() {
        let records = vec![record("huacheng", "特级", "active", founded(1998), &[])];

        let error = engine()
            .compare(&records, &field_specs(), chrono::Utc::now())
            .expect_err("one record is below the minimum");

        assert!(error.to_string().contains("at least 2"));
    }
}

mod report {
    use super::common::*;
    use chrono::Utc;
    use tender_eval::summary::build_report;

    #[test]
    fn comparison_embeds_into_the_evaluation_report() {
        let records = vec![
            record("huacheng", "特级", "active", founded(1998), &["iso9001"]),
            record("lvdi", "一级", "active", founded(2006), &["iso9001"]),
        ];
        let comparison = engine()
            .compare(&records, &field_specs(), Utc::now())
            .expect("records compare");

        let report = build_report(Vec::new(), Some(comparison), Utc::now());
        let payload = serde_json::to_value(&report).expect("report serializes");

        assert_eq!(payload["summary"]["entity_count"], serde_json::json!(0));
        assert_eq!(
            payload["comparison"]["summary"]["entity_count"],
            serde_json::json!(2)
        );
        assert_eq!(
            payload["comparison"]["comparability"]["huacheng"],
            serde_json::json!(76.0)
        );
    }
}
