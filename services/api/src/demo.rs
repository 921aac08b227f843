use crate::infra::{comparison_engine, default_field_specs, policy_from_file};
use chrono::{NaiveDate, Utc};
use clap::Args;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use tender_eval::comparison::{AttributeRecord, FieldValue};
use tender_eval::domain::{CriterionId, EntityId, ReviewerId};
use tender_eval::error::AppError;
use tender_eval::evaluation::{
    aggregate_batch, scores_from_reader, CriteriaDocument, CriteriaTree, Criterion, ReviewerScore,
    ScoreStatus,
};
use tender_eval::summary::build_report;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Criteria document (JSON) describing the weighted schema
    #[arg(long)]
    pub(crate) criteria: PathBuf,
    /// Reviewer score export (CSV: Reviewer,Entity,Criterion,Score,Status,Comment)
    #[arg(long)]
    pub(crate) scores: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional reviewer score CSV to replace the bundled sample sheet
    #[arg(long)]
    pub(crate) scores_csv: Option<PathBuf>,
    /// Comparability policy document (JSON); the bundled policy applies when omitted
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
    /// Skip the qualification comparison portion of the demo
    #[arg(long)]
    pub(crate) skip_comparison: bool,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs { criteria, scores } = args;

    let document: CriteriaDocument = serde_json::from_reader(File::open(criteria)?)?;
    let tree = CriteriaTree::from_document(document)?;
    let scores = scores_from_reader(File::open(scores)?)?;

    let batch = aggregate_batch(&tree, &scores);
    let report = build_report(batch.ranked.clone(), None, Utc::now());

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !batch.failures.is_empty() {
        eprintln!("rejected entities:");
        for failure in &batch.failures {
            eprintln!("  - {}: {}", failure.entity_id, failure.error);
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        scores_csv,
        policy,
        skip_comparison,
    } = args;

    println!("Tender evaluation demo");

    let tree = demo_criteria_tree()?;
    println!(
        "- Criteria schema '{}' with {} scorable leaves",
        tree.version(),
        tree.leaves().len()
    );

    let scores = match scores_csv {
        Some(path) => scores_from_reader(File::open(path)?)?,
        None => demo_scores(),
    };

    let batch = aggregate_batch(&tree, &scores);
    println!(
        "- Aggregated {} entities ({} rejected)",
        batch.results.len(),
        batch.failures.len()
    );
    for failure in &batch.failures {
        println!("  rejected {}: {}", failure.entity_id, failure.error);
    }
    for entry in &batch.ranked {
        println!(
            "  #{} {} -> {} ({} reviewers)",
            entry.rank, entry.result.entity_id, entry.result.total_score, entry.result.reviewer_count
        );
    }

    let comparison = if skip_comparison {
        None
    } else {
        let policy = policy.map(|path| policy_from_file(&path)).transpose()?;
        let engine = comparison_engine(5, policy);
        let report = engine.compare(&demo_qualifications(), &default_field_specs(), Utc::now())?;
        println!(
            "- Compared {} qualification records: {} differing fields",
            report.summary.entity_count, report.summary.difference_count
        );
        if let Some(entity) = &report.summary.recommended_entity {
            println!("  strongest qualification profile: {entity}");
        }
        Some(report)
    };

    let report = build_report(batch.ranked, comparison, Utc::now());
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn demo_criteria_tree() -> Result<CriteriaTree, AppError> {
    let criteria = vec![
        branch("technical", "Technical proposal", 50.0),
        leaf("design", "Design quality", 60.0, 100.0, Some("technical")),
        leaf("schedule", "Schedule feasibility", 40.0, 100.0, Some("technical")),
        leaf("commercial", "Commercial terms", 30.0, 100.0, None),
        leaf("track_record", "Track record", 20.0, 50.0, None),
    ];
    let document = CriteriaDocument {
        version: "demo-2026".to_string(),
        criteria,
    };
    Ok(CriteriaTree::from_document(document)?)
}

fn branch(id: &str, name: &str, weight: f64) -> Criterion {
    Criterion {
        id: CriterionId(id.to_string()),
        name: name.to_string(),
        weight,
        max_score: 0.0,
        parent_id: None,
    }
}

fn leaf(id: &str, name: &str, weight: f64, max_score: f64, parent: Option<&str>) -> Criterion {
    Criterion {
        id: CriterionId(id.to_string()),
        name: name.to_string(),
        weight,
        max_score,
        parent_id: parent.map(|p| CriterionId(p.to_string())),
    }
}

fn demo_scores() -> Vec<ReviewerScore> {
    let mut scores = Vec::new();
    let sheets: [(&str, &str, [f64; 4]); 9] = [
        ("r1", "huacheng-construction", [88.0, 85.0, 82.0, 45.0]),
        ("r2", "huacheng-construction", [84.0, 88.0, 79.0, 42.0]),
        ("r3", "huacheng-construction", [86.0, 82.0, 81.0, 44.0]),
        ("r1", "zhongjian-group", [91.0, 80.0, 85.0, 48.0]),
        ("r2", "zhongjian-group", [89.0, 83.0, 88.0, 46.0]),
        ("r3", "zhongjian-group", [90.0, 81.0, 86.0, 47.0]),
        ("r1", "lvdi-engineering", [72.0, 78.0, 90.0, 35.0]),
        ("r2", "lvdi-engineering", [75.0, 74.0, 87.0, 38.0]),
        ("r3", "lvdi-engineering", [70.0, 76.0, 88.0, 36.0]),
    ];

    for (reviewer, entity, [design, schedule, commercial, track_record]) in sheets {
        for (criterion, raw) in [
            ("design", design),
            ("schedule", schedule),
            ("commercial", commercial),
            ("track_record", track_record),
        ] {
            scores.push(ReviewerScore {
                reviewer_id: ReviewerId(reviewer.to_string()),
                entity_id: EntityId(entity.to_string()),
                criterion_id: CriterionId(criterion.to_string()),
                raw_score: raw,
                comment: None,
                status: ScoreStatus::Submitted,
            });
        }
    }

    scores
}

fn demo_qualifications() -> Vec<AttributeRecord> {
    vec![
        qualification(
            "huacheng-construction",
            "特级",
            "active",
            "50M",
            (1998, 4, 12),
            &["iso9001", "iso14001", "ohsas18001"],
        ),
        qualification(
            "zhongjian-group",
            "特级",
            "active",
            "120M",
            (1985, 9, 1),
            &["iso9001", "iso14001"],
        ),
        qualification(
            "lvdi-engineering",
            "一级",
            "probation",
            "18M",
            (2006, 6, 30),
            &["iso9001"],
        ),
    ]
}

fn qualification(
    entity: &str,
    tier: &str,
    status: &str,
    capital: &str,
    established: (i32, u32, u32),
    certifications: &[&str],
) -> AttributeRecord {
    let established = NaiveDate::from_ymd_opt(established.0, established.1, established.2)
        .expect("valid demo date");
    AttributeRecord {
        entity_id: EntityId(entity.to_string()),
        fields: BTreeMap::from([
            (
                "qualification_level".to_string(),
                FieldValue::Text(tier.to_string()),
            ),
            ("status".to_string(), FieldValue::Text(status.to_string())),
            (
                "registered_capital".to_string(),
                FieldValue::Text(capital.to_string()),
            ),
            ("established_on".to_string(), FieldValue::Date(established)),
            (
                "certifications".to_string(),
                FieldValue::Set(certifications.iter().map(|item| item.to_string()).collect()),
            ),
        ]),
    }
}
