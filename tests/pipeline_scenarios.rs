//! End-to-end behaviour of planner, executor and scorer with scripted handlers

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{
    article, executor, happy_registry, registry_of, sample_payload, sequential_executor,
    FailingHandler, RecordingHandler, SlowHandler, StaticHandler,
};
use uuid::Uuid;
use verifact::handlers::ConsistencyCheckHandler;
use verifact::pipeline::{
    BiasAnalysisParams, BiasReport, CancellationSignal, ExecutionStatus, FactCheckParams,
    FactCheckReport,
    HandlerRegistry, Plan, Planner, Scorer, SourceVerificationParams, Step, StepKind, StepPayload,
    StepStatus, StepType,
};
use verifact::{ValidationRequest, ValidationType};

fn full_plan() -> Plan {
    let request = ValidationRequest::new(Uuid::new_v4(), ValidationType::FullAnalysis);
    Planner::new().create_plan(&request).unwrap()
}

fn source(id: &str) -> Step {
    Step::new(
        id,
        StepKind::SourceVerification(SourceVerificationParams {
            depth: Default::default(),
        }),
    )
}

fn fact(id: &str) -> Step {
    Step::new(
        id,
        StepKind::FactCheck(FactCheckParams {
            model: "gemini-pro".to_string(),
            max_claims: 5,
        }),
    )
}

fn bias(id: &str) -> Step {
    Step::new(
        id,
        StepKind::BiasAnalysis(BiasAnalysisParams {
            aspects: Vec::new(),
        }),
    )
}

#[tokio::test]
async fn test_required_source_failure_skips_everything_downstream() {
    let mut registry = happy_registry();
    registry.register(
        StepType::SourceVerification,
        Arc::new(FailingHandler("source lookup failed")),
    );

    let result = executor(registry).execute(&full_plan(), &article()).await;
    let score = Scorer::new().score(&result);

    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_eq!(
        result.step("source_verification").unwrap().status,
        StepStatus::Failed
    );
    for id in ["fact_checking", "bias_analysis", "consistency_check"] {
        let step = result.step(id).unwrap();
        assert_eq!(step.status, StepStatus::Skipped, "{} should be skipped", id);
        assert!(step.result.is_none());
    }
    assert!(result
        .error()
        .unwrap()
        .contains("Required step source_verification failed"));
    assert!(!score.is_credible);
    assert_eq!(score.confidence, 0.0);
}

#[tokio::test]
async fn test_all_steps_succeed_and_score_credible() {
    let mut registry = happy_registry();
    registry.register(
        StepType::ConsistencyCheck,
        Arc::new(ConsistencyCheckHandler::new()),
    );

    let result = executor(registry).execute(&full_plan(), &article()).await;
    let score = Scorer::new().score(&result);

    assert_eq!(result.status(), ExecutionStatus::Completed);
    assert_eq!(result.successful_steps(), 4);
    assert!((score.confidence - 0.95).abs() < 1e-9);
    assert!(score.is_credible);
    assert!(score
        .summary
        .starts_with("Validation completed with 4 of 4 steps successful."));
    assert!(score.summary.contains("Overall confidence: 95.0%"));
    assert!(score
        .summary
        .contains("- Fact-checking: 8 claims supported, 2 contradicted"));
    assert!(score.summary.contains("- Bias analysis: Overall bias score 0.5 (neutral)"));

    match &result.step("consistency_check").unwrap().result {
        Some(StepPayload::ConsistencyCheck(report)) => {
            assert_eq!(report.signals, 3);
            assert!(report.passed);
        }
        other => panic!("unexpected consistency payload {:?}", other),
    }
}

#[tokio::test]
async fn test_disagreeing_reports_fail_consistency_and_run() {
    let mut registry = happy_registry();
    registry.register(
        StepType::FactCheck,
        Arc::new(StaticHandler(StepPayload::FactCheck(FactCheckReport::new(1, 9)))),
    );
    registry.register(
        StepType::ConsistencyCheck,
        Arc::new(ConsistencyCheckHandler::new()),
    );

    let result = executor(registry).execute(&full_plan(), &article()).await;
    let score = Scorer::new().score(&result);

    let consistency = result.step("consistency_check").unwrap();
    assert_eq!(consistency.status, StepStatus::Failed);
    assert!(consistency.result.is_none());
    assert!(consistency
        .error
        .as_deref()
        .unwrap()
        .contains("Consistency check failed: score 0.10 is below threshold 0.80"));

    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_eq!(result.successful_steps(), 3);
    assert!(!score.is_credible);
    assert!(!score.summary.contains("Consistency Check completed successfully"));
}

#[tokio::test]
async fn test_fact_check_timeout_fails_run_with_zero_confidence() {
    let steps: Vec<Step> = Planner::template(ValidationType::FactCheck)
        .into_iter()
        .map(|step| step.with_timeout(Duration::from_millis(50)))
        .collect();
    let plan = Plan::new(Uuid::new_v4(), steps).unwrap();
    let registry =
        HandlerRegistry::new().with(StepType::FactCheck, Arc::new(SlowHandler(Duration::from_secs(5))));

    let result = executor(registry).execute(&plan, &article()).await;
    let score = Scorer::new().score(&result);

    assert_eq!(result.status(), ExecutionStatus::Failed);
    let step = result.step("fact_checking").unwrap();
    assert_eq!(step.status, StepStatus::TimedOut);
    assert!(step.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(score.confidence, 0.0);
    assert!(!score.is_credible);
}

#[tokio::test]
async fn test_steps_start_in_dependency_then_priority_order() {
    let recorder = Arc::new(RecordingHandler::default());
    let result = sequential_executor(registry_of(recorder.clone()))
        .execute(&full_plan(), &article())
        .await;

    assert_eq!(result.status(), ExecutionStatus::Completed);
    assert_eq!(
        recorder.started(),
        vec![
            "source_verification",
            "fact_checking",
            "bias_analysis",
            "consistency_check"
        ]
    );

    let seen = recorder.upstream_seen();
    let consistency = seen.iter().find(|(id, _)| id == "consistency_check").unwrap();
    assert_eq!(
        consistency.1,
        vec!["bias_analysis", "fact_checking", "source_verification"]
    );
    let source = seen.iter().find(|(id, _)| id == "source_verification").unwrap();
    assert!(source.1.is_empty());
}

#[tokio::test]
async fn test_independent_steps_run_concurrently() {
    let recorder = Arc::new(RecordingHandler::with_delay(Duration::from_millis(100)));
    executor(registry_of(recorder.clone()))
        .execute(&full_plan(), &article())
        .await;
    assert_eq!(recorder.peak(), 2);

    let recorder = Arc::new(RecordingHandler::with_delay(Duration::from_millis(20)));
    sequential_executor(registry_of(recorder.clone()))
        .execute(&full_plan(), &article())
        .await;
    assert_eq!(recorder.peak(), 1);
}

#[tokio::test]
async fn test_skipping_is_transitive_and_spares_unrelated_steps() {
    let plan = Plan::new(
        Uuid::new_v4(),
        vec![
            source("root"),
            fact("middle").depends_on("root"),
            bias("leaf").depends_on("middle"),
            bias("unrelated"),
        ],
    )
    .unwrap();
    let registry = HandlerRegistry::new()
        .with(StepType::SourceVerification, Arc::new(FailingHandler("boom")))
        .with(
            StepType::FactCheck,
            Arc::new(StaticHandler(sample_payload(StepType::FactCheck))),
        )
        .with(
            StepType::BiasAnalysis,
            Arc::new(StaticHandler(sample_payload(StepType::BiasAnalysis))),
        );

    let result = executor(registry).execute(&plan, &article()).await;

    for id in ["middle", "leaf"] {
        let step = result.step(id).unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(step.metadata.skipped_due_to.as_deref(), Some("root"));
    }
    assert!(result.step("unrelated").unwrap().success());
    assert_eq!(result.status(), ExecutionStatus::Failed);

    let ids: Vec<&str> = result.steps().iter().map(|s| s.step_id.as_str()).collect();
    assert_eq!(ids, vec!["leaf", "middle", "root", "unrelated"]);
}

#[tokio::test]
async fn test_optional_failure_does_not_block_dependents() {
    let plan = Plan::new(
        Uuid::new_v4(),
        vec![source("source").optional(), fact("facts").depends_on("source")],
    )
    .unwrap();
    let registry = HandlerRegistry::new()
        .with(StepType::SourceVerification, Arc::new(FailingHandler("offline")))
        .with(
            StepType::FactCheck,
            Arc::new(StaticHandler(sample_payload(StepType::FactCheck))),
        );

    let result = executor(registry).execute(&plan, &article()).await;

    assert_eq!(result.status(), ExecutionStatus::Completed);
    assert_eq!(result.step("source").unwrap().status, StepStatus::Failed);
    assert!(result.step("facts").unwrap().success());
}

#[tokio::test]
async fn test_cancellation_stops_the_run() {
    let registry = registry_of(Arc::new(SlowHandler(Duration::from_secs(10))));
    let cancel = CancellationSignal::new();
    cancel.cancel_after(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let result = executor(registry)
        .execute_with_cancel(&full_plan(), &article(), &cancel)
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_eq!(result.error(), Some("Validation run cancelled"));
    assert_eq!(
        result.step("source_verification").unwrap().status,
        StepStatus::Cancelled
    );
    for id in ["fact_checking", "bias_analysis", "consistency_check"] {
        assert_eq!(result.step(id).unwrap().status, StepStatus::Skipped);
    }
    assert!(result.is_finalized());
}

#[tokio::test]
async fn test_scoring_is_idempotent_and_bounded() {
    let mut registry = happy_registry();
    registry.register(
        StepType::BiasAnalysis,
        Arc::new(StaticHandler(StepPayload::BiasAnalysis(BiasReport::new(
            7.0, "right",
        )))),
    );

    let result = executor(registry).execute(&full_plan(), &article()).await;
    let scorer = Scorer::new();
    let first = scorer.score(&result);
    let second = scorer.score(&result);

    assert_eq!(first, second);
    assert!((0.0..=1.0).contains(&first.confidence));
    // the malformed bias score is ignored, leaving the source credibility
    assert!((first.confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_planning_is_deterministic() {
    let article_id = Uuid::new_v4();
    let request = ValidationRequest::new(article_id, ValidationType::FullAnalysis);
    let a = Planner::new().create_plan(&request).unwrap();
    let b = Planner::new().create_plan(&request).unwrap();

    assert_eq!(a.steps(), b.steps());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.article_id(), article_id);
}
