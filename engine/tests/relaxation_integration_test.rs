//! Integration tests for the relaxation controller
//!
//! Each scenario drives a full gene sequence against the deterministic stub
//! in `common` and checks the stages that ran, the labels submitted, the
//! parameters each attempt used and the final classification.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{flags, StubClient};
use primerblast_engine::attempt::{AttemptRunner, Status};
use primerblast_engine::blast::BlastClient;
use primerblast_engine::config::strict_parameters;
use primerblast_engine::relaxation::{RelaxationController, Stage};
use sdk::errors::EngineError;

fn controller(client: &Arc<StubClient>) -> RelaxationController {
    let client: Arc<dyn BlastClient> = Arc::<StubClient>::clone(client);
    let runner = AttemptRunner::new(client, Duration::from_secs(60));
    RelaxationController::new(runner)
}

#[tokio::test(start_paused = true)]
async fn test_strict_success_stops_immediately() {
    let client = Arc::new(StubClient::new(|_, _| flags(false, false, false)).with_polls(2));

    let report = controller(&client)
        .run_iterative("NM_001062476", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(report.stages, vec![Stage::Strict]);
    assert_eq!(report.status(), Status::Strict);
    assert_eq!(report.attempt.parameters, strict_parameters());
    assert_eq!(report.attempt.primers.len(), 1);
    assert_eq!(client.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_intronless_easy_target_drops_intron_span_once() {
    let client = Arc::new(StubClient::new(|_, _| flags(true, false, false)));

    let report = controller(&client)
        .run_iterative("NM_001048233", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(report.stages, vec![Stage::Strict, Stage::IntronRemoved]);
    // The intron stage keeps the previous label
    assert_eq!(report.status(), Status::Strict);
    assert_eq!(
        client.statuses_for("NM_001048233"),
        vec![Status::Strict, Status::Strict]
    );

    let submissions = client.submissions();
    assert!(submissions[0].parameters.contains_key("SPAN_INTRON"));
    assert!(!submissions[1].parameters.contains_key("SPAN_INTRON"));
    assert_eq!(report.attempt.primers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_off_targets_everywhere_exhausts_ladder() {
    let client = Arc::new(StubClient::new(|_, _| flags(false, false, true)));

    let report = controller(&client)
        .run_iterative("NM_001053541", &strict_parameters())
        .await
        .unwrap();

    let expected: Vec<Stage> = Stage::ALL
        .into_iter()
        .filter(|s| *s != Stage::IntronRemoved)
        .collect();
    assert_eq!(report.stages, expected);
    assert_eq!(report.status(), Status::NoSpecificPrimers);
    assert!(report.attempt.primers.is_empty());

    assert_eq!(
        client.statuses_for("NM_001053541"),
        vec![
            Status::Strict,
            Status::Gc1,
            Status::Gc0,
            Status::GcContent,
            Status::LowTm,
            Status::PotentialDimers,
            Status::ProbableDimers,
            Status::NoRepeatFilter,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_intronless_target_without_primers_runs_all_nine_stages() {
    let client = Arc::new(StubClient::new(|_, _| flags(true, true, false)));

    let report = controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(report.stages, Stage::ALL.to_vec());
    assert_eq!(report.attempts(), 9);
    assert_eq!(report.status(), Status::PrimerQualityTooLow);
}

#[tokio::test(start_paused = true)]
async fn test_missing_primers_take_precedence_over_off_targets() {
    let client = Arc::new(StubClient::new(|_, _| flags(false, true, true)));

    let report = controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(report.status(), Status::PrimerQualityTooLow);
}

#[tokio::test(start_paused = true)]
async fn test_relaxation_stops_at_first_acceptable_stage() {
    // Primers only appear once the TM floor is lowered
    let client = Arc::new(StubClient::new(|_, parameters| {
        let relaxed = parameters.get("PRIMER_MIN_TM") == Some("52");
        flags(false, !relaxed, false)
    }));

    let report = controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(
        report.stages,
        vec![Stage::Strict, Stage::Gc1, Stage::Gc0, Stage::GcContent, Stage::LowTm]
    );
    assert_eq!(report.status(), Status::LowTm);

    let parameters = &report.attempt.parameters;
    assert_eq!(parameters.get("GC_CLAMP"), Some("0"));
    assert_eq!(parameters.get("PRIMER_MIN_GC"), Some("35"));
    assert_eq!(parameters.get("PRIMER_MAX_GC"), Some("65"));
    assert_eq!(parameters.get("PRIMER_MIN_TM"), Some("52"));
    // Later stages never ran
    assert_eq!(parameters.get("SELF_ANY"), Some("3.00"));
    assert!(parameters.contains_key("LOW_COMPLEXITY_FILTER"));
}

#[tokio::test(start_paused = true)]
async fn test_mutations_are_cumulative() {
    let client = Arc::new(StubClient::new(|_, _| flags(true, false, true)));

    controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap();

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 9);

    // Once removed, the intron span never comes back
    assert!(submissions[1..]
        .iter()
        .all(|s| !s.parameters.contains_key("SPAN_INTRON")));
    // GC band set at GC_content survives to the end
    assert!(submissions[4..]
        .iter()
        .all(|s| s.parameters.get("PRIMER_MIN_GC") == Some("35")));
    assert_eq!(submissions[8].parameters.get("SELF_ANY"), Some("8"));
    assert_eq!(submissions[8].parameters.get("SELF_END"), Some("3"));
    assert!(!submissions[8]
        .parameters
        .contains_key("LOW_COMPLEXITY_FILTER"));
}

#[tokio::test(start_paused = true)]
async fn test_template_is_never_modified_and_runs_are_repeatable() {
    let template = strict_parameters();
    let client = Arc::new(StubClient::new(|_, parameters| {
        flags(false, false, parameters.get("GC_CLAMP") != Some("0"))
    }));
    let controller = controller(&client);

    let first = controller.run_iterative("NM_1", &template).await.unwrap();
    let second = controller.run_iterative("NM_1", &template).await.unwrap();

    assert_eq!(template, strict_parameters());
    assert_eq!(first.stages, second.stages);
    assert_eq!(first.status(), second.status());
    assert_eq!(first.status(), Status::Gc0);
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_aborts_sequence() {
    let client = Arc::new(
        StubClient::new(|_, _| flags(false, true, false)).failing_on(2),
    );

    let err = controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Submission(_)));
    // Strict, GC1, then the failing GC0 submission; nothing after it
    assert_eq!(client.submissions().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_polling_waits_between_polls() {
    let client = Arc::new(StubClient::new(|_, _| flags(false, false, false)).with_polls(3));
    let start = tokio::time::Instant::now();

    controller(&client)
        .run_iterative("NM_1", &strict_parameters())
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(180));
}
