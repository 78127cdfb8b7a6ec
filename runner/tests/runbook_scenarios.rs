//! Scenario tests for the runbook sequencing
//!
//! Each test scripts the external tools through mocks and checks which steps
//! ran, in what order, and how the run ended.

mod common;
use common::{ClusterBuilder, TestFixtures};

use runner::{RunReport, RunnerError, Step, StepStatus, exit_code};

/// Missing client tool: exit 1, missing-tool message, nothing else runs
#[tokio::test]
async fn test_missing_kubectl_aborts_before_any_step() {
    let (runbook, recorder) = ClusterBuilder::new().without_tool("kubectl").expect_terminations(0).build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 1);
    match result {
        Err(RunnerError::ToolMissing { tool }) => assert_eq!(tool, "kubectl"),
        other => panic!("expected ToolMissing, got {other:?}"),
    }
    assert!(recorder.events().is_empty(), "no command should run: {:?}", recorder.events());
    assert_eq!(report.steps(), vec![Step::Preflight]);
    assert_eq!(
        report.status_of(Step::Preflight),
        Some(&StepStatus::Failed("kubectl is not installed. Please install kubectl first.".to_string()))
    );
}

#[tokio::test]
async fn test_missing_minikube_aborts_setup() {
    let (runbook, recorder) = ClusterBuilder::new().without_tool("minikube").expect_terminations(0).build();
    let mut report = RunReport::new();

    let result = runbook.run_setup(&mut report).await;

    assert!(matches!(result, Err(RunnerError::ToolMissing { ref tool }) if tool == "minikube"));
    assert!(recorder.events().is_empty());
}

/// Cluster bring-up fails: exit 1, no subsequent step
#[tokio::test]
async fn test_failed_cluster_start_stops_sequence() {
    let (runbook, recorder) = ClusterBuilder::new()
        .failing("minikube start", 80)
        .expect_terminations(0)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_setup(&mut report).await;

    assert_eq!(exit_code(&result), 1);
    assert!(matches!(
        result,
        Err(RunnerError::CommandFailed { ref step, code: Some(80), .. }) if step == "Cluster start"
    ));
    assert_eq!(recorder.events(), vec!["run: minikube start".to_string()]);
    assert_eq!(report.steps(), vec![Step::Preflight, Step::ClusterStart]);
}

/// Client present but cluster-info fails: exit 1
#[tokio::test]
async fn test_failed_connectivity_is_fatal() {
    let (runbook, recorder) = ClusterBuilder::new()
        .failing("cluster-info", 1)
        .expect_terminations(0)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_setup(&mut report).await;

    assert_eq!(exit_code(&result), 1);
    assert!(matches!(result, Err(RunnerError::CommandFailed { .. })));
    assert_eq!(recorder.count("get pods"), 0, "enumeration must not run after a fatal failure");
    assert!(report.has_failure());
}

/// kubectl absent during setup: cluster-info goes through minikube's client
#[tokio::test]
async fn test_connectivity_falls_back_to_minikube_client() {
    let (runbook, recorder) = ClusterBuilder::new().without_tool("kubectl").expect_terminations(0).build();
    let mut report = RunReport::new();

    runbook.run_setup(&mut report).await.unwrap();

    recorder.assert_order(&[
        "run: minikube start",
        "run: minikube kubectl -- cluster-info",
        "run: minikube kubectl -- get pods --all-namespaces",
    ]);
    assert_eq!(recorder.count("run: kubectl"), 0);
}

#[tokio::test]
async fn test_setup_enumeration_failure_is_a_warning() {
    let (runbook, _recorder) = ClusterBuilder::new()
        .failing("--all-namespaces", 1)
        .expect_terminations(0)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_setup(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert!(matches!(report.status_of(Step::Enumeration), Some(StepStatus::Warned(_))));
}

/// Successful run: enumeration, scale, rollout wait, load test, metrics in order
#[tokio::test]
async fn test_full_run_order() {
    let (runbook, recorder) = ClusterBuilder::new().build();
    let mut report = RunReport::new();

    let result = runbook.run_all(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    recorder.assert_order(&[
        "run: minikube start",
        "run: kubectl cluster-info",
        "run: kubectl get pods --all-namespaces",
        "run: kubectl apply -f",
        "run: kubectl scale deployment/messaging-app --replicas=3",
        "run: kubectl rollout status deployment/messaging-app",
        "spawn: kubectl port-forward service/messaging-app-service 18000:8000",
        "run: wrk -t1 -c1 -d1s http://127.0.0.1:18000/",
        "terminate: 4242",
        "run: kubectl top pods",
    ]);

    let steps = report.steps();
    let index = |step: Step| steps.iter().position(|s| *s == step).unwrap();
    assert!(index(Step::Enumeration) < index(Step::Scale));
    assert!(index(Step::Scale) < index(Step::Rollout));
    assert!(index(Step::Rollout) < index(Step::LoadTest));
    assert!(index(Step::LoadTest) < index(Step::ResourceUsage));
    assert!(report.warnings().is_empty());
}

/// Helper terminated exactly once even though the load test failed
#[tokio::test]
async fn test_port_forward_released_once_when_load_test_fails() {
    let (runbook, recorder) = ClusterBuilder::new()
        .failing("wrk", 1)
        .expect_terminations(1)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert_eq!(recorder.count("terminate: 4242"), 1);
    recorder.assert_order(&["spawn: kubectl port-forward", "run: wrk", "terminate: 4242", "run: kubectl top pods"]);
    assert!(matches!(report.status_of(Step::LoadTest), Some(StepStatus::Warned(_))));
    assert_eq!(report.status_of(Step::PortForward), Some(&StepStatus::Succeeded));
}

/// Metrics subsystem unavailable: warning, still exit 0
#[tokio::test]
async fn test_missing_metrics_server_only_warns() {
    let (runbook, recorder) = ClusterBuilder::new().failing("top pods", 1).build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert_eq!(recorder.count("run: kubectl top pods"), 1);
    match report.status_of(Step::ResourceUsage) {
        Some(StepStatus::Warned(reason)) => assert!(reason.contains("metrics-server")),
        other => panic!("expected a warning, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_rollout_skips_load_test() {
    let (runbook, recorder) = ClusterBuilder::new()
        .failing("rollout status", 1)
        .expect_terminations(0)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 1);
    assert_eq!(recorder.count("spawn:"), 0);
    assert_eq!(recorder.count("top pods"), 0);
}

#[tokio::test]
async fn test_missing_wrk_skips_load_test_without_forwarding() {
    let (runbook, recorder) = ClusterBuilder::new().without_tool("wrk").expect_terminations(0).build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert_eq!(recorder.count("spawn:"), 0);
    assert!(matches!(report.status_of(Step::LoadTest), Some(StepStatus::Skipped(_))));
    assert_eq!(recorder.count("run: kubectl top pods"), 1);
}

#[tokio::test]
async fn test_port_forward_spawn_failure_is_not_fatal() {
    let (runbook, recorder) = ClusterBuilder::new().failing_port_forward().build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert_eq!(recorder.count("run: wrk"), 0);
    assert_eq!(recorder.count("terminate:"), 0);
    assert!(matches!(report.status_of(Step::PortForward), Some(StepStatus::Failed(_))));
    assert_eq!(recorder.count("run: kubectl top pods"), 1);
}

#[tokio::test]
async fn test_service_port_is_resolved_from_cluster() {
    let (runbook, recorder) = ClusterBuilder::new().with_stdout("jsonpath", "8080").build();
    let mut report = RunReport::new();

    runbook.run_scale(&mut report).await.unwrap();

    assert_eq!(recorder.count("spawn: kubectl port-forward service/messaging-app-service 18000:8080"), 1);
}

#[tokio::test]
async fn test_unparseable_service_port_falls_back_to_config() {
    let (runbook, recorder) = ClusterBuilder::new().with_stdout("jsonpath", "not-a-port").build();
    let mut report = RunReport::new();

    runbook.run_scale(&mut report).await.unwrap();

    assert_eq!(recorder.count("18000:8000"), 1);
}

#[tokio::test]
async fn test_scale_uses_configured_replicas() {
    let mut config = TestFixtures::config();
    config.replicas = 5;
    config.deployment = "chat-backend".to_string();
    config.service = "chat-backend".to_string();
    let (runbook, recorder) = ClusterBuilder::new().with_config(config).build();
    let mut report = RunReport::new();

    runbook.run_scale(&mut report).await.unwrap();

    assert_eq!(recorder.count("run: kubectl scale deployment/chat-backend --replicas=5"), 1);
    assert_eq!(recorder.count("run: kubectl get pods -l app=chat-backend"), 1);
}

#[tokio::test]
async fn test_failed_apply_is_fatal() {
    let (runbook, recorder) = ClusterBuilder::new()
        .failing("apply -f", 1)
        .expect_terminations(0)
        .build();
    let mut report = RunReport::new();

    let result = runbook.run_all(&mut report).await;

    assert_eq!(exit_code(&result), 1);
    assert_eq!(recorder.count("scale deployment"), 0);
    assert!(matches!(report.status_of(Step::Apply), Some(StepStatus::Failed(_))));
}

/// A helper that cannot be cleaned up is reported, not fatal
#[tokio::test]
async fn test_port_forward_cleanup_failure_only_warns() {
    let (runbook, recorder) = ClusterBuilder::new().failing_terminate().build();
    let mut report = RunReport::new();

    let result = runbook.run_scale(&mut report).await;

    assert_eq!(exit_code(&result), 0);
    assert_eq!(recorder.count(&format!("terminate: {}", TestFixtures::HELPER_PID)), 1);
    assert_eq!(
        report.status_of(Step::PortForward),
        Some(&StepStatus::Warned(
            RunnerError::UnknownHelper {
                pid: TestFixtures::HELPER_PID
            }
            .to_string()
        ))
    );
    assert_eq!(report.status_of(Step::LoadTest), Some(&StepStatus::Succeeded));
    recorder.assert_order(&["terminate:", "kubectl top pods"]);
    assert!(!report.has_failure());
}
