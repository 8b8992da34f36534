//! Integration tests for the caller-facing facade.

mod common;

use common::{MockBehavior, config, registry};
use montage_abstraction::{EngineKind, FailureKind, GenerationRequest, ProgressReporter};
use montage_engines::catalog::simulated_constructor;
use montage_orchestrator::{
    EngineSettings, GenerateOptions, OrchestrationError, OrchestratorConfig, RoutingStrategy,
    VideoGenerationService,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn service(
    config: &OrchestratorConfig,
    engines: Vec<(EngineKind, MockBehavior)>,
) -> (VideoGenerationService, std::collections::HashMap<EngineKind, Arc<common::Probe>>) {
    let (registry, probes) = registry(engines);
    (VideoGenerationService::new(config, registry), probes)
}

#[tokio::test(start_paused = true)]
async fn test_free_first_selects_free_engine() {
    let mut config = config(2, 0);
    config.routing_strategy = RoutingStrategy::FreeFirst;
    config.priority = vec![EngineKind::DoubaoSeedancePro, EngineKind::CogVideoXFlash];
    let (service, probes) = service(
        &config,
        vec![
            (EngineKind::CogVideoXFlash, MockBehavior::default()),
            (EngineKind::DoubaoSeedancePro, MockBehavior::paid(0.02)),
        ],
    );

    let result = service.generate("harbor at dawn", &GenerateOptions::default(), &ProgressReporter::silent()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.engine, Some(EngineKind::CogVideoXFlash));
    assert!(result.cost.abs() < f64::EPSILON);
    assert_eq!(probes[&EngineKind::DoubaoSeedancePro].generate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_priority_strategy_follows_configured_order() {
    let mut config = config(2, 0);
    config.priority = vec![EngineKind::DoubaoSeedancePro, EngineKind::CogVideoXFlash];
    let (service, _probes) = service(
        &config,
        vec![
            (EngineKind::CogVideoXFlash, MockBehavior::default()),
            (EngineKind::DoubaoSeedancePro, MockBehavior::paid(0.02)),
        ],
    );

    let result = service.generate("harbor at dawn", &GenerateOptions::default(), &ProgressReporter::silent()).await.unwrap();

    assert_eq!(result.engine, Some(EngineKind::DoubaoSeedancePro));
    assert!((result.cost - 0.1).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_request_is_an_error() {
    let (service, _probes) = service(&config(1, 0), vec![(EngineKind::Vheer, MockBehavior::default())]);

    let outcome = service
        .generate("clouds", &GenerateOptions::default().with_duration(-1.0), &ProgressReporter::silent())
        .await;

    assert!(matches!(outcome, Err(OrchestrationError::InvalidRequest(_))));
}

#[tokio::test(start_paused = true)]
async fn test_admission_failure_is_a_result() {
    let broken = MockBehavior { init_failures: u32::MAX, ..MockBehavior::default() };
    let (service, _probes) = service(&config(1, 0), vec![(EngineKind::Vheer, broken)]);

    let result = service.generate("clouds", &GenerateOptions::default(), &ProgressReporter::silent()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::Admission));
    assert_eq!(result.error_message(), "no engine available");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_preferred_names_are_skipped() {
    let (service, probes) = service(
        &config(1, 0),
        vec![(EngineKind::CogVideoXFlash, MockBehavior::default()), (EngineKind::Haiper, MockBehavior::default())],
    );
    let options = GenerateOptions::default().with_preferred_engine("sora").with_preferred_engine("haiper");

    let result = service.generate("clouds", &options, &ProgressReporter::silent()).await.unwrap();

    assert_eq!(result.engine, Some(EngineKind::Haiper));
    assert_eq!(probes[&EngineKind::CogVideoXFlash].generate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_is_reported_distinctly() {
    let slow = MockBehavior { latency: Duration::from_secs(120), ..MockBehavior::default() };
    let (service, _probes) = service(&config(1, 2), vec![(EngineKind::Vheer, slow)]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = service
        .generate_with_cancel("clouds", &GenerateOptions::default(), &ProgressReporter::silent(), &cancel)
        .await
        .unwrap();

    assert!(result.is_cancelled());
    assert!(service.statistics().performance.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_progress_reaches_caller() {
    let (service, _probes) = service(&config(1, 0), vec![(EngineKind::Vheer, MockBehavior::default())]);
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let progress = ProgressReporter::new(move |update| sink.lock().unwrap().push(update.message.clone()));

    service.generate("clouds", &GenerateOptions::default(), &progress).await.unwrap();

    assert!(messages.lock().unwrap().iter().any(|m| m == "using Vheer"));
}

#[tokio::test(start_paused = true)]
async fn test_batch_generate_runs_sequentially() {
    let (service, probes) = service(&config(3, 0), vec![(EngineKind::Vheer, MockBehavior::default())]);
    let requests = vec![
        GenerationRequest::new("first"),
        GenerationRequest::new(""),
        GenerationRequest::new("third"),
    ];
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let progress = ProgressReporter::new(move |update| sink.lock().unwrap().push(update.message.clone()));

    let results = service.batch_generate(&requests, &[], &progress, &CancellationToken::new()).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].success);
    assert_eq!(probes[&EngineKind::Vheer].gauge.peak(), 1);
    let messages = messages.lock().unwrap();
    for marker in ["1/3", "2/3", "3/3"] {
        assert!(messages.iter().any(|m| m == marker), "missing {marker}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_introspection() {
    let unreachable = MockBehavior { reachable: false, ..MockBehavior::default() };
    let (service, _probes) = service(
        &config(1, 0),
        vec![(EngineKind::Vheer, MockBehavior::default()), (EngineKind::Haiper, unreachable)],
    );

    assert_eq!(service.registered_engines(), vec![EngineKind::Vheer, EngineKind::Haiper]);
    assert_eq!(service.list_available_engines().await, vec![EngineKind::Vheer, EngineKind::Haiper]);
    assert_eq!(service.get_engine_info(EngineKind::Vheer).await.unwrap().kind, EngineKind::Vheer);
    assert!(service.get_engine_info(EngineKind::RunwayMl).await.is_none());
    assert!(service.test_engine(EngineKind::Vheer).await);
    assert!(!service.test_engine(EngineKind::Haiper).await);
    assert!(!service.test_engine(EngineKind::RunwayMl).await);

    let results = service.test_all_engines().await;
    assert_eq!(results.len(), 2);
    assert!(results[&EngineKind::Vheer]);
    assert!(!results[&EngineKind::Haiper]);
}

#[tokio::test(start_paused = true)]
async fn test_set_routing_strategy_by_name() {
    let (service, _probes) = service(&config(1, 0), vec![(EngineKind::Vheer, MockBehavior::default())]);

    service.set_routing_strategy_name("load_balance").unwrap();
    assert_eq!(service.statistics().routing_strategy, RoutingStrategy::LoadBalance);

    assert!(matches!(
        service.set_routing_strategy_name("random"),
        Err(OrchestrationError::UnknownStrategy(_))
    ));
    assert_eq!(service.statistics().routing_strategy, RoutingStrategy::LoadBalance);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_engines_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = OrchestratorConfig { output_dir: dir.path().to_path_buf(), ..OrchestratorConfig::default() };
    config.engines.insert(
        EngineKind::CogVideoXFlash,
        EngineSettings { enabled: true, params: json!({ "fail_first": 1, "latency_ms": 10, "write_artifact": true }) },
    );
    config.engines.insert(EngineKind::Vheer, EngineSettings { enabled: false, ..EngineSettings::default() });
    let constructors = [EngineKind::CogVideoXFlash, EngineKind::Vheer]
        .into_iter()
        .map(|kind| (kind, simulated_constructor(kind)));
    let service = VideoGenerationService::from_config(&config, constructors);

    let result = service.generate("harbor at dawn", &GenerateOptions::default(), &ProgressReporter::silent()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.engine, Some(EngineKind::CogVideoXFlash));
    assert!(result.artifact_path.as_ref().unwrap().starts_with(dir.path()));
    let engine = service.manager().registry().cached(EngineKind::CogVideoXFlash).unwrap();
    assert_eq!(engine.statistics().request_count, 2);
    assert!((service.statistics().performance[&EngineKind::CogVideoXFlash].success_rate - 50.0).abs() < 1e-9);

    service.shutdown().await;
    assert!(service.statistics().engines.is_empty());
}
