//! Single phases driven against a local mock HTTP server
//!
//! These run in real time over real sockets, so the assertions leave room
//! for scheduling noise.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use surge_engine::{NoopSink, PhaseConfig, PhaseError, PhaseKind, PhaseRunner, ScenarioMix, ScenarioTemplate};
use surge_http::{HttpConfig, HttpMethod, ReqwestTransport};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Alternates 200 and 503 on every call
struct Alternating {
    calls: AtomicU64,
}

impl Respond for Alternating {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = if n % 2 == 0 { 200 } else { 503 };
        ResponseTemplate::new(status).set_delay(Duration::from_millis(10))
    }
}

fn transport() -> Arc<ReqwestTransport> {
    let config = HttpConfig {
        timeout: Duration::from_secs(2),
        ..HttpConfig::default()
    };
    Arc::new(ReqwestTransport::new(config).unwrap())
}

fn single(template: ScenarioTemplate) -> Arc<ScenarioMix> {
    Arc::new(ScenarioMix::new(vec![template]).unwrap())
}

fn server_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_steady_phase_against_slow_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok").set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let runner = PhaseRunner::new(transport(), Arc::new(NoopSink));
    let config = PhaseConfig::new(PhaseKind::Baseline, 10, Duration::from_secs(2), server_url(&server));

    let result = runner
        .run_phase(
            &single(ScenarioTemplate::new("health", HttpMethod::Get, "/health")),
            &config,
        )
        .await
        .unwrap();

    assert_eq!(result.failed_requests, 0);
    assert_eq!(result.error_rate, 0.0);
    assert!(!result.empty);
    assert!(result.latency.p50 >= 50.0, "p50 {}", result.latency.p50);
    assert!(result.latency.min >= 50.0);
    // 10 users at >= 50 ms per request cannot exceed ~200 req/s
    assert!(result.throughput_req_per_sec <= 215.0, "throughput {}", result.throughput_req_per_sec);
    assert!(result.throughput_req_per_sec >= 60.0, "throughput {}", result.throughput_req_per_sec);
    assert_eq!(result.status_codes.get(&200).copied(), Some(result.total_requests));
    assert_eq!(result.bytes_received, result.total_requests * 2);
    assert_eq!(result.peak_concurrency, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_half_failing_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(Alternating {
            calls: AtomicU64::new(0),
        })
        .mount(&server)
        .await;

    let runner = PhaseRunner::new(transport(), Arc::new(NoopSink));
    let config = PhaseConfig::new(PhaseKind::Spike, 20, Duration::from_secs(2), server_url(&server))
        .with_ramp_up(Duration::from_millis(500));

    let result = runner
        .run_phase(&single(ScenarioTemplate::new("flaky", HttpMethod::Get, "/flaky")), &config)
        .await
        .unwrap();

    assert!(result.total_requests > 100, "only {} requests", result.total_requests);
    assert!((result.error_rate - 0.5).abs() < 0.05, "error rate {}", result.error_rate);
    assert_eq!(result.error_kinds.get("http_503").copied(), Some(result.failed_requests));
    assert_eq!(result.status_codes.get(&503).copied(), Some(result.failed_requests));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_templated_json_body_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(serde_json::json!({"sku": "A-1", "phase": "baseline"})))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    // Anything that does not match the body falls through to 404

    let template = ScenarioTemplate::new("create_order", HttpMethod::Post, "/orders")
        .with_json_body(serde_json::json!({"sku": "A-1", "phase": "{{phase}}"}))
        .with_expected_status(201);

    let runner = PhaseRunner::new(transport(), Arc::new(NoopSink));
    let config = PhaseConfig::new(PhaseKind::Baseline, 2, Duration::from_secs(1), server_url(&server));

    let result = runner.run_phase(&single(template), &config).await.unwrap();

    assert!(result.total_requests > 0);
    assert_eq!(result.failed_requests, 0, "status codes {:?}", result.status_codes);
    assert_eq!(result.status_codes.get(&201).copied(), Some(result.total_requests));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_target_records_network_errors() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base_url = Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap();

    let runner = PhaseRunner::new(transport(), Arc::new(NoopSink));
    let config = PhaseConfig::new(PhaseKind::Recovery, 2, Duration::from_millis(500), base_url);

    let result = runner
        .run_phase(&single(ScenarioTemplate::new("health", HttpMethod::Get, "/health")), &config)
        .await
        .unwrap();

    assert!(result.total_requests > 0);
    assert_eq!(result.error_rate, 1.0);
    assert_eq!(result.error_kinds.get("network").copied(), Some(result.total_requests));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interrupt_returns_partial_phase() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    let interrupt = CancellationToken::new();
    let runner = PhaseRunner::new(transport(), Arc::new(NoopSink)).with_interrupt(interrupt.clone());
    let config = PhaseConfig::new(PhaseKind::Baseline, 4, Duration::from_secs(30), server_url(&server));

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        interrupt.cancel();
    });

    let started = std::time::Instant::now();
    let err = runner
        .run_phase(&single(ScenarioTemplate::new("health", HttpMethod::Get, "/health")), &config)
        .await
        .unwrap_err();
    cancel.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        PhaseError::Interrupted(partial) => {
            assert_eq!(partial.phase, PhaseKind::Baseline);
            assert!(partial.total_requests > 0);
            assert!(partial.elapsed_ms < 10_000);
        }
        other => panic!("expected interrupted phase, got {other}"),
    }
}
