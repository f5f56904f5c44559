//! Integration tests for running scenarios against a local server


use http_server_tester::{
    ReadyProbe, RunOptions, TestConfig, TestEntry, TestPlan, TestRunner, TesterError,
};
use recording_launcher::{Event, RecordingLauncher};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use test_server::{unused_port, TestServer, SLOW_DELAY};

fn entry(url: &str, status_code: u16, content: &str, is_regex: bool) -> TestEntry {
    TestEntry {
        url: url.to_string(),
        status_code,
        content: content.to_string(),
        is_regex,
    }
}

fn scenario(server: &str, base_address: String, test_entries: Vec<TestEntry>) -> TestConfig {
    TestConfig {
        server_path: PathBuf::from(server),
        arguments: vec!["-p".to_string(), "5000".to_string()],
        base_address,
        test_entries,
        ..Default::default()
    }
}

fn plan(scenarios: Vec<TestConfig>) -> TestPlan {
    TestPlan {
        source: PathBuf::from("/work/tests.json"),
        scenarios,
    }
}

fn runner(launcher: &RecordingLauncher) -> TestRunner<RecordingLauncher> {
    TestRunner::with_launcher(launcher.clone()).options(RunOptions {
        warmup: Some(Duration::ZERO),
        request_timeout: None,
    })
}

#[tokio::test]
async fn test_passing_scenario() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![scenario(
        "/bin/server",
        server.url(),
        vec![
            entry("/index.html", 200, "hello", false),
            entry("/", 200, "hello", false),
            entry("/page2", 200, "<h1>Test Page 2</h1>", true),
            entry("/missing", 404, "Not Found", false),
        ],
    )]);

    let summary = runner(&launcher)
        .run_all(&plan)
        .await
        .expect("Scenario should pass");

    assert_eq!(summary.scenarios, 1);
    assert_eq!(summary.entries, 4);
    assert_eq!(
        launcher.events(),
        vec![
            Event::Launched(
                PathBuf::from("/bin/server"),
                vec!["-p".to_string(), "5000".to_string()]
            ),
            Event::Terminated(PathBuf::from("/bin/server")),
            Event::Exited(PathBuf::from("/bin/server")),
        ]
    );
}

#[tokio::test]
async fn test_failures_are_aggregated() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![scenario(
        "/bin/server",
        server.url(),
        vec![
            entry("/index.html", 200, "goodbye", false),
            entry("/index.html", 200, "hello", false),
            entry("/missing", 200, "^Found", true),
        ],
    )]);

    let error = runner(&launcher)
        .run_all(&plan)
        .await
        .expect_err("Scenario should fail");

    let report = match error {
        TesterError::MatchFailure(report) => report,
        other => panic!("Expected MatchFailure, got: {}", other),
    };

    assert_eq!(report.scenario_index, 0);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.mismatch_count(), 3);

    assert_eq!(
        report.failures[0].mismatches,
        vec!["'hello' doesn't match goodbye"]
    );
    assert_eq!(
        report.failures[1].mismatches,
        vec![
            "Status '200' doesn't match status '404'",
            "Content doesn't match regex ^Found",
        ]
    );

    let rendered = report.to_string();
    assert!(rendered.contains("  - Path: /work/tests.json"));
    assert!(rendered.contains("  - Server: /bin/server -p 5000"));
    assert!(rendered.contains(&format!("  - Base URL: {}", server.url())));
    assert!(rendered.contains("  URL: /missing"));

    assert_eq!(launcher.terminations(), 1);
}

#[tokio::test]
async fn test_request_error_still_stops_server() {
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![scenario(
        "/bin/server",
        format!("http://127.0.0.1:{}", unused_port()),
        vec![entry("/index.html", 200, "hello", false)],
    )]);

    let error = runner(&launcher).run_all(&plan).await.unwrap_err();

    assert!(
        matches!(error, TesterError::Request { .. }),
        "Expected request error, got: {}",
        error
    );
    assert_eq!(launcher.launches(), 1);
    assert_eq!(launcher.terminations(), 1);
}

#[tokio::test]
async fn test_first_failing_scenario_aborts_run() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![
        scenario(
            "/bin/first",
            server.url(),
            vec![entry("/index.html", 200, "goodbye", false)],
        ),
        scenario(
            "/bin/second",
            server.url(),
            vec![entry("/index.html", 200, "hello", false)],
        ),
    ]);

    let error = runner(&launcher).run_all(&plan).await.unwrap_err();
    assert!(matches!(error, TesterError::MatchFailure(_)));

    // The second server is never started
    assert_eq!(
        launcher.events(),
        vec![
            Event::Launched(
                PathBuf::from("/bin/first"),
                vec!["-p".to_string(), "5000".to_string()]
            ),
            Event::Terminated(PathBuf::from("/bin/first")),
            Event::Exited(PathBuf::from("/bin/first")),
        ]
    );
}

#[tokio::test]
async fn test_scenarios_run_sequentially() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![
        scenario("/bin/a", server.url(), vec![entry("/", 200, "hello", false)]),
        scenario("/bin/b", server.url(), vec![entry("/", 200, "hello", false)]),
    ]);

    let summary = runner(&launcher).run_all(&plan).await.unwrap();
    assert_eq!(summary.scenarios, 2);

    let order: Vec<_> = launcher
        .events()
        .into_iter()
        .map(|e| match e {
            Event::Launched(path, _) => format!("start {}", path.display()),
            Event::Terminated(path) => format!("stop {}", path.display()),
            Event::Exited(path) => format!("exited {}", path.display()),
        })
        .collect();

    // Each server has exited before the next one is launched
    assert_eq!(
        order,
        vec![
            "start /bin/a",
            "stop /bin/a",
            "exited /bin/a",
            "start /bin/b",
            "stop /bin/b",
            "exited /bin/b",
        ]
    );
}

#[tokio::test]
async fn test_launch_failure_is_fatal() {
    let launcher = RecordingLauncher::failing();

    let plan = plan(vec![scenario(
        "/bin/vanished",
        "http://127.0.0.1:1".to_string(),
        vec![entry("/", 200, "", false)],
    )]);

    let error = runner(&launcher).run_all(&plan).await.unwrap_err();
    assert!(matches!(error, TesterError::ProcessLaunch { .. }));
    assert!(launcher.events().is_empty());
}

#[tokio::test]
async fn test_requests_are_concurrent() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let entries = (0..5).map(|_| entry("/slow", 200, "slow", false)).collect();
    let plan = plan(vec![scenario("/bin/server", server.url(), entries)]);

    let started = Instant::now();
    runner(&launcher).run_all(&plan).await.unwrap();

    // Five sequential requests would take at least 5 * SLOW_DELAY
    assert!(started.elapsed() < SLOW_DELAY * 4);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let plan = plan(vec![scenario(
        "/bin/server",
        server.url(),
        vec![entry("/slow", 200, "slow", false)],
    )]);

    let runner = TestRunner::with_launcher(launcher.clone()).options(RunOptions {
        warmup: Some(Duration::ZERO),
        request_timeout: Some(Duration::from_millis(50)),
    });

    let error = runner.run_all(&plan).await.unwrap_err();
    assert!(matches!(error, TesterError::Request { .. }));
    assert_eq!(launcher.terminations(), 1);
}

#[tokio::test]
async fn test_ready_probe_replaces_warmup() {
    let server = TestServer::start().await;
    let launcher = RecordingLauncher::new();

    let mut config = scenario(
        "/bin/server",
        server.url(),
        vec![entry("/index.html", 200, "hello", false)],
    );
    // A ten second warm-up would be obvious if it were still applied
    config.warmup_ms = Some(10_000);
    config.ready_probe = Some(ReadyProbe {
        path: "/page2".to_string(),
        ..Default::default()
    });

    let started = Instant::now();
    TestRunner::with_launcher(launcher.clone())
        .run_all(&plan(vec![config]))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_ready_probe_gives_up() {
    let launcher = RecordingLauncher::new();

    let mut config = scenario(
        "/bin/server",
        format!("http://127.0.0.1:{}", unused_port()),
        vec![entry("/", 200, "", false)],
    );
    config.ready_probe = Some(ReadyProbe {
        timeout_ms: 200,
        interval_ms: 20,
        ..Default::default()
    });

    let error = TestRunner::with_launcher(launcher.clone())
        .run_all(&plan(vec![config]))
        .await
        .unwrap_err();

    assert!(matches!(error, TesterError::NotReady { .. }));
    assert_eq!(launcher.terminations(), 1);
}
