//! Integration tests for the fixed-population benchmark against the fake runtime

use cospeck_lib::bench::{build_samplers, run_general, BenchmarkSession};
use cospeck_lib::runtime::FakeRuntime;
use cospeck_lib::{BenchConfig, SampleSource};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const RUNTIME_CGROUP: &str = "system.slice/containerd.service";

/// Mock cgroup v2 hierarchy holding the runtime's cgroup
fn mock_cgroup_root(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().to_path_buf();
    std::fs::write(root.join("cgroup.controllers"), "cpu memory io\n").unwrap();

    let path = root.join(RUNTIME_CGROUP);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("cpu.stat"), "usage_usec 1000\nnr_throttled 0\n").unwrap();
    std::fs::write(path.join("memory.current"), "52428800\n").unwrap();

    root
}

fn config(total_pods: usize, threads: usize) -> BenchConfig {
    BenchConfig {
        total_pods,
        threads,
        settle_delay_ms: 300,
        stats_window_ms: 0,
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_to_end_run() {
    let temp_dir = TempDir::new().unwrap();
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_create_latency(Duration::from_millis(50))
            .with_teardown_latency(Duration::from_millis(30)),
    );
    let config = BenchConfig {
        cgroup_root: mock_cgroup_root(&temp_dir),
        cgroup_path: RUNTIME_CGROUP.to_string(),
        ..config(20, 5)
    };

    let samplers = build_samplers(&config, runtime.clone()).await.unwrap();
    let session = BenchmarkSession::new(config, runtime.clone()).unwrap();
    let report = run_general(session.clone(), samplers).await.unwrap();

    assert_eq!(report.summary.registered, 20);
    assert_eq!(report.pods.len(), 20);
    assert_eq!(report.summary.torn_down, 20);
    assert!(report.pods.iter().all(|p| p.destruction_time.is_some()));
    assert_eq!(runtime.stop_calls(), 20);
    assert_eq!(runtime.live_sandboxes(), 0);

    let labels = report.timeline.labels();
    assert_eq!(labels, vec!["init", "post-launch", "settled", "final"]);
    assert_eq!(report.timeline.count(SampleSource::Cgroup), 4);
    assert_eq!(report.timeline.count(SampleSource::Runtime), 4);
    assert!(report.timeline.rows().iter().all(|r| r.cgroup.is_some() && r.runtime.is_some()));

    assert!(runtime.peak_in_flight() <= 5);
    assert!(session.gate().peak_held() <= 5);
    assert!(report.summary.avg_creation_ms.unwrap() >= 50.0);
    assert!(report.summary.avg_destruction_ms.unwrap() >= 30.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_bound_holds() {
    for (threads, pods) in [(1, 5), (3, 12), (8, 8)] {
        let runtime = Arc::new(
            FakeRuntime::new()
                .with_create_latency(Duration::from_millis(10))
                .with_start_latency(Duration::from_millis(5))
                .with_teardown_latency(Duration::from_millis(5)),
        );
        let config = BenchConfig {
            settle_delay_ms: 0,
            ..config(pods, threads)
        };
        let session = BenchmarkSession::new(config, runtime.clone()).unwrap();

        let report = run_general(session.clone(), Vec::new()).await.unwrap();

        assert_eq!(report.summary.registered, pods);
        assert!(
            runtime.peak_in_flight() <= threads,
            "{} calls in flight with {} threads",
            runtime.peak_in_flight(),
            threads
        );
        assert!(session.gate().peak_held() <= threads);
        assert_eq!(session.gate().held(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_integrity_with_failures() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .with_create_latency(Duration::from_millis(5))
            .fail_ids(["2", "5", "11"])
            .fail_start_ids(["7"]),
    );
    let session = BenchmarkSession::new(config(16, 4), runtime.clone()).unwrap();

    let report = run_general(session, Vec::new()).await.unwrap();

    assert_eq!(report.summary.attempted, 16);
    assert_eq!(report.summary.failed, 4);
    assert_eq!(report.summary.registered, 12);
    assert!(report.pods.iter().all(|p| !p.pod.sandbox_id.is_empty()));

    let sandboxes: HashSet<_> = report.pods.iter().map(|p| &p.pod.sandbox_id).collect();
    assert_eq!(sandboxes.len(), 12);

    let names: HashSet<_> = report.pods.iter().map(|p| p.pod.name.as_str()).collect();
    assert!(!names.contains("pod-fake-7"));
    assert_eq!(runtime.live_sandboxes(), 0);
}

#[tokio::test]
async fn test_unreadable_cgroup_is_setup_failure() {
    let temp_dir = TempDir::new().unwrap();
    let runtime = Arc::new(FakeRuntime::new());
    let config = BenchConfig {
        cgroup_root: mock_cgroup_root(&temp_dir),
        cgroup_path: "system.slice/missing.service".to_string(),
        ..config(1, 1)
    };

    assert!(build_samplers(&config, runtime.clone()).await.is_err());
    assert_eq!(runtime.create_calls(), 0);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let runtime = Arc::new(FakeRuntime::new());
    assert!(BenchmarkSession::new(config(0, 1), runtime.clone()).is_err());
    assert!(BenchmarkSession::new(config(1, 0), runtime).is_err());
}
