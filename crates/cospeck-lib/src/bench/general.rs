//! Fixed-population benchmark
//!
//! Launches `total_pods` pods through the gate, samples while they are in
//! flight and after a settle delay, then tears everything down.

use super::{BenchmarkSession, Phase};
use crate::error::BenchError;
use crate::models::checkpoints;
use crate::report::{BenchReport, MetricsTimeline};
use crate::sampler::ResourceSampler;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::info;

pub async fn run_general(
    session: Arc<BenchmarkSession>,
    mut samplers: Vec<Box<dyn ResourceSampler>>,
) -> Result<BenchReport, BenchError> {
    let config = session.config().clone();
    let started_at = Utc::now();
    let started = Instant::now();
    let mut timeline = MetricsTimeline::new();

    let runtime = session.runtime_info().await;
    session
        .logger()
        .log_run_started("general", &runtime, config.threads, Some(config.total_pods));

    session.enter(Phase::Cleaning);
    session.clean().await;

    session.enter(Phase::BaselineSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::INIT)
        .await;

    session.enter(Phase::Launching);
    let mut creation = JoinSet::new();
    for index in 0..config.total_pods {
        let slot = session.gate().acquire().await?;
        session.spawn_creation(&mut creation, slot, index, None);
    }
    info!(pods = config.total_pods, "All pod launches issued");

    session.enter(Phase::PostLaunchSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::POST_LAUNCH)
        .await;

    session.enter(Phase::Settling);
    tokio::time::sleep(config.settle_delay()).await;

    session.enter(Phase::SettledSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::SETTLED)
        .await;
    if config.track_pod_memory {
        session.record_pod_memory().await;
    }

    session.enter(Phase::TearingDown);
    let pods = session.registry().pods_from(0).await;
    let swept = pods.len();
    info!(pods = swept, "Tearing down registered pods");
    let mut teardown = JoinSet::new();
    session.spawn_teardowns(&mut teardown, pods).await?;

    session.enter(Phase::FinalSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::FINAL)
        .await;

    session.enter(Phase::Reporting);
    session.finish_teardown(creation, teardown, swept).await?;
    let report = session
        .report(runtime, started_at, started, timeline, None)
        .await;

    session.enter(Phase::Done);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;
    use crate::runtime::FakeRuntime;

    fn config(total_pods: usize, threads: usize) -> BenchConfig {
        BenchConfig {
            total_pods,
            threads,
            settle_delay_ms: 0,
            stats_window_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_without_samplers() {
        let runtime = Arc::new(FakeRuntime::new());
        let session = BenchmarkSession::new(config(4, 2), runtime.clone()).unwrap();

        let report = run_general(session.clone(), Vec::new()).await.unwrap();

        assert_eq!(report.summary.registered, 4);
        assert_eq!(report.summary.torn_down, 4);
        assert!(report.timeline.is_empty());
        assert_eq!(runtime.clean_calls(), 1);
        assert_eq!(runtime.live_sandboxes(), 0);
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_clean_failure_is_not_fatal() {
        let runtime = Arc::new(FakeRuntime::new().fail_clean());
        let session = BenchmarkSession::new(config(2, 1), runtime).unwrap();

        let report = run_general(session, Vec::new()).await.unwrap();
        assert_eq!(report.summary.registered, 2);
    }

    #[tokio::test]
    async fn test_failed_removal_is_not_a_clean_teardown() {
        let runtime = Arc::new(FakeRuntime::new().fail_remove_ids(["1"]));
        let session = BenchmarkSession::new(config(3, 2), runtime.clone()).unwrap();

        let report = run_general(session, Vec::new()).await.unwrap();

        assert_eq!(report.summary.registered, 3);
        assert_eq!(report.summary.torn_down, 2);
        assert_eq!(report.summary.teardown_failures, 1);
        // Stop succeeded, so every pod still has a destruction time
        assert!(report.pods.iter().all(|p| p.destruction_time.is_some()));
        assert_eq!(runtime.live_sandboxes(), 1);
    }

    #[tokio::test]
    async fn test_stop_only_teardown() {
        let runtime = Arc::new(FakeRuntime::new());
        let config = BenchConfig {
            remove_after_stop: false,
            ..config(3, 3)
        };
        let session = BenchmarkSession::new(config, runtime.clone()).unwrap();

        let report = run_general(session, Vec::new()).await.unwrap();

        assert_eq!(runtime.stop_calls(), 3);
        assert_eq!(runtime.remove_calls(), 0);
        assert_eq!(runtime.live_sandboxes(), 3);
        assert!(report.pods.iter().all(|p| p.destruction_time.is_some()));
    }

    #[tokio::test]
    async fn test_pod_memory_tracking() {
        let runtime = Arc::new(FakeRuntime::new());
        let config = BenchConfig {
            track_pod_memory: true,
            settle_delay_ms: 50,
            ..config(2, 2)
        };
        let session = BenchmarkSession::new(config, runtime).unwrap();

        let report = run_general(session, Vec::new()).await.unwrap();

        assert_eq!(report.summary.avg_pod_memory_mib, Some(8.0));
    }
}
