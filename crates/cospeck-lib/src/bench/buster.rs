//! Saturation benchmark ("node-buster")
//!
//! Launches pods without an upper bound until one fails to come up. A
//! failing worker signals a single-slot channel that the launch loop polls
//! without blocking, before and after waiting for a slot.
//!
//! Workers launched before the stop decision keep running and may still
//! fail afterwards, in any order. Every failure is recorded on the session
//! and the report carries the lowest failing index once all workers have
//! been joined, a lower bound on how many pods of this shape the node can
//! hold.

use super::{BenchmarkSession, Phase};
use crate::error::BenchError;
use crate::models::checkpoints;
use crate::report::{BenchReport, MetricsTimeline, SaturationOutcome};
use crate::sampler::ResourceSampler;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

/// Failure signalled by a node-buster worker
#[derive(Debug)]
pub struct SaturationResult {
    /// Sequence index of the pod that failed
    pub index: usize,
    pub error: anyhow::Error,
}

pub async fn run_node_buster(
    session: Arc<BenchmarkSession>,
    mut samplers: Vec<Box<dyn ResourceSampler>>,
) -> Result<BenchReport, BenchError> {
    let threads = session.config().threads;
    let started_at = Utc::now();
    let started = Instant::now();
    let mut timeline = MetricsTimeline::new();

    let runtime = session.runtime_info().await;
    session
        .logger()
        .log_run_started("node-buster", &runtime, threads, None);

    session.enter(Phase::Cleaning);
    session.clean().await;

    session.enter(Phase::BaselineSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::INIT)
        .await;

    session.enter(Phase::Launching);
    let (failures, mut results) = mpsc::channel::<SaturationResult>(1);
    let mut creation = JoinSet::new();
    let mut index = 0usize;

    let signal = loop {
        if let Ok(result) = results.try_recv() {
            break result;
        }

        let slot = session.gate().acquire().await?;
        if let Ok(result) = results.try_recv() {
            drop(slot);
            break result;
        }

        session.spawn_creation(&mut creation, slot, index, Some(failures.clone()));
        index += 1;
    };

    info!(
        launched = index,
        signalled = signal.index,
        "Stopping launches after pod failure"
    );

    session.enter(Phase::PostLaunchSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::SATURATED)
        .await;

    session.enter(Phase::TearingDown);
    let pods = session.registry().pods_from(0).await;
    let swept = pods.len();
    let mut teardown = JoinSet::new();
    session.spawn_teardowns(&mut teardown, pods).await?;

    session.enter(Phase::FinalSample);
    session
        .sample_checkpoint(&mut samplers, &mut timeline, checkpoints::FINAL)
        .await;

    session.enter(Phase::Reporting);
    session.finish_teardown(creation, teardown, swept).await?;
    let outcome = session
        .lowest_failure()
        .await
        .unwrap_or_else(|| SaturationOutcome {
            index: signal.index,
            error: format!("{:#}", signal.error),
        });
    let registered = session.registry().len().await;
    session
        .logger()
        .log_saturation(outcome.index, registered, &outcome.error);
    let report = session
        .report(runtime, started_at, started, timeline, Some(outcome))
        .await;

    session.enter(Phase::Done);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchConfig, TestKind};
    use crate::runtime::FakeRuntime;

    fn config(threads: usize) -> BenchConfig {
        BenchConfig {
            test: TestKind::NodeBuster,
            threads,
            stats_window_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_thread_reports_exact_index() {
        let runtime = Arc::new(FakeRuntime::new().fail_from_call(6));
        let session = BenchmarkSession::new(config(1), runtime.clone()).unwrap();

        let report = run_node_buster(session, Vec::new()).await.unwrap();
        let saturation = report.summary.saturation.unwrap();

        assert_eq!(saturation.index, 5);
        assert_eq!(report.summary.registered, 5);
        assert_eq!(report.summary.torn_down, 5);
        assert_eq!(runtime.create_calls(), 6);
        assert_eq!(runtime.live_sandboxes(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_is_saturation_signal() {
        let runtime = Arc::new(FakeRuntime::new().fail_start_ids(["3"]));
        let session = BenchmarkSession::new(config(1), runtime.clone()).unwrap();

        let report = run_node_buster(session, Vec::new()).await.unwrap();

        assert_eq!(report.summary.saturation.unwrap().index, 3);
        assert_eq!(report.summary.registered, 3);
        // The half-started pod was removed rather than registered
        assert_eq!(runtime.live_sandboxes(), 0);
    }

    #[tokio::test]
    async fn test_lowest_failure_wins_regardless_of_order() {
        let session = BenchmarkSession::new(config(4), Arc::new(FakeRuntime::new())).unwrap();
        assert!(session.lowest_failure().await.is_none());

        for index in [7, 3, 5] {
            let error = anyhow::anyhow!("pod {} refused", index);
            session.record_failure(index, &error).await;
        }

        let lowest = session.lowest_failure().await.unwrap();
        assert_eq!(lowest.index, 3);
        assert_eq!(lowest.error, "pod 3 refused");
    }
}
