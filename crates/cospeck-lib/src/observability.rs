//! Observability infrastructure for benchmark runs
//!
//! Provides:
//! - Prometheus metrics (pod creation and teardown latency, pod outcomes, in-flight workers)
//! - Structured logging with tracing, one event per benchmark milestone

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for pod lifecycle latencies (in seconds)
const LIFECYCLE_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<BenchMetricsInner> = OnceLock::new();

struct BenchMetricsInner {
    pod_creation_seconds: Histogram,
    pod_teardown_seconds: Histogram,
    pods_created: IntCounter,
    pods_failed: IntCounterVec,
    teardown_errors: IntCounter,
    sampling_errors: IntCounterVec,
    workers_in_flight: IntGauge,
}

impl BenchMetricsInner {
    fn new() -> Self {
        Self {
            pod_creation_seconds: register_histogram!(
                "cospeck_pod_creation_seconds",
                "Time to create a pod and start its containers",
                LIFECYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register pod_creation_seconds"),

            pod_teardown_seconds: register_histogram!(
                "cospeck_pod_teardown_seconds",
                "Time to stop (and remove) a pod",
                LIFECYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register pod_teardown_seconds"),

            pods_created: register_int_counter!(
                "cospeck_pods_created_total",
                "Pods created and registered"
            )
            .expect("Failed to register pods_created"),

            pods_failed: register_int_counter_vec!(
                "cospeck_pods_failed_total",
                "Pods that failed to be created or started",
                &["stage"]
            )
            .expect("Failed to register pods_failed"),

            teardown_errors: register_int_counter!(
                "cospeck_teardown_errors_total",
                "Pods that failed to stop or be removed"
            )
            .expect("Failed to register teardown_errors"),

            sampling_errors: register_int_counter_vec!(
                "cospeck_sampling_errors_total",
                "Checkpoint samples that could not be taken",
                &["source"]
            )
            .expect("Failed to register sampling_errors"),

            workers_in_flight: register_int_gauge!(
                "cospeck_workers_in_flight",
                "Pod workers currently holding a concurrency slot"
            )
            .expect("Failed to register workers_in_flight"),
        }
    }
}

/// Benchmark metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct BenchMetrics {
    _private: (),
}

impl Default for BenchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(BenchMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &BenchMetricsInner {
        GLOBAL_METRICS.get_or_init(BenchMetricsInner::new)
    }

    pub fn observe_creation(&self, elapsed: Duration) {
        self.inner().pods_created.inc();
        self.inner()
            .pod_creation_seconds
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_teardown(&self, elapsed: Duration) {
        self.inner()
            .pod_teardown_seconds
            .observe(elapsed.as_secs_f64());
    }

    /// `stage` is "create" or "start"
    pub fn inc_pod_failed(&self, stage: &str) {
        self.inner().pods_failed.with_label_values(&[stage]).inc();
    }

    pub fn inc_teardown_errors(&self) {
        self.inner().teardown_errors.inc();
    }

    pub fn inc_sampling_errors(&self, source: &str) {
        self.inner()
            .sampling_errors
            .with_label_values(&[source])
            .inc();
    }

    pub fn worker_started(&self) {
        self.inner().workers_in_flight.inc();
    }

    pub fn worker_finished(&self) {
        self.inner().workers_in_flight.dec();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for benchmark events
///
/// Every event carries the run ID and an `event` field so runs can be
/// filtered out of interleaved JSON logs.
#[derive(Clone)]
pub struct StructuredLogger {
    run_id: String,
}

impl StructuredLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_run_started(&self, test: &str, runtime: &str, threads: usize, total_pods: Option<usize>) {
        info!(
            event = "run_started",
            run_id = %self.run_id,
            test = %test,
            runtime = %runtime,
            threads = threads,
            total_pods = ?total_pods,
            "Benchmark run started"
        );
    }

    pub fn log_pod_created(&self, index: usize, pod_name: &str, sandbox_id: &str, elapsed: Duration) {
        info!(
            event = "pod_created",
            run_id = %self.run_id,
            index = index,
            pod_name = %pod_name,
            sandbox_id = %sandbox_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Pod created and started"
        );
    }

    pub fn log_pod_failed(&self, index: usize, stage: &str, error: &anyhow::Error) {
        warn!(
            event = "pod_failed",
            run_id = %self.run_id,
            index = index,
            stage = %stage,
            error = %format!("{:#}", error),
            "Pod could not be brought up"
        );
    }

    pub fn log_pod_stopped(&self, pod_name: &str, elapsed: Duration, removed: bool) {
        info!(
            event = "pod_stopped",
            run_id = %self.run_id,
            pod_name = %pod_name,
            elapsed_ms = elapsed.as_millis() as u64,
            removed = removed,
            "Pod torn down"
        );
    }

    pub fn log_checkpoint(&self, label: &str, source: &str, mem_mib: f64, cpu_percent: f64) {
        info!(
            event = "checkpoint_sampled",
            run_id = %self.run_id,
            checkpoint = %label,
            source = %source,
            mem_mib = mem_mib,
            cpu_percent = cpu_percent,
            "Checkpoint sampled"
        );
    }

    pub fn log_saturation(&self, index: usize, registered: usize, error: &str) {
        warn!(
            event = "saturation_reached",
            run_id = %self.run_id,
            index = index,
            registered = registered,
            error = %error,
            "Node sustained {} pods before failure",
            index
        );
    }

    pub fn log_run_finished(&self, registered: usize, failed: usize, elapsed: Duration) {
        info!(
            event = "run_finished",
            run_id = %self.run_id,
            registered = registered,
            failed = failed,
            elapsed_secs = elapsed.as_secs_f64(),
            "Benchmark run finished"
        );
    }
}
