//! State shared by the driver and its pod workers during one run

use super::buster::SaturationResult;
use super::{ConcurrencyGate, Phase, PodRegistry, Slot};
use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::models::{bytes_to_mib, PodDescriptor, StatsFilter, TrackedPod};
use crate::observability::{BenchMetrics, StructuredLogger};
use crate::report::{
    average_creation_ms, average_destruction_ms, average_pod_memory_mib, BenchReport,
    MetricsTimeline, RunSummary, SaturationOutcome,
};
use crate::runtime::RuntimeDriver;
use crate::sampler::{create_cgroup_sampler, ResourceSampler, RuntimeStatsSampler};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct RunCounters {
    attempted: AtomicUsize,
    failed: AtomicUsize,
    torn_down: AtomicUsize,
    teardown_failures: AtomicUsize,
}

/// One benchmark run: configuration, runtime handle, gate and registry.
///
/// Shared with worker tasks through an `Arc`; nothing here is global, so
/// several sessions can run in the same process.
pub struct BenchmarkSession {
    config: BenchConfig,
    runtime: Arc<dyn RuntimeDriver>,
    gate: ConcurrencyGate,
    registry: PodRegistry,
    metrics: BenchMetrics,
    logger: StructuredLogger,
    phase: watch::Sender<Phase>,
    counters: RunCounters,
    /// Lowest-indexed failure reported by a saturation worker
    lowest_failure: Mutex<Option<SaturationOutcome>>,
}

impl BenchmarkSession {
    pub fn new(
        config: BenchConfig,
        runtime: Arc<dyn RuntimeDriver>,
    ) -> Result<Arc<Self>, BenchError> {
        config.validate()?;

        let run_id = format!("run-{}", Utc::now().format("%Y%m%d-%H%M%S%.3f"));
        let (phase, _) = watch::channel(Phase::Init);

        Ok(Arc::new(Self {
            gate: ConcurrencyGate::new(config.threads),
            config,
            runtime,
            registry: PodRegistry::new(),
            metrics: BenchMetrics::new(),
            logger: StructuredLogger::new(run_id),
            phase,
            counters: RunCounters::default(),
            lowest_failure: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<dyn RuntimeDriver> {
        &self.runtime
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn registry(&self) -> &PodRegistry {
        &self.registry
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn attempted(&self) -> usize {
        self.counters.attempted.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.counters.failed.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(&self, phase: Phase) {
        debug!(run_id = %self.logger.run_id(), phase = %phase, "Entering phase");
        self.phase.send_replace(phase);
    }

    /// Runtime description, or "unknown" when the runtime cannot say
    pub(crate) async fn runtime_info(&self) -> String {
        match self.runtime.info().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Failed to query runtime version");
                "unknown".to_string()
            }
        }
    }

    /// Best-effort removal of leftovers from earlier runs
    pub(crate) async fn clean(&self) {
        if let Err(e) = self.runtime.clean().await {
            warn!(error = %e, "Cleanup before run failed, continuing on a possibly non-empty namespace");
        }
    }

    /// Create pod `index`, start its containers and register it.
    ///
    /// A pod whose containers fail to start is stopped and removed before
    /// the error is returned; it is never registered.
    pub async fn create_pod(&self, index: usize) -> anyhow::Result<usize> {
        self.counters.attempted.fetch_add(1, Ordering::SeqCst);
        let unique_id = index.to_string();
        let start = Instant::now();

        let pod = match self
            .runtime
            .create_pod_from_spec(&self.config.pod_config_file, &unique_id)
            .await
        {
            Ok(pod) => pod,
            Err(e) => return Err(self.pod_failed(index, "create", e)),
        };

        for container in &pod.containers {
            if let Err(e) = self.runtime.run(container).await {
                self.discard(&pod).await;
                let e = e.context(format!("Failed to start container {}", container.name));
                return Err(self.pod_failed(index, "start", e));
            }
        }

        let elapsed = start.elapsed();
        let name = pod.name.clone();
        let sandbox_id = pod.sandbox_id.clone();

        let position = match self.registry.append(TrackedPod::new(pod, elapsed)).await {
            Ok(position) => position,
            Err(e) => return Err(self.pod_failed(index, "register", e.into())),
        };

        self.metrics.observe_creation(elapsed);
        self.logger
            .log_pod_created(index, &name, &sandbox_id, elapsed);
        Ok(position)
    }

    fn pod_failed(&self, index: usize, stage: &str, error: anyhow::Error) -> anyhow::Error {
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        self.metrics.inc_pod_failed(stage);
        self.logger.log_pod_failed(index, stage, &error);
        error
    }

    async fn discard(&self, pod: &PodDescriptor) {
        if let Err(e) = self.runtime.stop_pod(pod).await {
            warn!(pod = %pod.name, error = %e, "Failed to stop pod after start failure");
        }
        if let Err(e) = self.runtime.remove_pod(pod).await {
            warn!(pod = %pod.name, error = %e, "Failed to remove pod after start failure");
        }
    }

    /// Stop `pod`, remove it when configured to, and record how long it took
    pub async fn teardown_pod(&self, pod: &PodDescriptor) {
        let mut elapsed = match self.runtime.stop_pod(pod).await {
            Ok(elapsed) => elapsed,
            Err(e) => {
                error!(pod = %pod.name, sandbox_id = %pod.sandbox_id, error = %e, "Error stopping pod");
                self.teardown_failed();
                return;
            }
        };

        let mut removed = false;
        let mut clean = true;
        if self.config.remove_after_stop {
            match self.runtime.remove_pod(pod).await {
                Ok(remove_elapsed) => {
                    elapsed += remove_elapsed;
                    removed = true;
                }
                Err(e) => {
                    error!(pod = %pod.name, sandbox_id = %pod.sandbox_id, error = %e, "Error removing pod");
                    clean = false;
                }
            }
        }

        // A stopped pod has a destruction time even when removal failed
        self.registry
            .set_destruction_time(&pod.sandbox_id, elapsed)
            .await;
        self.metrics.observe_teardown(elapsed);
        self.logger.log_pod_stopped(&pod.name, elapsed, removed);

        if clean {
            self.counters.torn_down.fetch_add(1, Ordering::SeqCst);
        } else {
            self.teardown_failed();
        }
    }

    fn teardown_failed(&self) {
        self.counters.teardown_failures.fetch_add(1, Ordering::SeqCst);
        self.metrics.inc_teardown_errors();
    }

    /// Run pod creation `index` on `slot` in the background.
    ///
    /// With `failures` set, a failing worker records itself as a saturation
    /// candidate and signals the channel before giving its slot back.
    pub(crate) fn spawn_creation(
        self: &Arc<Self>,
        tasks: &mut JoinSet<()>,
        slot: Slot,
        index: usize,
        failures: Option<mpsc::Sender<SaturationResult>>,
    ) {
        let session = Arc::clone(self);
        session.metrics.worker_started();

        tasks.spawn(async move {
            if let Err(error) = session.create_pod(index).await {
                if let Some(failures) = failures {
                    session.record_failure(index, &error).await;
                    // Stop signal only; a full channel already holds one
                    let _ = failures.try_send(SaturationResult { index, error });
                }
            }
            session.metrics.worker_finished();
            drop(slot);
        });
    }

    pub(crate) async fn record_failure(&self, index: usize, error: &anyhow::Error) {
        let mut lowest = self.lowest_failure.lock().await;
        if lowest.as_ref().map_or(true, |current| index < current.index) {
            *lowest = Some(SaturationOutcome {
                index,
                error: format!("{:#}", error),
            });
        }
    }

    /// Lowest-indexed saturation failure recorded so far.
    ///
    /// Only final once every creation task has been joined.
    pub(crate) async fn lowest_failure(&self) -> Option<SaturationOutcome> {
        self.lowest_failure.lock().await.clone()
    }

    /// Launch a teardown worker for each pod, waiting for a slot before each
    pub(crate) async fn spawn_teardowns(
        self: &Arc<Self>,
        tasks: &mut JoinSet<()>,
        pods: Vec<PodDescriptor>,
    ) -> Result<(), BenchError> {
        for pod in pods {
            let slot = self.gate.acquire().await?;
            let session = Arc::clone(self);
            session.metrics.worker_started();

            tasks.spawn(async move {
                session.teardown_pod(&pod).await;
                session.metrics.worker_finished();
                drop(slot);
            });
        }
        Ok(())
    }

    /// Wait for stragglers, tear down pods registered after the first sweep
    /// and wait for every teardown to finish.
    pub(crate) async fn finish_teardown(
        self: &Arc<Self>,
        mut creation: JoinSet<()>,
        mut teardown: JoinSet<()>,
        swept: usize,
    ) -> Result<(), BenchError> {
        drain(&mut creation).await;

        let late = self.registry.pods_from(swept).await;
        if !late.is_empty() {
            info!(pods = late.len(), "Tearing down pods registered after the sweep");
            self.spawn_teardowns(&mut teardown, late).await?;
        }

        drain(&mut teardown).await;
        Ok(())
    }

    /// Sample every backend under `label`; failures are logged and skipped
    pub(crate) async fn sample_checkpoint(
        &self,
        samplers: &mut [Box<dyn ResourceSampler>],
        timeline: &mut MetricsTimeline,
        label: &str,
    ) {
        for sampler in samplers.iter_mut() {
            let source = sampler.source().to_string();
            match sampler.sample(label).await {
                Ok(sample) => {
                    self.logger
                        .log_checkpoint(label, &source, sample.mem_mib, sample.cpu_percent);
                    timeline.push(sample);
                }
                Err(e) => {
                    warn!(checkpoint = %label, source = %source, error = %e, "Sampling failed");
                    self.metrics.inc_sampling_errors(&source);
                }
            }
        }
    }

    /// Record the average container working set of every registered pod
    pub(crate) async fn record_pod_memory(&self) {
        for tracked in self.registry.snapshot().await {
            let sandbox_id = tracked.pod.sandbox_id;
            match self
                .runtime
                .stats(&StatsFilter::Pod(sandbox_id.clone()))
                .await
            {
                Ok(usage) if !usage.is_empty() => {
                    let total: u64 = usage.iter().map(|c| c.working_set_bytes).sum();
                    let average = bytes_to_mib(total) / usage.len() as f64;
                    self.registry.set_average_memory(&sandbox_id, average).await;
                }
                Ok(_) => debug!(sandbox_id = %sandbox_id, "No container stats for pod"),
                Err(e) => warn!(sandbox_id = %sandbox_id, error = %e, "Failed to query pod stats"),
            }
        }
    }

    pub(crate) async fn report(
        &self,
        runtime: String,
        started_at: DateTime<Utc>,
        started: Instant,
        timeline: MetricsTimeline,
        saturation: Option<SaturationOutcome>,
    ) -> BenchReport {
        let pods = self.registry.snapshot().await;
        let elapsed = started.elapsed();

        let summary = RunSummary {
            run_id: self.logger.run_id().to_string(),
            test: self.config.test,
            runtime,
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            attempted: self.attempted(),
            registered: pods.len(),
            failed: self.failed(),
            torn_down: self.counters.torn_down.load(Ordering::SeqCst),
            teardown_failures: self.counters.teardown_failures.load(Ordering::SeqCst),
            avg_creation_ms: average_creation_ms(&pods),
            avg_destruction_ms: average_destruction_ms(&pods),
            avg_pod_memory_mib: average_pod_memory_mib(&pods),
            saturation,
        };

        self.logger
            .log_run_finished(summary.registered, summary.failed, elapsed);

        BenchReport {
            summary,
            timeline,
            pods,
        }
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Pod worker task failed");
        }
    }
}

/// Build the cgroup and runtime-stats samplers for a run.
///
/// A cgroup that cannot be read is a setup failure.
pub async fn build_samplers(
    config: &BenchConfig,
    runtime: Arc<dyn RuntimeDriver>,
) -> Result<Vec<Box<dyn ResourceSampler>>, BenchError> {
    let cgroup = create_cgroup_sampler(&config.cgroup_root, &config.cgroup_path)
        .await
        .map_err(|e| BenchError::Setup(e.into()))?;
    let stats = RuntimeStatsSampler::new(runtime, StatsFilter::All, config.stats_window());

    Ok(vec![Box::new(cgroup), Box::new(stats)])
}
