//! In-memory runtime driver
//!
//! Keeps pods in a map, sleeps for configurable latencies and fails on
//! scripted calls.

use super::RuntimeDriver;
use crate::models::{ContainerDescriptor, ContainerUsage, PodDescriptor, StatsFilter, BYTES_IN_MIB};
use crate::spec::{ContainerTemplate, PodTemplate};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// CPU each running container accrues per stats query
const CPU_TICK_NS: u64 = 5_000_000;
const WORKING_SET_BYTES: u64 = 8 * BYTES_IN_MIB;
const WRITABLE_LAYER_BYTES: u64 = BYTES_IN_MIB;

#[derive(Debug)]
struct FakeContainer {
    sandbox_id: String,
    unique_id: String,
    name: String,
    running: bool,
    cpu_ns: u64,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    /// Sandbox ID to the unique ID it was created for
    sandboxes: HashMap<String, String>,
    containers: HashMap<String, FakeContainer>,
}

/// Scripted in-memory runtime
#[derive(Debug)]
pub struct FakeRuntime {
    template: PodTemplate,
    create_latency: Duration,
    start_latency: Duration,
    stop_latency: Duration,
    remove_latency: Duration,
    /// Create calls numbered at or past this (1-based) fail
    fail_from_call: Option<usize>,
    failing_ids: HashSet<String>,
    failing_start_ids: HashSet<String>,
    failing_remove_ids: HashSet<String>,
    fail_clean: bool,
    state: Mutex<FakeState>,
    create_calls: AtomicUsize,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    clean_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts one lifecycle call as in flight until dropped
struct InFlight<'a> {
    runtime: &'a FakeRuntime,
}

impl<'a> InFlight<'a> {
    fn enter(runtime: &'a FakeRuntime) -> Self {
        let now = runtime.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        runtime.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { runtime }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.runtime.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeRuntime {
    /// A runtime that instantly succeeds with a single `web` container pod
    pub fn new() -> Self {
        Self {
            template: PodTemplate {
                name: "fake".to_string(),
                containers: vec![ContainerTemplate {
                    name: "web".to_string(),
                    image: "docker.io/library/alpine:latest".to_string(),
                    command: vec!["sleep".to_string(), "5000".to_string()],
                    args: Vec::new(),
                }],
            },
            create_latency: Duration::ZERO,
            start_latency: Duration::ZERO,
            stop_latency: Duration::ZERO,
            remove_latency: Duration::ZERO,
            fail_from_call: None,
            failing_ids: HashSet::new(),
            failing_start_ids: HashSet::new(),
            failing_remove_ids: HashSet::new(),
            fail_clean: false,
            state: Mutex::new(FakeState::default()),
            create_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            clean_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_template(mut self, template: PodTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_create_latency(mut self, latency: Duration) -> Self {
        self.create_latency = latency;
        self
    }

    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    /// Latency of both stop and remove
    pub fn with_teardown_latency(mut self, latency: Duration) -> Self {
        self.stop_latency = latency;
        self.remove_latency = latency;
        self
    }

    /// Fail the `call`th create (1-based) and every create after it
    pub fn fail_from_call(mut self, call: usize) -> Self {
        self.fail_from_call = Some(call);
        self
    }

    /// Fail creation for the given unique IDs
    pub fn fail_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Create normally but fail to start containers of the given unique IDs
    pub fn fail_start_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_start_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Stop normally but fail to remove the pods of the given unique IDs
    pub fn fail_remove_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_remove_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn fail_clean(mut self) -> Self {
        self.fail_clean = true;
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn clean_calls(&self) -> usize {
        self.clean_calls.load(Ordering::SeqCst)
    }

    /// Highest number of lifecycle calls ever in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Sandboxes created and not yet removed
    pub fn live_sandboxes(&self) -> usize {
        self.lock().sandboxes.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // A poisoned lock only means a test thread panicked mid-update
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RuntimeDriver for FakeRuntime {
    async fn clean(&self) -> Result<()> {
        self.clean_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_clean {
            anyhow::bail!("fake runtime: clean refused");
        }
        let mut state = self.lock();
        state.sandboxes.clear();
        state.containers.clear();
        Ok(())
    }

    async fn create_pod_from_spec(
        &self,
        _spec_file: &Path,
        unique_id: &str,
    ) -> Result<PodDescriptor> {
        let _in_flight = InFlight::enter(self);
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.create_latency.is_zero() {
            tokio::time::sleep(self.create_latency).await;
        }

        if self.fail_from_call.is_some_and(|k| call >= k) {
            anyhow::bail!("fake runtime: create call {} refused", call);
        }
        if self.failing_ids.contains(unique_id) {
            anyhow::bail!("fake runtime: pod {} refused", unique_id);
        }

        let mut descriptor = self.template.descriptor(unique_id);
        let mut state = self.lock();
        state.next_id += 1;
        let sandbox_id = format!("sandbox-{:06}", state.next_id);
        state
            .sandboxes
            .insert(sandbox_id.clone(), unique_id.to_string());

        for container in &mut descriptor.containers {
            state.next_id += 1;
            container.container_id = format!("ctr-{:06}", state.next_id);
            state.containers.insert(
                container.container_id.clone(),
                FakeContainer {
                    sandbox_id: sandbox_id.clone(),
                    unique_id: unique_id.to_string(),
                    name: container.name.clone(),
                    running: false,
                    cpu_ns: 0,
                },
            );
        }
        descriptor.sandbox_id = sandbox_id;

        Ok(descriptor)
    }

    async fn run(&self, container: &ContainerDescriptor) -> Result<Duration> {
        let _in_flight = InFlight::enter(self);
        let start = Instant::now();
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        if !self.start_latency.is_zero() {
            tokio::time::sleep(self.start_latency).await;
        }

        let mut state = self.lock();
        let Some(entry) = state.containers.get_mut(&container.container_id) else {
            anyhow::bail!("fake runtime: no container {}", container.container_id);
        };
        if self.failing_start_ids.contains(&entry.unique_id) {
            anyhow::bail!("fake runtime: start of {} refused", container.container_id);
        }
        entry.running = true;

        Ok(start.elapsed())
    }

    async fn stop_pod(&self, pod: &PodDescriptor) -> Result<Duration> {
        let _in_flight = InFlight::enter(self);
        let start = Instant::now();
        self.stop_calls.fetch_add(1, Ordering::SeqCst);

        if !self.stop_latency.is_zero() {
            tokio::time::sleep(self.stop_latency).await;
        }

        let mut state = self.lock();
        if !state.sandboxes.contains_key(&pod.sandbox_id) {
            anyhow::bail!("fake runtime: no sandbox {}", pod.sandbox_id);
        }
        for container in state.containers.values_mut() {
            if container.sandbox_id == pod.sandbox_id {
                container.running = false;
            }
        }

        Ok(start.elapsed())
    }

    async fn remove_pod(&self, pod: &PodDescriptor) -> Result<Duration> {
        let _in_flight = InFlight::enter(self);
        let start = Instant::now();
        self.remove_calls.fetch_add(1, Ordering::SeqCst);

        if !self.remove_latency.is_zero() {
            tokio::time::sleep(self.remove_latency).await;
        }

        let mut state = self.lock();
        let Some(unique_id) = state.sandboxes.get(&pod.sandbox_id) else {
            anyhow::bail!("fake runtime: no sandbox {}", pod.sandbox_id);
        };
        if self.failing_remove_ids.contains(unique_id) {
            anyhow::bail!("fake runtime: removal of {} refused", pod.sandbox_id);
        }
        state.sandboxes.remove(&pod.sandbox_id);
        state
            .containers
            .retain(|_, container| container.sandbox_id != pod.sandbox_id);

        Ok(start.elapsed())
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<Vec<ContainerUsage>> {
        let mut state = self.lock();
        let mut usage: Vec<ContainerUsage> = state
            .containers
            .iter_mut()
            .filter(|(id, c)| match filter {
                StatsFilter::All => true,
                StatsFilter::Container(wanted) => *id == wanted,
                StatsFilter::Pod(sandbox) => &c.sandbox_id == sandbox,
            })
            .map(|(id, c)| {
                if c.running {
                    c.cpu_ns += CPU_TICK_NS;
                }
                ContainerUsage {
                    container_id: id.clone(),
                    name: c.name.clone(),
                    cpu_core_ns: c.cpu_ns,
                    working_set_bytes: if c.running { WORKING_SET_BYTES } else { 0 },
                    writable_layer_bytes: WRITABLE_LAYER_BYTES,
                }
            })
            .collect();
        usage.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        Ok(usage)
    }

    async fn info(&self) -> Result<String> {
        Ok("fake 0.1.0 (CRI API v1)".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let runtime = FakeRuntime::new();
        let pod = runtime
            .create_pod_from_spec(Path::new("pod.yaml"), "3")
            .await
            .unwrap();

        assert_eq!(pod.name, "pod-fake-3");
        assert!(!pod.sandbox_id.is_empty());
        assert!(!pod.containers[0].container_id.is_empty());
        assert_eq!(runtime.live_sandboxes(), 1);
    }

    #[tokio::test]
    async fn test_fail_from_call() {
        let runtime = FakeRuntime::new().fail_from_call(2);
        let spec = Path::new("pod.yaml");

        assert!(runtime.create_pod_from_spec(spec, "0").await.is_ok());
        assert!(runtime.create_pod_from_spec(spec, "1").await.is_err());
        assert!(runtime.create_pod_from_spec(spec, "2").await.is_err());
        assert_eq!(runtime.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_start_failure_by_id() {
        let runtime = FakeRuntime::new().fail_start_ids(["1"]);
        let spec = Path::new("pod.yaml");

        let ok = runtime.create_pod_from_spec(spec, "0").await.unwrap();
        let bad = runtime.create_pod_from_spec(spec, "1").await.unwrap();

        assert!(runtime.run(&ok.containers[0]).await.is_ok());
        assert!(runtime.run(&bad.containers[0]).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_accrue_for_running_containers() {
        let runtime = FakeRuntime::new();
        let pod = runtime
            .create_pod_from_spec(Path::new("pod.yaml"), "0")
            .await
            .unwrap();
        runtime.run(&pod.containers[0]).await.unwrap();

        let first = runtime.stats(&StatsFilter::All).await.unwrap();
        let second = runtime
            .stats(&StatsFilter::Pod(pod.sandbox_id.clone()))
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert!(second[0].cpu_core_ns > first[0].cpu_core_ns);
        assert_eq!(second[0].working_set_bytes, WORKING_SET_BYTES);

        let none = runtime
            .stats(&StatsFilter::Container("missing".to_string()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_stop_and_remove() {
        let runtime = FakeRuntime::new();
        let pod = runtime
            .create_pod_from_spec(Path::new("pod.yaml"), "0")
            .await
            .unwrap();

        runtime.stop_pod(&pod).await.unwrap();
        runtime.remove_pod(&pod).await.unwrap();
        assert_eq!(runtime.live_sandboxes(), 0);
        assert!(runtime.remove_pod(&pod).await.is_err());
    }

    #[tokio::test]
    async fn test_clean_failure() {
        let runtime = FakeRuntime::new().fail_clean();
        assert!(runtime.clean().await.is_err());
        assert_eq!(runtime.clean_calls(), 1);
    }
}
