//! Sampling from the runtime's per-container stats API
//!
//! The runtime reports cumulative CPU counters per container, so each sample
//! takes two reads a short window apart and diffs them container by container.

use super::{cpu_rate, ResourceSampler};
use crate::error::SamplerError;
use crate::models::{bytes_to_mib, ContainerUsage, MetricSample, SampleSource, StatsFilter};
use crate::runtime::RuntimeDriver;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Samples resource usage reported by the runtime
pub struct RuntimeStatsSampler {
    runtime: Arc<dyn RuntimeDriver>,
    filter: StatsFilter,
    window: Duration,
}

impl RuntimeStatsSampler {
    pub fn new(runtime: Arc<dyn RuntimeDriver>, filter: StatsFilter, window: Duration) -> Self {
        Self {
            runtime,
            filter,
            window,
        }
    }

    async fn read(&self) -> Result<(Vec<ContainerUsage>, Instant), SamplerError> {
        let stats = self
            .runtime
            .stats(&self.filter)
            .await
            .map_err(SamplerError::Runtime)?;
        Ok((stats, Instant::now()))
    }
}

/// Total CPU consumed between two stats reads.
///
/// Containers only present in the later read started inside the window and
/// contribute their whole counter; containers that disappeared contribute
/// nothing.
pub fn container_cpu_delta(
    before: &[ContainerUsage],
    after: &[ContainerUsage],
) -> Result<u64, SamplerError> {
    let previous: HashMap<&str, u64> = before
        .iter()
        .map(|c| (c.container_id.as_str(), c.cpu_core_ns))
        .collect();

    let mut total = 0u64;
    for container in after {
        let prev = previous
            .get(container.container_id.as_str())
            .copied()
            .unwrap_or(0);
        if container.cpu_core_ns < prev {
            return Err(SamplerError::CounterReset {
                previous: prev,
                current: container.cpu_core_ns,
            });
        }
        total = total.saturating_add(container.cpu_core_ns - prev);
    }

    Ok(total)
}

#[async_trait]
impl ResourceSampler for RuntimeStatsSampler {
    fn source(&self) -> SampleSource {
        SampleSource::Runtime
    }

    async fn sample(&mut self, label: &str) -> Result<MetricSample, SamplerError> {
        let (before, started) = self.read().await?;
        if !self.window.is_zero() {
            tokio::time::sleep(self.window).await;
        }
        let (after, finished) = self.read().await?;

        let cpu_ns = container_cpu_delta(&before, &after)?;
        let memory_bytes: u64 = after.iter().map(|c| c.working_set_bytes).sum();
        let disk_bytes: u64 = after.iter().map(|c| c.writable_layer_bytes).sum();

        tracing::debug!(
            label,
            containers = after.len(),
            cpu_ns,
            memory_bytes,
            "Runtime stats sampled"
        );

        Ok(MetricSample {
            name: label.to_string(),
            source: SampleSource::Runtime,
            timestamp: chrono::Utc::now().timestamp(),
            mem_mib: bytes_to_mib(memory_bytes),
            cpu_ns,
            cpu_percent: cpu_rate(cpu_ns, finished.saturating_duration_since(started)),
            disk_mib: Some(bytes_to_mib(disk_bytes)),
        })
    }
}
