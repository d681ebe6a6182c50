//! Resource sampling at benchmark checkpoints
//!
//! Two interchangeable backends produce [`MetricSample`]s:
//! - cgroup readers for the v1 (legacy) and v2 (unified) hierarchies,
//!   detected automatically from the cgroup mount
//! - the runtime's own per-container stats API
//!
//! Both report cumulative CPU counters, so every sampler keeps the previous
//! reading and reports the delta against it.

mod cgroup_v1;
mod cgroup_v2;
mod runtime_stats;


pub use cgroup_v1::CgroupV1Reader;
pub use cgroup_v2::CgroupV2Reader;
pub use runtime_stats::{container_cpu_delta, RuntimeStatsSampler};

use crate::error::SamplerError;
use crate::models::{bytes_to_mib, MetricSample, SampleSource};
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs;

/// A source of checkpoint samples
#[async_trait]
pub trait ResourceSampler: Send {
    /// Which backend this sampler reads
    fn source(&self) -> SampleSource;

    /// Take a sample labeled with the given checkpoint name
    async fn sample(&mut self, label: &str) -> Result<MetricSample, SamplerError>;
}

/// CPU time consumed between two readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuDelta {
    pub delta_ns: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy)]
struct CpuReading {
    cumulative_ns: u64,
    at: Instant,
}

/// Last observed cumulative CPU counter and when it was read
#[derive(Debug, Default)]
pub struct CpuTracker {
    last: Option<CpuReading>,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new cumulative reading and return the delta since the last one.
    ///
    /// The first reading is measured against a zero baseline and reports a
    /// percentage of 0, since there is no interval to divide by. A counter
    /// lower than the previous reading is a [`SamplerError::CounterReset`];
    /// the new reading still becomes the baseline so the next call recovers.
    pub fn observe(&mut self, cumulative_ns: u64, at: Instant) -> Result<CpuDelta, SamplerError> {
        let previous = self.last.replace(CpuReading { cumulative_ns, at });

        let Some(previous) = previous else {
            return Ok(CpuDelta {
                delta_ns: cumulative_ns,
                percent: 0.0,
            });
        };

        if cumulative_ns < previous.cumulative_ns {
            return Err(SamplerError::CounterReset {
                previous: previous.cumulative_ns,
                current: cumulative_ns,
            });
        }

        let delta_ns = cumulative_ns - previous.cumulative_ns;
        Ok(CpuDelta {
            delta_ns,
            percent: cpu_rate(delta_ns, at.saturating_duration_since(previous.at)),
        })
    }

    pub fn is_primed(&self) -> bool {
        self.last.is_some()
    }
}

/// CPU time per wall-clock time; 0 when no time has elapsed
pub fn cpu_rate(delta_ns: u64, elapsed: Duration) -> f64 {
    let elapsed_ns = elapsed.as_nanos();
    if elapsed_ns == 0 {
        return 0.0;
    }
    delta_ns as f64 / elapsed_ns as f64
}

/// Raw cumulative usage of a single cgroup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgroupUsage {
    pub memory_bytes: u64,
    pub cpu_ns: u64,
}

/// Reads raw usage counters for one cgroup
#[async_trait]
pub trait CgroupReader: Send + Sync {
    async fn read_usage(&self) -> Result<CgroupUsage, SamplerError>;
}

/// Samples a cgroup through a version-specific reader
pub struct CgroupSampler {
    reader: Box<dyn CgroupReader>,
    cpu: CpuTracker,
}

impl CgroupSampler {
    pub fn new(reader: Box<dyn CgroupReader>) -> Self {
        Self {
            reader,
            cpu: CpuTracker::new(),
        }
    }
}

#[async_trait]
impl ResourceSampler for CgroupSampler {
    fn source(&self) -> SampleSource {
        SampleSource::Cgroup
    }

    async fn sample(&mut self, label: &str) -> Result<MetricSample, SamplerError> {
        let usage = self.reader.read_usage().await?;
        let cpu = self.cpu.observe(usage.cpu_ns, Instant::now())?;

        Ok(MetricSample {
            name: label.to_string(),
            source: SampleSource::Cgroup,
            timestamp: chrono::Utc::now().timestamp(),
            mem_mib: bytes_to_mib(usage.memory_bytes),
            cpu_ns: cpu.delta_ns,
            cpu_percent: cpu.percent,
            disk_mib: None,
        })
    }
}

/// Cgroup version detected on the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    V1,
    V2,
    Unknown,
}

/// Detect which cgroup version is mounted at `cgroup_root`
pub async fn detect_cgroup_version(cgroup_root: &Path) -> CgroupVersion {
    let v2_controllers = cgroup_root.join("cgroup.controllers");
    if fs::metadata(&v2_controllers).await.is_ok() {
        return CgroupVersion::V2;
    }

    let v1_memory = cgroup_root.join("memory");
    let v1_cpuacct = cgroup_root.join("cpuacct");
    if fs::metadata(&v1_memory).await.is_ok() && fs::metadata(&v1_cpuacct).await.is_ok() {
        return CgroupVersion::V1;
    }

    CgroupVersion::Unknown
}

/// Create a cgroup sampler for `cgroup_path`, picking the reader from the
/// detected hierarchy and checking that the cgroup can be read.
pub async fn create_cgroup_sampler(
    cgroup_root: &Path,
    cgroup_path: &str,
) -> Result<CgroupSampler, SamplerError> {
    let reader: Box<dyn CgroupReader> = match detect_cgroup_version(cgroup_root).await {
        CgroupVersion::V2 => {
            tracing::info!(cgroup_path, "Detected cgroup v2, using unified hierarchy reader");
            Box::new(CgroupV2Reader::new(cgroup_root, cgroup_path))
        }
        CgroupVersion::V1 => {
            tracing::info!(cgroup_path, "Detected cgroup v1, using legacy hierarchy reader");
            Box::new(CgroupV1Reader::new(cgroup_root, cgroup_path))
        }
        CgroupVersion::Unknown => {
            tracing::warn!("Could not detect cgroup version, defaulting to v2");
            Box::new(CgroupV2Reader::new(cgroup_root, cgroup_path))
        }
    };

    reader.read_usage().await?;
    Ok(CgroupSampler::new(reader))
}

async fn read_trimmed(path: &Path) -> Result<String, SamplerError> {
    fs::read_to_string(path)
        .await
        .map(|content| content.trim().to_string())
        .map_err(|source| SamplerError::Read {
            path: path.display().to_string(),
            source,
        })
}
