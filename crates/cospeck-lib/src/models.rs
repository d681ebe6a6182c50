//! Core data models for the benchmark

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const BYTES_IN_MIB: u64 = 1024 * 1024;

/// Convert a byte count to MiB
pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_IN_MIB as f64
}

/// A container as known to the runtime driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    /// Overrides the image entrypoint when non-empty
    pub command: Vec<String>,
    pub trace: bool,
    /// Assigned by the runtime on creation
    pub container_id: String,
}

/// A started pod sandbox and its containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodDescriptor {
    pub name: String,
    pub sandbox_id: String,
    pub containers: Vec<ContainerDescriptor>,
}

/// A pod created during a benchmark run, with its lifecycle timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPod {
    pub pod: PodDescriptor,
    pub creation_time: Duration,
    pub destruction_time: Option<Duration>,
    /// Average working set per container in MiB, when per-pod tracking is on
    pub average_memory_mib: Option<f64>,
}

impl TrackedPod {
    pub fn new(pod: PodDescriptor, creation_time: Duration) -> Self {
        Self {
            pod,
            creation_time,
            destruction_time: None,
            average_memory_mib: None,
        }
    }
}

/// Where a metric sample was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    Cgroup,
    Runtime,
}

impl std::fmt::Display for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleSource::Cgroup => write!(f, "cgroup"),
            SampleSource::Runtime => write!(f, "runtime"),
        }
    }
}

/// Resource usage at a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Checkpoint label
    pub name: String,
    pub source: SampleSource,
    pub timestamp: i64,
    pub mem_mib: f64,
    /// CPU time consumed since the previous reading, in nanoseconds
    pub cpu_ns: u64,
    /// CPU time per wall-clock time over the same interval (1.0 = one core)
    pub cpu_percent: f64,
    pub disk_mib: Option<f64>,
}

/// Per-container usage as reported by the runtime's stats API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub container_id: String,
    pub name: String,
    /// Cumulative CPU time in nanoseconds
    pub cpu_core_ns: u64,
    pub working_set_bytes: u64,
    pub writable_layer_bytes: u64,
}

/// Selects which containers a stats query covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatsFilter {
    #[default]
    All,
    Container(String),
    Pod(String),
}

/// Checkpoint labels used by the drivers
pub mod checkpoints {
    pub const INIT: &str = "init";
    pub const POST_LAUNCH: &str = "post-launch";
    pub const SETTLED: &str = "settled";
    pub const SATURATED: &str = "saturated";
    pub const FINAL: &str = "final";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_mib() {
        assert_eq!(bytes_to_mib(0), 0.0);
        assert_eq!(bytes_to_mib(104857600), 100.0);
        assert_eq!(bytes_to_mib(BYTES_IN_MIB / 2), 0.5);
    }
}
