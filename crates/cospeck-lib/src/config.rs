//! Benchmark configuration

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which benchmark to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    #[default]
    General,
    NodeBuster,
}

/// Configuration for a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// CRI socket (bare path or unix:// URL)
    #[serde(default = "default_runtime_endpoint")]
    pub runtime_endpoint: String,

    /// Mount point of the cgroup filesystem
    #[serde(default = "default_cgroup_root")]
    pub cgroup_root: PathBuf,

    /// Cgroup of the runtime, relative to the cgroup root
    #[serde(default = "default_cgroup_path")]
    pub cgroup_path: String,

    /// Kubernetes pod manifest used for every pod
    #[serde(default = "default_pod_config_file")]
    pub pod_config_file: PathBuf,

    /// Optional JSON base config for pod sandboxes
    #[serde(default)]
    pub sandbox_config_file: Option<PathBuf>,

    /// Optional JSON base config for containers
    #[serde(default)]
    pub container_config_file: Option<PathBuf>,

    #[serde(default)]
    pub test: TestKind,

    /// Pods to create in the general test
    #[serde(default = "default_total_pods")]
    pub total_pods: usize,

    /// Concurrency limit for pod workers
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Pause between the post-launch and settled checkpoints
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Timeout applied to every runtime call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Gap between the two stats reads of a runtime sample
    #[serde(default = "default_stats_window_ms")]
    pub stats_window_ms: u64,

    /// Remove sandboxes after stopping them during teardown
    #[serde(default = "default_true")]
    pub remove_after_stop: bool,

    /// Query per-pod memory at the settled checkpoint
    #[serde(default)]
    pub track_pod_memory: bool,
}

fn default_runtime_endpoint() -> String {
    "unix:///run/containerd/containerd.sock".to_string()
}

fn default_cgroup_root() -> PathBuf {
    PathBuf::from("/sys/fs/cgroup")
}

fn default_cgroup_path() -> String {
    "system.slice/containerd.service".to_string()
}

fn default_pod_config_file() -> PathBuf {
    PathBuf::from("config/pod.yaml")
}

fn default_total_pods() -> usize {
    10
}

fn default_threads() -> usize {
    1
}

fn default_settle_delay_ms() -> u64 {
    10_000
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_stats_window_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            runtime_endpoint: default_runtime_endpoint(),
            cgroup_root: default_cgroup_root(),
            cgroup_path: default_cgroup_path(),
            pod_config_file: default_pod_config_file(),
            sandbox_config_file: None,
            container_config_file: None,
            test: TestKind::default(),
            total_pods: default_total_pods(),
            threads: default_threads(),
            settle_delay_ms: default_settle_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            stats_window_ms: default_stats_window_ms(),
            remove_after_stop: true,
            track_pod_memory: false,
        }
    }
}

impl BenchConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn stats_window(&self) -> Duration {
        Duration::from_millis(self.stats_window_ms)
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.threads == 0 {
            return Err(BenchError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.test == TestKind::General && self.total_pods == 0 {
            return Err(BenchError::InvalidConfig(
                "total pods must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(BenchError::InvalidConfig(
                "call timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.settle_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = BenchConfig {
            threads: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BenchError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_pods_only_rejected_for_general() {
        let mut config = BenchConfig {
            total_pods: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.test = TestKind::NodeBuster;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BenchConfig =
            serde_json::from_str(r#"{"threads": 5, "test": "node-buster"}"#).unwrap();
        assert_eq!(config.threads, 5);
        assert_eq!(config.test, TestKind::NodeBuster);
        assert_eq!(config.total_pods, 10);
        assert!(config.remove_after_stop);
    }
}
