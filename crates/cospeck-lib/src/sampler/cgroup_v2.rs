//! cgroup v2 usage reader
//!
//! Reads the unified hierarchy:
//! - cpu.stat for cumulative CPU time
//! - memory.current for current memory usage

use super::{read_trimmed, CgroupReader, CgroupUsage};
use crate::error::SamplerError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Reader for a cgroup in the unified v2 hierarchy
pub struct CgroupV2Reader {
    cgroup_path: PathBuf,
}

impl CgroupV2Reader {
    pub fn new(cgroup_root: &Path, cgroup_path: &str) -> Self {
        Self {
            cgroup_path: cgroup_root.join(cgroup_path.trim_start_matches('/')),
        }
    }

    /// Cumulative CPU time in microseconds from cpu.stat contents
    pub fn parse_cpu_stat(content: &str) -> u64 {
        content
            .lines()
            .filter_map(|line| line.split_once(' '))
            .find(|(key, _)| *key == "usage_usec")
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CgroupReader for CgroupV2Reader {
    async fn read_usage(&self) -> Result<CgroupUsage, SamplerError> {
        if fs::metadata(&self.cgroup_path).await.is_err() {
            return Err(SamplerError::MissingCgroup(
                self.cgroup_path.display().to_string(),
            ));
        }

        let cpu_stat_file = self.cgroup_path.join("cpu.stat");
        let cpu_stat = fs::read_to_string(&cpu_stat_file)
            .await
            .map_err(|source| SamplerError::Read {
                path: cpu_stat_file.display().to_string(),
                source,
            })?;
        let usage_usec = Self::parse_cpu_stat(&cpu_stat);

        let memory_file = self.cgroup_path.join("memory.current");
        let memory = read_trimmed(&memory_file).await?;
        let memory_bytes = memory.parse().map_err(|_| SamplerError::Parse {
            file: memory_file.display().to_string(),
            value: memory,
        })?;

        Ok(CgroupUsage {
            memory_bytes,
            cpu_ns: usage_usec.saturating_mul(1000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_stat() {
        let content = r#"usage_usec 123456789
user_usec 100000000
system_usec 23456789
nr_periods 1000
nr_throttled 50
throttled_usec 5000000"#;

        assert_eq!(CgroupV2Reader::parse_cpu_stat(content), 123456789);
    }

    #[test]
    fn test_parse_cpu_stat_empty() {
        assert_eq!(CgroupV2Reader::parse_cpu_stat(""), 0);
    }

    #[test]
    fn test_path_strips_leading_slash() {
        let reader = CgroupV2Reader::new(Path::new("/sys/fs/cgroup"), "/system.slice/containerd.service");
        assert_eq!(
            reader.cgroup_path,
            PathBuf::from("/sys/fs/cgroup/system.slice/containerd.service")
        );
    }
}
