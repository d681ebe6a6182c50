//! cgroup v1 usage reader
//!
//! Reads the legacy per-controller hierarchy:
//! - cpuacct controller for cumulative CPU time
//! - memory controller for resident memory

use super::{read_trimmed, CgroupReader, CgroupUsage};
use crate::error::SamplerError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Reader for a cgroup in the legacy v1 hierarchy
pub struct CgroupV1Reader {
    cpuacct_path: PathBuf,
    memory_path: PathBuf,
}

impl CgroupV1Reader {
    /// Create a reader for `cgroup_path` under each controller of `cgroup_root`
    pub fn new(cgroup_root: &Path, cgroup_path: &str) -> Self {
        let relative = cgroup_path.trim_start_matches('/');
        Self {
            cpuacct_path: cgroup_root.join("cpuacct").join(relative),
            memory_path: cgroup_root.join("memory").join(relative),
        }
    }

    /// Check that both controllers expose this cgroup
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.cpuacct_path).await.is_ok()
            && fs::metadata(&self.memory_path).await.is_ok()
    }

    /// Parse memory.stat file contents
    pub fn parse_memory_stat(content: &str) -> HashMap<String, u64> {
        let mut stats = HashMap::new();

        for line in content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(value) = parts[1].parse::<u64>() {
                    stats.insert(parts[0].to_string(), value);
                }
            }
        }

        stats
    }

    /// Resident memory from memory.stat, preferring the hierarchical total
    pub fn resident_bytes(stats: &HashMap<String, u64>) -> Option<u64> {
        stats
            .get("total_rss")
            .or_else(|| stats.get("rss"))
            .copied()
    }

    async fn read_cpu_usage(&self) -> Result<u64, SamplerError> {
        let usage_file = self.cpuacct_path.join("cpuacct.usage");
        let content = read_trimmed(&usage_file).await?;

        content.parse().map_err(|_| SamplerError::Parse {
            file: usage_file.display().to_string(),
            value: content,
        })
    }

    async fn read_memory_usage(&self) -> Result<u64, SamplerError> {
        let stat_file = self.memory_path.join("memory.stat");
        if let Ok(content) = fs::read_to_string(&stat_file).await {
            if let Some(rss) = Self::resident_bytes(&Self::parse_memory_stat(&content)) {
                return Ok(rss);
            }
        }

        let usage_file = self.memory_path.join("memory.usage_in_bytes");
        let content = read_trimmed(&usage_file).await?;
        content.parse().map_err(|_| SamplerError::Parse {
            file: usage_file.display().to_string(),
            value: content,
        })
    }
}

#[async_trait]
impl CgroupReader for CgroupV1Reader {
    async fn read_usage(&self) -> Result<CgroupUsage, SamplerError> {
        if !self.exists().await {
            return Err(SamplerError::MissingCgroup(
                self.memory_path.display().to_string(),
            ));
        }

        Ok(CgroupUsage {
            memory_bytes: self.read_memory_usage().await?,
            cpu_ns: self.read_cpu_usage().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_stat() {
        let content = r#"cache 104857600
rss 52428800
total_cache 104857600
total_rss 62914560
total_inactive_file 26214400"#;

        let stats = CgroupV1Reader::parse_memory_stat(content);
        assert_eq!(stats.get("cache"), Some(&104857600));
        assert_eq!(stats.get("total_inactive_file"), Some(&26214400));
        assert_eq!(CgroupV1Reader::resident_bytes(&stats), Some(62914560));
    }

    #[test]
    fn test_resident_bytes_falls_back_to_rss() {
        let stats = CgroupV1Reader::parse_memory_stat("cache 1\nrss 2048\n");
        assert_eq!(CgroupV1Reader::resident_bytes(&stats), Some(2048));

        let empty = CgroupV1Reader::parse_memory_stat("");
        assert_eq!(CgroupV1Reader::resident_bytes(&empty), None);
    }

    #[test]
    fn test_controller_paths() {
        let reader = CgroupV1Reader::new(Path::new("/sys/fs/cgroup"), "/system.slice/crio.service");
        assert_eq!(
            reader.cpuacct_path,
            PathBuf::from("/sys/fs/cgroup/cpuacct/system.slice/crio.service")
        );
        assert_eq!(
            reader.memory_path,
            PathBuf::from("/sys/fs/cgroup/memory/system.slice/crio.service")
        );
    }
}
