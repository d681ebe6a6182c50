//! Configuration management for the CLI
//!
//! Settings are layered: config file, then `COSPECK_*` environment
//! variables, then command-line flags (applied by the caller).

use anyhow::{Context, Result};
use cospeck_lib::BenchConfig;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "COSPECK";

/// Default config file location (`~/.config/cospeck/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("cospeck").join("config.toml"))
}

/// Load the benchmark configuration from file and environment.
///
/// An explicitly given file must exist; the default file is optional.
pub fn load(explicit: Option<&Path>) -> Result<BenchConfig> {
    let mut builder = config::Config::builder();

    match explicit {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to load configuration")?;

    settings
        .try_deserialize()
        .context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cospeck_lib::config::TestKind;

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
runtime_endpoint = "unix:///var/run/crio/crio.sock"
cgroup_path = "system.slice/crio.service"
threads = 8
test = "node-buster"
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.runtime_endpoint, "unix:///var/run/crio/crio.sock");
        assert_eq!(config.cgroup_path, "system.slice/crio.service");
        assert_eq!(config.threads, 8);
        assert_eq!(config.test, TestKind::NodeBuster);
        assert_eq!(config.total_pods, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_default_path_under_config_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".config/cospeck/config.toml"));
        }
    }
}
