//! Runtime information

use anyhow::Result;
use colored::Colorize;
use cospeck_lib::runtime::RuntimeDriver;
use cospeck_lib::sampler::detect_cgroup_version;
use cospeck_lib::BenchConfig;

use super::connect_runtime;
use crate::output::{print_success, print_warning};

/// Show the runtime's name and version and the detected cgroup hierarchy
pub async fn show_info(config: &BenchConfig) -> Result<()> {
    let runtime = connect_runtime(config).await?;
    let version = runtime.info().await?;

    print_success(&format!("Connected to {}", runtime.endpoint()));
    println!("Runtime:   {}", version.cyan());

    let cgroups = detect_cgroup_version(&config.cgroup_root).await;
    println!("Cgroups:   {:?} at {}", cgroups, config.cgroup_root.display());

    let runtime_cgroup = config.cgroup_root.join(&config.cgroup_path);
    if tokio::fs::metadata(&runtime_cgroup).await.is_err() {
        print_warning(&format!(
            "Runtime cgroup {} not found; benchmarks will fail to sample it",
            config.cgroup_path
        ));
    }

    Ok(())
}
