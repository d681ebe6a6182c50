//! CLI subcommands

pub mod info;
pub mod run;

use anyhow::{Context, Result};
use cospeck_lib::runtime::{CriRuntime, CriRuntimeConfig};
use cospeck_lib::spec::{load_defaults, ContainerDefaults, SandboxDefaults};
use cospeck_lib::BenchConfig;

/// Connect to the configured CRI runtime
pub async fn connect_runtime(config: &BenchConfig) -> Result<CriRuntime> {
    let sandbox_defaults: SandboxDefaults = load_defaults(config.sandbox_config_file.as_deref())?;
    let container_defaults: ContainerDefaults =
        load_defaults(config.container_config_file.as_deref())?;

    let runtime_config = CriRuntimeConfig {
        endpoint: config.runtime_endpoint.clone(),
        call_timeout: config.call_timeout(),
        sandbox_defaults,
        container_defaults,
        ..Default::default()
    };

    CriRuntime::connect(runtime_config)
        .await
        .with_context(|| format!("Could not reach runtime at {}", config.runtime_endpoint))
}
