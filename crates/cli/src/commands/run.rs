//! Benchmark runs

use anyhow::{Context, Result};
use cospeck_lib::bench::{self, build_samplers, BenchmarkSession};
use cospeck_lib::runtime::RuntimeDriver;
use cospeck_lib::spec::load_pod_manifest;
use cospeck_lib::{BenchConfig, BenchMetrics};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::connect_runtime;
use crate::output::{emit_report, print_info, print_success, OutputFormat};

/// Run the configured benchmark and print its report
pub async fn run_benchmark(
    config: BenchConfig,
    format: OutputFormat,
    metrics_out: Option<&Path>,
) -> Result<()> {
    config.validate()?;

    // Setup failures abort before any pod is launched
    let template = load_pod_manifest(&config.pod_config_file)?;
    let runtime: Arc<dyn RuntimeDriver> = Arc::new(connect_runtime(&config).await?);
    let samplers = build_samplers(&config, Arc::clone(&runtime)).await?;

    info!(
        pod = %template.name,
        containers = template.containers.len(),
        threads = config.threads,
        "Benchmark configured"
    );
    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Running {:?} test with pod {} on {} threads",
            config.test, template.name, config.threads
        ));
    }

    let session = BenchmarkSession::new(config, runtime)?;
    let report = bench::run(session, samplers).await?;

    emit_report(&report, format)?;

    if let Some(path) = metrics_out {
        let text = BenchMetrics::new().gather_text()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        if matches!(format, OutputFormat::Table) {
            print_success(&format!("Metrics written to {}", path.display()));
        }
    }

    Ok(())
}
