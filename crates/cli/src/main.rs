//! cospeck CLI
//!
//! Benchmarks a CRI container runtime: creates pods under bounded
//! concurrency, samples cgroup and runtime resource usage at fixed
//! checkpoints, and reports lifecycle timings.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{info, run};
use cospeck_lib::config::TestKind;
use cospeck_lib::BenchConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Container runtime benchmark
#[derive(Parser)]
#[command(name = "cospeck")]
#[command(author, version, about = "Benchmark harness for CRI container runtimes", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.config/cospeck/config.toml)
    #[arg(long, env = "COSPECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// CRI runtime endpoint (e.g., unix:///run/containerd/containerd.sock)
    #[arg(long, short = 'r')]
    pub runtime_endpoint: Option<String>,

    /// Mount point of the cgroup filesystem
    #[arg(long)]
    pub cgroup_root: Option<PathBuf>,

    /// Runtime cgroup relative to the cgroup root
    #[arg(long, short = 'c')]
    pub cgroup_path: Option<String>,

    /// Kubernetes pod manifest used for every pod
    #[arg(long, short = 's')]
    pub pod_config: Option<PathBuf>,

    /// JSON base config for pod sandboxes
    #[arg(long)]
    pub sandbox_config: Option<PathBuf>,

    /// JSON base config for containers
    #[arg(long)]
    pub container_config: Option<PathBuf>,

    /// Maximum concurrent pod workers
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Timeout for each runtime call, in seconds
    #[arg(long)]
    pub call_timeout: Option<u64>,

    /// Report format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Log format
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Write Prometheus metrics to this file when the run finishes
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a fixed number of pods, sample usage, then tear them down
    Test {
        /// Number of pods to create
        #[arg(long, short = 'n')]
        pods: Option<usize>,

        /// Delay before the settled checkpoint, in milliseconds
        #[arg(long)]
        settle_delay_ms: Option<u64>,

        /// Gap between the two runtime stats reads, in milliseconds
        #[arg(long)]
        stats_window_ms: Option<u64>,

        /// Stop pods without removing them
        #[arg(long)]
        keep_sandboxes: bool,

        /// Record each pod's average memory at the settled checkpoint
        #[arg(long)]
        track_pod_memory: bool,
    },

    /// Launch pods until the node fails to start one
    NodeBuster {
        /// Gap between the two runtime stats reads, in milliseconds
        #[arg(long)]
        stats_window_ms: Option<u64>,
    },

    /// Show the runtime version and detected cgroup hierarchy
    Info,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Flags take precedence over file and environment settings
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(endpoint) = &self.runtime_endpoint {
            config.runtime_endpoint = endpoint.clone();
        }
        if let Some(root) = &self.cgroup_root {
            config.cgroup_root = root.clone();
        }
        if let Some(path) = &self.cgroup_path {
            config.cgroup_path = path.clone();
        }
        if let Some(pod_config) = &self.pod_config {
            config.pod_config_file = pod_config.clone();
        }
        if self.sandbox_config.is_some() {
            config.sandbox_config_file = self.sandbox_config.clone();
        }
        if self.container_config.is_some() {
            config.container_config_file = self.container_config.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(timeout) = self.call_timeout {
            config.call_timeout_secs = timeout;
        }

        match &self.command {
            Commands::Test {
                pods,
                settle_delay_ms,
                stats_window_ms,
                keep_sandboxes,
                track_pod_memory,
            } => {
                config.test = TestKind::General;
                if let Some(pods) = pods {
                    config.total_pods = *pods;
                }
                if let Some(delay) = settle_delay_ms {
                    config.settle_delay_ms = *delay;
                }
                if let Some(window) = stats_window_ms {
                    config.stats_window_ms = *window;
                }
                if *keep_sandboxes {
                    config.remove_after_stop = false;
                }
                if *track_pod_memory {
                    config.track_pod_memory = true;
                }
            }
            Commands::NodeBuster { stats_window_ms } => {
                config.test = TestKind::NodeBuster;
                if let Some(window) = stats_window_ms {
                    config.stats_window_ms = *window;
                }
            }
            Commands::Info => {}
        }
    }
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so reports on stdout stay machine-readable
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    let mut config = config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let result = match cli.command {
        Commands::Info => info::show_info(&config).await,
        Commands::Test { .. } | Commands::NodeBuster { .. } => {
            run::run_benchmark(config, cli.format, cli.metrics_out.as_deref()).await
        }
    };

    if let Err(e) = &result {
        output::print_error(&format!("{:#}", e));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "cospeck",
            "--threads",
            "5",
            "--runtime-endpoint",
            "unix:///var/run/crio/crio.sock",
            "test",
            "--pods",
            "20",
            "--keep-sandboxes",
        ]);
        let mut config = BenchConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.threads, 5);
        assert_eq!(config.total_pods, 20);
        assert_eq!(config.runtime_endpoint, "unix:///var/run/crio/crio.sock");
        assert_eq!(config.test, TestKind::General);
        assert!(!config.remove_after_stop);
    }

    #[test]
    fn test_node_buster_selects_test() {
        let cli = Cli::parse_from(["cospeck", "node-buster"]);
        let mut config = BenchConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.test, TestKind::NodeBuster);
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
