//! Typed errors for the benchmark core

use thiserror::Error;

/// Errors raised while sampling resource usage
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("cumulative CPU counter went backwards ({previous} -> {current})")]
    CounterReset { previous: u64, current: u64 },

    #[error("cgroup path not found: {0}")]
    MissingCgroup(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {file}: {value:?}")]
    Parse { file: String, value: String },

    #[error("runtime stats query failed: {0}")]
    Runtime(#[source] anyhow::Error),
}

/// Errors raised by the benchmark core
///
/// `InvalidConfig` and `Setup` abort a run before any worker is launched.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("setup failed: {0}")]
    Setup(#[source] anyhow::Error),

    #[error("concurrency gate closed")]
    GateClosed,

    #[error("pod {0} has no sandbox ID")]
    MissingSandboxId(String),
}
