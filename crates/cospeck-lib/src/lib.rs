//! Core library for the cospeck container runtime benchmark
//!
//! This crate provides:
//! - Resource sampling from cgroups and from the runtime's stats API
//! - A runtime driver abstraction with a CRI implementation and an in-memory fake
//! - Bounded-concurrency pod lifecycle benchmarks (general and node-buster)
//! - Metrics timelines and run summaries for reporting

pub mod bench;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod proto;
pub mod report;
pub mod runtime;
pub mod sampler;
pub mod spec;

pub use config::BenchConfig;
pub use error::{BenchError, SamplerError};
pub use models::*;
pub use observability::{BenchMetrics, StructuredLogger};
