//! Runtime driver abstraction
//!
//! The benchmark core only talks to a container runtime through
//! [`RuntimeDriver`]. [`CriRuntime`] drives a real runtime over the CRI gRPC
//! socket; [`FakeRuntime`] is an in-memory stand-in with scripted latencies
//! and failures.

mod cri;
pub mod fake;

pub use cri::{CriRuntime, CriRuntimeConfig};
pub use fake::FakeRuntime;

use crate::models::{ContainerDescriptor, ContainerUsage, PodDescriptor, StatsFilter};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Pod and container lifecycle operations the benchmark needs
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    /// Stop and remove the pod sandboxes left in the benchmark namespace
    /// by earlier runs
    async fn clean(&self) -> Result<()>;

    /// Create a pod sandbox and its containers from a pod manifest.
    /// `unique_id` disambiguates the pod name between iterations.
    async fn create_pod_from_spec(&self, spec_file: &Path, unique_id: &str)
        -> Result<PodDescriptor>;

    /// Start a created container
    async fn run(&self, container: &ContainerDescriptor) -> Result<Duration>;

    /// Stop a pod sandbox and all of its containers
    async fn stop_pod(&self, pod: &PodDescriptor) -> Result<Duration>;

    /// Remove a stopped pod sandbox
    async fn remove_pod(&self, pod: &PodDescriptor) -> Result<Duration>;

    /// Per-container usage for the containers matching `filter`
    async fn stats(&self, filter: &StatsFilter) -> Result<Vec<ContainerUsage>>;

    /// Human-readable description of the runtime
    async fn info(&self) -> Result<String>;
}
