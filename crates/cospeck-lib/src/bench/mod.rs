//! Benchmark drivers
//!
//! A [`BenchmarkSession`] owns everything one run mutates: the concurrency
//! gate, the pod registry and the run counters. The drivers in
//! [`general`] and [`buster`] move a session through its [`Phase`]s and
//! sample resource usage at each checkpoint.
//!
//! Checkpoint labels record when sampling was initiated. Launch and
//! teardown workers may still be in flight when a checkpoint is sampled.

pub mod buster;
pub mod general;
mod gate;
mod registry;
mod session;

pub use buster::{run_node_buster, SaturationResult};
pub use gate::{ConcurrencyGate, Slot};
pub use general::run_general;
pub use registry::PodRegistry;
pub use session::{build_samplers, BenchmarkSession};

use crate::config::TestKind;
use crate::error::BenchError;
use crate::report::BenchReport;
use crate::sampler::ResourceSampler;
use std::sync::Arc;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Cleaning,
    BaselineSample,
    Launching,
    PostLaunchSample,
    Settling,
    SettledSample,
    TearingDown,
    FinalSample,
    Reporting,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Cleaning => "cleaning",
            Phase::BaselineSample => "baseline-sample",
            Phase::Launching => "launching",
            Phase::PostLaunchSample => "post-launch-sample",
            Phase::Settling => "settling",
            Phase::SettledSample => "settled-sample",
            Phase::TearingDown => "tearing-down",
            Phase::FinalSample => "final-sample",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the test selected in the session's configuration
pub async fn run(
    session: Arc<BenchmarkSession>,
    samplers: Vec<Box<dyn ResourceSampler>>,
) -> Result<BenchReport, BenchError> {
    match session.config().test {
        TestKind::General => run_general(session, samplers).await,
        TestKind::NodeBuster => run_node_buster(session, samplers).await,
    }
}
