//! Metrics timeline and run summary handed to report sinks

use crate::config::TestKind;
use crate::models::{MetricSample, SampleSource, TrackedPod};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

/// Samples in the order they were taken
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsTimeline {
    samples: Vec<MetricSample>,
}

/// One checkpoint with the sample from each backend, when it succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub cgroup: Option<MetricSample>,
    pub runtime: Option<MetricSample>,
}

impl MetricsTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Checkpoint labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for sample in &self.samples {
            if !labels.contains(&sample.name.as_str()) {
                labels.push(&sample.name);
            }
        }
        labels
    }

    pub fn get(&self, label: &str, source: SampleSource) -> Option<&MetricSample> {
        self.samples
            .iter()
            .find(|s| s.name == label && s.source == source)
    }

    /// Number of samples taken from `source`
    pub fn count(&self, source: SampleSource) -> usize {
        self.samples.iter().filter(|s| s.source == source).count()
    }

    /// Pair the cgroup and runtime samples of each checkpoint
    pub fn rows(&self) -> Vec<ReportRow> {
        self.labels()
            .into_iter()
            .map(|label| ReportRow {
                label: label.to_string(),
                cgroup: self.get(label, SampleSource::Cgroup).cloned(),
                runtime: self.get(label, SampleSource::Runtime).cloned(),
            })
            .collect()
    }
}

/// Where a node-buster run stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationOutcome {
    /// Lowest failing sequence index, a lower bound on the node's capacity
    pub index: usize,
    pub error: String,
}

/// Counts and averages for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub test: TestKind,
    pub runtime: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub attempted: usize,
    pub registered: usize,
    pub failed: usize,
    pub torn_down: usize,
    pub teardown_failures: usize,
    pub avg_creation_ms: Option<f64>,
    pub avg_destruction_ms: Option<f64>,
    pub avg_pod_memory_mib: Option<f64>,
    pub saturation: Option<SaturationOutcome>,
}

fn mean_ms(durations: impl Iterator<Item = Duration>) -> Option<f64> {
    let (count, total) = durations.fold((0u32, Duration::ZERO), |(n, sum), d| (n + 1, sum + d));
    if count == 0 {
        return None;
    }
    Some((total / count).as_secs_f64() * 1000.0)
}

/// Average creation time of the registered pods, in milliseconds
pub fn average_creation_ms(pods: &[TrackedPod]) -> Option<f64> {
    mean_ms(pods.iter().map(|p| p.creation_time))
}

/// Average destruction time of the pods that were torn down, in milliseconds
pub fn average_destruction_ms(pods: &[TrackedPod]) -> Option<f64> {
    mean_ms(pods.iter().filter_map(|p| p.destruction_time))
}

/// Average of the per-pod memory measurements, in MiB
pub fn average_pod_memory_mib(pods: &[TrackedPod]) -> Option<f64> {
    let values: Vec<f64> = pods.iter().filter_map(|p| p.average_memory_mib).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub summary: RunSummary,
    pub timeline: MetricsTimeline,
    pub pods: Vec<TrackedPod>,
}

/// Receives the finished report
pub trait ReportSink {
    fn emit(&mut self, report: &BenchReport) -> Result<()>;
}

/// Writes the report as pretty JSON
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, report: &BenchReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PodDescriptor;

    fn sample(label: &str, source: SampleSource, mem: f64) -> MetricSample {
        MetricSample {
            name: label.to_string(),
            source,
            timestamp: 0,
            mem_mib: mem,
            cpu_ns: 0,
            cpu_percent: 0.0,
            disk_mib: None,
        }
    }

    fn tracked(creation_ms: u64, destruction_ms: Option<u64>) -> TrackedPod {
        let mut pod = TrackedPod::new(
            PodDescriptor {
                name: "pod".to_string(),
                sandbox_id: "s".to_string(),
                containers: Vec::new(),
            },
            Duration::from_millis(creation_ms),
        );
        pod.destruction_time = destruction_ms.map(Duration::from_millis);
        pod
    }

    #[test]
    fn test_rows_pair_by_label_in_order() {
        let mut timeline = MetricsTimeline::new();
        timeline.push(sample("init", SampleSource::Cgroup, 1.0));
        timeline.push(sample("init", SampleSource::Runtime, 2.0));
        timeline.push(sample("post-launch", SampleSource::Runtime, 3.0));
        timeline.push(sample("settled", SampleSource::Cgroup, 4.0));

        let rows = timeline.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "init");
        assert_eq!(rows[0].runtime.as_ref().unwrap().mem_mib, 2.0);
        assert!(rows[1].cgroup.is_none());
        assert_eq!(rows[2].label, "settled");
        assert!(rows[2].runtime.is_none());
        assert_eq!(timeline.count(SampleSource::Cgroup), 2);
    }

    #[test]
    fn test_averages() {
        let pods = vec![tracked(100, Some(30)), tracked(300, None)];

        assert_eq!(average_creation_ms(&pods), Some(200.0));
        assert_eq!(average_destruction_ms(&pods), Some(30.0));
        assert_eq!(average_pod_memory_mib(&pods), None);
        assert_eq!(average_creation_ms(&[]), None);
    }

    #[test]
    fn test_json_sink() {
        let report = BenchReport {
            summary: RunSummary {
                run_id: "r".to_string(),
                test: TestKind::General,
                runtime: "fake".to_string(),
                started_at: Utc::now(),
                elapsed_secs: 1.5,
                attempted: 2,
                registered: 2,
                failed: 0,
                torn_down: 2,
                teardown_failures: 0,
                avg_creation_ms: Some(10.0),
                avg_destruction_ms: None,
                avg_pod_memory_mib: None,
                saturation: None,
            },
            timeline: MetricsTimeline::new(),
            pods: Vec::new(),
        };

        let mut sink = JsonSink::new(Vec::new());
        sink.emit(&report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(value["summary"]["test"], "general");
        assert_eq!(value["summary"]["registered"], 2);
    }
}
