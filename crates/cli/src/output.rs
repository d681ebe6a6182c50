//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use cospeck_lib::report::{BenchReport, JsonSink, ReportRow, ReportSink};
use cospeck_lib::MetricSample;
use tabled::{settings::Style, Table, Tabled};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_mib(mib: f64) -> String {
    if mib >= 1024.0 {
        format!("{:.2}Gi", mib / 1024.0)
    } else {
        format!("{:.2}Mi", mib)
    }
}

/// Format a CPU delta in nanoseconds as milliseconds
pub fn format_cpu_ns(ns: u64) -> String {
    format!("{:.1}ms", ns as f64 / 1_000_000.0)
}

/// Format a CPU rate (1.0 = one core) as a percentage
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub fn format_ms(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms >= 1000.0 => format!("{:.2}s", ms / 1000.0),
        Some(ms) => format!("{:.1}ms", ms),
        None => "-".to_string(),
    }
}

/// Row for the checkpoint table
#[derive(Tabled)]
struct CheckpointRow {
    #[tabled(rename = "Checkpoint")]
    label: String,
    #[tabled(rename = "Mem")]
    mem: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU %")]
    cpu_percent: String,
    #[tabled(rename = "Runtime Mem")]
    runtime_mem: String,
    #[tabled(rename = "Runtime CPU")]
    runtime_cpu: String,
    #[tabled(rename = "Runtime CPU %")]
    runtime_cpu_percent: String,
    #[tabled(rename = "Disk")]
    disk: String,
}

fn field(sample: Option<&MetricSample>, render: impl Fn(&MetricSample) -> String) -> String {
    sample.map(render).unwrap_or_else(|| "-".to_string())
}

impl From<&ReportRow> for CheckpointRow {
    fn from(row: &ReportRow) -> Self {
        let cgroup = row.cgroup.as_ref();
        let runtime = row.runtime.as_ref();
        Self {
            label: row.label.clone(),
            mem: field(cgroup, |s| format_mib(s.mem_mib)),
            cpu: field(cgroup, |s| format_cpu_ns(s.cpu_ns)),
            cpu_percent: field(cgroup, |s| format_percent(s.cpu_percent)),
            runtime_mem: field(runtime, |s| format_mib(s.mem_mib)),
            runtime_cpu: field(runtime, |s| format_cpu_ns(s.cpu_ns)),
            runtime_cpu_percent: field(runtime, |s| format_percent(s.cpu_percent)),
            disk: field(runtime, |s| s.disk_mib.map(format_mib).unwrap_or_else(|| "-".to_string())),
        }
    }
}

/// Renders reports as colored tables on stdout
pub struct TableSink;

impl ReportSink for TableSink {
    fn emit(&mut self, report: &BenchReport) -> anyhow::Result<()> {
        let summary = &report.summary;

        println!();
        println!("{}", "Benchmark Report".bold());
        println!("{}", "=".repeat(60));
        println!("Run:       {}", summary.run_id.cyan());
        println!("Runtime:   {}", summary.runtime.cyan());
        println!(
            "Started:   {}",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("Elapsed:   {:.1}s", summary.elapsed_secs);
        println!();

        let rows: Vec<CheckpointRow> = report.timeline.rows().iter().map(Into::into).collect();
        if rows.is_empty() {
            print_warning("No checkpoint samples were taken");
        } else {
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        println!();

        println!(
            "Pods:      {} registered / {} attempted",
            summary.registered.to_string().green(),
            summary.attempted
        );
        if summary.failed > 0 {
            println!("Failed:    {}", summary.failed.to_string().red());
        }
        println!("Creation:  {} avg", format_ms(summary.avg_creation_ms));
        println!("Teardown:  {} avg", format_ms(summary.avg_destruction_ms));
        if let Some(mem) = summary.avg_pod_memory_mib {
            println!("Pod mem:   {} avg", format_mib(mem));
        }
        if summary.teardown_failures > 0 {
            print_warning(&format!(
                "{} pods could not be torn down cleanly",
                summary.teardown_failures
            ));
        }

        if let Some(saturation) = &summary.saturation {
            println!();
            print_warning(&format!(
                "Node sustained {} pods of this shape before failure",
                saturation.index
            ));
            println!("  {}", saturation.error.dimmed());
        }

        Ok(())
    }
}

/// Emit a report in the requested format
pub fn emit_report(report: &BenchReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => TableSink.emit(report),
        OutputFormat::Json => JsonSink::new(std::io::stdout().lock()).emit(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cospeck_lib::SampleSource;

    fn sample(source: SampleSource) -> MetricSample {
        MetricSample {
            name: "settled".to_string(),
            source,
            timestamp: 0,
            mem_mib: 512.0,
            cpu_ns: 25_000_000,
            cpu_percent: 0.125,
            disk_mib: Some(2048.0),
        }
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_mib(512.0), "512.00Mi");
        assert_eq!(format_mib(2048.0), "2.00Gi");
        assert_eq!(format_cpu_ns(25_000_000), "25.0ms");
        assert_eq!(format_percent(0.125), "12.50%");
        assert_eq!(format_ms(Some(52.34)), "52.3ms");
        assert_eq!(format_ms(Some(1500.0)), "1.50s");
        assert_eq!(format_ms(None), "-");
    }

    #[test]
    fn test_checkpoint_row_with_missing_backend() {
        let row = ReportRow {
            label: "settled".to_string(),
            cgroup: None,
            runtime: Some(sample(SampleSource::Runtime)),
        };

        let rendered = CheckpointRow::from(&row);
        assert_eq!(rendered.mem, "-");
        assert_eq!(rendered.runtime_mem, "512.00Mi");
        assert_eq!(rendered.disk, "2.00Gi");
    }
}
