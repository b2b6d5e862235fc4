//! Output formatting.
//!
//! Renders scan results as plain text or JSON. The scanner itself only
//! produces structured results; everything here is presentation.

use crate::cli::OutputFormat;
use crate::scanner::{PortStatus, ScanResult};
use console::{style, Style};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Scan results prepared for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub target: String,
    pub ports_scanned: usize,
    pub open_ports: usize,
    pub closed_ports: usize,
    pub unknown_ports: usize,
    pub aborted_ports: usize,
    pub duration_ms: u64,
    pub results: Vec<ScanResult>,
}

impl ScanSummary {
    /// Count statuses and sort results by port. Closed ports are dropped
    /// from `results` unless `show_closed` is set; counts always cover all.
    pub fn new(
        target: &str,
        mut results: Vec<ScanResult>,
        duration: Duration,
        show_closed: bool,
    ) -> Self {
        let count = |status: PortStatus| results.iter().filter(|r| r.status == status).count();
        let open_ports = count(PortStatus::Open);
        let closed_ports = count(PortStatus::Closed);
        let unknown_ports = count(PortStatus::Unknown);
        let aborted_ports = count(PortStatus::Aborted);
        let ports_scanned = results.len();

        if !show_closed {
            results.retain(|r| r.status != PortStatus::Closed);
        }
        results.sort_by_key(|r| (r.port.number, r.port.protocol));

        Self {
            target: target.to_string(),
            ports_scanned,
            open_ports,
            closed_ports,
            unknown_ports,
            aborted_ports,
            duration_ms: duration.as_millis() as u64,
            results,
        }
    }
}

/// Format and print scan results according to the specified format.
pub fn print_results(summary: &ScanSummary, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Plain => write_plain(&mut out, summary),
        OutputFormat::Json => write_json(&mut out, summary),
    }
}

fn write_plain(out: &mut impl Write, summary: &ScanSummary) -> io::Result<()> {
    for result in &summary.results {
        let status_style = match result.status {
            PortStatus::Open => Style::new().green().bold(),
            PortStatus::Closed => Style::new().red(),
            PortStatus::Unknown => Style::new().yellow(),
            PortStatus::Aborted => Style::new().dim(),
        };
        writeln!(
            out,
            "  {:<12} {}",
            result.port.to_string(),
            status_style.apply_to(result.status)
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "  {} {} ports probed in {:.2}s: {} open, {} closed, {} unknown",
        style("Summary:").bold(),
        summary.ports_scanned,
        summary.duration_ms as f64 / 1000.0,
        style(summary.open_ports).green().bold(),
        style(summary.closed_ports).red(),
        style(summary.unknown_ports).yellow()
    )?;
    if summary.aborted_ports > 0 {
        writeln!(
            out,
            "  {} {} probes aborted",
            style("Warning:").yellow().bold(),
            summary.aborted_ports
        )?;
    }
    Ok(())
}

fn write_json(out: &mut impl Write, summary: &ScanSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary).map_err(io::Error::other)?;
    writeln!(out)
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, ports: usize) {
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portprobe").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Target: {}",
        style("•").dim(),
        style(target).white().bold()
    );
    println!(
        "{} Probing {} ports...",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}
