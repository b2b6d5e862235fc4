//! Command-line interface definitions for portprobe.
//!
//! Uses `clap` derive macros for declarative argument parsing.

use crate::config::AppSettings;
use crate::context::ScanContext;
use crate::output::{self, ScanSummary};
use crate::scanner::Scanner;
use crate::types::{PortSpec, Protocol};
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Probe TCP and UDP ports on a host.
#[derive(Parser, Debug)]
#[command(name = "portprobe")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent TCP/UDP port prober", long_about = None)]
pub struct Args {
    /// Target IP address or hostname to probe
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to probe (e.g. "80", "80,443", "1-1000", "tcp:22,udp:53,udp:5000-5010")
    #[arg(short, long, default_value = "1-1000")]
    pub ports: String,

    /// Protocol for ports given without a "tcp:" or "udp:" prefix
    #[arg(short = 'P', long, value_enum, default_value = "tcp")]
    pub protocol: Protocol,

    /// Per-probe timeout in milliseconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Maximum number of probes in flight (0 for unbounded)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Abort the whole scan after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Show closed ports in output
    #[arg(long)]
    pub show_closed: bool,

    /// Report timed-out probes as unknown instead of closed
    #[arg(long)]
    pub unknown: bool,

    /// Verbose output (debug logging and a progress spinner)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH", env = "PORTPROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl Args {
    /// Load settings, applying `--config` when given.
    pub fn settings(&self) -> anyhow::Result<AppSettings> {
        match &self.config {
            Some(path) => AppSettings::load_from(path)
                .with_context(|| format!("loading settings from {}", path.display())),
            None => Ok(AppSettings::load().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable settings");
                AppSettings::default()
            })),
        }
    }

    /// Merge flags over settings.
    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(timeout) = self.timeout {
            settings.default_timeout_ms = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            settings.default_concurrency = concurrency;
        }
        if let Some(format) = self.output {
            settings.default_output_format = format;
        }
        settings.show_closed |= self.show_closed;
        settings.report_unknown |= self.unknown;
        settings
    }

    /// Run the scan described by these arguments and print the results.
    pub async fn execute(self) -> anyhow::Result<()> {
        let settings = self.apply(self.settings()?);
        let ports = PortSpec::parse_with_default(&self.ports, self.protocol)
            .context("invalid port specification")?
            .to_ports();
        if settings.default_timeout_ms == 0 {
            bail!("timeout must be greater than zero");
        }

        let config = settings.scanner_config();
        debug!(?config, "scanner configured");
        let scanner = Scanner::with_config(config);

        let ctx = match self.deadline {
            Some(ms) => ScanContext::with_timeout(Duration::from_millis(ms)),
            None => ScanContext::new(),
        };
        let interrupt = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let plain = settings.default_output_format == OutputFormat::Plain;
        if plain && !self.quiet {
            output::print_scan_header(&self.target, ports.len());
        }

        let spinner = (self.verbose && plain).then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(format!("probing {} ports...", ports.len()));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        let start = Instant::now();
        let report = scanner.scan_partial(&ctx, &self.target, &ports).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let summary = ScanSummary::new(
            &self.target,
            report.results,
            start.elapsed(),
            settings.show_closed,
        );
        output::print_results(&summary, settings.default_output_format)?;

        if let Some(err) = report.cancelled {
            bail!("{err}; results above are partial");
        }
        Ok(())
    }
}
