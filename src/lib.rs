//! # portprobe - concurrent TCP/UDP reachability prober
//!
//! Probes a list of ports on one host, one bounded connection attempt per
//! port, all running at once, and reports whether each could be connected.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use portprobe::{Port, ScanContext, Scanner};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), portprobe::ScanError> {
//! let scanner = Scanner::new(Duration::from_millis(200));
//! let ports = [Port::tcp(80), Port::tcp(5444), Port::udp(5444)];
//!
//! for result in scanner.scan(&ScanContext::new(), "127.0.0.1", &ports).await? {
//!     println!("{} {}", result.port, result.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - ports and protocols
//! - [`context`] - the cancellable scope a scan runs under
//! - [`scanner`] - connectors and the concurrent orchestrator
//! - [`config`] - settings file handling
//! - [`cli`], [`output`], [`logging`] - the command-line front end

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use context::ScanContext;
pub use error::ScanError;
pub use scanner::{PortStatus, ScanReport, ScanResult, Scanner, ScannerConfig};
pub use types::{Port, PortSpec, Protocol};
