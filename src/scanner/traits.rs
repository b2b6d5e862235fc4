//! Connector trait abstraction and result types.
//!
//! A [`Connector`] performs one bounded connection attempt and reports a
//! structured [`ProbeFailure`] when it does not succeed. The orchestrator
//! turns that outcome into a [`PortStatus`].

use crate::context::ScanContext;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Status of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    /// A connection was established.
    Open,
    /// The attempt failed.
    Closed,
    /// Reachability could not be determined.
    Unknown,
    /// The probe stopped because the scan was cancelled.
    Aborted,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Unknown => write!(f, "unknown"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Outcome for a single requested port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanResult {
    pub port: Port,
    pub status: PortStatus,
}

impl ScanResult {
    pub fn new(port: Port, status: PortStatus) -> Self {
        Self { port, status }
    }

    pub fn is_open(&self) -> bool {
        self.status == PortStatus::Open
    }
}

/// Why a connection attempt did not succeed.
#[derive(Error, Debug)]
pub enum ProbeFailure {
    #[error("connection refused")]
    Refused,

    #[error("connection timed out")]
    TimedOut,

    #[error("destination unreachable: {0}")]
    Unreachable(io::Error),

    #[error("address could not be resolved: {0}")]
    Unresolved(String),

    #[error("probe aborted by cancellation")]
    Aborted,

    #[error("connection failed: {0}")]
    Other(io::Error),
}

impl ProbeFailure {
    /// Classify an I/O error from a connect attempt.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => Self::Unreachable(err),
            _ => {
                let msg = err.to_string().to_lowercase();
                if msg.contains("refused") {
                    Self::Refused
                } else if msg.contains("unreachable") {
                    Self::Unreachable(err)
                } else {
                    Self::Other(err)
                }
            }
        }
    }
}

/// Maps connector outcomes to port statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusMapping {
    /// Report timed-out attempts as [`PortStatus::Unknown`] instead of closed.
    pub ambiguous_as_unknown: bool,
}

impl StatusMapping {
    pub fn status(&self, outcome: &Result<(), ProbeFailure>) -> PortStatus {
        match outcome {
            Ok(()) => PortStatus::Open,
            Err(ProbeFailure::Aborted) => PortStatus::Aborted,
            Err(ProbeFailure::TimedOut) if self.ambiguous_as_unknown => PortStatus::Unknown,
            Err(_) => PortStatus::Closed,
        }
    }
}

/// A single-endpoint connection prober.
///
/// Implementations must bound the attempt by `timeout`, stop early when
/// `ctx` ends, and release any transport resource before returning.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        ctx: &ScanContext,
        address: &str,
        port: Port,
        timeout: Duration,
    ) -> Result<(), ProbeFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_status_display() {
        assert_eq!(PortStatus::Open.to_string(), "open");
        assert_eq!(PortStatus::Closed.to_string(), "closed");
        assert_eq!(PortStatus::Unknown.to_string(), "unknown");
        assert_eq!(PortStatus::Aborted.to_string(), "aborted");
    }

    #[test]
    fn test_failure_classification() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(matches!(ProbeFailure::from_io(refused), ProbeFailure::Refused));

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert!(matches!(ProbeFailure::from_io(timed_out), ProbeFailure::TimedOut));

        let other = io::Error::new(io::ErrorKind::Other, "Network is unreachable");
        assert!(matches!(
            ProbeFailure::from_io(other),
            ProbeFailure::Unreachable(_)
        ));
    }

    #[test]
    fn test_default_mapping_collapses_failures() {
        let mapping = StatusMapping::default();
        assert_eq!(mapping.status(&Ok(())), PortStatus::Open);
        assert_eq!(mapping.status(&Err(ProbeFailure::Refused)), PortStatus::Closed);
        assert_eq!(mapping.status(&Err(ProbeFailure::TimedOut)), PortStatus::Closed);
        assert_eq!(
            mapping.status(&Err(ProbeFailure::Unresolved("nope".into()))),
            PortStatus::Closed
        );
        assert_eq!(mapping.status(&Err(ProbeFailure::Aborted)), PortStatus::Aborted);
    }

    #[test]
    fn test_unknown_mapping() {
        let mapping = StatusMapping {
            ambiguous_as_unknown: true,
        };
        assert_eq!(mapping.status(&Err(ProbeFailure::TimedOut)), PortStatus::Unknown);
        assert_eq!(mapping.status(&Err(ProbeFailure::Refused)), PortStatus::Closed);
    }

    #[test]
    fn test_scan_result() {
        let result = ScanResult::new(Port::tcp(80), PortStatus::Open);
        assert!(result.is_open());
        assert!(!ScanResult::new(Port::udp(53), PortStatus::Unknown).is_open());
    }
}
