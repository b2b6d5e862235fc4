//! Core value types describing what to probe.

mod port;

pub use port::{Port, PortError, PortRange, PortSpec, Protocol};
