//! Port and protocol types with parsing.
//!
//! A [`Port`] pairs a transport [`Protocol`] with a port number. The full
//! `u16` range (0-65535) is accepted; the scanner never rejects a number the
//! caller asked for. [`PortSpec`] handles list/range specifications as typed
//! on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport protocol used for a probe.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// Textual name of the protocol ("tcp" or "udp").
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(PortError::UnknownProtocol(other.to_string())),
        }
    }
}

/// A port to probe: protocol plus number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Port {
    pub protocol: Protocol,
    pub number: u16,
}

impl Port {
    #[inline]
    pub const fn new(protocol: Protocol, number: u16) -> Self {
        Self { protocol, number }
    }

    #[inline]
    pub const fn tcp(number: u16) -> Self {
        Self::new(Protocol::Tcp, number)
    }

    #[inline]
    pub const fn udp(number: u16) -> Self {
        Self::new(Protocol::Udp, number)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.number)
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of port numbers over one protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    protocol: Protocol,
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(protocol: Protocol, start: u16, end: u16) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start, end))
        } else {
            Ok(Self {
                protocol,
                start,
                end,
            })
        }
    }

    pub const fn single(port: Port) -> Self {
        Self {
            protocol: port.protocol,
            start: port.number,
            end: port.number,
        }
    }

    const fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        let protocol = self.protocol;
        (self.start..=self.end).map(move |n| Port::new(protocol, n))
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}:{}", self.protocol, self.start)
        } else {
            write!(f, "{}:{}-{}", self.protocol, self.start, self.end)
        }
    }
}

/// A port specification made of one or more ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,udp:53"
/// - Range: "1-1000", "udp:5000-5010"
///
/// Items without a protocol prefix use the default protocol. Order and
/// duplicates are preserved: "80,80" scans port 80 twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Expand into the ordered list of ports, keeping duplicates.
    pub fn to_ports(&self) -> Vec<Port> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Total number of ports, duplicates included.
    pub fn count(&self) -> usize {
        self.ranges.iter().map(PortRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Parse a specification, using `default` for items without a prefix.
    pub fn parse_with_default(s: &str, default: Protocol) -> Result<Self, PortError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (protocol, body) = match part.split_once(':') {
                Some((proto, rest)) => (proto.parse::<Protocol>()?, rest.trim()),
                None => (default, part),
            };

            if let Some((start, end)) = body.split_once('-') {
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                spec.add_range(PortRange::new(protocol, start, end)?);
            } else {
                spec.add_port(Port::new(protocol, parse_number(body)?));
            }
        }

        if spec.is_empty() {
            return Err(PortError::Empty);
        }

        Ok(spec)
    }
}

fn parse_number(s: &str) -> Result<u16, PortError> {
    let s = s.trim();
    s.parse()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_default(s, Protocol::Tcp)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
