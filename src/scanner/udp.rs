//! UDP connect probe.
//!
//! UDP is connectionless, so the probe binds an ephemeral local socket and
//! connects it to the destination. This succeeds unless the destination is
//! definitively unreachable or cannot be resolved; a success does not prove
//! that anything is listening.

use crate::context::ScanContext;
use crate::scanner::connector::{bounded, resolve};
use crate::scanner::traits::{Connector, ProbeFailure};
use crate::types::Port;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::trace;

/// UDP datagram connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

#[async_trait]
impl Connector for UdpConnector {
    async fn connect(
        &self,
        ctx: &ScanContext,
        address: &str,
        port: Port,
        timeout: Duration,
    ) -> Result<(), ProbeFailure> {
        bounded(ctx, timeout, attempt(address, port.number)).await
    }
}

async fn attempt(address: &str, number: u16) -> Result<(), ProbeFailure> {
    let mut last = None;
    for addr in resolve(address, number).await? {
        match connect_udp(addr).await {
            Ok(()) => {
                trace!(%addr, "udp connect succeeded");
                return Ok(());
            }
            Err(e) => {
                trace!(%addr, error = %e, "udp connect failed");
                last = Some(ProbeFailure::from_io(e));
            }
        }
    }
    Err(last.unwrap_or_else(|| ProbeFailure::Unresolved(address.to_string())))
}

async fn connect_udp(addr: SocketAddr) -> std::io::Result<()> {
    let local = match addr.ip() {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await
}
