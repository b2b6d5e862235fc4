//! Default network connector.
//!
//! Dispatches to the TCP or UDP connector by protocol and provides the
//! shared plumbing both use: address resolution and the per-attempt
//! sub-deadline.

use crate::context::ScanContext;
use crate::scanner::tcp::TcpConnector;
use crate::scanner::traits::{Connector, PortStatus, ProbeFailure, StatusMapping};
use crate::scanner::udp::UdpConnector;
use crate::types::{Port, Protocol};
use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::lookup_host;

/// Connector backed by the host's TCP and UDP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetConnector;

#[async_trait]
impl Connector for NetConnector {
    async fn connect(
        &self,
        ctx: &ScanContext,
        address: &str,
        port: Port,
        timeout: Duration,
    ) -> Result<(), ProbeFailure> {
        match port.protocol {
            Protocol::Tcp => TcpConnector.connect(ctx, address, port, timeout).await,
            Protocol::Udp => UdpConnector.connect(ctx, address, port, timeout).await,
        }
    }
}

/// Probe one endpoint and report its status.
///
/// Every failure collapses to [`PortStatus::Closed`]; use [`Connector`]
/// directly to see the reason.
pub async fn probe(ctx: &ScanContext, address: &str, port: Port, timeout: Duration) -> PortStatus {
    let outcome = NetConnector.connect(ctx, address, port, timeout).await;
    StatusMapping::default().status(&outcome)
}

/// Run `attempt` under a sub-deadline of `timeout` derived from `ctx`.
///
/// Reports [`ProbeFailure::Aborted`] when `ctx` itself ended and
/// [`ProbeFailure::TimedOut`] when only the sub-deadline passed. Custom
/// [`Connector`] implementations should wrap their attempt in this.
///
/// The sub-context is dropped, and so released, before this returns.
pub async fn bounded<F>(
    ctx: &ScanContext,
    timeout: Duration,
    attempt: F,
) -> Result<(), ProbeFailure>
where
    F: Future<Output = Result<(), ProbeFailure>>,
{
    let sub = ctx.child_with_timeout(timeout);
    match sub.run(attempt).await {
        Ok(outcome) => outcome,
        Err(_) if ctx.err().is_some() => Err(ProbeFailure::Aborted),
        Err(_) => Err(ProbeFailure::TimedOut),
    }
}

/// Resolve `address` (hostname or IP literal) for `number`.
pub(crate) async fn resolve(address: &str, number: u16) -> Result<Vec<SocketAddr>, ProbeFailure> {
    let addrs: Vec<SocketAddr> = lookup_host((address, number))
        .await
        .map_err(|e| ProbeFailure::Unresolved(format!("{address}: {e}")))?
        .collect();

    if addrs.is_empty() {
        Err(ProbeFailure::Unresolved(address.to_string()))
    } else {
        Ok(addrs)
    }
}
