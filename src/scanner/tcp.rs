//! TCP connect probe.
//!
//! Uses the operating system's socket API to complete a full handshake.
//! The stream is dropped as soon as it is established; no data is
//! exchanged.

use crate::context::ScanContext;
use crate::scanner::connector::{bounded, resolve};
use crate::scanner::traits::{Connector, ProbeFailure};
use crate::types::Port;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// TCP stream connector. Does not require elevated privileges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
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

/// Try each resolved address in turn, as a dialer would.
async fn attempt(address: &str, number: u16) -> Result<(), ProbeFailure> {
    let mut last = None;
    for addr in resolve(address, number).await? {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                trace!(%addr, "tcp connect succeeded");
                drop(stream);
                return Ok(());
            }
            Err(e) => {
                trace!(%addr, error = %e, "tcp connect failed");
                last = Some(ProbeFailure::from_io(e));
            }
        }
    }
    Err(last.unwrap_or_else(|| ProbeFailure::Unresolved(address.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let number = listener.local_addr().unwrap().port();

        let outcome = TcpConnector
            .connect(
                &ScanContext::new(),
                "127.0.0.1",
                Port::tcp(number),
                Duration::from_secs(2),
            )
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let number = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let outcome = TcpConnector
            .connect(
                &ScanContext::new(),
                "127.0.0.1",
                Port::tcp(number),
                Duration::from_secs(2),
            )
            .await;
        assert!(matches!(outcome, Err(ProbeFailure::Refused)));
    }
}
