//! Scanner module - coordinates concurrent probes.
//!
//! [`Scanner::scan`] spawns one tokio task per requested port. Each task
//! runs a [`Connector`] attempt and posts exactly one [`ScanResult`] into a
//! channel sized to the port count, so no task ever waits on the collector.
//! Dropping a task's sender is its completion signal; the collector stops
//! once every sender is gone.

pub mod connector;
pub mod tcp;
pub mod traits;
pub mod udp;

use crate::context::ScanContext;
use crate::error::{Result, ScanError};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

pub use crate::types::{Port, Protocol};
pub use connector::{bounded, probe, NetConnector};
pub use tcp::TcpConnector;
pub use traits::{Connector, PortStatus, ProbeFailure, ScanResult, StatusMapping};
pub use udp::UdpConnector;

/// Immutable scanner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Per-probe connection timeout.
    pub timeout: Duration,
    /// Maximum number of probes in flight; `None` runs them all at once.
    pub concurrency: Option<usize>,
    /// Report timed-out probes as [`PortStatus::Unknown`].
    pub ambiguous_as_unknown: bool,
}

impl ScannerConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            concurrency: None,
            ambiguous_as_unknown: false,
        }
    }

    /// Cap the number of simultaneous probes. Zero is treated as one.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn with_unknown(mut self) -> Self {
        self.ambiguous_as_unknown = true;
        self
    }

    fn mapping(&self) -> StatusMapping {
        StatusMapping {
            ambiguous_as_unknown: self.ambiguous_as_unknown,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

/// Results of a scan that may have been cut short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// One result per requested port, in completion order.
    pub results: Vec<ScanResult>,
    /// Set when the governing context ended before the scan finished.
    pub cancelled: Option<ScanError>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.cancelled.is_none()
    }

    /// All results, or the cancellation error if the scan was cut short.
    pub fn into_result(self) -> Result<Vec<ScanResult>> {
        match self.cancelled {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Concurrent port scanner with a fixed per-probe timeout.
#[derive(Clone)]
pub struct Scanner {
    config: ScannerConfig,
    connector: Arc<dyn Connector>,
}

impl Scanner {
    /// Create a scanner using the host's TCP/UDP sockets.
    pub fn new(timeout: Duration) -> Self {
        Self::with_config(ScannerConfig::new(timeout))
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        Self {
            config,
            connector: Arc::new(NetConnector),
        }
    }

    /// Replace the connector used for each probe.
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Probe every port on `target` and return one result per port.
    ///
    /// Results come back in completion order. If `ctx` has ended by the time
    /// every probe has reported, the results are discarded and the
    /// cancellation is returned instead.
    pub async fn scan(
        &self,
        ctx: &ScanContext,
        target: &str,
        ports: &[Port],
    ) -> Result<Vec<ScanResult>> {
        self.scan_partial(ctx, target, ports).await.into_result()
    }

    /// Like [`scan`](Self::scan), but keeps whatever was gathered.
    ///
    /// Probes still running when `ctx` ends report [`PortStatus::Aborted`],
    /// so the report always holds one result per requested port.
    pub async fn scan_partial(
        &self,
        ctx: &ScanContext,
        target: &str,
        ports: &[Port],
    ) -> ScanReport {
        let start = Instant::now();
        info!(host = target, ports = ports.len(), "starting scan");

        let results = self.fan_out(ctx, target, ports).await;
        let cancelled = ctx.err();

        match cancelled {
            Some(err) => warn!(host = target, error = %err, "scan ended early"),
            None => info!(
                host = target,
                open = results.iter().filter(|r| r.is_open()).count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "scan complete"
            ),
        }

        ScanReport { results, cancelled }
    }

    async fn fan_out(&self, ctx: &ScanContext, target: &str, ports: &[Port]) -> Vec<ScanResult> {
        if ports.is_empty() {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel(ports.len());
        let limiter = self
            .config
            .concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let target: Arc<str> = Arc::from(target);
        let timeout = self.config.timeout;
        let mapping = self.config.mapping();

        for &port in ports {
            let completion = Completion::new(port, tx.clone());
            let ctx = ctx.clone();
            let connector = Arc::clone(&self.connector);
            let limiter = limiter.clone();
            let target = Arc::clone(&target);

            tokio::spawn(async move {
                let outcome = match acquire(&ctx, limiter).await {
                    Ok(_permit) => connector.connect(&ctx, &target, port, timeout).await,
                    Err(_) => Err(ProbeFailure::Aborted),
                };
                if let Err(ref reason) = outcome {
                    debug!(%port, %reason, "probe failed");
                }
                completion.finish(mapping.status(&outcome));
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(ports.len());
        while let Some(result) = rx.recv().await {
            debug!(port = %result.port, status = %result.status, "probe finished");
            results.push(result);
        }
        results
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wait for a concurrency slot, unless the context ends first.
async fn acquire(
    ctx: &ScanContext,
    limiter: Option<Arc<Semaphore>>,
) -> Result<Option<OwnedSemaphorePermit>> {
    match limiter {
        None => Ok(None),
        Some(semaphore) => Ok(ctx.run(semaphore.acquire_owned()).await?.ok()),
    }
}

/// Posts exactly one result for a port.
///
/// If the probe task unwinds or is dropped before finishing, the port is
/// reported as [`PortStatus::Unknown`] so the result count still matches.
struct Completion {
    port: Port,
    tx: Option<Sender<ScanResult>>,
}

impl Completion {
    fn new(port: Port, tx: Sender<ScanResult>) -> Self {
        Self { port, tx: Some(tx) }
    }

    fn finish(mut self, status: PortStatus) {
        self.post(status);
    }

    fn post(&mut self, status: PortStatus) {
        if let Some(tx) = self.tx.take() {
            // Capacity equals the port count and each port posts once.
            let _ = tx.try_send(ScanResult::new(self.port, status));
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.post(PortStatus::Unknown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Even port numbers are open, odd ones refuse.
    struct ParityConnector;

    #[async_trait]
    impl Connector for ParityConnector {
        async fn connect(
            &self,
            _ctx: &ScanContext,
            _address: &str,
            port: Port,
            _timeout: Duration,
        ) -> std::result::Result<(), ProbeFailure> {
            if port.number % 2 == 0 {
                Ok(())
            } else {
                Err(ProbeFailure::Refused)
            }
        }
    }

    /// Sleeps for `delay`, honouring the context, and tracks peak concurrency.
    #[derive(Default)]
    struct SlowConnector {
        delay: Duration,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for SlowConnector {
        async fn connect(
            &self,
            ctx: &ScanContext,
            _address: &str,
            _port: Port,
            timeout: Duration,
        ) -> std::result::Result<(), ProbeFailure> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let outcome = connector::bounded(ctx, timeout, async {
                tokio::time::sleep(self.delay).await;
                Ok::<(), ProbeFailure>(())
            })
            .await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    struct PanicConnector;

    #[async_trait]
    impl Connector for PanicConnector {
        async fn connect(
            &self,
            _ctx: &ScanContext,
            _address: &str,
            port: Port,
            _timeout: Duration,
        ) -> std::result::Result<(), ProbeFailure> {
            if port.number == 13 {
                panic!("connector bug");
            }
            Ok(())
        }
    }

    fn tally(results: &[ScanResult]) -> HashMap<ScanResult, usize> {
        let mut counts = HashMap::new();
        for r in results {
            *counts.entry(*r).or_insert(0) += 1;
        }
        counts
    }

    fn scanner(connector: impl Connector + 'static) -> Scanner {
        Scanner::new(Duration::from_millis(500)).with_connector(connector)
    }

    #[tokio::test]
    async fn test_one_result_per_port() {
        let ports: Vec<Port> = (1..=50).map(Port::tcp).collect();
        let results = scanner(ParityConnector)
            .scan(&ScanContext::new(), "example", &ports)
            .await
            .unwrap();

        assert_eq!(results.len(), ports.len());
        let mut seen: Vec<Port> = results.iter().map(|r| r.port).collect();
        seen.sort();
        assert_eq!(seen, ports);
        for r in &results {
            let expected = if r.port.number % 2 == 0 {
                PortStatus::Open
            } else {
                PortStatus::Closed
            };
            assert_eq!(r.status, expected);
        }
    }

    #[tokio::test]
    async fn test_empty_port_list() {
        let results = scanner(ParityConnector)
            .scan(&ScanContext::new(), "example", &[])
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_are_scanned_independently() {
        let ports = [Port::tcp(2), Port::tcp(2), Port::udp(2), Port::tcp(3)];
        let results = scanner(ParityConnector)
            .scan(&ScanContext::new(), "example", &ports)
            .await
            .unwrap();

        let counts = tally(&results);
        assert_eq!(counts[&ScanResult::new(Port::tcp(2), PortStatus::Open)], 2);
        assert_eq!(counts[&ScanResult::new(Port::udp(2), PortStatus::Open)], 1);
        assert_eq!(counts[&ScanResult::new(Port::tcp(3), PortStatus::Closed)], 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_context() {
        let ctx = ScanContext::new();
        ctx.cancel();

        let err = scanner(ParityConnector)
            .scan(&ctx, "example", &[Port::tcp(80), Port::tcp(81)])
            .await
            .unwrap_err();
        assert_eq!(err, ScanError::Cancelled);
    }

    #[tokio::test]
    async fn test_partial_report_when_cancelled() {
        let ctx = ScanContext::new();
        ctx.cancel();

        let ports = [Port::tcp(80), Port::tcp(81), Port::tcp(80)];
        let report = scanner(SlowConnector::default())
            .scan_partial(&ctx, "example", &ports)
            .await;

        assert_eq!(report.cancelled, Some(ScanError::Cancelled));
        assert_eq!(report.results.len(), 3);
        assert!(report
            .results
            .iter()
            .all(|r| r.status == PortStatus::Aborted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_scan() {
        let ctx = ScanContext::with_timeout(Duration::from_millis(100));
        let slow = SlowConnector {
            delay: Duration::from_secs(10),
            ..Default::default()
        };
        let scanner = Scanner::new(Duration::from_secs(30)).with_connector(slow);

        let started = tokio::time::Instant::now();
        let report = scanner
            .scan_partial(&ctx, "example", &[Port::tcp(1), Port::tcp(2)])
            .await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(report.cancelled, Some(ScanError::DeadlineExceeded));
        assert_eq!(report.results.len(), 2);
        assert_eq!(
            report.into_result().unwrap_err(),
            ScanError::DeadlineExceeded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_maps_to_closed() {
        let slow = SlowConnector {
            delay: Duration::from_secs(10),
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        let results = Scanner::new(Duration::from_millis(200))
            .with_connector(slow)
            .scan(&ScanContext::new(), "example", &[Port::tcp(1)])
            .await
            .unwrap();

        assert_eq!(results, vec![ScanResult::new(Port::tcp(1), PortStatus::Closed)]);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_maps_to_unknown_when_enabled() {
        let slow = SlowConnector {
            delay: Duration::from_secs(10),
            ..Default::default()
        };
        let config = ScannerConfig::new(Duration::from_millis(200)).with_unknown();
        let results = Scanner::with_config(config)
            .with_connector(slow)
            .scan(&ScanContext::new(), "example", &[Port::udp(1)])
            .await
            .unwrap();

        assert_eq!(results[0].status, PortStatus::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit() {
        let peak = Arc::new(AtomicUsize::new(0));
        let slow = SlowConnector {
            delay: Duration::from_millis(50),
            peak: Arc::clone(&peak),
            ..Default::default()
        };
        let config = ScannerConfig::new(Duration::from_secs(1)).with_concurrency(4);
        let ports: Vec<Port> = (1..=20).map(Port::tcp).collect();

        let results = Scanner::with_config(config)
            .with_connector(slow)
            .scan(&ScanContext::new(), "example", &ports)
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        assert!(results.iter().all(|r| r.status == PortStatus::Open));
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_runs_all_probes_together() {
        let peak = Arc::new(AtomicUsize::new(0));
        let slow = SlowConnector {
            delay: Duration::from_millis(50),
            peak: Arc::clone(&peak),
            ..Default::default()
        };
        let ports: Vec<Port> = (1..=10).map(Port::tcp).collect();

        scanner(slow)
            .scan(&ScanContext::new(), "example", &ports)
            .await
            .unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_panicking_probe_still_reports() {
        let ports = [Port::tcp(12), Port::tcp(13), Port::tcp(14)];
        let results = scanner(PanicConnector)
            .scan(&ScanContext::new(), "example", &ports)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let counts = tally(&results);
        assert_eq!(counts[&ScanResult::new(Port::tcp(13), PortStatus::Unknown)], 1);
    }

    #[test]
    fn test_zero_concurrency_becomes_one() {
        let config = ScannerConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency, Some(1));
        assert_eq!(config.timeout, Duration::from_millis(3000));
    }
}
