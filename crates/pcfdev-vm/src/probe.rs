//! TCP-based liveness probe.
//!
//! Reachability is inferred from a TCP connect. An accepted or actively
//! refused connection both mean a host answered at that address; only
//! silence counts as "nobody there".

use crate::driver::Prober;
use crate::error::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default port probed on the guest (SSH).
pub const DEFAULT_PROBE_PORT: u16 = 22;

/// Default time to wait for an answer.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// [`Prober`] that attempts a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProber {
    port: u16,
    timeout: Duration,
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT)
    }
}

impl TcpProber {
    /// Create a prober for the given port and timeout.
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn try_ip(&self, ip: Ipv4Addr) -> Result<bool> {
        let addr = SocketAddr::from((ip, self.port));
        let responds = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => e.kind() == ErrorKind::ConnectionRefused,
            Err(_) => false,
        };
        tracing::trace!(%ip, port = self.port, responds, "Probed address");
        Ok(responds)
    }
}
