//! Post-discovery reachability probe.

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

/// Echo timeout. Devices answer broadcasts from the same L2 segment even
/// when unroutable, so anything slower than this is "not reachable" as far
/// as the operator is concerned.
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Sends one ICMP echo to `address` and reports whether a reply came back
/// in time.
///
/// Any failure mode, from a missing raw-socket privilege to a plain
/// timeout, is logged and collapses to `false`; a failed probe must never
/// fail a scan.
pub async fn is_reachable(address: Ipv4Addr) -> bool {
    let pinger = match tokio_icmp_echo::Pinger::new().await {
        Ok(pinger) => pinger,
        Err(e) => {
            debug!(error = %e, "ICMP probing unavailable, devices will report unreachable");
            return false;
        }
    };

    match pinger.ping(address.into(), 0, 0, PROBE_TIMEOUT).await {
        Ok(Some(rtt)) => {
            debug!(%address, ?rtt, "device answered the echo probe");
            true
        }
        Ok(None) => false,
        Err(e) => {
            debug!(%address, error = %e, "echo probe failed");
            false
        }
    }
}
