//! Hostname resolution with a bounded wait.

use std::io;
use std::time::Duration;

use log::debug;
use tokio::net::lookup_host;

use crate::address::{parse_address, Address};
use crate::error::{CloudInfoError, Result};

/// Default timeout for DNS lookups.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves a hostname to a single address using the system resolver.
#[derive(Debug, Clone, Copy)]
pub struct DnsResolver {
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `host` to the first address the system resolver returns.
    ///
    /// Literal IPv4/IPv6 text (optionally bracketed) is returned as-is
    /// without a lookup.
    pub async fn resolve(&self, host: &str) -> Result<Address> {
        let literal = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if let Ok(address) = parse_address(literal) {
            return Ok(address);
        }

        debug!("resolving {host}");
        let addrs = match tokio::time::timeout(self.timeout, lookup_host((host, 0))).await {
            Err(_) => return Err(CloudInfoError::ResolutionTimeout(host.to_string())),
            Ok(Err(source)) => {
                return Err(CloudInfoError::ResolutionFailed {
                    host: host.to_string(),
                    source,
                })
            }
            Ok(Ok(addrs)) => addrs,
        };

        let address = addrs
            .map(|addr| Address::from(addr.ip()))
            .next()
            .ok_or_else(|| CloudInfoError::ResolutionFailed {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
            })?;
        debug!("resolved {host} to {address}");
        Ok(address)
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DNS_TIMEOUT)
    }
}
