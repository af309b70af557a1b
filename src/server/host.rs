//! Client identity resolution
//!
//! A client's identity is the resolved host name of its remote address, so a
//! device that reconnects reuses its settings and tracking slot. Reverse DNS
//! is best-effort: lookups can fail or change, the raw IP is the fallback,
//! and loopback maps to this machine's own host name. Two devices behind the
//! same NAT may resolve to the same name; the aggregation layers tolerate
//! that collision rather than inventing a stronger identity.

use futures_util::future::BoxFuture;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::server::socket::HostResolver;

/// The resolver used by the server unless one is injected.
pub fn default_resolver() -> HostResolver {
    Arc::new(|addr: IpAddr| -> BoxFuture<'static, String> { Box::pin(resolve_host(addr)) })
}

/// Resolve a remote address into a stable identity string.
pub async fn resolve_host(addr: IpAddr) -> String {
    if addr.is_loopback() {
        return local_hostname();
    }

    match tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr)).await {
        Ok(Ok(host)) => host,
        Ok(Err(err)) => {
            debug!(%addr, %err, "reverse lookup failed, using raw address");
            addr.to_string()
        }
        Err(err) => {
            debug!(%addr, %err, "reverse lookup task failed, using raw address");
            addr.to_string()
        }
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
