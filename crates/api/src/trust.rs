//! Forwarded-header interpretation: the trust boundary for inbound requests.
//!
//! A reverse proxy in front of the backend describes the original client
//! connection through `X-Forwarded-*` headers. Resolution overlays those
//! values onto the ambient connection info and produces the [`TrustContext`]
//! everything downstream in the same request is allowed to trust. Nothing
//! here is shared across requests.

use std::collections::HashSet;
use std::net::IpAddr;

use axum::http::HeaderMap;
use serde::Serialize;
use thiserror::Error;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Validated connection metadata for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustContext {
    pub remote_addr: IpAddr,
    pub scheme: String,
    pub host: String,
}

/// Which peers are allowed to rewrite connection metadata via forwarded
/// headers.
#[derive(Debug, Clone, Default)]
pub enum ForwardPolicy {
    /// Honor forwarded headers from any peer. This reproduces the historical
    /// behavior and is the default; it means any direct client can spoof its
    /// own address, so restrict it when the proxy addresses are known.
    #[default]
    TrustAny,
    /// Honor forwarded headers only when the immediate peer is listed.
    /// Headers from other peers are ignored wholesale and the ambient
    /// connection info stands; the request itself is not rejected.
    TrustedProxies(HashSet<IpAddr>),
}

impl ForwardPolicy {
    pub fn trusted_proxies(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self::TrustedProxies(addrs.into_iter().collect())
    }

    fn permits(&self, peer: IpAddr) -> bool {
        match self {
            Self::TrustAny => true,
            Self::TrustedProxies(proxies) => proxies.contains(&peer),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrustHeaderError {
    /// The first `X-Forwarded-For` element is not an IP literal.
    #[error("malformed X-Forwarded-For entry: {0:?}")]
    MalformedForwardedFor(String),

    /// A forwarded header holds bytes that are not visible ASCII.
    #[error("unreadable {0} header")]
    UnreadableHeader(&'static str),
}

/// Overlay forwarded headers onto the ambient connection context.
///
/// `X-Forwarded-For`: the first comma-separated element, trimmed, parsed as
/// an IP literal, replaces the remote address. `X-Forwarded-Proto` and
/// `X-Forwarded-Host` replace scheme and host with their literal values,
/// unvalidated. Absent headers leave the ambient value in place, and a
/// header with an empty value counts as absent.
pub fn resolve(
    headers: &HeaderMap,
    ambient: TrustContext,
    policy: &ForwardPolicy,
) -> Result<TrustContext, TrustHeaderError> {
    if !policy.permits(ambient.remote_addr) {
        return Ok(ambient);
    }

    let mut ctx = ambient;

    if let Some(value) = header_str(headers, X_FORWARDED_FOR)? {
        let first = value.split(',').next().unwrap_or_default().trim();
        ctx.remote_addr = first
            .parse()
            .map_err(|_| TrustHeaderError::MalformedForwardedFor(first.to_string()))?;
    }

    if let Some(value) = header_str(headers, X_FORWARDED_PROTO)? {
        ctx.scheme = value.to_string();
    }

    if let Some(value) = header_str(headers, X_FORWARDED_HOST)? {
        ctx.host = value.to_string();
    }

    Ok(ctx)
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<Option<&'a str>, TrustHeaderError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| TrustHeaderError::UnreadableHeader(name))?;
            // empty values are skipped like absent headers; whitespace-only
            // X-Forwarded-For still fails the IP parse
            Ok((!value.is_empty()).then_some(value))
        }
    }
}
