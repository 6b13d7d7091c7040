//! Axum middleware applying the trust resolver to every inbound request.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::trust::{self, ForwardPolicy, TrustContext};

#[derive(Clone)]
pub struct TrustState {
    pub policy: Arc<ForwardPolicy>,
    pub default_scheme: String,
}

/// Resolve the [`TrustContext`] for this request and stash it in the request
/// extensions, where handlers and downstream middleware pick it up.
///
/// A malformed `X-Forwarded-For` fails this request with `400 Bad Request`;
/// per-request state only, concurrent requests are unaffected.
pub async fn trust_middleware(
    State(state): State<TrustState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let ambient = TrustContext {
        remote_addr: peer.ip(),
        scheme: state.default_scheme.clone(),
        host,
    };

    let ctx = trust::resolve(req.headers(), ambient, &state.policy).map_err(|err| {
        tracing::warn!(%err, peer = %peer, "rejecting request with malformed forwarded headers");
        StatusCode::BAD_REQUEST
    })?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
