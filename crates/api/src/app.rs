//! Router assembly.
//!
//! The CRUD resource routers (clients, boletos, documents, notifications)
//! are mounted by their own crates; this one owns the edge: the trust
//! middleware every route sits behind, plus the diagnostic routes.

use std::sync::Arc;

use axum::{Extension, Json, Router, middleware, routing::get};
use tower::ServiceBuilder;

use crate::middleware::{TrustState, trust_middleware};
use crate::trust::{ForwardPolicy, TrustContext};

pub fn build_app(policy: ForwardPolicy, default_scheme: impl Into<String>) -> Router {
    let state = TrustState {
        policy: Arc::new(policy),
        default_scheme: default_scheme.into(),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/connection", get(connection))
        .layer(ServiceBuilder::new().layer(middleware::from_fn_with_state(state, trust_middleware)))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Echo the resolved connection context. Diagnostic surface for operators
/// checking proxy configuration.
async fn connection(Extension(ctx): Extension<TrustContext>) -> Json<TrustContext> {
    Json(ctx)
}
