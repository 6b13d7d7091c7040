use std::net::SocketAddr;

use portal_api::trust::ForwardPolicy;

#[tokio::main]
async fn main() {
    portal_observability::init();

    let policy = match std::env::var("PORTAL_TRUSTED_PROXIES") {
        Ok(raw) => ForwardPolicy::trusted_proxies(raw.split(',').map(|addr| {
            addr.trim()
                .parse()
                .expect("invalid address in PORTAL_TRUSTED_PROXIES")
        })),
        Err(_) => {
            tracing::warn!(
                "PORTAL_TRUSTED_PROXIES not set; honoring forwarded headers from any peer"
            );
            ForwardPolicy::TrustAny
        }
    };

    let bind = std::env::var("PORTAL_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let app = portal_api::app::build_app(policy, "http");

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {bind}: {err}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
