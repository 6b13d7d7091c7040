//! Black-box tests for the forwarded-header trust boundary, driven over
//! real TCP against the production router.

use std::net::SocketAddr;

use reqwest::StatusCode;

use portal_api::app::build_app;
use portal_api::trust::ForwardPolicy;

struct TestServer {
    base_url: String,
    port: u16,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(policy: ForwardPolicy) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = build_app(policy, "http");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url,
            port: addr.port(),
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn connection(
    server: &TestServer,
    headers: &[(&str, &str)],
) -> (StatusCode, Option<serde_json::Value>) {
    let client = reqwest::Client::new();
    let mut request = client.get(format!("{}/connection", server.base_url));
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await.expect("request failed");
    let status = response.status();
    let body = response.json().await.ok();
    (status, body)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let response = reqwest::get(format!("{}/healthz", server.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn ambient_context_without_forwarded_headers() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let (status, body) = connection(&server, &[]).await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remote_addr"], "127.0.0.1");
    assert_eq!(body["scheme"], "http");
    assert_eq!(body["host"], format!("127.0.0.1:{}", server.port));
}

#[tokio::test]
async fn forwarded_for_rewrites_remote_addr() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let (status, body) = connection(&server, &[("X-Forwarded-For", "203.0.113.7")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["remote_addr"], "203.0.113.7");
}

#[tokio::test]
async fn first_entry_of_forwarded_chain_wins() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let (status, body) = connection(
        &server,
        &[("X-Forwarded-For", "203.0.113.7, 198.51.100.2")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["remote_addr"], "203.0.113.7");
}

#[tokio::test]
async fn malformed_forwarded_for_fails_the_request() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let (status, _) = connection(&server, &[("X-Forwarded-For", "not-an-ip")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // per-request failure only: the next request is unaffected
    let (status, body) = connection(&server, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["remote_addr"], "127.0.0.1");
}

#[tokio::test]
async fn proto_and_host_are_applied_literally() {
    let server = TestServer::spawn(ForwardPolicy::TrustAny).await;
    let (status, body) = connection(
        &server,
        &[
            ("X-Forwarded-Proto", "https"),
            ("X-Forwarded-Host", "portal.example.com"),
        ],
    )
    .await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheme"], "https");
    assert_eq!(body["host"], "portal.example.com");
    assert_eq!(body["remote_addr"], "127.0.0.1");
}

#[tokio::test]
async fn untrusted_peer_forwarded_headers_are_ignored() {
    // loopback (the test client) is not in the trusted set
    let policy = ForwardPolicy::trusted_proxies(["192.0.2.1".parse().unwrap()]);
    let server = TestServer::spawn(policy).await;

    let (status, body) = connection(
        &server,
        &[
            ("X-Forwarded-For", "203.0.113.7"),
            ("X-Forwarded-Proto", "https"),
        ],
    )
    .await;
    let body = body.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remote_addr"], "127.0.0.1");
    assert_eq!(body["scheme"], "http");
}

#[tokio::test]
async fn trusted_peer_forwarded_headers_are_honored() {
    let policy = ForwardPolicy::trusted_proxies(["127.0.0.1".parse().unwrap()]);
    let server = TestServer::spawn(policy).await;

    let (status, body) = connection(&server, &[("X-Forwarded-For", "2001:db8::1")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["remote_addr"], "2001:db8::1");
}
