//! The outbound request pipeline: one HTTP client wrapped by two interceptor
//! stages.
//!
//! Outbound stage: the stored bearer token is read and attached *before* the
//! request is sent; the store read is awaited, so attach never races send.
//! Inbound stage: any 401 response clears both session entries before the
//! response is handed back, regardless of which endpoint produced it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::ClientResult;
use crate::store::{AUTH_TOKEN_KEY, SecureStore, USER_DATA_KEY};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared client for every call against the portal API.
///
/// Cheap to clone; clones share the underlying connection pool, store handle
/// and teardown channel. CRUD collaborators consume [`PortalClient::get`] and
/// [`PortalClient::post`] as their interface.
#[derive(Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn SecureStore>,
    teardown_tx: broadcast::Sender<()>,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn SecureStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (teardown_tx, _) = broadcast::channel(8);

        Ok(Self {
            http,
            base_url: base_url.into(),
            store,
            teardown_tx,
        })
    }

    /// Receiver that fires after the inbound stage clears the stored session.
    /// The session state machine subscribes here.
    pub fn subscribe_teardown(&self) -> broadcast::Receiver<()> {
        self.teardown_tx.subscribe()
    }

    pub async fn get(&self, path: &str) -> ClientResult<Response> {
        self.execute(self.http.get(self.url(path))).await
    }

    pub async fn post<B>(&self, path: &str, body: &B) -> ClientResult<Response>
    where
        B: Serialize + ?Sized,
    {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let request = self.attach_token(request).await?;
        let response = request.send().await?;
        self.observe_response(response).await
    }

    /// Outbound stage: attach the stored token as a bearer credential, or
    /// send unmodified when none is stored.
    async fn attach_token(&self, request: RequestBuilder) -> ClientResult<RequestBuilder> {
        Ok(match self.store.get(AUTH_TOKEN_KEY).await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Inbound stage: tear the session down the first time any call reports
    /// it invalid, then propagate the original response untouched.
    async fn observe_response(&self, response: Response) -> ClientResult<Response> {
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %response.url(), "unauthorized response, clearing stored session");
            self.store.delete(AUTH_TOKEN_KEY).await?;
            self.store.delete(USER_DATA_KEY).await?;
            // no subscribers is fine; teardown already happened in the store
            let _ = self.teardown_tx.send(());
        }
        Ok(response)
    }
}
