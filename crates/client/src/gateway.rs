//! Remote authentication endpoints.
//!
//! The gateway exchanges credentials for a [`Session`] and nothing more:
//! persistence belongs to the session state machine, retry policy (if any)
//! to callers. Requests go through the intercepted [`PortalClient`], so the
//! auth endpoints sit behind the same pipeline as every other call.

use reqwest::Response;
use serde::{Deserialize, Serialize};

use portal_core::{Identity, Session};

use crate::error::{ClientError, ClientResult};
use crate::http::PortalClient;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const GENERIC_FAILURE: &str = "authentication rejected by the remote service";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    document: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    document: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    identity: Identity,
}

/// Best-effort shape of a remote error body. Anything unparseable falls back
/// to the generic message; the typed error is the contract, not the payload.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct AuthGateway {
    client: PortalClient,
}

impl AuthGateway {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }

    /// Exchange a document/password pair for a session. Never retries.
    pub async fn login(&self, document: &str, password: &str) -> ClientResult<Session> {
        let body = LoginRequest { document, password };
        self.exchange(LOGIN_PATH, &body).await
    }

    /// Create portal credentials for an existing CRM client. Same contract
    /// as [`AuthGateway::login`].
    pub async fn register(
        &self,
        document: &str,
        password: &str,
        email: Option<&str>,
    ) -> ClientResult<Session> {
        let body = RegisterRequest {
            document,
            password,
            email,
        };
        self.exchange(REGISTER_PATH, &body).await
    }

    async fn exchange<B>(&self, path: &str, body: &B) -> ClientResult<Session>
    where
        B: serde::Serialize,
    {
        let response = self.client.post(path, body).await?;

        if !response.status().is_success() {
            return Err(ClientError::AuthenticationFailed {
                message: remote_message(response).await,
            });
        }

        let auth: AuthResponse = response.json().await?;
        Session::new(auth.token, auth.identity)
            .map_err(|err| ClientError::authentication(err.to_string()))
    }
}

async fn remote_message(response: Response) -> String {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}
