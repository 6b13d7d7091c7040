//! An authenticated session: bearer token plus the identity it belongs to.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, Identity};

/// Token/identity pair returned by the remote authentication service.
///
/// The token is opaque to this core; no cryptographic verification happens
/// client-side. Fields are private so the non-empty-token invariant holds
/// for every constructed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    identity: Identity,
}

impl Session {
    pub fn new(token: impl Into<String>, identity: Identity) -> CoreResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(CoreError::validation("session token must not be empty"));
        }
        Ok(Self { token, identity })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn into_parts(self) -> (String, Identity) {
        (self.token, self.identity)
    }
}
