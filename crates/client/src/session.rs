//! The session state machine: the single authoritative answer to "is the
//! user authenticated".
//!
//! State is derived from store contents and gateway results, published on a
//! watch channel so observers (navigation, redirect-to-login) can react
//! without polling. The machine cycles for the lifetime of the process;
//! there is no terminal state.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use portal_core::{Identity, Session, normalize_document};

use crate::error::{ClientError, ClientResult};
use crate::gateway::AuthGateway;
use crate::store::{AUTH_TOKEN_KEY, SecureStore, USER_DATA_KEY};

/// Minimum password length accepted by the remote credential service,
/// checked client-side before any request is issued.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Client-observable session state. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Storage has not been consulted yet.
    Unknown,
    /// A storage read or a login/register call is in flight.
    Loading,
    /// Token and identity are held in the store.
    Authenticated,
    /// No session is held.
    Unauthenticated,
}

/// Owns the store and the gateway; constructed once and passed by reference
/// to every caller.
pub struct SessionManager {
    store: Arc<dyn SecureStore>,
    gateway: AuthGateway,
    identity: Mutex<Option<Identity>>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SecureStore>, gateway: AuthGateway) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        Self {
            store,
            gateway,
            identity: Mutex::new(None),
            state_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch channel carrying every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Identity of the authenticated client, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.identity.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// React to the interceptor chain clearing the store: drop the cached
    /// identity and force `Unauthenticated`. The store itself was already
    /// cleared by the inbound stage.
    pub fn spawn_teardown_listener(
        self: &Arc<Self>,
        mut teardown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match teardown_rx.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        tracing::info!("session torn down by interceptor");
                        manager.clear_local();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Consult the store once at startup: `Unknown → Loading → Authenticated`
    /// when both entries are present and the identity deserializes,
    /// `Unauthenticated` otherwise. A partial or corrupt session is resolved
    /// by deleting what is left, never by failing.
    pub async fn load_stored(&self) -> ClientResult<SessionState> {
        self.set_state(SessionState::Loading);

        let token = self.store.get(AUTH_TOKEN_KEY).await?;
        let user_data = self.store.get(USER_DATA_KEY).await?;

        match (token, user_data) {
            (Some(token), Some(raw)) if !token.is_empty() => {
                match serde_json::from_str::<Identity>(&raw) {
                    Ok(identity) => {
                        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) =
                            Some(identity);
                        self.set_state(SessionState::Authenticated);
                    }
                    Err(err) => {
                        tracing::warn!(%err, "stored identity failed to deserialize, discarding session");
                        self.discard_stored().await?;
                        self.set_state(SessionState::Unauthenticated);
                    }
                }
            }
            (None, None) => self.set_state(SessionState::Unauthenticated),
            _ => {
                tracing::warn!("partial session in store, discarding");
                self.discard_stored().await?;
                self.set_state(SessionState::Unauthenticated);
            }
        }

        Ok(self.state())
    }

    /// `Unauthenticated → Loading → Authenticated` on success; the returned
    /// session is persisted before the transition. On failure the typed
    /// error is surfaced, nothing new is written, and the state is
    /// re-derived from whatever the store actually holds (so a still-valid
    /// previous session stays `Authenticated`, while a session the
    /// interceptor tore down during the attempt ends `Unauthenticated`).
    pub async fn login(&self, document: &str, password: &str) -> ClientResult<Identity> {
        validate_password(password)?;
        self.set_state(SessionState::Loading);

        let document = normalize_document(document);
        match self.gateway.login(&document, password).await {
            Ok(session) => self.install(session).await,
            Err(err) => {
                self.resync_from_store().await;
                Err(err)
            }
        }
    }

    /// Same lifecycle as [`SessionManager::login`], against the registration
    /// endpoint.
    pub async fn register(
        &self,
        document: &str,
        password: &str,
        email: Option<&str>,
    ) -> ClientResult<Identity> {
        validate_password(password)?;
        self.set_state(SessionState::Loading);

        let document = normalize_document(document);
        match self.gateway.register(&document, password, email).await {
            Ok(session) => self.install(session).await,
            Err(err) => {
                self.resync_from_store().await;
                Err(err)
            }
        }
    }

    /// Explicit logout: delete both entries, then `Unauthenticated`.
    pub async fn logout(&self) -> ClientResult<()> {
        self.discard_stored().await?;
        self.clear_local();
        Ok(())
    }

    async fn install(&self, session: Session) -> ClientResult<Identity> {
        let (token, identity) = session.into_parts();

        let raw = match serde_json::to_string(&identity) {
            Ok(raw) => raw,
            Err(err) => {
                self.clear_local();
                return Err(err.into());
            }
        };

        // two independent writes; a failure after the first must not leave
        // a partial session behind, nor the machine stuck in Loading
        let persisted = async {
            self.store.set(AUTH_TOKEN_KEY, &token).await?;
            self.store.set(USER_DATA_KEY, &raw).await
        }
        .await;

        if let Err(err) = persisted {
            if let Err(cleanup_err) = self.discard_stored().await {
                tracing::warn!(%cleanup_err, "failed to discard partially written session");
            }
            self.clear_local();
            return Err(err.into());
        }

        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) = Some(identity.clone());
        self.set_state(SessionState::Authenticated);
        Ok(identity)
    }

    /// Re-derive the published state from store contents after a failed
    /// auth attempt. A store read failure degrades to `Unauthenticated`.
    async fn resync_from_store(&self) {
        if let Err(err) = self.load_stored().await {
            tracing::warn!(%err, "failed to re-derive session state from store");
            self.clear_local();
        }
    }

    async fn discard_stored(&self) -> ClientResult<()> {
        self.store.delete(AUTH_TOKEN_KEY).await?;
        self.store.delete(USER_DATA_KEY).await?;
        Ok(())
    }

    fn clear_local(&self) {
        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.set_state(SessionState::Unauthenticated);
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

/// Client-side precondition mirrored from the remote credential service.
pub fn validate_password(password: &str) -> ClientResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::authentication(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
