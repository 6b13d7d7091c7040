//! `portal-client` — client-side session lifecycle for the portal API.
//!
//! One [`PortalClient`] instance carries the interceptor chain every outbound
//! call passes through; one [`SessionManager`] instance owns the observable
//! session state. Both are explicit values passed to callers, never global
//! singletons.

pub mod error;
pub mod gateway;
pub mod http;
pub mod session;
pub mod store;

pub use error::{ClientError, ClientResult};
pub use gateway::AuthGateway;
pub use http::PortalClient;
pub use session::{MIN_PASSWORD_LEN, SessionManager, SessionState, validate_password};
pub use store::{
    AUTH_TOKEN_KEY, EncryptedFileStore, InMemoryStore, KeyringStore, SecureStore, StoreError,
    USER_DATA_KEY,
};
