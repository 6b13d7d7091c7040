//! `portal-core` — domain primitives shared by the portal client and server.
//!
//! This crate contains **pure domain** types (no HTTP or storage concerns).

pub mod error;
pub mod identity;
pub mod session;

pub use error::{CoreError, CoreResult};
pub use identity::{Identity, PersonType, normalize_document};
pub use session::Session;
