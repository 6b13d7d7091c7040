//! HTTP edge of the portal backend: the forwarded-header trust boundary and
//! the server wiring that mounts it.

pub mod app;
pub mod middleware;
pub mod trust;
