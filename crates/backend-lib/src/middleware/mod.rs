// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the cloudkit auth backend.

pub mod session;

pub use session::{session_context, SessionContext};
