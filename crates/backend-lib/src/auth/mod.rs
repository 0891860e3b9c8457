// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module: password hashing, sessions and session cookies.

pub mod cookie;
pub mod password;
pub mod session;
mod service;
mod service_impl;

pub use cookie::{SessionCookieConfig, DEFAULT_SESSION_COOKIE_NAME};
pub use password::{verify_password, PasswordHasher};
pub use service::{AuthService, SessionValidation};
pub use service_impl::DefaultAuth;
pub use session::{Session, SessionManager, SESSION_TTL};
