use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use cloudkit_common::{User, UserId};

use super::Session;
use crate::error::AppError;

/// What the session library knows about a session id.
///
/// Both fields are `None` for unknown or expired sessions.
#[derive(Clone, Debug, Default)]
pub struct SessionValidation {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Session library seam used by the validator, middleware and handlers
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Name of the cookie holding the session id
    fn session_cookie_name(&self) -> &str;
    async fn create_session(&self, user_id: UserId) -> Result<Session, AppError>;
    async fn validate_session(&self, session_id: &str) -> Result<SessionValidation, AppError>;
    async fn invalidate_session(&self, session_id: &str) -> Result<(), AppError>;
    fn create_session_cookie(&self, session: &Session) -> Cookie<'static>;
    fn create_blank_session_cookie(&self) -> Cookie<'static>;
}
