use std::sync::Arc;

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use cloudkit_common::UserId;
use tracing::{info, warn};

use super::{AuthService, Session, SessionCookieConfig, SessionManager, SessionValidation};
use crate::error::AppError;
use crate::storage::UserRepository;

pub struct DefaultAuth {
    sm: SessionManager,
    users: Arc<dyn UserRepository>,
    cookie: SessionCookieConfig,
}

impl DefaultAuth {
    pub fn new(sm: SessionManager, users: Arc<dyn UserRepository>, cookie: SessionCookieConfig) -> Self {
        Self { sm, users, cookie }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sm
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    fn session_cookie_name(&self) -> &str {
        &self.cookie.name
    }

    async fn create_session(&self, user_id: UserId) -> Result<Session, AppError> {
        let session = self.sm.create_session(user_id).await;
        info!(%user_id, "created session");
        Ok(session)
    }

    async fn validate_session(&self, session_id: &str) -> Result<SessionValidation, AppError> {
        let Some(session) = self.sm.validate(session_id).await else {
            return Ok(SessionValidation::default());
        };

        match self.users.find_by_id(session.user_id).await? {
            Some(record) => Ok(SessionValidation {
                user: Some(record.user),
                session: Some(session),
            }),
            None => {
                warn!(user_id = %session.user_id, "session refers to a missing user");
                self.sm.invalidate(&session.id).await;
                Ok(SessionValidation::default())
            },
        }
    }

    async fn invalidate_session(&self, session_id: &str) -> Result<(), AppError> {
        self.sm.invalidate(session_id).await;
        Ok(())
    }

    fn create_session_cookie(&self, session: &Session) -> Cookie<'static> {
        self.cookie.session_cookie(session)
    }

    fn create_blank_session_cookie(&self) -> Cookie<'static> {
        self.cookie.blank_cookie()
    }
}
