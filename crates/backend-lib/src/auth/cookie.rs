//! Session cookie construction.
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::Session;

/// Name used when none is configured
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "auth_session";

/// Attributes shared by every session cookie
#[derive(Clone, Debug)]
pub struct SessionCookieConfig {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl SessionCookieConfig {
    /// Cookie carrying `session`'s id
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        self.build(session.id.clone(), Duration::seconds(self.max_age_secs))
    }

    /// Empty cookie that makes the browser drop the session cookie
    pub fn blank_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), Duration::ZERO)
    }

    fn build(&self, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            secure: true,
            max_age_secs: super::SESSION_TTL.as_secs() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_session_cookie_attributes() {
        let config = SessionCookieConfig {
            name: "sid".to_string(),
            secure: false,
            max_age_secs: 3600,
        };
        let session = Session {
            id: "abc123".to_string(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now(),
            fresh: true,
        };

        let cookie = config.session_cookie(&session);
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));

        let rendered = cookie.to_string();
        assert!(rendered.starts_with("sid=abc123"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_blank_cookie_expires_immediately() {
        let cookie = SessionCookieConfig::default().blank_cookie();
        assert_eq!(cookie.name(), DEFAULT_SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.secure(), Some(true));
        assert!(cookie.to_string().contains("Max-Age=0"));
    }
}
