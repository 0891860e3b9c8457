// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cloudkit_common::UserId;
use metrics::{counter, gauge};
use rand::{distr::Alphanumeric, Rng};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;

/// Default session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30); // 30 days

const SESSION_ID_LENGTH: usize = 40;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Session information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    /// Set when validation just extended the expiry; the cookie must be re-issued
    pub fresh: bool,
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: ChronoDuration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::days(30)),
        }
    }

    pub fn ttl(&self) -> ChronoDuration {
        self.ttl
    }

    /// Create a new session
    pub async fn create_session(&self, user_id: UserId) -> Session {
        let session = Session {
            id: generate_session_id(),
            user_id,
            expires_at: Utc::now() + self.ttl,
            fresh: true,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), Session { fresh: false, ..session.clone() });

        counter!("session.created").increment(1);
        gauge!("session.active").set(sessions.len() as f64);

        session
    }

    /// Validate a session id.
    ///
    /// Expired sessions are dropped. A session past half its lifetime gets a
    /// new expiry and comes back with `fresh` set.
    pub async fn validate(&self, session_id: &str) -> Option<Session> {
        if session_id.is_empty() {
            return None;
        }

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let session = sessions.get_mut(session_id)?;

        if now >= session.expires_at {
            sessions.remove(session_id);
            counter!("session.expired").increment(1);
            gauge!("session.active").set(sessions.len() as f64);
            return None;
        }

        if session.expires_at - now < self.ttl / 2 {
            session.expires_at = now + self.ttl;
            debug!(user_id = %session.user_id, "extended session");
            return Some(Session { fresh: true, ..session.clone() });
        }

        Some(session.clone())
    }

    /// Remove a session
    pub async fn invalidate(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            counter!("session.invalidated").increment(1);
            gauge!("session.active").set(sessions.len() as f64);
        }
    }

    /// Remove every session belonging to a user
    pub async fn invalidate_user_sessions(&self, user_id: UserId) {
        let mut sessions = self.sessions.write().await;
        let before_count = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        let removed = before_count - sessions.len();
        if removed > 0 {
            counter!("session.invalidated").increment(removed as u64);
            gauge!("session.active").set(sessions.len() as f64);
        }
    }

    /// Drop expired sessions, returning how many were removed
    pub async fn remove_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before_count = sessions.len();

        sessions.retain(|_, session| now < session.expires_at);

        let after_count = sessions.len();
        let removed = before_count - after_count;

        if removed > 0 {
            counter!("session.expired").increment(removed as u64);
            gauge!("session.active").set(after_count as f64);
        }
        removed
    }

    /// Spawn the task that periodically removes expired sessions
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVAL).await;
                let removed = manager.remove_expired().await;
                if removed > 0 {
                    debug!(removed, "removed expired sessions");
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) async fn set_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.expires_at = expires_at;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_and_validate() {
        let manager = SessionManager::default();
        let user_id = Uuid::new_v4();
        let session = manager.create_session(user_id).await;

        assert_eq!(session.id.len(), SESSION_ID_LENGTH);
        assert!(session.id.chars().all(|c| c.is_ascii_alphanumeric()));

        let validated = manager.validate(&session.id).await.unwrap();
        assert_eq!(validated.user_id, user_id);
        assert!(!validated.fresh);
        assert!(manager.validate("unknown").await.is_none());
        assert!(manager.validate("").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_dropped() {
        let manager = SessionManager::default();
        let session = manager.create_session(Uuid::new_v4()).await;
        manager
            .set_expiry(&session.id, Utc::now() - ChronoDuration::seconds(1))
            .await;

        assert!(manager.validate(&session.id).await.is_none());
        assert_eq!(manager.remove_expired().await, 0);
    }

    #[tokio::test]
    async fn test_session_past_half_life_is_extended() {
        let manager = SessionManager::new(Duration::from_secs(100));
        let session = manager.create_session(Uuid::new_v4()).await;
        manager
            .set_expiry(&session.id, Utc::now() + ChronoDuration::seconds(10))
            .await;

        let refreshed = manager.validate(&session.id).await.unwrap();
        assert!(refreshed.fresh);
        assert!(refreshed.expires_at > Utc::now() + ChronoDuration::seconds(90));

        let again = manager.validate(&session.id).await.unwrap();
        assert!(!again.fresh);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let manager = SessionManager::default();
        let user_id = Uuid::new_v4();
        let first = manager.create_session(user_id).await;
        let second = manager.create_session(user_id).await;
        let other = manager.create_session(Uuid::new_v4()).await;

        manager.invalidate(&first.id).await;
        assert!(manager.validate(&first.id).await.is_none());
        assert!(manager.validate(&second.id).await.is_some());

        manager.invalidate_user_sessions(user_id).await;
        assert!(manager.validate(&second.id).await.is_none());
        assert!(manager.validate(&other.id).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let manager = SessionManager::default();
        let stale = manager.create_session(Uuid::new_v4()).await;
        let live = manager.create_session(Uuid::new_v4()).await;
        manager
            .set_expiry(&stale.id, Utc::now() - ChronoDuration::seconds(5))
            .await;

        assert_eq!(manager.remove_expired().await, 1);
        assert!(manager.validate(&live.id).await.is_some());
    }
}
