// ============================
// crates/backend-lib/src/users.rs
// ============================
//! Registration and credential checks on top of a [`UserRepository`].
use std::sync::Arc;

use chrono::Utc;
use cloudkit_common::{AuthenticateUser, RegisterUser, User};
use metrics::counter;
use tracing::info;
use uuid::Uuid;

use crate::auth::{verify_password, PasswordHasher};
use crate::error::AppError;
use crate::storage::{UserRecord, UserRepository};

/// Result of checking a set of credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    UnknownEmail,
    WrongPassword,
    Authenticated(User),
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { repo, hasher }
    }

    pub async fn exists(&self, email: &str) -> Result<bool, AppError> {
        self.repo.exists(email).await
    }

    /// Hash the password and store a new user
    pub async fn create_user(&self, form: RegisterUser) -> Result<User, AppError> {
        let hasher = self.hasher;
        let password = form.password;
        let hashed_password = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let record = UserRecord {
            user: User {
                id: Uuid::new_v4(),
                email: form.email,
                name: form.name,
                created_at: Utc::now(),
            },
            hashed_password,
        };
        let user = self.repo.create(record).await?;

        counter!("auth.register").increment(1);
        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Check an email/password pair
    pub async fn authenticate(&self, credentials: &AuthenticateUser) -> Result<AuthOutcome, AppError> {
        let Some(record) = self.repo.find_by_email(&credentials.email).await? else {
            counter!("auth.login_failed").increment(1);
            return Ok(AuthOutcome::UnknownEmail);
        };

        let hash = record.hashed_password;
        let password = credentials.password.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &password)).await?;

        if valid {
            counter!("auth.login").increment(1);
            Ok(AuthOutcome::Authenticated(record.user))
        } else {
            counter!("auth.login_failed").increment(1);
            Ok(AuthOutcome::WrongPassword)
        }
    }
}
