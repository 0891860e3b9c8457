// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core functionality for the cloudkit auth backend: session cookies,
//! login/registration handlers and per-route request validation.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod users;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthService, DefaultAuth, PasswordHasher, SessionManager};
use crate::config::Settings;
use crate::error::AppError;
use crate::storage::{FlatFileStorage, UserRepository};
use crate::users::UserService;
use crate::validation::RequestValidator;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session library
    pub auth: Arc<dyn AuthService>,
    /// Session store behind `auth`, kept for the cleanup task
    pub sessions: SessionManager,
    /// Registration and credential checks
    pub users: UserService,
    /// Request validator
    pub validator: RequestValidator,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state
    pub fn new(repo: Arc<dyn UserRepository>, settings: Settings) -> Result<Self, AppError> {
        let sessions = SessionManager::new(settings.session.ttl());
        let auth: Arc<dyn AuthService> = Arc::new(DefaultAuth::new(
            sessions.clone(),
            repo.clone(),
            settings.session.cookie_config(),
        ));
        let hasher = PasswordHasher::new(settings.password.scrypt_log_n)?;

        Ok(Self {
            validator: RequestValidator::new(auth.clone(), settings.validation.enforce_params),
            users: UserService::new(repo, hasher),
            auth,
            sessions,
            settings: Arc::new(settings),
        })
    }

    /// Create a new application state backed by the flat-file store in `settings.storage.path`
    pub fn with_flat_file_storage(settings: Settings) -> anyhow::Result<Self> {
        let storage = FlatFileStorage::new(&settings.storage.path)?;
        Ok(Self::new(Arc::new(storage), settings)?)
    }
}
