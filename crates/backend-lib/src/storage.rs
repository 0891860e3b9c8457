// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! User persistence with in-memory and flat-file implementations.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use cloudkit_common::{User, UserId};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::fs as tokio_fs;
use tracing::{debug, info};

use crate::error::AppError;

/// A user together with its password hash. Never sent to clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub hashed_password: String,
}

/// Trait for user storage backends
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Whether a user with this email is registered
    async fn exists(&self, email: &str) -> Result<bool, AppError>;

    /// Look a user up by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Look a user up by id
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AppError>;

    /// Store a new user; fails with [`AppError::CollectionAlreadyExists`] on a taken email
    async fn create(&self, record: UserRecord) -> Result<User, AppError>;
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Process-local repository, also used as the index of [`FlatFileStorage`]
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    by_email: Arc<DashMap<String, UserId>>,
    by_id: Arc<DashMap<UserId, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn insert(&self, record: UserRecord) -> Result<User, AppError> {
        match self.by_email.entry(email_key(&record.user.email)) {
            Entry::Occupied(_) => Err(AppError::CollectionAlreadyExists(format!(
                "User with email {} already exists",
                record.user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.user.id);
                let user = record.user.clone();
                self.by_id.insert(user.id, record);
                Ok(user)
            },
        }
    }

    fn remove(&self, record: &UserRecord) {
        self.by_email.remove(&email_key(&record.user.email));
        self.by_id.remove(&record.user.id);
    }

    fn lookup_email(&self, email: &str) -> Option<UserRecord> {
        let id = *self.by_email.get(&email_key(email))?;
        self.by_id.get(&id).map(|r| r.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.by_email.contains_key(&email_key(email)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.lookup_email(email))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AppError> {
        Ok(self.by_id.get(&id).map(|r| r.clone()))
    }

    async fn create(&self, record: UserRecord) -> Result<User, AppError> {
        self.insert(record)
    }
}

/// Flat-file implementation: one JSON document per user under `<root>/users/`
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    index: InMemoryUserRepository,
}

impl FlatFileStorage {
    /// Open the store, creating directories and loading existing users
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let users_dir = root.join("users");
        fs::create_dir_all(&users_dir)?;

        let index = InMemoryUserRepository::new();
        for entry in fs::read_dir(&users_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let record: UserRecord = serde_json::from_str(&content)?;
            index
                .insert(record)
                .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        }
        info!(users = index.len(), root = %root.display(), "loaded user store");

        Ok(Self { root, index })
    }

    fn user_path(&self, id: UserId) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }
}

#[async_trait]
impl UserRepository for FlatFileStorage {
    async fn exists(&self, email: &str) -> Result<bool, AppError> {
        self.index.exists(email).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        self.index.find_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AppError> {
        self.index.find_by_id(id).await
    }

    /// Claim the email in the index first, then write the document.
    async fn create(&self, record: UserRecord) -> Result<User, AppError> {
        let user = self.index.insert(record.clone())?;
        let path = self.user_path(user.id);
        let json = serde_json::to_string_pretty(&record)?;

        if let Err(err) = tokio_fs::write(&path, json).await {
            self.index.remove(&record);
            return Err(err.into());
        }
        debug!(user_id = %user.id, path = %path.display(), "stored user");

        Ok(user)
    }
}
