// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the cloudkit web client and the auth backend.
//! This module defines the request payloads of the auth API and the public user shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a registered user
pub type UserId = Uuid;

/// Credentials sent to `PUT /api/v1/auth`
/// # Fields
/// * `email` - Address the account was registered with
/// * `password` - Plain-text password, only ever compared against the stored hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateUser {
    pub email: String,
    pub password: String,
}

/// Registration form posted to `POST /api/v1/auth`
/// # Fields
/// * `email` - Unique login address
/// * `name` - Display name
/// * `password` - Chosen password
/// * `confirm_password` - Must repeat `password`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

/// A user as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable user identifier
    pub id: UserId,
    /// Login address
    pub email: String,
    /// Display name
    pub name: String,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// Body of the 400 returned for an unknown email on login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}
