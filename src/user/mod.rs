// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! User identity records and the user store interface
//!
//! The concrete user store is an external collaborator; the core only
//! depends on the [`UserStore`] trait. An in-memory implementation is
//! provided for single-instance deployments and tests.

mod password;

pub use password::{Argon2PasswordHasher, PasswordHasher};

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Identity record owned by the user store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Normalized (trimmed, lowercased) email, unique across the store
    pub email: String,

    /// Password hash at rest, never a plaintext password
    pub password_hash: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user from an already-normalized email and a computed hash
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Normalize and validate an email at the boundary
///
/// Parse, don't re-validate downstream: everything past this function works
/// with the normalized form. The check is deliberately shallow (non-empty
/// local part and domain around a single `@`); deliverability is not this
/// core's concern.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] for anything that does not look like
/// an email address.
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::Validation(format!("invalid email address: {raw:?}"))),
    }
}

/// Interface the core consumes for user persistence
///
/// Implementations are external collaborators; the wire format behind
/// these calls is out of scope here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user
    async fn save(&self, user: User) -> Result<(), AuthError>;

    /// Look up a user by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Look up a user by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Delete a user by id
    async fn delete(&self, id: Uuid) -> Result<(), AuthError>;

    /// Check whether a user with this normalized email exists
    async fn exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Replace an existing user record
    async fn update(&self, user: User) -> Result<(), AuthError>;
}

/// Process-local user store for single-instance deployments and tests
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn save(&self, user: User) -> Result<(), AuthError> {
        self.lock()?.insert(user.id, user);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        self.lock()?.remove(&id);
        Ok(())
    }

    async fn exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.lock()?.values().any(|u| u.email == email))
    }

    async fn update(&self, mut user: User) -> Result<(), AuthError> {
        user.updated_at = Utc::now();
        self.lock()?.insert(user.id, user);
        Ok(())
    }
}

impl InMemoryUserStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, User>>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::Internal("user store lock poisoned".to_string()))
    }
}
