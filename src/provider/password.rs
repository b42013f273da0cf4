// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Email/password credential provider
//!
//! Validates an email/password pair against the user store through the
//! password-hashing primitive. Unknown email and wrong password are
//! indistinguishable to the caller: both are `InvalidCredentials`.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{AuthProvider, AuthenticatedUser};
use crate::error::AuthError;
use crate::user::{normalize_email, PasswordHasher, UserStore};

/// Method name the password provider registers under
pub const EMAIL_PASSWORD_METHOD: &str = "password";

#[derive(Debug, Deserialize)]
struct PasswordCredentials {
    email: String,
    password: String,
}

/// Provider authenticating against the local user store
pub struct EmailPasswordProvider {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl EmailPasswordProvider {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl AuthProvider for EmailPasswordProvider {
    fn method(&self) -> &str {
        EMAIL_PASSWORD_METHOD
    }

    async fn authenticate(&self, credentials: Value) -> Result<AuthenticatedUser, AuthError> {
        let creds: PasswordCredentials = serde_json::from_value(credentials)
            .map_err(|e| AuthError::Validation(format!("malformed password credentials: {e}")))?;
        let email = normalize_email(&creds.email)?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("password login for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };
        if !self.hasher.verify(&creds.password, &user.password_hash) {
            debug!("password verification failed for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthenticatedUser {
            user_id: Some(user.id),
            email: user.email,
            email_verified: true,
            name: None,
            picture: None,
            method: EMAIL_PASSWORD_METHOD.to_string(),
            provider_user_id: None,
            metadata: Default::default(),
        })
    }
}
