// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Credential providers
//!
//! A provider turns a credential payload (password form, OAuth callback
//! parameters) into a provider-neutral [`AuthenticatedUser`]. Providers are
//! looked up by method name through the [`ProviderRegistry`]; OAuth-capable
//! providers additionally expose the [`OAuthProvider`] capability for the
//! authorization-code flow.

mod oauth;
mod password;
mod registry;
mod state;

// Re-export the public API
pub use oauth::OAuth2Provider;
pub use password::{EmailPasswordProvider, EMAIL_PASSWORD_METHOD};
pub use registry::ProviderRegistry;
pub use state::{InMemoryOAuthStateStore, OAuthState, OAuthStateStore};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AuthError;

/// Provider-neutral normalized identity
///
/// Transient: never persisted as-is. The orchestrator consumes it
/// immediately to resolve or create a local [`crate::user::User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Pre-existing local user id, when the provider authenticated against
    /// the local user store (the password provider sets this)
    pub user_id: Option<Uuid>,

    /// Email asserted by the provider
    pub email: String,

    /// Whether the provider vouches for the email
    pub email_verified: bool,

    /// Display name, if the provider exposes one
    pub name: Option<String>,

    /// Avatar URL, if the provider exposes one
    pub picture: Option<String>,

    /// Method tag of the provider that produced this identity
    pub method: String,

    /// Provider-side user id (e.g. the OIDC `sub`)
    pub provider_user_id: Option<String>,

    /// Free-form provider metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Capability every credential provider implements
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Method name this provider answers to (e.g. "password", "google")
    fn method(&self) -> &str;

    /// Authenticate a credential payload into a normalized identity
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for a bad password or a rejected
    /// authorization code; [`AuthError::Validation`] for a malformed
    /// payload; [`AuthError::Provider`] for upstream failures.
    async fn authenticate(&self, credentials: Value) -> Result<AuthenticatedUser, AuthError>;

    /// The OAuth capability of this provider, if it has one
    fn as_oauth(&self) -> Option<&dyn OAuthProvider> {
        None
    }
}

/// Parameters for building an authorization URL
#[derive(Debug, Clone)]
pub struct AuthorizationUrlParams {
    /// Redirect URI the provider sends the user agent back to
    pub redirect_uri: String,
    /// CSRF state value the callback must echo
    pub state: String,
    /// Scope override; the provider's configured scope applies when `None`
    pub scope: Option<String>,
    /// PKCE S256 code challenge, when the initiating client uses PKCE
    pub code_challenge: Option<String>,
}

/// Token response from an OAuth2 code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Additional capability of OAuth2 authorization-code providers
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Build the provider's authorization URL for the given parameters
    fn authorization_url(&self, params: &AuthorizationUrlParams) -> Result<String, AuthError>;

    /// Exchange an authorization code for provider tokens
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens, AuthError>;

    /// Fetch the normalized profile behind a provider access token
    async fn get_user_info(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError>;
}
