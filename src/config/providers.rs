// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OAuth2 provider client configuration
//!
//! This module defines [`OAuthClientConfig`], the per-provider parameters
//! required to drive an OAuth2 authorization-code flow: client credentials,
//! the provider's three endpoints, and the scopes to request.
//!
//! The response shapes of concrete providers are not modeled here; any
//! provider whose token endpoint speaks standard `access_token` JSON and
//! whose userinfo endpoint returns an OIDC-ish profile works unmodified.

use serde::{Deserialize, Serialize};

/// Configuration for one OAuth2/OIDC provider client
///
/// # Example
///
/// ```
/// use authcore::config::OAuthClientConfig;
///
/// let google = OAuthClientConfig {
///     method: "google".to_string(),
///     client_id: "my-client-id".to_string(),
///     client_secret: "my-client-secret".to_string(),
///     authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
///     token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
///     userinfo_endpoint: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
///     scope: "openid email profile".to_string(),
/// };
/// assert_eq!(google.method, "google");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    /// Authentication method name this provider registers under (e.g. "google")
    pub method: String,

    /// OAuth2 client ID registered with the provider
    pub client_id: String,

    /// OAuth2 client secret registered with the provider
    pub client_secret: String,

    /// Authorization endpoint the user agent is redirected to
    pub authorization_endpoint: String,

    /// Token endpoint used for the authorization-code exchange
    pub token_endpoint: String,

    /// Userinfo endpoint queried with the provider access token
    pub userinfo_endpoint: String,

    /// Space-separated list of scopes to request
    pub scope: String,
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            method: "oauth".to_string(),
            client_id: "authcore-client".to_string(),
            client_secret: String::new(),
            authorization_endpoint: "https://localhost:8080/authorize".to_string(),
            token_endpoint: "https://localhost:8080/token".to_string(),
            userinfo_endpoint: "https://localhost:8080/userinfo".to_string(),
            scope: "openid email profile".to_string(),
        }
    }
}

impl OAuthClientConfig {
    /// Load a provider client from the environment
    ///
    /// Reads `AUTHCORE_<METHOD>_CLIENT_ID`, `_CLIENT_SECRET`,
    /// `_AUTHORIZATION_ENDPOINT`, `_TOKEN_ENDPOINT`, `_USERINFO_ENDPOINT`
    /// and `_SCOPE`, where `<METHOD>` is the uppercased method name.
    /// Returns `None` when the client id is not set; endpoint variables
    /// fall back to the defaults.
    pub fn from_env(method: &str) -> Option<Self> {
        let prefix = format!("AUTHCORE_{}", method.to_uppercase());
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        let client_id = var("CLIENT_ID")?;
        let defaults = Self::default();
        Some(Self {
            method: method.to_string(),
            client_id,
            client_secret: var("CLIENT_SECRET").unwrap_or_default(),
            authorization_endpoint: var("AUTHORIZATION_ENDPOINT")
                .unwrap_or(defaults.authorization_endpoint),
            token_endpoint: var("TOKEN_ENDPOINT").unwrap_or(defaults.token_endpoint),
            userinfo_endpoint: var("USERINFO_ENDPOINT").unwrap_or(defaults.userinfo_endpoint),
            scope: var("SCOPE").unwrap_or(defaults.scope),
        })
    }
}
