// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token signing configuration
//!
//! This module defines the [`TokenConfig`] struct holding everything the
//! [`crate::token::TokenIssuer`] is constructed from: the HMAC secret, the
//! issuer and audience strings, and the access/refresh token lifetimes.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

fn default_access_ttl() -> i64 {
    900
}

fn default_refresh_ttl() -> i64 {
    604_800
}

/// Configuration for JWT signing and verification
///
/// # Example
///
/// ```
/// use authcore::config::TokenConfig;
///
/// let config = TokenConfig {
///     secret: "your-hmac-secret".to_string(),
///     ..TokenConfig::default()
/// };
/// assert_eq!(config.access_ttl_secs, 900);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HMAC-SHA256 signing secret
    ///
    /// Shared by signing and verification. Must be overridden in production.
    pub secret: String,

    /// Value of the `iss` claim, enforced on verification
    pub issuer: String,

    /// Value of the `aud` claim, enforced on verification
    pub audience: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    ///
    /// Also the absolute lifetime of a session: the session store TTL
    /// equals this value.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            // Development-only default (should be changed in production)
            secret: "authcore-development-secret".to_string(),
            issuer: "authcore".to_string(),
            audience: "authcore-client".to_string(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
        }
    }
}

impl TokenConfig {
    /// Check invariants the token layer relies on
    ///
    /// # Errors
    ///
    /// Fails if the secret is empty, a TTL is non-positive, or the access
    /// TTL exceeds the refresh TTL (which would break the
    /// `accessTokenExpiresAt <= refreshTokenExpiresAt` session invariant).
    pub fn validate(&self) -> Result<()> {
        if self.secret.is_empty() {
            bail!("token secret must not be empty");
        }
        if self.access_ttl_secs <= 0 || self.refresh_ttl_secs <= 0 {
            bail!("token TTLs must be positive");
        }
        if self.access_ttl_secs > self.refresh_ttl_secs {
            bail!(
                "access TTL ({}s) must not exceed refresh TTL ({}s)",
                self.access_ttl_secs,
                self.refresh_ttl_secs
            );
        }
        Ok(())
    }
}
