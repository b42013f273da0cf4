// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Application configuration
//!
//! Typed configuration for the authentication core: token signing parameters
//! and OAuth2 provider clients. Configuration can come from three places,
//! in the order a deployment usually layers them:
//!
//! 1. `Config::default()` - development defaults
//! 2. `Config::from_file()` - a YAML file
//! 3. `Config::from_env()` - environment variables, the primary mechanism
//!
//! # Environment variables
//!
//! * `AUTHCORE_JWT_SECRET` - HMAC signing secret
//! * `AUTHCORE_TOKEN_ISSUER` / `AUTHCORE_TOKEN_AUDIENCE`
//! * `AUTHCORE_ACCESS_TTL_SECS` / `AUTHCORE_REFRESH_TTL_SECS`
//! * `AUTHCORE_OAUTH_PROVIDERS` - comma-separated method names; each name
//!   `<M>` is then loaded from `AUTHCORE_<M>_CLIENT_ID`, `_CLIENT_SECRET`
//!   and the endpoint variables (see [`OAuthClientConfig::from_env`])

mod providers;
mod token;

pub use providers::OAuthClientConfig;
pub use token::TokenConfig;

use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Root configuration for the authentication core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Token signing configuration
    #[serde(default)]
    pub token: TokenConfig,

    /// OAuth2 provider clients to register at startup
    #[serde(default)]
    pub oauth: Vec<OAuthClientConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, does not parse as YAML matching
    /// the config shape, or violates a token invariant.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.token.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment
    ///
    /// Unset variables fall back to defaults; a default signing secret in
    /// the environment-backed path is logged as a warning since that only
    /// makes sense in development.
    pub fn from_env() -> Result<Self> {
        let defaults = TokenConfig::default();
        let token = TokenConfig {
            secret: std::env::var("AUTHCORE_JWT_SECRET").unwrap_or_else(|_| {
                warn!("AUTHCORE_JWT_SECRET not set, using the development default");
                defaults.secret.clone()
            }),
            issuer: std::env::var("AUTHCORE_TOKEN_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("AUTHCORE_TOKEN_AUDIENCE").unwrap_or(defaults.audience),
            access_ttl_secs: env_i64("AUTHCORE_ACCESS_TTL_SECS", defaults.access_ttl_secs)?,
            refresh_ttl_secs: env_i64("AUTHCORE_REFRESH_TTL_SECS", defaults.refresh_ttl_secs)?,
        };
        token.validate()?;

        let mut oauth = Vec::new();
        if let Ok(methods) = std::env::var("AUTHCORE_OAUTH_PROVIDERS") {
            for method in methods.split(',').map(str::trim).filter(|m| !m.is_empty()) {
                match OAuthClientConfig::from_env(method) {
                    Some(client) => oauth.push(client),
                    None => warn!("OAuth provider {method} listed but has no client id, skipping"),
                }
            }
        }

        Ok(Self { token, oauth })
    }
}

fn env_i64(name: &str, default: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("{name} must be an integer, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
