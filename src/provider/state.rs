// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One-time CSRF state for the OAuth authorization-code flow
//!
//! A state value binds an authorization attempt to its provider and
//! redirect URI for a bounded window (10 minutes). Consumption is atomic
//! and exactly-once: the first successful `consume` removes the entry, a
//! second attempt with the same value returns `None`.
//!
//! The store sits behind a trait so a multi-instance deployment can swap
//! the process-local map for a shared keyed store with TTL and atomic
//! consume-once semantics.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default lifetime of an unconsumed state entry
pub const STATE_TTL_SECS: i64 = 600;

/// CSRF-protection record for one authorization attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// The unguessable `state` parameter value
    pub value: String,

    /// Provider method the attempt was initiated for
    pub provider: String,

    /// Redirect URI the callback must arrive on
    pub redirect_uri: String,

    /// PKCE S256 code challenge, when the initiating client uses PKCE
    pub code_challenge: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    /// Whether the entry has outlived its window
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Interface for issuing and consuming one-time CSRF states
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    /// Create and store a fresh state bound to a provider and redirect URI
    async fn issue(
        &self,
        provider: &str,
        redirect_uri: &str,
        code_challenge: Option<String>,
    ) -> Result<OAuthState, AuthError>;

    /// Consume a state value exactly once
    ///
    /// Removes the entry on success. Unknown, already-consumed and expired
    /// values all read as `None`.
    async fn consume(&self, value: &str) -> Result<Option<OAuthState>, AuthError>;

    /// Garbage-collect entries past their TTL; returns how many were removed
    async fn sweep_expired(&self) -> Result<usize, AuthError>;
}

/// Process-local state store for single-instance deployments and tests
pub struct InMemoryOAuthStateStore {
    states: Mutex<HashMap<String, OAuthState>>,
    ttl: Duration,
}

impl Default for InMemoryOAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOAuthStateStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(STATE_TTL_SECS))
    }

    /// Override the TTL (shorter windows are useful in tests)
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, OAuthState>>, AuthError> {
        self.states
            .lock()
            .map_err(|_| AuthError::Internal("oauth state store lock poisoned".to_string()))
    }
}

fn random_state_value() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[async_trait]
impl OAuthStateStore for InMemoryOAuthStateStore {
    async fn issue(
        &self,
        provider: &str,
        redirect_uri: &str,
        code_challenge: Option<String>,
    ) -> Result<OAuthState, AuthError> {
        let state = OAuthState {
            value: random_state_value(),
            provider: provider.to_string(),
            redirect_uri: redirect_uri.to_string(),
            code_challenge,
            created_at: Utc::now(),
        };
        self.lock()?.insert(state.value.clone(), state.clone());
        Ok(state)
    }

    async fn consume(&self, value: &str) -> Result<Option<OAuthState>, AuthError> {
        let removed = self.lock()?.remove(value);
        Ok(removed.filter(|s| !s.is_expired(Utc::now(), self.ttl)))
    }

    async fn sweep_expired(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let mut states = self.lock()?;
        let before = states.len();
        states.retain(|_, s| !s.is_expired(now, self.ttl));
        Ok(before - states.len())
    }
}
