// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session record: one authenticated device/browser instance
//!
//! A session pairs an access token with a refresh token and tracks both
//! expiries. Invariant: `access_expires_at <= refresh_expires_at`; the
//! refresh expiry is the session's absolute lifetime (store TTL equals the
//! refresh TTL). Sessions are destroyed, never archived.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Time-based state of a stored session
///
/// `INVALIDATED` has no variant here: an invalidated session is simply
/// absent from the store, indistinguishable from one that never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Both tokens unexpired
    Active,
    /// Access token past expiry, refresh token still valid; client must refresh
    AccessExpired,
    /// Refresh token past expiry; the session is dead and must be treated as absent
    Expired,
}

/// One authenticated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Email snapshot taken at creation
    pub email: String,

    /// Signed access token string
    pub access_token: String,

    /// Signed refresh token string
    pub refresh_token: String,

    /// Access token expiry
    pub access_expires_at: DateTime<Utc>,

    /// Refresh token expiry; also the session's absolute lifetime
    pub refresh_expires_at: DateTime<Utc>,

    /// Roles granted to this session
    #[serde(default)]
    pub roles: Vec<String>,

    /// Permissions granted to this session
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Free-form metadata attached at creation
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// True while the access token window has not elapsed
    pub fn is_access_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.access_expires_at
    }

    /// True while the refresh token window has not elapsed
    pub fn is_refresh_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_expires_at
    }

    /// Current position in the session state machine
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_access_valid(now) {
            SessionState::Active
        } else if self.is_refresh_valid(now) {
            SessionState::AccessExpired
        } else {
            SessionState::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(access_secs: i64, refresh_secs: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            access_expires_at: now + Duration::seconds(access_secs),
            refresh_expires_at: now + Duration::seconds(refresh_secs),
            roles: vec![],
            permissions: vec![],
            metadata: HashMap::new(),
            created_at: now,
        }
    }

    #[test]
    fn state_machine_transitions_on_time() {
        let now = Utc::now();
        assert_eq!(session(900, 3600).state(now), SessionState::Active);
        assert_eq!(session(-10, 3600).state(now), SessionState::AccessExpired);
        assert_eq!(session(-3600, -10).state(now), SessionState::Expired);
    }
}
