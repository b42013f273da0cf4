// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session store interface and in-memory implementation
//!
//! The concrete session store is an external collaborator. The in-memory
//! implementation expires entries natively on read: a session past its
//! refresh expiry is never returned, which makes the explicit cleanup sweep
//! a best-effort space reclaim rather than a correctness requirement.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::model::Session;
use crate::error::AuthError;

/// Interface the core consumes for session persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session
    async fn save(&self, session: Session) -> Result<(), AuthError>;

    /// Look up a session by id; expired sessions read as absent
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, AuthError>;

    /// All live sessions for a user
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError>;

    /// Hard-delete one session
    async fn delete(&self, id: Uuid) -> Result<(), AuthError>;

    /// Hard-delete every session of a user
    async fn delete_by_user_id(&self, user_id: Uuid) -> Result<(), AuthError>;

    /// Reclaim expired entries; returns how many were removed
    async fn delete_expired(&self) -> Result<usize, AuthError>;
}

/// Process-local session store for single-instance deployments and tests
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Session>>, AuthError> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::Internal("session store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: Session) -> Result<(), AuthError> {
        self.lock()?.insert(session.id, session);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, AuthError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .get(&id)
            .filter(|s| s.is_refresh_valid(now))
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .values()
            .filter(|s| s.user_id == user_id && s.is_refresh_valid(now))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AuthError> {
        self.lock()?.remove(&id);
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.lock()?.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_refresh_valid(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn expired_session(user_id: Uuid) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id,
            email: "a@x.com".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            access_expires_at: now - Duration::seconds(120),
            refresh_expires_at: now - Duration::seconds(60),
            roles: vec![],
            permissions: vec![],
            metadata: HashMap::new(),
            created_at: now - Duration::seconds(600),
        }
    }

    #[tokio::test]
    async fn expired_sessions_read_as_absent() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session = expired_session(user_id);
        let id = session.id;
        store.save(session).await.unwrap();

        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert!(store.find_by_user_id(user_id).await.unwrap().is_empty());
        // the entry is still physically present until the sweep reclaims it
        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert_eq!(store.delete_expired().await.unwrap(), 0);
    }
}
