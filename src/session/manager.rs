// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session lifecycle management
//!
//! The [`SessionManager`] owns creation, validity checks, rotation and
//! invalidation. Token signing happens first, purely in memory; only the
//! fully-formed session is persisted, so no multi-step transaction spans a
//! create. Rotation on refresh is full replacement: the old record is
//! deleted and a brand-new session (new id, new token pair) is created,
//! which makes the old tokens unrecoverable immediately.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use super::model::Session;
use super::store::SessionStore;
use crate::error::AuthError;
use crate::token::TokenIssuer;

/// Creates, rotates and invalidates sessions backed by a token pair
#[derive(Clone)]
pub struct SessionManager {
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(issuer: Arc<TokenIssuer>, store: Arc<dyn SessionStore>) -> Self {
        Self { issuer, store }
    }

    /// Mint a new session for a user
    ///
    /// Generates a fresh session id, signs an access and a refresh token
    /// scoped to that id, computes both expiries from the current time and
    /// the configured TTLs, persists the session and returns it.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        email: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
        metadata: HashMap<String, Value>,
    ) -> Result<Session, AuthError> {
        let id = Uuid::new_v4();
        let sid = id.to_string();
        let uid = user_id.to_string();

        let access_token =
            self.issuer
                .sign_access(&uid, email, &sid, &roles, &permissions, &metadata)?;
        let refresh_token = self.issuer.sign_refresh(&uid, email, &sid)?;

        let now = Utc::now();
        let session = Session {
            id,
            user_id,
            email: email.to_string(),
            access_token,
            refresh_token,
            access_expires_at: now + self.issuer.access_ttl(),
            refresh_expires_at: now + self.issuer.refresh_ttl(),
            roles,
            permissions,
            metadata,
            created_at: now,
        };
        self.store.save(session.clone()).await?;
        debug!("created session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Look up a session by id
    pub async fn get_session_by_id(&self, id: Uuid) -> Result<Option<Session>, AuthError> {
        self.store.find_by_id(id).await
    }

    /// Verify an access token, then fetch the session its claims point at
    ///
    /// A session absent from the store is indistinguishable from one that
    /// never existed.
    pub async fn get_session_by_access_token(
        &self,
        token: &str,
    ) -> Result<Option<Session>, AuthError> {
        match self.issuer.verify_access(token).and_then(|c| parse_sid(&c.sid)) {
            Some(id) => self.store.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Verify a refresh token, then fetch the session its claims point at
    pub async fn get_session_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<Session>, AuthError> {
        match self.issuer.verify_refresh(token).and_then(|c| parse_sid(&c.sid)) {
            Some(id) => self.store.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// All live sessions for a user
    pub async fn get_sessions_by_user_id(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        self.store.find_by_user_id(user_id).await
    }

    /// True while the session's refresh window has not elapsed
    pub fn is_session_valid(&self, session: &Session) -> bool {
        session.is_refresh_valid(Utc::now())
    }

    /// True while the session's access window has not elapsed
    pub fn is_access_token_valid(&self, session: &Session) -> bool {
        session.is_access_valid(Utc::now())
    }

    /// True while the session's refresh window has not elapsed
    pub fn is_refresh_token_valid(&self, session: &Session) -> bool {
        session.is_refresh_valid(Utc::now())
    }

    /// Rotate a session: delete the old record, mint a replacement
    ///
    /// The replacement carries forward user, email, roles, permissions and
    /// metadata but gets a new id and a new token pair. This is a full
    /// rotation, not an in-place TTL extension; it closes the replay window
    /// for both old tokens.
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError> {
        self.store.delete(session.id).await?;
        debug!("rotating session {} for user {}", session.id, session.user_id);
        self.create_session(
            session.user_id,
            &session.email,
            session.roles.clone(),
            session.permissions.clone(),
            session.metadata.clone(),
        )
        .await
    }

    /// Hard-delete one session
    pub async fn invalidate_session(&self, id: Uuid) -> Result<(), AuthError> {
        self.store.delete(id).await
    }

    /// Hard-delete every session of a user
    pub async fn invalidate_all_user_sessions(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.delete_by_user_id(user_id).await
    }

    /// Best-effort sweep of expired sessions
    ///
    /// A store that expires entries natively may make this a no-op.
    pub async fn cleanup_expired_sessions(&self) -> Result<usize, AuthError> {
        self.store.delete_expired().await
    }
}

fn parse_sid(sid: &str) -> Option<Uuid> {
    Uuid::parse_str(sid).ok()
}
