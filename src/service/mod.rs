// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication orchestrator
//!
//! [`AuthService`] is the single entry point of the core: registration,
//! login (password and OAuth), token refresh, logout and validation all go
//! through it. It composes the token issuer, the session manager, the
//! provider registry, the one-time OAuth state store and the user store;
//! callers never touch those collaborators directly.
//!
//! Session policy is single-session and uniform: every successful
//! registration or login first invalidates all existing sessions of the
//! user, then creates exactly one new session. The same rule applies to
//! every provider so a password login and an OAuth login for the same
//! account cannot coexist.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::OAuthClientConfig;
use crate::error::AuthError;
use crate::limiter::RateLimiter;
use crate::provider::{
    AuthProvider, AuthenticatedUser, AuthorizationUrlParams, EmailPasswordProvider,
    OAuth2Provider, OAuthStateStore, ProviderRegistry,
};
use crate::session::{Session, SessionManager, SessionStore};
use crate::token::{JwtClaims, TokenIssuer};
use crate::user::{normalize_email, PasswordHasher, User, UserStore};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// User record as exposed to callers; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Session as exposed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for PublicSession {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            access_expires_at: session.access_expires_at,
            refresh_expires_at: session.refresh_expires_at,
            roles: session.roles.clone(),
            permissions: session.permissions.clone(),
            created_at: session.created_at,
        }
    }
}

/// Outcome of a successful register, login or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    pub user: PublicUser,
    pub session: PublicSession,
}

/// Authorization URL handed to the client, with its bound CSRF state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUrl {
    pub url: String,
    pub state: String,
}

/// Result of validating an access token
///
/// `valid` is true only when the token verifies, its session still exists
/// and its user still exists; `claims` and `user` are populated only then.
#[derive(Debug, Clone, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub claims: Option<JwtClaims>,
    pub user: Option<PublicUser>,
}

impl TokenValidation {
    fn invalid() -> Self {
        Self {
            valid: false,
            claims: None,
            user: None,
        }
    }
}

/// The authentication core's orchestrator
pub struct AuthService {
    issuer: Arc<TokenIssuer>,
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: SessionManager,
    registry: Arc<ProviderRegistry>,
    states: Arc<dyn OAuthStateStore>,
    limiter: Option<Arc<RateLimiter>>,
}

impl AuthService {
    /// Wire the orchestrator from its collaborators
    ///
    /// The email/password provider is registered automatically; OAuth
    /// providers are added through [`AuthService::register_oauth_client`].
    pub fn new(
        issuer: Arc<TokenIssuer>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        session_store: Arc<dyn SessionStore>,
        states: Arc<dyn OAuthStateStore>,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        registry.register(Arc::new(EmailPasswordProvider::new(
            users.clone(),
            hasher.clone(),
        )));
        Self {
            sessions: SessionManager::new(issuer.clone(), session_store),
            issuer,
            users,
            hasher,
            registry,
            states,
            limiter: None,
        }
    }

    /// Attach an attempt limiter to registration and password login
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Register a config-driven OAuth2 provider
    pub fn register_oauth_client(&self, config: OAuthClientConfig) {
        info!("registering OAuth provider: {}", config.method);
        self.registry.register(Arc::new(OAuth2Provider::new(config)));
    }

    /// Register a custom provider implementation
    pub fn register_provider(&self, provider: Arc<dyn AuthProvider>) {
        self.registry.register(provider);
    }

    /// The session manager backing this service
    pub fn session_manager(&self) -> &SessionManager {
        &self.sessions
    }

    /// Registered authentication method names
    pub fn methods(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Create an account and log it in
    ///
    /// The email is normalized before any lookup; the password must meet
    /// the minimum length. A taken email is an `AlreadyExists` conflict.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`], [`AuthError::AlreadyExists`],
    /// [`AuthError::RateLimitExceeded`], or [`AuthError::Internal`] on
    /// store/signing failures.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        self.register_with_attributes(email, password, Vec::new(), Vec::new(), HashMap::new())
            .await
    }

    /// Register with initial roles, permissions and session metadata
    pub async fn register_with_attributes(
        &self,
        email: &str,
        password: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
        metadata: HashMap<String, Value>,
    ) -> Result<AuthResult, AuthError> {
        let email = normalize_email(email)?;
        self.check_limit(&format!("register:{email}"))?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.users.exists(&email).await? {
            return Err(AuthError::AlreadyExists("user".to_string()));
        }

        let hash = self.hasher.hash(password)?;
        let user = User::new(&email, hash);
        self.users.save(user.clone()).await?;
        info!("registered user {}", user.id);

        let mut metadata = metadata;
        metadata.extend(session_metadata("password", None));
        self.start_session(&user, roles, permissions, metadata).await
    }

    /// Authenticate through a registered provider and open a session
    ///
    /// # Errors
    ///
    /// [`AuthError::UnsupportedMethod`] when no provider answers to
    /// `method`; otherwise whatever the provider reports, or
    /// [`AuthError::UserNotFound`] when the provider names a local user id
    /// that no longer exists.
    pub async fn login(&self, method: &str, credentials: Value) -> Result<AuthResult, AuthError> {
        let provider = self
            .registry
            .get(method)
            .ok_or_else(|| AuthError::UnsupportedMethod(method.to_string()))?;
        let identity = provider.authenticate(credentials).await?;
        self.complete_login(identity).await
    }

    /// Password login convenience wrapper
    pub async fn login_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, AuthError> {
        let normalized = normalize_email(email)?;
        self.check_limit(&format!("login:{normalized}"))?;
        self.login(
            crate::provider::EMAIL_PASSWORD_METHOD,
            json!({ "email": normalized, "password": password }),
        )
        .await
    }

    /// Complete an OAuth callback and open a session
    ///
    /// The CSRF state is consumed before anything else; a state that was
    /// never issued, was already consumed, expired, or is bound to a
    /// different provider or redirect URI fails as `InvalidCredentials`
    /// without any call to the upstream provider.
    pub async fn login_with_oauth(
        &self,
        method: &str,
        code: &str,
        state: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<AuthResult, AuthError> {
        let stored = self
            .states
            .consume(state)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if stored.provider != method || stored.redirect_uri != redirect_uri {
            warn!("OAuth state bound to a different provider or redirect URI");
            return Err(AuthError::InvalidCredentials);
        }

        self.login(
            method,
            json!({
                "code": code,
                "redirect_uri": redirect_uri,
                "code_verifier": code_verifier,
            }),
        )
        .await
    }

    /// Build an authorization URL and issue its one-time CSRF state
    ///
    /// # Errors
    ///
    /// [`AuthError::ProviderNotConfigured`] when the method is unknown or
    /// the provider has no OAuth capability.
    pub async fn get_oauth_url(
        &self,
        method: &str,
        redirect_uri: &str,
        scope: Option<String>,
        code_challenge: Option<String>,
    ) -> Result<OAuthUrl, AuthError> {
        let provider = self
            .registry
            .get(method)
            .ok_or_else(|| AuthError::ProviderNotConfigured(method.to_string()))?;
        let oauth = provider
            .as_oauth()
            .ok_or_else(|| AuthError::ProviderNotConfigured(method.to_string()))?;

        // Opportunistic cleanup; the periodic sweeper does the real work
        let swept = self.states.sweep_expired().await?;
        if swept > 0 {
            debug!("swept {swept} expired OAuth states");
        }

        let state = self
            .states
            .issue(method, redirect_uri, code_challenge.clone())
            .await?;
        let url = oauth.authorization_url(&AuthorizationUrlParams {
            redirect_uri: redirect_uri.to_string(),
            state: state.value.clone(),
            scope,
            code_challenge,
        })?;
        Ok(OAuthUrl {
            url,
            state: state.value,
        })
    }

    /// Rotate a session from its refresh token
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] when the token does not verify;
    /// [`AuthError::SessionNotFound`] when it verifies but its session is
    /// gone; [`AuthError::UserNotFound`] when the session's user no longer
    /// exists, in which case the orphaned session is invalidated too.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResult, AuthError> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .ok_or(AuthError::InvalidToken)?;
        let sid = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;
        let session = self
            .sessions
            .get_session_by_id(sid)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let user = match self.users.find_by_id(session.user_id).await? {
            Some(user) => user,
            None => {
                warn!("invalidating orphaned session {} (user gone)", session.id);
                self.sessions.invalidate_session(session.id).await?;
                return Err(AuthError::UserNotFound);
            }
        };

        let rotated = self.sessions.refresh_session(&session).await?;
        Ok(AuthResult {
            user: PublicUser::from(&user),
            session: PublicSession::from(&rotated),
        })
    }

    /// End the session behind an access token
    ///
    /// Idempotent: a token that does not verify, or whose session is
    /// already gone, is a no-op rather than an error.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        if let Some(session) = self.sessions.get_session_by_access_token(access_token).await? {
            debug!("logout of session {}", session.id);
            self.sessions.invalidate_session(session.id).await?;
        }
        Ok(())
    }

    /// End every session of the user behind an access token
    ///
    /// Idempotent for the same reasons as [`AuthService::logout`].
    pub async fn logout_all(&self, access_token: &str) -> Result<(), AuthError> {
        if let Some(session) = self.sessions.get_session_by_access_token(access_token).await? {
            self.logout_all_for_user(session.user_id).await?;
        }
        Ok(())
    }

    /// End every session of a user by id
    pub async fn logout_all_for_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        debug!("logout of all sessions for user {user_id}");
        self.sessions.invalidate_all_user_sessions(user_id).await
    }

    /// Full validation of an access token
    ///
    /// Never errors on a bad token; all failure causes collapse to
    /// `valid: false`. Only store failures surface as `Err`.
    pub async fn validate_access_token(
        &self,
        access_token: &str,
    ) -> Result<TokenValidation, AuthError> {
        let Some(claims) = self.issuer.verify_access(access_token) else {
            return Ok(TokenValidation::invalid());
        };
        let Ok(sid) = Uuid::parse_str(&claims.sid) else {
            return Ok(TokenValidation::invalid());
        };
        if self.sessions.get_session_by_id(sid).await?.is_none() {
            debug!("access token verified but session {sid} is gone");
            return Ok(TokenValidation::invalid());
        }
        let Ok(uid) = Uuid::parse_str(&claims.sub) else {
            return Ok(TokenValidation::invalid());
        };
        let Some(user) = self.users.find_by_id(uid).await? else {
            return Ok(TokenValidation::invalid());
        };
        Ok(TokenValidation {
            valid: true,
            claims: Some(claims),
            user: Some(PublicUser::from(&user)),
        })
    }

    /// Decode a token's claims without requiring a live session
    ///
    /// Signature, issuer, audience and expiry are still enforced.
    pub fn extract_claims(&self, token: &str) -> Option<JwtClaims> {
        self.issuer.decode(token)
    }

    /// The user behind a live access token
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`], [`AuthError::SessionNotFound`] or
    /// [`AuthError::UserNotFound`] depending on which link is broken.
    pub async fn get_me(&self, access_token: &str) -> Result<PublicUser, AuthError> {
        let claims = self
            .issuer
            .verify_access(access_token)
            .ok_or(AuthError::InvalidToken)?;
        let sid = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;
        if self.sessions.get_session_by_id(sid).await?.is_none() {
            return Err(AuthError::SessionNotFound);
        }
        let uid = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let user = self
            .users
            .find_by_id(uid)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(PublicUser::from(&user))
    }

    /// Spawn the periodic cleanup task
    ///
    /// Sweeps expired sessions, OAuth states and limiter windows every
    /// `interval_secs`. Stores that expire natively make the session sweep
    /// a space-reclaim, not a correctness requirement.
    pub fn spawn_sweeper(self: &Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match service.sessions.cleanup_expired_sessions().await {
                    Ok(n) if n > 0 => debug!("swept {n} expired sessions"),
                    Ok(_) => {}
                    Err(e) => warn!("session sweep failed: {e}"),
                }
                if let Err(e) = service.states.sweep_expired().await {
                    warn!("OAuth state sweep failed: {e}");
                }
                if let Some(limiter) = &service.limiter {
                    if let Err(e) = limiter.sweep_expired() {
                        warn!("rate limiter sweep failed: {e}");
                    }
                }
            }
        })
    }

    /// Resolve a provider identity to a local user, then open its session
    async fn complete_login(&self, identity: AuthenticatedUser) -> Result<AuthResult, AuthError> {
        let user = self.resolve_user(&identity).await?;
        let metadata = session_metadata(&identity.method, identity.provider_user_id.as_deref());
        self.start_session(&user, Vec::new(), Vec::new(), metadata).await
    }

    /// Map a provider identity onto the local user store
    ///
    /// A provider that names a local user id (the password provider) must
    /// name a live one. Email-only identities (OAuth) reuse the account
    /// behind the email or create one on first login; such accounts get a
    /// random unusable password hash so the password provider can never
    /// match them until a password is explicitly set.
    async fn resolve_user(&self, identity: &AuthenticatedUser) -> Result<User, AuthError> {
        if let Some(id) = identity.user_id {
            return self
                .users
                .find_by_id(id)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        let email = normalize_email(&identity.email)?;
        if let Some(user) = self.users.find_by_email(&email).await? {
            return Ok(user);
        }

        let hash = self.hasher.hash(&unguessable_password())?;
        let user = User::new(&email, hash);
        self.users.save(user.clone()).await?;
        info!("provisioned user {} from {} login", user.id, identity.method);
        Ok(user)
    }

    /// Enforce the single-session policy and create the one live session
    async fn start_session(
        &self,
        user: &User,
        roles: Vec<String>,
        permissions: Vec<String>,
        metadata: HashMap<String, Value>,
    ) -> Result<AuthResult, AuthError> {
        self.sessions.invalidate_all_user_sessions(user.id).await?;
        let session = self
            .sessions
            .create_session(user.id, &user.email, roles, permissions, metadata)
            .await?;
        Ok(AuthResult {
            user: PublicUser::from(user),
            session: PublicSession::from(&session),
        })
    }

    fn check_limit(&self, key: &str) -> Result<(), AuthError> {
        match &self.limiter {
            Some(limiter) => limiter.check(key),
            None => Ok(()),
        }
    }
}

fn session_metadata(method: &str, provider_user_id: Option<&str>) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert("method".to_string(), Value::String(method.to_string()));
    if let Some(pid) = provider_user_id {
        metadata.insert("provider_user_id".to_string(), Value::String(pid.to_string()));
    }
    metadata
}

fn unguessable_password() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryOAuthStateStore;
    use crate::session::InMemorySessionStore;
    use crate::user::{Argon2PasswordHasher, InMemoryUserStore, MockUserStore};

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            b"service-test-secret",
            "authcore",
            "authcore-client",
            900,
            604800,
        ))
    }

    fn service() -> AuthService {
        AuthService::new(
            issuer(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(Argon2PasswordHasher),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryOAuthStateStore::new()),
        )
    }

    #[tokio::test]
    async fn register_opens_exactly_one_session() {
        let svc = service();
        let result = svc.register("A@X.com ", "longenough").await.unwrap();
        assert_eq!(result.user.email, "a@x.com");
        assert_eq!(result.session.user_id, result.user.id);

        let sessions = svc
            .session_manager()
            .get_sessions_by_user_id(result.user.id)
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn short_passwords_are_rejected_before_any_write() {
        let svc = service();
        let err = svc.register("a@x.com", "short").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(svc.login_with_email_password("a@x.com", "short").await.is_err());
    }

    #[tokio::test]
    async fn a_second_login_displaces_the_first_session() {
        let svc = service();
        let first = svc.register("a@x.com", "longenough").await.unwrap();
        let second = svc
            .login_with_email_password("a@x.com", "longenough")
            .await
            .unwrap();
        assert_ne!(first.session.id, second.session.id);

        // the displaced session is gone, only the new one validates
        assert!(!svc
            .validate_access_token(&first.session.access_token)
            .await
            .unwrap()
            .valid);
        assert!(svc
            .validate_access_token(&second.session.access_token)
            .await
            .unwrap()
            .valid);
    }

    #[tokio::test]
    async fn refresh_with_an_orphaned_session_invalidates_it() {
        let mut users = MockUserStore::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let svc = AuthService::new(
            issuer(),
            Arc::new(users),
            Arc::new(Argon2PasswordHasher),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryOAuthStateStore::new()),
        );

        let session = svc
            .session_manager()
            .create_session(Uuid::new_v4(), "a@x.com", vec![], vec![], HashMap::new())
            .await
            .unwrap();
        let err = svc.refresh_token(&session.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
        assert!(svc
            .session_manager()
            .get_session_by_id(session.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn registration_attributes_flow_into_the_access_token() {
        let svc = service();
        let result = svc
            .register_with_attributes(
                "a@x.com",
                "longenough",
                vec!["admin".to_string()],
                vec!["read:api".to_string()],
                HashMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.session.roles, vec!["admin"]);

        let claims = svc.extract_claims(&result.session.access_token).unwrap();
        assert_eq!(claims.roles, vec!["admin"]);
        assert_eq!(claims.permissions, vec!["read:api"]);
    }

    #[tokio::test]
    async fn logout_all_for_user_clears_the_store() {
        let svc = service();
        let result = svc.register("a@x.com", "longenough").await.unwrap();
        svc.logout_all_for_user(result.user.id).await.unwrap();
        assert!(svc
            .session_manager()
            .get_sessions_by_user_id(result.user.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn logout_is_idempotent_on_garbage_tokens() {
        let svc = service();
        svc.logout("not-a-token").await.unwrap();
        svc.logout_all("not-a-token").await.unwrap();
    }

    #[tokio::test]
    async fn rate_limiter_caps_password_logins() {
        let svc = service().with_rate_limiter(Arc::new(RateLimiter::new(2, 60)));
        svc.register("a@x.com", "longenough").await.unwrap();
        svc.login_with_email_password("a@x.com", "longenough").await.unwrap();
        svc.login_with_email_password("a@x.com", "wrongwrong").await.unwrap_err();
        let err = svc
            .login_with_email_password("a@x.com", "longenough")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn oauth_url_requests_for_unknown_methods_fail() {
        let svc = service();
        let err = svc
            .get_oauth_url("github", "https://app/cb", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderNotConfigured(_)));

        // the password provider has no OAuth capability
        let err = svc
            .get_oauth_url("password", "https://app/cb", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderNotConfigured(_)));
    }

    #[tokio::test]
    async fn methods_lists_the_builtin_password_provider() {
        let svc = service();
        assert_eq!(svc.methods(), vec!["password"]);
    }
}
