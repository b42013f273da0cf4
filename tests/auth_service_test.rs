// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end scenarios through the orchestrator
//!
//! Exercises the public [`AuthService`] surface with the in-memory stores:
//! registration, password login, token refresh with rotation, logout and
//! validation. OAuth scenarios live in `oauth_provider_test.rs`.

use std::sync::Arc;

use chrono::{Duration, Utc};

use authcore::error::AuthError;
use authcore::provider::InMemoryOAuthStateStore;
use authcore::service::AuthService;
use authcore::session::InMemorySessionStore;
use authcore::token::{TokenIssuer, TokenType};
use authcore::user::{Argon2PasswordHasher, InMemoryUserStore};

const ACCESS_TTL: i64 = 900;
const REFRESH_TTL: i64 = 604_800;

fn service() -> AuthService {
    AuthService::new(
        Arc::new(TokenIssuer::new(
            b"integration-test-secret",
            "authcore",
            "authcore-client",
            ACCESS_TTL,
            REFRESH_TTL,
        )),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(Argon2PasswordHasher),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryOAuthStateStore::new()),
    )
}

#[tokio::test]
async fn register_issues_a_session_with_the_configured_windows() {
    let svc = service();
    let before = Utc::now();
    let result = svc.register("alice@example.com", "longenough").await.unwrap();
    let after = Utc::now();

    assert_eq!(result.user.email, "alice@example.com");
    assert_eq!(result.session.user_id, result.user.id);
    assert!(result.session.access_expires_at <= result.session.refresh_expires_at);

    // expiries are anchored on "now" with the configured TTLs
    assert!(result.session.access_expires_at >= before + Duration::seconds(ACCESS_TTL));
    assert!(result.session.access_expires_at <= after + Duration::seconds(ACCESS_TTL));
    assert!(result.session.refresh_expires_at >= before + Duration::seconds(REFRESH_TTL));
    assert!(result.session.refresh_expires_at <= after + Duration::seconds(REFRESH_TTL));

    let validation = svc
        .validate_access_token(&result.session.access_token)
        .await
        .unwrap();
    assert!(validation.valid);
    let claims = validation.claims.unwrap();
    assert_eq!(claims.token_type, TokenType::Access);
    assert_eq!(claims.sub, result.user.id.to_string());
    assert_eq!(claims.sid, result.session.id.to_string());
    assert_eq!(validation.user.unwrap().id, result.user.id);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let svc = service();
    svc.register("alice@example.com", "longenough").await.unwrap();
    let err = svc
        .register("  ALICE@Example.com", "otherpassword")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyExists(_)));
}

#[tokio::test]
async fn failed_login_creates_no_session() {
    let svc = service();
    let registered = svc.register("alice@example.com", "longenough").await.unwrap();
    svc.logout(&registered.session.access_token).await.unwrap();

    let err = svc
        .login_with_email_password("alice@example.com", "wrongpassword")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(svc
        .session_manager()
        .get_sessions_by_user_id(registered.user.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn refresh_rotates_and_a_replayed_refresh_token_is_dead() {
    let svc = service();
    let first = svc.register("alice@example.com", "longenough").await.unwrap();

    let second = svc.refresh_token(&first.session.refresh_token).await.unwrap();
    assert_eq!(second.user.id, first.user.id);
    assert_ne!(second.session.id, first.session.id);
    assert_ne!(second.session.access_token, first.session.access_token);
    assert_ne!(second.session.refresh_token, first.session.refresh_token);

    // the old pair is unrecoverable: replaying the consumed refresh token
    // verifies cryptographically but its session is gone
    let err = svc.refresh_token(&first.session.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
    assert!(!svc
        .validate_access_token(&first.session.access_token)
        .await
        .unwrap()
        .valid);

    // the rotated pair works
    assert!(svc
        .validate_access_token(&second.session.access_token)
        .await
        .unwrap()
        .valid);
    svc.refresh_token(&second.session.refresh_token).await.unwrap();
}

#[tokio::test]
async fn refresh_rejects_garbage_and_access_tokens() {
    let svc = service();
    let result = svc.register("alice@example.com", "longenough").await.unwrap();

    let err = svc.refresh_token("not-a-token").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));

    // an access token is never accepted where a refresh token is required
    let err = svc.refresh_token(&result.session.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn logout_all_kills_every_session_and_validation_fails_afterwards() {
    let svc = service();
    let result = svc.register("alice@example.com", "longenough").await.unwrap();

    svc.logout_all(&result.session.access_token).await.unwrap();
    assert!(svc
        .session_manager()
        .get_sessions_by_user_id(result.user.id)
        .await
        .unwrap()
        .is_empty());
    assert!(!svc
        .validate_access_token(&result.session.access_token)
        .await
        .unwrap()
        .valid);
    let err = svc.get_me(&result.session.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));

    // claims are still decodable, the token just no longer grants anything
    assert!(svc.extract_claims(&result.session.access_token).is_some());
}

#[tokio::test]
async fn get_me_returns_the_account_without_the_password_hash() {
    let svc = service();
    let result = svc.register("alice@example.com", "longenough").await.unwrap();
    let me = svc.get_me(&result.session.access_token).await.unwrap();
    assert_eq!(me.id, result.user.id);
    assert_eq!(me.email, "alice@example.com");

    let body = serde_json::to_value(&me).unwrap();
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn tokens_from_a_foreign_issuer_are_rejected_everywhere() {
    let svc = service();
    svc.register("alice@example.com", "longenough").await.unwrap();

    let foreign = TokenIssuer::new(
        b"some-other-secret",
        "authcore",
        "authcore-client",
        ACCESS_TTL,
        REFRESH_TTL,
    );
    let forged = foreign
        .sign_refresh(&uuid::Uuid::new_v4().to_string(), "alice@example.com", "sid")
        .unwrap();

    assert!(matches!(
        svc.refresh_token(&forged).await.unwrap_err(),
        AuthError::InvalidToken
    ));
    assert!(svc.extract_claims(&forged).is_none());
    assert!(!svc.validate_access_token(&forged).await.unwrap().valid);
}
