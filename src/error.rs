// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy for the authentication core
//!
//! Every expected failure of the core is an [`AuthError`] variant carrying a
//! stable machine-readable code and an HTTP status hint for the (external)
//! boundary layer. Expected outcomes such as bad credentials are values, not
//! panics; token verification additionally collapses all failure causes into
//! `None` at the [`crate::token::TokenIssuer`] level so callers cannot be used
//! as an error-message oracle.

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;

/// All failures the authentication core can report
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or out-of-policy input (missing field, bad email, short password)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrong password, unknown account presented as a credential, bad or
    /// replayed OAuth state, or a rejected authorization code
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A token that does not verify (signature, expiry, issuer, audience or type)
    #[error("invalid token")]
    InvalidToken,

    /// No credential was presented where one is required
    #[error("authentication required")]
    AuthenticationRequired,

    /// The authenticated user lacks a required role
    #[error("insufficient role: {0}")]
    InsufficientRole(String),

    /// The authenticated user lacks a required permission
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// The referenced user does not exist
    #[error("user not found")]
    UserNotFound,

    /// The referenced session does not exist (or has been invalidated)
    #[error("session not found")]
    SessionNotFound,

    /// Uniqueness conflict, e.g. registering an email that is already taken
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// No provider is registered under the requested authentication method
    #[error("unsupported authentication method: {0}")]
    UnsupportedMethod(String),

    /// The provider exists but lacks the capability the call needs
    /// (e.g. an authorization URL was requested from a non-OAuth provider)
    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Too many attempts inside the configured window
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// An upstream identity provider failed in an unexpected way
    #[error("provider error: {0}")]
    Provider(String),

    /// Anything non-operational: store failures, signing failures, poisoned state
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for this error
    ///
    /// Codes are part of the produced error-body surface and must not
    /// change between releases.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AuthError::InsufficientRole(_) => "INSUFFICIENT_ROLE",
            AuthError::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::AlreadyExists(_) => "ALREADY_EXISTS",
            AuthError::UnsupportedMethod(_) => "UNSUPPORTED_METHOD",
            AuthError::ProviderNotConfigured(_) => "PROVIDER_NOT_CONFIGURED",
            AuthError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AuthError::Provider(_) => "PROVIDER_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the boundary layer should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Validation(_)
            | AuthError::UnsupportedMethod(_)
            | AuthError::ProviderNotConfigured(_) => 400,
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::AuthenticationRequired => 401,
            AuthError::InsufficientRole(_) | AuthError::InsufficientPermissions(_) => 403,
            AuthError::UserNotFound | AuthError::SessionNotFound => 404,
            AuthError::AlreadyExists(_) => 409,
            AuthError::RateLimitExceeded => 429,
            AuthError::Provider(_) => 502,
            AuthError::Internal(_) => 500,
        }
    }

    /// Serializable error body in the shape the boundary layer exposes:
    /// `{error, code, statusCode, timestamp, details?}`
    ///
    /// Internal errors are reported opaquely; their detail belongs in logs,
    /// not in responses.
    pub fn to_body(&self) -> Value {
        let message = match self {
            AuthError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        let mut body = json!({
            "error": message,
            "code": self.code(),
            "statusCode": self.status_code(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }
        body
    }

    fn details(&self) -> Option<Value> {
        match self {
            AuthError::Validation(detail) => Some(json!({ "reason": detail })),
            AuthError::UnsupportedMethod(method) => Some(json!({ "method": method })),
            AuthError::ProviderNotConfigured(provider) => Some(json!({ "provider": provider })),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(AuthError::Validation("x".into()).status_code(), 400);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::InsufficientRole("admin".into()).status_code(), 403);
        assert_eq!(AuthError::SessionNotFound.status_code(), 404);
        assert_eq!(AuthError::AlreadyExists("user".into()).status_code(), 409);
        assert_eq!(AuthError::RateLimitExceeded.status_code(), 429);
        assert_eq!(AuthError::Internal("db".into()).status_code(), 500);
    }

    #[test]
    fn internal_errors_are_opaque_in_the_body() {
        let body = AuthError::Internal("connection string leaked".into()).to_body();
        assert_eq!(body["error"], "internal error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["statusCode"], 500);
    }

    #[test]
    fn validation_errors_carry_details() {
        let body = AuthError::Validation("email is malformed".into()).to_body();
        assert_eq!(body["details"]["reason"], "email is malformed");
    }
}
