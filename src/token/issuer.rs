// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Stateless JWT issuer for access and refresh tokens
//!
//! Tokens are signed with symmetric HMAC-SHA256. All configuration (secret,
//! issuer, audience, TTLs) is fixed at construction; the issuer holds no
//! per-token state, which is what lets revocation live entirely at the
//! session layer.
//!
//! Verification never returns an error to the caller: malformed, expired,
//! tampered and wrong-type tokens all collapse to `None`, so the orchestrator
//! treats every failure uniformly as "unauthenticated".

use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use super::claims::{JwtClaims, TokenType};
use crate::config::TokenConfig;
use crate::error::AuthError;

/// Signs and verifies the access/refresh token pair backing every session
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Hides key material in debug output
impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer with an explicit HMAC secret and token windows
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC-SHA256 signing secret, shared by sign and verify
    /// * `issuer` - value of the `iss` claim, enforced on verification
    /// * `audience` - value of the `aud` claim, enforced on verification
    /// * `access_ttl_secs` - access token lifetime in seconds
    /// * `refresh_ttl_secs` - refresh token lifetime in seconds
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
            audience: audience.into(),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Create an issuer from the application token configuration
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.secret.as_bytes(),
            &config.issuer,
            &config.audience,
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        )
    }

    /// Access token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an access token scoped to a session
    ///
    /// The token carries `type=access`, a fresh `jti`, `nbf` equal to `iat`,
    /// and expires `access_ttl` from now.
    pub fn sign_access(
        &self,
        user_id: &str,
        email: &str,
        session_id: &str,
        roles: &[String],
        permissions: &[String],
        metadata: &HashMap<String, Value>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            sid: session_id.to_string(),
            roles: roles.to_vec(),
            permissions: permissions.to_vec(),
            metadata: metadata.clone(),
            token_type: TokenType::Access,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Sign a refresh token scoped to a session
    ///
    /// Refresh tokens are narrow-purpose: `type=refresh`, no roles,
    /// permissions or metadata, expiring `refresh_ttl` from now.
    pub fn sign_refresh(
        &self,
        user_id: &str,
        email: &str,
        session_id: &str,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            sid: session_id.to_string(),
            roles: Vec::new(),
            permissions: Vec::new(),
            metadata: HashMap::new(),
            token_type: TokenType::Refresh,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Verify a token and require `type=access`
    pub fn verify_access(&self, token: &str) -> Option<JwtClaims> {
        self.verify(token, Some(TokenType::Access))
    }

    /// Verify a token and require `type=refresh`
    pub fn verify_refresh(&self, token: &str) -> Option<JwtClaims> {
        self.verify(token, Some(TokenType::Refresh))
    }

    /// Verify signature, issuer, audience and time window without enforcing
    /// a specific token type
    pub fn decode(&self, token: &str) -> Option<JwtClaims> {
        self.verify(token, None)
    }

    /// Fail-closed expiry check
    ///
    /// Returns `true` once the signed `exp` has passed, and also `true` when
    /// verification fails for any other reason (bad signature, wrong issuer,
    /// garbage input). Only a token that fully verifies reports `false`.
    pub fn is_expired(&self, token: &str) -> bool {
        self.decode(token).is_none()
    }

    fn sign(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    fn verify(&self, token: &str, expected: Option<TokenType>) -> Option<JwtClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_nbf = true;
        // Expiry semantics are exact: a token is invalid the second `exp` passes
        validation.leeway = 0;

        let data = match decode::<JwtClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                debug!("token verification failed: {e}");
                return None;
            }
        };
        if let Some(expected) = expected {
            if data.claims.token_type != expected {
                debug!(
                    "token type mismatch: expected {:?}, got {:?}",
                    expected, data.claims.token_type
                );
                return None;
            }
        }
        Some(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret-key-for-token-tests", "authcore", "authcore-client", 900, 604800)
    }

    fn metadata() -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("device".to_string(), Value::String("cli".to_string()));
        map
    }

    #[test]
    fn access_claims_round_trip() {
        let iss = issuer();
        let token = iss
            .sign_access(
                "user-1",
                "a@x.com",
                "session-1",
                &["admin".to_string()],
                &["read:api".to_string()],
                &metadata(),
            )
            .unwrap();

        let claims = iss.verify_access(&token).expect("token should verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.sid, "session-1");
        assert_eq!(claims.roles, vec!["admin"]);
        assert_eq!(claims.permissions, vec!["read:api"]);
        assert_eq!(claims.metadata["device"], "cli");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn refresh_claims_round_trip_and_are_narrow() {
        let iss = issuer();
        let token = iss.sign_refresh("user-1", "a@x.com", "session-1").unwrap();
        let claims = iss.verify_refresh(&token).expect("token should verify");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.roles.is_empty());
        assert!(claims.permissions.is_empty());
        assert!(claims.metadata.is_empty());
        assert_eq!(claims.exp - claims.iat, 604800);
    }

    #[test]
    fn verifiers_reject_the_other_token_type() {
        let iss = issuer();
        let access = iss
            .sign_access("u", "a@x.com", "s", &[], &[], &HashMap::new())
            .unwrap();
        let refresh = iss.sign_refresh("u", "a@x.com", "s").unwrap();

        assert!(iss.verify_refresh(&access).is_none());
        assert!(iss.verify_access(&refresh).is_none());
        // decode does not enforce a type
        assert!(iss.decode(&access).is_some());
        assert!(iss.decode(&refresh).is_some());
    }

    #[test]
    fn each_signature_gets_a_fresh_jti() {
        let iss = issuer();
        let a = iss.sign_refresh("u", "a@x.com", "s").unwrap();
        let b = iss.sign_refresh("u", "a@x.com", "s").unwrap();
        let ja = iss.verify_refresh(&a).unwrap().jti;
        let jb = iss.verify_refresh(&b).unwrap().jti;
        assert_ne!(ja, jb);
    }

    #[test]
    fn expired_tokens_fail_verification_and_is_expired() {
        // Negative TTL produces an already-elapsed window
        let iss = TokenIssuer::new(b"test-secret", "authcore", "authcore-client", -10, -10);
        let token = iss
            .sign_access("u", "a@x.com", "s", &[], &[], &HashMap::new())
            .unwrap();
        assert!(iss.verify_access(&token).is_none());
        assert!(iss.is_expired(&token));
    }

    #[test]
    fn unexpired_tokens_are_not_expired() {
        let iss = issuer();
        let token = iss.sign_refresh("u", "a@x.com", "s").unwrap();
        assert!(!iss.is_expired(&token));
    }

    #[test]
    fn is_expired_fails_closed_on_garbage_and_wrong_secret() {
        let iss = issuer();
        assert!(iss.is_expired("not-a-token"));
        assert!(iss.is_expired(""));

        let other = TokenIssuer::new(b"another-secret", "authcore", "authcore-client", 900, 604800);
        let token = other.sign_refresh("u", "a@x.com", "s").unwrap();
        assert!(iss.is_expired(&token));
        assert!(iss.verify_refresh(&token).is_none());
    }

    #[test]
    fn issuer_and_audience_mismatches_are_rejected() {
        let iss = issuer();
        let other_iss = TokenIssuer::new(
            b"test-secret-key-for-token-tests",
            "someone-else",
            "authcore-client",
            900,
            604800,
        );
        let other_aud = TokenIssuer::new(
            b"test-secret-key-for-token-tests",
            "authcore",
            "someone-elses-client",
            900,
            604800,
        );
        let token = iss.sign_refresh("u", "a@x.com", "s").unwrap();
        assert!(other_iss.verify_refresh(&token).is_none());
        assert!(other_aud.verify_refresh(&token).is_none());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let iss = issuer();
        let token = iss.sign_refresh("u", "a@x.com", "s").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(iss.verify_refresh(&tampered).is_none());
    }
}
