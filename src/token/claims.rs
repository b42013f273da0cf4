// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT claims carried inside access and refresh tokens
//!
//! The claim set follows RFC 7519 registered claims (iss, aud, sub, iat,
//! nbf, exp, jti) plus the application claims the session layer needs:
//! the session id, the email snapshot, roles, permissions and free-form
//! metadata. A `type` claim distinguishes access from refresh tokens so a
//! verifier for one kind always rejects the other.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Purpose of a signed token
///
/// Refresh tokens are narrow-purpose: they carry no roles, permissions or
/// metadata and are only good for minting a replacement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived credential presented on each request
    Access,
    /// Longer-lived credential exchanged for a new session
    Refresh,
}

/// Decoded content of a signed token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id
    pub sub: String,

    /// Email snapshot taken at issuance
    pub email: String,

    /// Session id this token is scoped to
    pub sid: String,

    /// Roles granted to the session (access tokens only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Permissions granted to the session (access tokens only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    /// Free-form metadata attached at session creation (access tokens only)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,

    /// Token purpose, `access` or `refresh`
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issuer string, fixed at [`crate::token::TokenIssuer`] construction
    pub iss: String,

    /// Audience string, fixed at issuer construction
    pub aud: String,

    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,

    /// Not-before, equals `iat` for every token this core signs
    pub nbf: i64,

    /// Expiry, seconds since the Unix epoch
    pub exp: i64,

    /// Unique token id, a fresh UUID per signature
    pub jti: String,
}

impl JwtClaims {
    /// Remaining validity in whole seconds, zero once expired
    pub fn valid_for_seconds(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        (self.exp - now).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenType::Access).unwrap(), "\"access\"");
        assert_eq!(serde_json::to_string(&TokenType::Refresh).unwrap(), "\"refresh\"");
    }

    #[test]
    fn type_claim_uses_the_reserved_name() {
        let claims = JwtClaims {
            sub: "u".into(),
            email: "a@x.com".into(),
            sid: "s".into(),
            roles: vec![],
            permissions: vec![],
            metadata: HashMap::new(),
            token_type: TokenType::Refresh,
            iss: "authcore".into(),
            aud: "client".into(),
            iat: 0,
            nbf: 0,
            exp: 10,
            jti: "j".into(),
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["type"], "refresh");
        // Narrow-purpose claims are omitted entirely when empty
        assert!(value.get("roles").is_none());
        assert!(value.get("metadata").is_none());
    }
}
