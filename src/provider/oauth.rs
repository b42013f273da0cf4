// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generic OAuth2 authorization-code provider
//!
//! Driven entirely by [`OAuthClientConfig`]; no provider-specific response
//! shapes are modeled. The token endpoint must return standard
//! `access_token` JSON and the userinfo endpoint an OIDC-style profile
//! (`sub`/`id`, `email`, optional `name`/`picture`/`email_verified`).
//!
//! A 4xx from the token endpoint means the code (or verifier) was rejected
//! and surfaces as `InvalidCredentials`; every other upstream failure is a
//! `Provider` error.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{AuthProvider, AuthenticatedUser, AuthorizationUrlParams, OAuthProvider, OAuthTokens};
use crate::config::OAuthClientConfig;
use crate::error::AuthError;

/// Credential payload of an OAuth callback
#[derive(Debug, Deserialize)]
struct OAuthCredentials {
    code: String,
    redirect_uri: String,
    #[serde(default)]
    code_verifier: Option<String>,
}

/// Loose OIDC-ish userinfo shape
#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Config-driven OAuth2/OIDC provider
pub struct OAuth2Provider {
    config: OAuthClientConfig,
    http: reqwest::Client,
}

impl OAuth2Provider {
    pub fn new(config: OAuthClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// The client configuration this provider was built from
    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }
}

#[async_trait]
impl AuthProvider for OAuth2Provider {
    fn method(&self) -> &str {
        &self.config.method
    }

    async fn authenticate(&self, credentials: Value) -> Result<AuthenticatedUser, AuthError> {
        let creds: OAuthCredentials = serde_json::from_value(credentials)
            .map_err(|e| AuthError::Validation(format!("malformed oauth credentials: {e}")))?;
        let tokens = self
            .exchange_code(&creds.code, &creds.redirect_uri, creds.code_verifier.as_deref())
            .await?;
        self.get_user_info(&tokens.access_token).await
    }

    fn as_oauth(&self) -> Option<&dyn OAuthProvider> {
        Some(self)
    }
}

#[async_trait]
impl OAuthProvider for OAuth2Provider {
    fn authorization_url(&self, params: &AuthorizationUrlParams) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.authorization_endpoint).map_err(|e| {
            AuthError::Internal(format!(
                "bad authorization endpoint for {}: {e}",
                self.config.method
            ))
        })?;
        let scope = params.scope.as_deref().unwrap_or(&self.config.scope);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &params.redirect_uri)
                .append_pair("scope", scope)
                .append_pair("state", &params.state);
            if let Some(challenge) = &params.code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens, AuthError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        debug!("exchanging authorization code with {}", self.config.method);
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            debug!("{} token endpoint rejected the code: {status}", self.config.method);
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "{} token endpoint returned {status}",
                self.config.method
            )));
        }
        let tokens: OAuthTokens = response.json().await?;
        Ok(tokens)
    }

    async fn get_user_info(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "{} userinfo endpoint returned {status}",
                self.config.method
            )));
        }

        let raw: Value = response.json().await?;
        let info: UserInfo = serde_json::from_value(raw.clone())
            .map_err(|e| AuthError::Provider(format!("unreadable userinfo response: {e}")))?;

        let email = info.email.ok_or_else(|| {
            AuthError::Provider(format!("{} did not return an email", self.config.method))
        })?;
        let provider_user_id = info
            .sub
            .or_else(|| info.id.map(|id| id.to_string().trim_matches('"').to_string()));

        let mut metadata = HashMap::new();
        metadata.insert("userinfo".to_string(), raw);

        Ok(AuthenticatedUser {
            user_id: None,
            email,
            email_verified: info.email_verified.unwrap_or(false),
            name: info.name,
            picture: info.picture,
            method: self.config.method.clone(),
            provider_user_id,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OAuth2Provider {
        OAuth2Provider::new(OAuthClientConfig {
            method: "google".to_string(),
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_endpoint: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            scope: "openid email profile".to_string(),
        })
    }

    #[test]
    fn authorization_url_carries_the_standard_parameters() {
        let url = provider()
            .authorization_url(&AuthorizationUrlParams {
                redirect_uri: "https://app/cb".to_string(),
                state: "abc123".to_string(),
                scope: None,
                code_challenge: None,
            })
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "https://app/cb");
        assert_eq!(pairs["scope"], "openid email profile");
        assert_eq!(pairs["state"], "abc123");
        assert!(!pairs.contains_key("code_challenge"));
    }

    #[test]
    fn pkce_challenge_is_appended_as_s256() {
        let url = provider()
            .authorization_url(&AuthorizationUrlParams {
                redirect_uri: "https://app/cb".to_string(),
                state: "abc123".to_string(),
                scope: Some("email".to_string()),
                code_challenge: Some("challenge-value".to_string()),
            })
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["code_challenge"], "challenge-value");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["scope"], "email");
    }
}
