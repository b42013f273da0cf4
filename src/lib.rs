// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Authentication core
//!
//! Transport-agnostic authentication engine: user registration, password
//! and OAuth2 login, JWT access/refresh token pairs, and full session
//! lifecycle management. No HTTP routes, no storage engine - persistence
//! sits behind the `UserStore` and `SessionStore` traits and the outer
//! layers are expected to map [`error::AuthError`] onto their own surface.
//!
//! ## Architecture
//!
//! * [`token`] - stateless HMAC-SHA256 JWT issuance and fail-closed
//!   verification
//! * [`session`] - session records, the session store interface, and the
//!   [`session::SessionManager`] (create, rotate, invalidate)
//! * [`provider`] - credential providers (password, config-driven OAuth2),
//!   the provider registry and the one-time OAuth CSRF state store
//! * [`user`] - user records, email normalization, password hashing and
//!   the user store interface
//! * [`service`] - the [`service::AuthService`] orchestrator tying it all
//!   together
//! * [`config`] - typed configuration loaded from YAML or the environment
//! * [`limiter`] - fixed-window attempt limiting
//! * [`error`] - the error taxonomy shared by every layer
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use authcore::config::Config;
//! use authcore::provider::InMemoryOAuthStateStore;
//! use authcore::service::AuthService;
//! use authcore::session::InMemorySessionStore;
//! use authcore::token::TokenIssuer;
//! use authcore::user::{Argon2PasswordHasher, InMemoryUserStore};
//!
//! # async fn demo() -> Result<(), authcore::error::AuthError> {
//! let config = Config::default();
//! let service = AuthService::new(
//!     Arc::new(TokenIssuer::from_config(&config.token)),
//!     Arc::new(InMemoryUserStore::new()),
//!     Arc::new(Argon2PasswordHasher),
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryOAuthStateStore::new()),
//! );
//!
//! let result = service.register("alice@example.com", "correct horse").await?;
//! let me = service.get_me(&result.session.access_token).await?;
//! assert_eq!(me.email, "alice@example.com");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod limiter;
pub mod provider;
pub mod service;
pub mod session;
pub mod token;
pub mod user;

pub use error::AuthError;
pub use service::{AuthResult, AuthService, OAuthUrl, PublicSession, PublicUser, TokenValidation};
