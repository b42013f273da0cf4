// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT token issuance and verification
//!
//! This module handles the signed token pair every session is built on:
//! claims construction, HMAC-SHA256 signing, and fail-closed verification.

mod claims;
mod issuer;

// Re-export the public API
pub use claims::{JwtClaims, TokenType};
pub use issuer::TokenIssuer;
