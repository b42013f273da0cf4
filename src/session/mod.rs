// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session lifecycle: creation, validity, rotation, invalidation
//!
//! Per-session state machine: `ACTIVE` → `ACCESS_EXPIRED` → `EXPIRED`,
//! plus hard deletion (`INVALIDATED`, modeled as absence from the store).
//! There is no transition out of `EXPIRED` or deletion.

mod manager;
mod model;
mod store;

// Re-export the public API
pub use manager::SessionManager;
pub use model::{Session, SessionState};
pub use store::{InMemorySessionStore, SessionStore};
