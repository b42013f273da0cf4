// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Provider lookup table
//!
//! Maps an authentication-method name to its provider. Holds no business
//! logic; no ordering or priority semantics - the last registration for a
//! given method wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;

use super::AuthProvider;

/// Registry of credential providers keyed by method name
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn AuthProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its method name, replacing any previous one
    pub fn register(&self, provider: Arc<dyn AuthProvider>) {
        let method = provider.method().to_string();
        debug!("registering auth provider: {method}");
        self.providers.write().unwrap().insert(method, provider);
    }

    /// Look up a provider by method name
    pub fn get(&self, method: &str) -> Option<Arc<dyn AuthProvider>> {
        self.providers.read().unwrap().get(method).cloned()
    }

    /// Whether a provider is registered under this method name
    pub fn has(&self, method: &str) -> bool {
        self.providers.read().unwrap().contains_key(method)
    }

    /// All registered method names
    pub fn list(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.providers.read().unwrap().keys().cloned().collect();
        methods.sort();
        methods
    }
}
