// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the authcore project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-window attempt limiter
//!
//! Counts attempts per key (typically `"login:<email>"`) inside a fixed
//! window. Once the count reaches the limit, further attempts inside the
//! same window are rejected with [`AuthError::RateLimitExceeded`]. Windows
//! are not sliding; the counter resets when the window elapses.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::error::AuthError;

struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Per-key fixed-window counter
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// A limiter allowing `limit` attempts per `window_secs` seconds
    pub fn new(limit: u32, window_secs: i64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window: Duration::seconds(window_secs),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Window>>, AuthError> {
        self.windows
            .lock()
            .map_err(|_| AuthError::Internal("rate limiter lock poisoned".to_string()))
    }

    /// Record one attempt for `key`
    ///
    /// # Errors
    ///
    /// [`AuthError::RateLimitExceeded`] once the key has used up its window.
    pub fn check(&self, key: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut windows = self.lock()?;
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });
        if now - window.started_at >= self.window {
            window.count = 0;
            window.started_at = now;
        }
        if window.count >= self.limit {
            debug!("rate limit exceeded for key {key}");
            return Err(AuthError::RateLimitExceeded);
        }
        window.count += 1;
        Ok(())
    }

    /// Drop counters whose window has elapsed; returns how many were removed
    pub fn sweep_expired(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let mut windows = self.lock()?;
        let before = windows.len();
        windows.retain(|_, w| now - w.started_at < self.window);
        Ok(before - windows.len())
    }
}
