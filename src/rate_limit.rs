// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window rate limiter, keyed by session id or remote address. One
//! instance guards the MCP endpoint, a second guards the dashboard read API.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How many `check` calls to let through between sweeps of stale keys.
const SWEEP_INTERVAL: u64 = 500;

struct Window {
    hits: Vec<Instant>,
}

struct Inner {
    windows: HashMap<String, Window>,
    calls_since_sweep: u64,
}

/// Fixed-capacity sliding window: at most `limit` hits per `window` duration
/// for any one key.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    inner: Mutex<Inner>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window, inner: Mutex::new(Inner { windows: HashMap::new(), calls_since_sweep: 0 }) }
    }

    /// Record a hit for `key` and report whether it's allowed under the
    /// window. Denied hits are not counted against the window.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        inner.calls_since_sweep += 1;
        if inner.calls_since_sweep >= SWEEP_INTERVAL {
            inner.calls_since_sweep = 0;
            let window = self.window;
            inner.windows.retain(|_, w| w.hits.last().is_some_and(|&t| now.duration_since(t) < window));
        }

        let window = self.window;
        let limit = self.limit as usize;
        let entry = inner.windows.entry(key.to_owned()).or_insert_with(|| Window { hits: Vec::new() });
        entry.hits.retain(|&t| now.duration_since(t) < window);

        if entry.hits.len() >= limit {
            return false;
        }
        entry.hits.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn test_window_expiry_allows_retry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("a"));
    }

    #[test]
    fn test_sweep_does_not_corrupt_live_windows() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        for i in 0..(SWEEP_INTERVAL as usize + 5) {
            let key = format!("k{}", i % 4);
            limiter.check(&key);
        }
        // "k0" got well over its limit of 2 hits during the sweep storm above;
        // the periodic sweep must not have silently reset its window.
        assert!(!limiter.check("k0"));
    }
}
