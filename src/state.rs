// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::HoneypotConfig;
use crate::db::Store;
use crate::event_bus::EventBus;
use crate::protocol::ProtocolHandler;
use crate::rate_limit::RateLimiter;
use crate::registry::ToolRegistry;
use crate::session::SessionManager;

/// Max concurrent SSE subscribers on `/api/events/live`.
pub const MAX_LIVE_SUBSCRIBERS: usize = 10;

/// Shared application state, wired once at startup and handed to every route.
pub struct AppState {
    pub config: HoneypotConfig,
    pub store: Arc<Store>,
    pub bus: Arc<EventBus>,
    pub sessions: Arc<SessionManager>,
    pub protocol: ProtocolHandler,
    pub mcp_limiter: RateLimiter,
    pub dashboard_limiter: RateLimiter,
    pub live_subscribers: AtomicUsize,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: HoneypotConfig, store: Arc<Store>, shutdown: CancellationToken) -> Arc<Self> {
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(Arc::clone(&store), Arc::clone(&bus), config.session_ttl(), shutdown.clone());
        sessions.spawn_eviction_worker();

        let registry = Arc::new(ToolRegistry::new(Arc::clone(&store), Arc::clone(&sessions), Arc::clone(&bus)));
        let protocol = ProtocolHandler::new(Arc::clone(&sessions), registry);

        let mcp_limiter = RateLimiter::new(config.mcp_rate_limit, config.mcp_rate_window());
        let dashboard_limiter = RateLimiter::new(config.dashboard_rate_limit, config.dashboard_rate_window());

        Arc::new(Self {
            config,
            store,
            bus,
            sessions,
            protocol,
            mcp_limiter,
            dashboard_limiter,
            live_subscribers: AtomicUsize::new(0),
            shutdown,
        })
    }

    /// Try to reserve a live-stream subscriber slot; returns `false` if the
    /// server is already at `MAX_LIVE_SUBSCRIBERS`.
    pub fn try_acquire_live_slot(&self) -> bool {
        loop {
            let current = self.live_subscribers.load(Ordering::SeqCst);
            if current >= MAX_LIVE_SUBSCRIBERS {
                return false;
            }
            if self
                .live_subscribers
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn release_live_slot(&self) {
        self.live_subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}
