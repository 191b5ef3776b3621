// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session cache with write-through persistence and TTL eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use rand::RngCore;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::db::{DiscoveredPort, SessionUpdate, Store};
use crate::event_bus::EventBus;

/// Live, mutable view of a session. Ordered, deduplicated discovery lists use
/// `IndexSet` so insertion order is preserved for the dashboard while
/// duplicates are dropped in O(1).
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub client_info: serde_json::Value,
    pub escalation_level: i64,
    pub discovered_hosts: IndexSet<String>,
    pub discovered_ports: IndexSet<(String, u16, String)>,
    pub discovered_files: IndexSet<String>,
    pub discovered_credentials: IndexSet<String>,
    pub interaction_count: u64,
}

impl SessionContext {
    fn new(session_id: String, client_info: serde_json::Value) -> Self {
        Self {
            session_id,
            client_info,
            escalation_level: 0,
            discovered_hosts: IndexSet::new(),
            discovered_ports: IndexSet::new(),
            discovered_files: IndexSet::new(),
            discovered_credentials: IndexSet::new(),
            interaction_count: 0,
        }
    }

    pub fn add_host(&mut self, host: impl Into<String>) {
        self.discovered_hosts.insert(host.into());
    }

    pub fn add_port(&mut self, host: impl Into<String>, port: u16, service: impl Into<String>) {
        self.discovered_ports.insert((host.into(), port, service.into()));
    }

    pub fn add_file(&mut self, path: impl Into<String>) {
        self.discovered_files.insert(path.into());
    }

    pub fn add_credential(&mut self, cred_id: impl Into<String>) {
        self.discovered_credentials.insert(cred_id.into());
    }

    /// Raise escalation by `delta`, saturating at 3. Never lowers it.
    pub fn escalate(&mut self, delta: i64) {
        self.escalation_level = (self.escalation_level + delta).clamp(0, 3);
    }

    fn to_update(&self) -> SessionUpdate {
        SessionUpdate {
            escalation_level: self.escalation_level,
            discovered_hosts: self.discovered_hosts.iter().cloned().collect(),
            discovered_ports: self
                .discovered_ports
                .iter()
                .map(|(host, port, service)| DiscoveredPort {
                    host: host.clone(),
                    port: *port,
                    service: service.clone(),
                })
                .collect(),
            discovered_files: self.discovered_files.iter().cloned().collect(),
            discovered_credentials: self.discovered_credentials.iter().cloned().collect(),
        }
    }

    fn from_row(row: crate::db::SessionRow) -> Self {
        Self {
            session_id: row.id,
            client_info: row.client_info,
            escalation_level: row.escalation_level,
            discovered_hosts: row.discovered_hosts.into_iter().collect(),
            discovered_ports: row
                .discovered_ports
                .into_iter()
                .map(|p| (p.host, p.port, p.service))
                .collect(),
            discovered_files: row.discovered_files.into_iter().collect(),
            discovered_credentials: row.discovered_credentials.into_iter().collect(),
            interaction_count: 0,
        }
    }
}

struct Cache {
    sessions: HashMap<String, SessionContext>,
    last_touch: HashMap<String, Instant>,
}

impl Cache {
    fn assert_key_sync(&self) {
        debug_assert_eq!(self.sessions.len(), self.last_touch.len());
    }
}

pub struct SessionManager {
    pub(crate) store: Arc<Store>,
    bus: Arc<EventBus>,
    cache: Mutex<Cache>,
    ttl: Duration,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(store: Arc<Store>, bus: Arc<EventBus>, ttl: Duration, shutdown: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus,
            cache: Mutex::new(Cache { sessions: HashMap::new(), last_touch: HashMap::new() }),
            ttl,
            shutdown,
        })
    }

    /// Generate a 32-char lowercase hex session ID from CSPRNG randomness.
    fn generate_id() -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub async fn create(&self, client_info: serde_json::Value) -> anyhow::Result<String> {
        let session_id = Self::generate_id();
        let ctx = SessionContext::new(session_id.clone(), client_info.clone());

        {
            let mut cache = self.cache.lock().await;
            cache.sessions.insert(session_id.clone(), ctx);
            cache.last_touch.insert(session_id.clone(), Instant::now());
            cache.assert_key_sync();
        }

        let store = Arc::clone(&self.store);
        let id_for_db = session_id.clone();
        tokio::task::spawn_blocking(move || store.create_session(&id_for_db, &client_info)).await??;

        self.bus
            .publish("session_new", serde_json::json!({"session_id": session_id}))
            .await;

        Ok(session_id)
    }

    /// Look up a session, loading from the store on cache miss.
    pub async fn get(&self, session_id: &str) -> anyhow::Result<Option<SessionContext>> {
        {
            let cache = self.cache.lock().await;
            if let Some(ctx) = cache.sessions.get(session_id) {
                return Ok(Some(ctx.clone()));
            }
        }

        let store = Arc::clone(&self.store);
        let id = session_id.to_owned();
        let row = tokio::task::spawn_blocking(move || store.get_session(&id)).await??;
        let Some(row) = row else { return Ok(None) };
        let ctx = SessionContext::from_row(row);

        let mut cache = self.cache.lock().await;
        cache.sessions.entry(session_id.to_owned()).or_insert_with(|| ctx.clone());
        cache.last_touch.entry(session_id.to_owned()).or_insert_with(Instant::now);
        cache.assert_key_sync();
        Ok(Some(ctx))
    }

    /// Atomically increment the interaction counter and refresh the
    /// last-touch timestamp under a single mutex acquisition, so N
    /// concurrent `touch` calls always yield a final count of N.
    pub async fn touch(&self, session_id: &str) -> anyhow::Result<()> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(ctx) = cache.sessions.get_mut(session_id) {
                ctx.interaction_count += 1;
                cache.last_touch.insert(session_id.to_owned(), Instant::now());
                cache.assert_key_sync();
                return Ok(());
            }
        }

        // Not cached: load it (populates the cache), then retry under the lock.
        if self.get(session_id).await?.is_none() {
            return Ok(());
        }
        let mut cache = self.cache.lock().await;
        if let Some(ctx) = cache.sessions.get_mut(session_id) {
            ctx.interaction_count += 1;
            cache.last_touch.insert(session_id.to_owned(), Instant::now());
            cache.assert_key_sync();
        }
        Ok(())
    }

    /// Mutate the cached context in place via `f`, then return a clone.
    pub async fn with_session_mut<F>(&self, session_id: &str, f: F) -> anyhow::Result<Option<SessionContext>>
    where
        F: FnOnce(&mut SessionContext),
    {
        self.with_session_mut_result(session_id, |ctx| {
            f(ctx);
            Ok(())
        })
        .await
        .map(|opt| opt.map(|(ctx, ())| ctx))
    }

    /// Like `with_session_mut`, but threads a fallible closure result back
    /// out alongside the mutated context. Used by the tool-dispatch pipeline,
    /// which needs a simulator's return value from the same critical section
    /// as the mutation it performs on the session.
    pub async fn with_session_mut_result<F, T>(
        &self,
        session_id: &str,
        f: F,
    ) -> anyhow::Result<Option<(SessionContext, T)>>
    where
        F: FnOnce(&mut SessionContext) -> anyhow::Result<T>,
    {
        if self.get(session_id).await?.is_none() {
            return Ok(None);
        }
        let mut cache = self.cache.lock().await;
        if let Some(ctx) = cache.sessions.get_mut(session_id) {
            let result = f(ctx)?;
            return Ok(Some((ctx.clone(), result)));
        }
        Ok(None)
    }

    /// Write the cached context through to the store. Does not publish any
    /// event itself — callers that change escalation level are responsible
    /// for publishing `session_update` when that escalation actually occurred.
    pub async fn persist(&self, session_id: &str) -> anyhow::Result<()> {
        let ctx = {
            let cache = self.cache.lock().await;
            cache.sessions.get(session_id).cloned()
        };
        let Some(ctx) = ctx else { return Ok(()) };

        let store = Arc::clone(&self.store);
        let id = session_id.to_owned();
        let update = ctx.to_update();
        tokio::task::spawn_blocking(move || store.update_session(&id, &update)).await??;
        Ok(())
    }

    /// Spawn the background TTL eviction loop. Cancellable via `shutdown`.
    pub fn spawn_eviction_worker(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(60));
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let mut cache = manager.cache.lock().await;
                let now = Instant::now();
                let expired: Vec<String> = cache
                    .last_touch
                    .iter()
                    .filter(|(_, last)| now.duration_since(**last) > manager.ttl)
                    .map(|(id, _)| id.clone())
                    .collect();

                for id in expired {
                    cache.sessions.remove(&id);
                    cache.last_touch.remove(&id);
                    tracing::info!(session_id = %id, "evicted idle session from cache");
                }
                cache.assert_key_sync();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_manager() -> Arc<SessionManager> {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        SessionManager::new(store, bus, Duration::from_secs(3600), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_create_generates_valid_id() {
        let mgr = test_manager().await;
        let id = mgr.create(serde_json::json!({"name": "t"})).await.unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[tokio::test]
    async fn test_touch_concurrent_no_lost_updates() {
        let mgr = test_manager().await;
        let id = mgr.create(serde_json::json!({})).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let mgr = Arc::clone(&mgr);
            let id = id.clone();
            handles.push(tokio::spawn(async move { mgr.touch(&id).await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let ctx = mgr.get(&id).await.unwrap().unwrap();
        assert_eq!(ctx.interaction_count, 50);
    }

    #[tokio::test]
    async fn test_dedup_on_discovery_lists() {
        let mgr = test_manager().await;
        let id = mgr.create(serde_json::json!({})).await.unwrap();
        mgr.with_session_mut(&id, |ctx| {
            ctx.add_host("10.0.1.5");
            ctx.add_host("10.0.1.5");
        })
        .await
        .unwrap();
        let ctx = mgr.get(&id).await.unwrap().unwrap();
        assert_eq!(ctx.discovered_hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_escalation_caps_at_three() {
        let mgr = test_manager().await;
        let id = mgr.create(serde_json::json!({})).await.unwrap();
        mgr.with_session_mut(&id, |ctx| ctx.escalate(10)).await.unwrap();
        let ctx = mgr.get(&id).await.unwrap().unwrap();
        assert_eq!(ctx.escalation_level, 3);
    }

    #[tokio::test]
    async fn test_persist_writes_through_to_store() {
        let mgr = test_manager().await;
        let id = mgr.create(serde_json::json!({})).await.unwrap();
        mgr.with_session_mut(&id, |ctx| ctx.add_host("10.0.1.5")).await.unwrap();
        mgr.persist(&id).await.unwrap();

        let row = mgr.store.get_session(&id).unwrap().unwrap();
        assert_eq!(row.discovered_hosts, vec!["10.0.1.5".to_string()]);
    }
}
