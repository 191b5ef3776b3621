// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-process event bus with monotonic IDs and catch-up replay,
//! feeding the live SSE stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};

const MAX_EVENTS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: u64,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

struct Inner {
    events: VecDeque<Event>,
    subscribers: Vec<Arc<Notify>>,
}

/// Bus handle subscribers hold: a notification signal plus the cursor they
/// last consumed.
pub struct Subscription {
    pub notify: Arc<Notify>,
    pub last_id: u64,
}

pub struct EventBus {
    inner: Mutex<Inner>,
    counter: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { events: VecDeque::new(), subscribers: Vec::new() }), counter: AtomicU64::new(0) }
    }

    pub async fn publish(&self, event_type: &str, data: serde_json::Value) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event { id, event_type: event_type.to_owned(), data, timestamp: now_iso() };

        let mut inner = self.inner.lock().await;
        inner.events.push_back(event);
        while inner.events.len() > MAX_EVENTS {
            inner.events.pop_front();
        }
        for notify in &inner.subscribers {
            notify.notify_one();
        }
        id
    }

    pub async fn subscribe(&self) -> Subscription {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.lock().await;
        inner.subscribers.push(Arc::clone(&notify));
        let last_id = inner.events.back().map(|e| e.id).unwrap_or(0);
        Subscription { notify, last_id }
    }

    pub async fn unsubscribe(&self, notify: &Arc<Notify>) {
        let mut inner = self.inner.lock().await;
        inner.subscribers.retain(|n| !Arc::ptr_eq(n, notify));
    }

    pub async fn events_since(&self, last_id: u64) -> Vec<Event> {
        let inner = self.inner.lock().await;
        inner.events.iter().filter(|e| e.id > last_id).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn now_iso() -> String {
    crate::db::now_iso()
}
