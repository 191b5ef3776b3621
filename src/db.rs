// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite persistence store: sessions, interactions, honey tokens.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct DiscoveredPort {
    pub host: String,
    pub port: u16,
    pub service: String,
}

/// A session row as stored durably. JSON-typed columns already deserialized.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionRow {
    pub id: String,
    pub client_info: serde_json::Value,
    pub started_at: String,
    pub last_seen_at: String,
    pub escalation_level: i64,
    pub discovered_hosts: Vec<String>,
    pub discovered_ports: Vec<DiscoveredPort>,
    pub discovered_files: Vec<String>,
    pub discovered_credentials: Vec<String>,
    pub metadata: serde_json::Value,
}

/// Mutable fields written back on every `update_session` call.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub escalation_level: i64,
    pub discovered_hosts: Vec<String>,
    pub discovered_ports: Vec<DiscoveredPort>,
    pub discovered_files: Vec<String>,
    pub discovered_credentials: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InteractionRow {
    pub id: i64,
    pub session_id: String,
    pub timestamp: String,
    pub method: String,
    pub tool_name: Option<String>,
    pub params: serde_json::Value,
    pub response: serde_json::Value,
    pub escalation_delta: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HoneyTokenRow {
    pub id: i64,
    pub session_id: String,
    pub token_type: String,
    pub token_value: String,
    pub context: String,
    pub deployed_at: String,
    pub interaction_id: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize, Default)]
pub struct Stats {
    pub total_sessions: i64,
    pub total_interactions: i64,
    pub total_honey_tokens: i64,
    pub sessions_by_escalation: Vec<(i64, i64)>,
}

/// Where a fresh `Connection` is opened from. File-backed stores reopen the
/// same path every call; in-memory stores share one SQLite `cache=shared`
/// namespace, which needs a URI rather than a path.
enum Location {
    Path(PathBuf),
    SharedMemory(String),
}

const MAX_TXN_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(320);

/// SQLite-backed store. Every public method opens its own `Connection`,
/// runs in a single transaction, and closes the connection on return —
/// nothing is held across calls except (for the in-memory variant) one
/// keep-alive handle that prevents the shared-cache database from being
/// torn down between operations. Transient `SQLITE_BUSY`/`SQLITE_LOCKED`
/// errors are retried with bounded exponential backoff before surfacing.
pub struct Store {
    location: Location,
    // Only ever written once at construction and read by nothing — wrapped in
    // a `Mutex` purely so `Connection`'s lack of `Sync` doesn't stop `Store`
    // (and thus `Arc<Store>`) from crossing the `spawn_blocking` thread boundary.
    _keep_alive: std::sync::Mutex<Option<Connection>>,
}

// Minimal RFC3339 UTC timestamp built on std only — no case in this server
// needs parsing or arithmetic beyond string comparison, so a `chrono`
// dependency isn't pulled in for it.
pub(crate) fn now_iso() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_iso(now.as_secs(), now.subsec_millis())
}

fn format_iso(secs: u64, millis: u32) -> String {
    // Days since epoch -> y/m/d via civil_from_days (Howard Hinnant's algorithm).
    let days = (secs / 86400) as i64;
    let rem = secs % 86400;
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    let (y, mo, d) = civil_from_days(days);
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{m:02}:{s:02}.{millis:03}+00:00")
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn to_json(v: &impl serde::Serialize) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "null".to_string())
}

fn from_json<T: serde::de::DeserializeOwned + Default>(s: &str) -> T {
    serde_json::from_str(s).unwrap_or_default()
}

/// Transient write-lock contention, the only error class worth retrying.
fn is_transient_lock_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating db directory {}", parent.display()))?;
            }
        }
        let store =
            Self { location: Location::Path(db_path.to_path_buf()), _keep_alive: std::sync::Mutex::new(None) };
        store.init_schema()?;
        store.enforce_owner_only_permissions(db_path);
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:honeytrap-mem-{id}?mode=memory&cache=shared");

        // Hold one connection open for the store's lifetime: a shared-cache
        // in-memory database is destroyed the instant its last connection
        // closes, which would otherwise happen between every call.
        let keep_alive = Self::open_uri(&uri)
            .with_context(|| format!("opening in-memory database {uri}"))?;
        let store = Self {
            location: Location::SharedMemory(uri),
            _keep_alive: std::sync::Mutex::new(Some(keep_alive)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn open_uri(uri: &str) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI,
        )
    }

    /// Open a fresh connection for a single operation. The caller is
    /// responsible for closing it (drop) once the operation is done.
    fn open_conn(&self) -> rusqlite::Result<Connection> {
        let conn = match &self.location {
            Location::Path(path) => Connection::open(path)?,
            Location::SharedMemory(uri) => Self::open_uri(uri)?,
        };
        // We drive retries ourselves; don't let rusqlite's own busy-timeout
        // also block inside a single call.
        conn.busy_timeout(Duration::ZERO)?;
        Ok(conn)
    }

    #[cfg(unix)]
    fn enforce_owner_only_permissions(&self, db_path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(db_path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            let _ = std::fs::set_permissions(db_path, perms);
        }
    }

    #[cfg(not(unix))]
    fn enforce_owner_only_permissions(&self, _db_path: &Path) {}

    /// Run `f` inside a fresh connection and a single transaction: commit on
    /// success, rollback (implicit via drop) on any failure, close the
    /// connection on return. Transient lock contention is retried with
    /// bounded exponential backoff; once attempts are exhausted the error is
    /// surfaced to the caller as an internal error.
    fn run_txn<T>(&self, f: impl Fn(&rusqlite::Transaction) -> rusqlite::Result<T>) -> Result<T> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_TXN_ATTEMPTS {
            let mut conn = self.open_conn().context("opening store connection")?;
            let tx = conn.transaction().context("starting store transaction")?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit().context("committing store transaction")?;
                    return Ok(value);
                }
                Err(e) if is_transient_lock_error(&e) && attempt < MAX_TXN_ATTEMPTS => {
                    drop(tx);
                    tracing::debug!(attempt, error = %e, "store operation hit transient lock, retrying");
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => {
                    drop(tx);
                    if is_transient_lock_error(&e) {
                        tracing::warn!(attempts = attempt, error = %e, "store retry exhaustion, surfacing as internal error");
                    }
                    return Err(e).context("store operation failed");
                }
            }
        }
        // Every branch inside the loop returns by the final attempt; this is
        // only reachable if MAX_TXN_ATTEMPTS were ever set to 0.
        Err(anyhow::anyhow!("store transaction retry loop exited without a result"))
    }

    fn init_schema(&self) -> Result<()> {
        self.run_txn(|tx| {
            tx.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA foreign_keys=ON;

                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    client_info TEXT NOT NULL DEFAULT '{}',
                    started_at TEXT NOT NULL,
                    last_seen_at TEXT NOT NULL,
                    escalation_level INTEGER NOT NULL DEFAULT 0,
                    discovered_hosts TEXT NOT NULL DEFAULT '[]',
                    discovered_ports TEXT NOT NULL DEFAULT '[]',
                    discovered_files TEXT NOT NULL DEFAULT '[]',
                    discovered_credentials TEXT NOT NULL DEFAULT '[]',
                    metadata TEXT NOT NULL DEFAULT '{}'
                );

                CREATE TABLE IF NOT EXISTS interactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    method TEXT NOT NULL,
                    tool_name TEXT,
                    params TEXT NOT NULL DEFAULT '{}',
                    response TEXT NOT NULL DEFAULT '{}',
                    escalation_delta INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS honey_tokens (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    token_type TEXT NOT NULL,
                    token_value TEXT NOT NULL,
                    context TEXT NOT NULL DEFAULT '',
                    deployed_at TEXT NOT NULL,
                    interaction_id INTEGER,
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
                    FOREIGN KEY (interaction_id) REFERENCES interactions(id) ON DELETE SET NULL
                );

                CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions(session_id);
                CREATE INDEX IF NOT EXISTS idx_honey_tokens_session ON honey_tokens(session_id);
                CREATE INDEX IF NOT EXISTS idx_honey_tokens_value ON honey_tokens(token_value);
                "#,
            )
        })
    }

    pub fn create_session(&self, session_id: &str, client_info: &serde_json::Value) -> Result<()> {
        let ts = now_iso();
        let client_info = to_json(client_info);
        self.run_txn(|tx| {
            tx.execute(
                "INSERT INTO sessions (id, client_info, started_at, last_seen_at) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, client_info, ts, ts],
            )
            .map(|_| ())
        })
    }

    pub fn update_session(&self, session_id: &str, fields: &SessionUpdate) -> Result<()> {
        let ts = now_iso();
        let hosts = to_json(&fields.discovered_hosts);
        let ports = to_json(&fields.discovered_ports);
        let files = to_json(&fields.discovered_files);
        let creds = to_json(&fields.discovered_credentials);
        self.run_txn(|tx| {
            tx.execute(
                r#"UPDATE sessions SET
                    last_seen_at = ?1,
                    escalation_level = ?2,
                    discovered_hosts = ?3,
                    discovered_ports = ?4,
                    discovered_files = ?5,
                    discovered_credentials = ?6
                   WHERE id = ?7"#,
                params![ts, fields.escalation_level, hosts, ports, files, creds, session_id],
            )
            .map(|_| ())
        })
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        self.run_txn(|tx| {
            tx.query_row("SELECT * FROM sessions WHERE id = ?1", params![session_id], Self::row_to_session)
                .optional()
        })
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
        let client_info: String = row.get("client_info")?;
        let hosts: String = row.get("discovered_hosts")?;
        let ports: String = row.get("discovered_ports")?;
        let files: String = row.get("discovered_files")?;
        let creds: String = row.get("discovered_credentials")?;
        let metadata: String = row.get("metadata")?;
        Ok(SessionRow {
            id: row.get("id")?,
            client_info: serde_json::from_str(&client_info).unwrap_or(serde_json::json!({})),
            started_at: row.get("started_at")?,
            last_seen_at: row.get("last_seen_at")?,
            escalation_level: row.get("escalation_level")?,
            discovered_hosts: from_json(&hosts),
            discovered_ports: from_json(&ports),
            discovered_files: from_json(&files),
            discovered_credentials: from_json(&creds),
            metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::json!({})),
        })
    }

    pub fn log_interaction(
        &self,
        session_id: &str,
        method: &str,
        tool_name: Option<&str>,
        params: &serde_json::Value,
        response: &serde_json::Value,
        escalation_delta: i64,
    ) -> Result<i64> {
        let ts = now_iso();
        let params_json = to_json(params);
        let response_json = to_json(response);
        self.run_txn(|tx| {
            tx.execute(
                r#"INSERT INTO interactions
                   (session_id, timestamp, method, tool_name, params, response, escalation_delta)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![session_id, ts, method, tool_name, params_json, response_json, escalation_delta],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    pub fn log_honey_token(
        &self,
        session_id: &str,
        token_type: &str,
        token_value: &str,
        context: &str,
        interaction_id: Option<i64>,
    ) -> Result<i64> {
        let ts = now_iso();
        self.run_txn(|tx| {
            tx.execute(
                r#"INSERT INTO honey_tokens
                   (session_id, token_type, token_value, context, deployed_at, interaction_id)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![session_id, token_type, token_value, context, ts, interaction_id],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    pub fn interaction_count(&self, session_id: &str) -> Result<i64> {
        self.run_txn(|tx| {
            tx.query_row("SELECT COUNT(*) FROM interactions WHERE session_id = ?1", params![session_id], |r| r.get(0))
        })
    }

    pub fn token_count(&self, session_id: &str) -> Result<i64> {
        self.run_txn(|tx| {
            tx.query_row("SELECT COUNT(*) FROM honey_tokens WHERE session_id = ?1", params![session_id], |r| r.get(0))
        })
    }

    pub fn get_stats(&self) -> Result<Stats> {
        self.run_txn(|tx| {
            let total_sessions = tx.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;
            let total_interactions = tx.query_row("SELECT COUNT(*) FROM interactions", [], |r| r.get(0))?;
            let total_honey_tokens = tx.query_row("SELECT COUNT(*) FROM honey_tokens", [], |r| r.get(0))?;

            let mut stmt = tx.prepare(
                "SELECT escalation_level, COUNT(*) FROM sessions GROUP BY escalation_level ORDER BY escalation_level",
            )?;
            let sessions_by_escalation =
                stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?.collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Stats { total_sessions, total_interactions, total_honey_tokens, sessions_by_escalation })
        })
    }

    pub fn get_all_sessions(
        &self,
        escalation_level: Option<i64>,
        since: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionRow>> {
        let mut sql = String::from("SELECT * FROM sessions WHERE 1=1");
        if escalation_level.is_some() {
            sql.push_str(" AND escalation_level = ?1");
        }
        if since.is_some() {
            sql.push_str(if escalation_level.is_some() {
                " AND last_seen_at >= ?2"
            } else {
                " AND last_seen_at >= ?1"
            });
        }
        sql.push_str(" ORDER BY last_seen_at DESC LIMIT ? OFFSET ?");

        self.run_txn(|tx| {
            let mut stmt = tx.prepare(&sql)?;
            let rows = match (escalation_level, since) {
                (Some(lvl), Some(s)) => stmt.query_map(params![lvl, s, limit, offset], Self::row_to_session)?,
                (Some(lvl), None) => stmt.query_map(params![lvl, limit, offset], Self::row_to_session)?,
                (None, Some(s)) => stmt.query_map(params![s, limit, offset], Self::row_to_session)?,
                (None, None) => stmt.query_map(params![limit, offset], Self::row_to_session)?,
            };
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    pub fn get_session_interactions(
        &self,
        session_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InteractionRow>> {
        self.run_txn(|tx| {
            let mut stmt = tx.prepare(
                "SELECT * FROM interactions WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![session_id, limit, offset], |row| {
                let params_s: String = row.get("params")?;
                let response_s: String = row.get("response")?;
                Ok(InteractionRow {
                    id: row.get("id")?,
                    session_id: row.get("session_id")?,
                    timestamp: row.get("timestamp")?,
                    method: row.get("method")?,
                    tool_name: row.get("tool_name")?,
                    params: serde_json::from_str(&params_s).unwrap_or(serde_json::json!({})),
                    response: serde_json::from_str(&response_s).unwrap_or(serde_json::json!({})),
                    escalation_delta: row.get("escalation_delta")?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    pub fn get_session_tokens(&self, session_id: &str) -> Result<Vec<HoneyTokenRow>> {
        self.run_txn(|tx| {
            let mut stmt = tx.prepare("SELECT * FROM honey_tokens WHERE session_id = ?1 ORDER BY id DESC")?;
            let rows = stmt.query_map(params![session_id], Self::row_to_token)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    pub fn get_all_tokens(
        &self,
        token_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HoneyTokenRow>> {
        self.run_txn(|tx| {
            if let Some(t) = token_type {
                let mut stmt = tx.prepare(
                    "SELECT * FROM honey_tokens WHERE token_type = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(params![t, limit, offset], Self::row_to_token)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            } else {
                let mut stmt = tx.prepare("SELECT * FROM honey_tokens ORDER BY id DESC LIMIT ?1 OFFSET ?2")?;
                let rows = stmt.query_map(params![limit, offset], Self::row_to_token)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            }
        })
    }

    fn row_to_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<HoneyTokenRow> {
        Ok(HoneyTokenRow {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            token_type: row.get("token_type")?,
            token_value: row.get("token_value")?,
            context: row.get("context")?,
            deployed_at: row.get("deployed_at")?,
            interaction_id: row.get("interaction_id")?,
        })
    }

    pub fn clear_all_data(&self) -> Result<()> {
        self.run_txn(|tx| {
            tx.execute_batch("DELETE FROM honey_tokens; DELETE FROM interactions; DELETE FROM sessions;")
        })
    }

    pub fn purge_tokens_older_than(&self, days: i64) -> Result<usize> {
        let cutoff_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
            - days * 86400;
        let (y, mo, d) = civil_from_days(cutoff_secs / 86400);
        let cutoff = format!("{y:04}-{mo:02}-{d:02}");
        self.run_txn(|tx| tx.execute("DELETE FROM honey_tokens WHERE deployed_at < ?1", params![cutoff]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_session() {
        let store = Store::open_in_memory().unwrap();
        store.create_session("a".repeat(32).as_str(), &serde_json::json!({"name":"t"})).unwrap();
        let row = store.get_session(&"a".repeat(32)).unwrap().unwrap();
        assert_eq!(row.escalation_level, 0);
        assert_eq!(row.discovered_hosts.len(), 0);
    }

    #[test]
    fn test_update_session_persists_lists() {
        let store = Store::open_in_memory().unwrap();
        let id = "b".repeat(32);
        store.create_session(&id, &serde_json::json!({})).unwrap();
        let update = SessionUpdate {
            escalation_level: 2,
            discovered_hosts: vec!["10.0.1.5".into()],
            discovered_ports: vec![DiscoveredPort { host: "10.0.1.5".into(), port: 22, service: "ssh".into() }],
            discovered_files: vec![],
            discovered_credentials: vec!["db_credential:vault".into()],
        };
        store.update_session(&id, &update).unwrap();
        let row = store.get_session(&id).unwrap().unwrap();
        assert_eq!(row.escalation_level, 2);
        assert_eq!(row.discovered_hosts, vec!["10.0.1.5".to_string()]);
        assert_eq!(row.discovered_ports[0].port, 22);
    }

    #[test]
    fn test_log_interaction_and_token() {
        let store = Store::open_in_memory().unwrap();
        let id = "c".repeat(32);
        store.create_session(&id, &serde_json::json!({})).unwrap();
        let interaction_id = store
            .log_interaction(&id, "tools/call", Some("nmap_scan"), &serde_json::json!({}), &serde_json::json!({}), 1)
            .unwrap();
        assert!(interaction_id > 0);
        let token_id = store
            .log_honey_token(&id, "db_credential", "postgresql://x", "vault:secret/prod/db", Some(interaction_id))
            .unwrap();
        assert!(token_id > 0);
        assert_eq!(store.interaction_count(&id).unwrap(), 1);
        assert_eq!(store.token_count(&id).unwrap(), 1);
    }

    #[test]
    fn test_get_all_sessions_filters() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..3 {
            let id = format!("{i}").repeat(32);
            store.create_session(&id, &serde_json::json!({})).unwrap();
            let update = SessionUpdate { escalation_level: i, ..Default::default() };
            store.update_session(&id, &update).unwrap();
        }
        let filtered = store.get_all_sessions(Some(2), None, 50, 0).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].escalation_level, 2);
    }

    #[test]
    fn test_cascade_delete_on_clear() {
        let store = Store::open_in_memory().unwrap();
        let id = "d".repeat(32);
        store.create_session(&id, &serde_json::json!({})).unwrap();
        store
            .log_interaction(&id, "ping", None, &serde_json::json!({}), &serde_json::json!({}), 0)
            .unwrap();
        store.clear_all_data().unwrap();
        assert!(store.get_session(&id).unwrap().is_none());
    }

    #[test]
    fn test_fresh_connection_per_operation_sees_committed_state() {
        // Each call opens and closes its own connection; this only works if
        // writes are durably committed rather than sitting on a held connection.
        let store = Store::open_in_memory().unwrap();
        let id = "e".repeat(32);
        store.create_session(&id, &serde_json::json!({})).unwrap();
        assert!(store.get_session(&id).unwrap().is_some());
    }
}
