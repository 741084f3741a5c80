//! SQLite-backed `KvStore`.
//!
//! # Invariants
//! - All SQLite work runs on the blocking pool; async callers never block.
//! - `compare_and_write` checks and bumps the version inside one
//!   `IMMEDIATE` transaction, so two handles on the same file cannot both win.

use super::{KvStore, StoreError, StoreResult, StoredValue, Version};
use crate::db::{open_db, open_db_in_memory};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Durable store keeping one row per namespace.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    latency: Duration,
}

impl SqliteStore {
    /// Opens a store file, creating and migrating it when needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            latency: Duration::ZERO,
        }
    }

    /// Adds simulated I/O latency before every read and write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn read(&self, namespace: &str) -> StoreResult<Option<StoredValue>> {
        let namespace = namespace.to_string();
        self.run(move |conn| {
            let value = conn
                .query_row(
                    "SELECT payload, version FROM collections WHERE namespace = ?1;",
                    [namespace.as_str()],
                    |row| {
                        Ok(StoredValue {
                            bytes: row.get(0)?,
                            version: row.get::<_, i64>(1)? as Version,
                        })
                    },
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn write(&self, namespace: &str, bytes: Vec<u8>) -> StoreResult<Version> {
        let namespace = namespace.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let next = current_version(&tx, &namespace)? + 1;
            upsert(&tx, &namespace, &bytes, next)?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn compare_and_write(
        &self,
        namespace: &str,
        expected: Version,
        bytes: Vec<u8>,
    ) -> StoreResult<Version> {
        let namespace = namespace.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let actual = current_version(&tx, &namespace)?;
            if actual != expected {
                return Err(StoreError::VersionMismatch {
                    namespace,
                    expected,
                    actual,
                });
            }
            let next = actual + 1;
            upsert(&tx, &namespace, &bytes, next)?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn namespaces(&self) -> StoreResult<Vec<String>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT namespace FROM collections ORDER BY namespace;")?;
            let mut rows = stmt.query([])?;
            let mut names = Vec::new();
            while let Some(row) = rows.next()? {
                names.push(row.get(0)?);
            }
            Ok(names)
        })
        .await
    }
}

fn current_version(conn: &Connection, namespace: &str) -> StoreResult<Version> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM collections WHERE namespace = ?1;",
            [namespace],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.map_or(0, |value| value as Version))
}

fn upsert(conn: &Connection, namespace: &str, bytes: &[u8], version: Version) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO collections (namespace, payload, version, updated_at)
         VALUES (?1, ?2, ?3, strftime('%s', 'now') * 1000)
         ON CONFLICT(namespace) DO UPDATE SET
            payload = excluded.payload,
            version = excluded.version,
            updated_at = excluded.updated_at;",
        params![namespace, bytes, version as i64],
    )?;
    Ok(())
}
