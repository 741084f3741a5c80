//! Durable namespace-keyed byte store.
//!
//! # Responsibility
//! - Define the async storage contract every repository is built on.
//! - Carry a per-namespace version so writers can detect interleaving.
//!
//! # Invariants
//! - Reading an absent namespace is `Ok(None)`, never an error.
//! - Each call is an atomic single-key read or write; no multi-key
//!   transactions exist.
//! - A namespace's version starts at 0 (absent) and increases by one per
//!   successful write.

use crate::db::DbError;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteStore;

/// Monotonic per-namespace write counter. `0` means "never written".
pub type Version = u64;

pub type StoreResult<T> = Result<T, StoreError>;

/// Bytes currently stored under one namespace, with their version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub bytes: Vec<u8>,
    pub version: Version,
}

/// Storage transport errors.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// `compare_and_write` observed a different version than expected.
    VersionMismatch {
        namespace: String,
        expected: Version,
        actual: Version,
    },
    /// A previous holder of the connection lock panicked.
    Poisoned,
    /// The blocking storage task could not be joined.
    Task(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::VersionMismatch {
                namespace,
                expected,
                actual,
            } => write!(
                f,
                "namespace `{namespace}` is at version {actual}, expected {expected}"
            ),
            Self::Poisoned => write!(f, "store connection lock poisoned"),
            Self::Task(message) => write!(f, "store task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::VersionMismatch { .. } | Self::Poisoned | Self::Task(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Async key-value contract backing every entity repository.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the bytes stored under `namespace`, or `None` if absent.
    async fn read(&self, namespace: &str) -> StoreResult<Option<StoredValue>>;

    /// Unconditionally replaces the bytes under `namespace`.
    ///
    /// Returns the new version.
    async fn write(&self, namespace: &str, bytes: Vec<u8>) -> StoreResult<Version>;

    /// Replaces the bytes only if the namespace is still at `expected`.
    ///
    /// # Errors
    /// - `StoreError::VersionMismatch` when another writer got there first.
    async fn compare_and_write(
        &self,
        namespace: &str,
        expected: Version,
        bytes: Vec<u8>,
    ) -> StoreResult<Version>;

    /// Lists every namespace that has been written, sorted by name.
    async fn namespaces(&self) -> StoreResult<Vec<String>>;
}
