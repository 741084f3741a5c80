//! Generic collection-at-a-time CRUD engine.
//!
//! # Responsibility
//! - Load, mutate and persist one namespace holding a JSON array of records.
//! - Generate identifiers and merge partial updates.
//!
//! # Invariants
//! - Ids are random v4 UUIDs assigned here, never by the caller.
//! - Read-modify-write cycles through one repository (and its clones) are
//!   serialized by `write_lock`.
//! - Every persist is conditional on the version observed at load, so a
//!   writer on another handle surfaces `RepoError::Conflict` instead of
//!   silently losing an update.

use super::{RepoError, RepoResult};
use crate::model::inventory::InventoryItem;
use crate::model::resource::Resource;
use crate::model::user::User;
use crate::model::{Entity, EntityId};
use crate::store::{KvStore, StoreError, Version};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type UserRepository = EntityRepository<User>;
pub type ResourceRepository = EntityRepository<Resource>;
pub type InventoryRepository = EntityRepository<InventoryItem>;

/// Full collection as loaded from the store.
struct Snapshot<E> {
    records: Vec<E>,
    version: Version,
}

/// CRUD engine bound to one store handle and one namespace.
pub struct EntityRepository<E: Entity> {
    store: Arc<dyn KvStore>,
    namespace: Arc<str>,
    write_lock: Arc<Mutex<()>>,
    _kind: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: Arc::clone(&self.namespace),
            write_lock: Arc::clone(&self.write_lock),
            _kind: PhantomData,
        }
    }
}

impl<E: Entity> EntityRepository<E> {
    /// Binds the repository to the kind's default namespace.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_namespace(store, E::NAMESPACE)
    }

    pub fn with_namespace(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: Arc::from(namespace.into()),
            write_lock: Arc::new(Mutex::new(())),
            _kind: PhantomData,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns every record in insertion order.
    ///
    /// # Errors
    /// - `StorageCorruption` when the namespace holds undecodable or invalid data.
    pub async fn get_all(&self) -> RepoResult<Vec<E>> {
        Ok(self.load().await?.records)
    }

    pub async fn find(&self, id: EntityId) -> RepoResult<Option<E>> {
        let snapshot = self.load().await?;
        Ok(snapshot.records.into_iter().find(|record| record.id() == id))
    }

    /// Current store version of this namespace (`0` when never written).
    pub async fn version(&self) -> RepoResult<Version> {
        let stored = self.store.read(&self.namespace).await?;
        Ok(stored.map_or(0, |value| value.version))
    }

    /// Creates a record with a fresh id and returns it.
    pub async fn create(&self, draft: E::Draft) -> RepoResult<E> {
        self.create_checked(draft, |_, _| Ok(())).await
    }

    /// Creates a record after `check` accepts it.
    ///
    /// `check` sees the loaded collection and the candidate, inside the
    /// serialized write section and before anything is persisted.
    pub async fn create_checked<F>(&self, draft: E::Draft, check: F) -> RepoResult<E>
    where
        F: FnOnce(&[E], &E) -> RepoResult<()> + Send,
    {
        let started_at = Instant::now();
        let _guard = self.write_lock.lock().await;
        let result = self.create_locked(draft, check).await;
        self.log_outcome(
            "entity_create",
            started_at,
            result.as_ref().map(E::id).ok(),
            result.as_ref().err(),
        );
        result
    }

    /// Merges `patch` onto the record identified by `id`.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`.
    pub async fn update(&self, id: EntityId, patch: E::Patch) -> RepoResult<()> {
        self.update_checked(id, patch, |_, _, _| Ok(())).await
    }

    /// Merges `patch` after `check` accepts the change.
    ///
    /// `check` receives the other records, the stored record and the merged
    /// candidate.
    pub async fn update_checked<F>(&self, id: EntityId, patch: E::Patch, check: F) -> RepoResult<()>
    where
        F: FnOnce(&[E], &E, &E) -> RepoResult<()> + Send,
    {
        let started_at = Instant::now();
        let _guard = self.write_lock.lock().await;
        let result = self.update_locked(id, patch, check).await;
        self.log_outcome("entity_update", started_at, Some(id), result.as_ref().err());
        result
    }

    /// Removes the record identified by `id`.
    ///
    /// # Errors
    /// - `NotFound` when no record has `id`; the collection is left untouched.
    pub async fn delete(&self, id: EntityId) -> RepoResult<()> {
        let started_at = Instant::now();
        let _guard = self.write_lock.lock().await;

        let result = self.delete_locked(id).await;
        self.log_outcome("entity_delete", started_at, Some(id), result.as_ref().err());
        result
    }

    /// Replaces the namespace with an empty collection.
    ///
    /// Recovery path after `StorageCorruption`; it does not decode the
    /// current contents.
    pub async fn reset(&self) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec(&Vec::<E>::new()).map_err(RepoError::Encode)?;
        let version = self.store.write(&self.namespace, bytes).await?;
        warn!(
            "event=namespace_reset module=repo status=ok namespace={} version={version}",
            self.namespace
        );
        Ok(())
    }

    async fn create_locked<F>(&self, draft: E::Draft, check: F) -> RepoResult<E>
    where
        F: FnOnce(&[E], &E) -> RepoResult<()> + Send,
    {
        let mut snapshot = self.load().await?;
        let mut record = E::from_draft(Uuid::new_v4(), draft);
        record.touch(Utc::now());
        record.validate()?;
        check(&snapshot.records, &record)?;

        snapshot.records.push(record.clone());
        self.persist(&snapshot.records, snapshot.version).await?;
        Ok(record)
    }

    async fn update_locked<F>(&self, id: EntityId, patch: E::Patch, check: F) -> RepoResult<()>
    where
        F: FnOnce(&[E], &E, &E) -> RepoResult<()> + Send,
    {
        let mut snapshot = self.load().await?;
        let index = self.position(&snapshot.records, id)?;

        let mut candidate = snapshot.records[index].clone();
        candidate.merge(patch);
        candidate.touch(Utc::now());
        candidate.validate()?;

        let current = snapshot.records.remove(index);
        check(&snapshot.records, &current, &candidate)?;

        snapshot.records.insert(index, candidate);
        self.persist(&snapshot.records, snapshot.version).await?;
        Ok(())
    }

    async fn delete_locked(&self, id: EntityId) -> RepoResult<()> {
        let mut snapshot = self.load().await?;
        let index = self.position(&snapshot.records, id)?;
        snapshot.records.remove(index);
        self.persist(&snapshot.records, snapshot.version).await?;
        Ok(())
    }

    async fn load(&self) -> RepoResult<Snapshot<E>> {
        let Some(stored) = self.store.read(&self.namespace).await? else {
            return Ok(Snapshot {
                records: Vec::new(),
                version: 0,
            });
        };

        Ok(Snapshot {
            records: self.decode(&stored.bytes)?,
            version: stored.version,
        })
    }

    fn decode(&self, bytes: &[u8]) -> RepoResult<Vec<E>> {
        let records: Vec<E> =
            serde_json::from_slice(bytes).map_err(|err| self.corruption(err.to_string()))?;

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            let id = record.id();
            if let Err(err) = record.validate() {
                return Err(self.corruption(format!("{} {id}: {err}", E::KIND)));
            }
            if !seen.insert(id) {
                return Err(self.corruption(format!("duplicate {} id {id}", E::KIND)));
            }
        }

        Ok(records)
    }

    async fn persist(&self, records: &[E], expected: Version) -> RepoResult<Version> {
        let bytes = serde_json::to_vec(records).map_err(RepoError::Encode)?;
        match self
            .store
            .compare_and_write(&self.namespace, expected, bytes)
            .await
        {
            Ok(version) => Ok(version),
            Err(err @ StoreError::VersionMismatch { .. }) => {
                warn!(
                    "event=entity_conflict module=repo status=error namespace={} error={err}",
                    self.namespace
                );
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn position(&self, records: &[E], id: EntityId) -> RepoResult<usize> {
        records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(RepoError::NotFound { kind: E::KIND, id })
    }

    fn corruption(&self, message: String) -> RepoError {
        error!(
            "event=storage_corruption module=repo status=error namespace={} error_code=decode_failed",
            self.namespace
        );
        RepoError::StorageCorruption {
            namespace: self.namespace.to_string(),
            message,
        }
    }

    fn log_outcome(
        &self,
        event: &str,
        started_at: Instant,
        id: Option<EntityId>,
        error: Option<&RepoError>,
    ) {
        let duration_ms = started_at.elapsed().as_millis();
        let id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
        match error {
            None => info!(
                "event={event} module=repo status=ok namespace={} id={id} duration_ms={duration_ms}",
                self.namespace
            ),
            Some(err) => debug!(
                "event={event} module=repo status=error namespace={} id={id} duration_ms={duration_ms} error_code={}",
                self.namespace,
                error_code(err)
            ),
        }
    }
}

/// Stable machine-readable code for log lines.
pub(crate) fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Store(_) => "store_failed",
        RepoError::StorageCorruption { .. } => "storage_corruption",
        RepoError::NotFound { .. } => "not_found",
        RepoError::ReferentialIntegrity(_) => "referential_integrity",
        RepoError::Overlap { .. } => "overlap",
        RepoError::Conflict { .. } => "conflict",
        RepoError::Validation(_) => "validation_failed",
        RepoError::Encode(_) => "encode_failed",
    }
}
