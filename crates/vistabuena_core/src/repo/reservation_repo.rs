//! Reservation repository with status workflow enforcement.
//!
//! # Invariants
//! - Creation only accepts `pending` drafts.
//! - Status changes follow `ReservationStatus::transition`.
//! - Every create/update runs the relation checks inside the serialized
//!   write section, so the checked collection is the one persisted.

use super::{EntityRepository, RepoError, RepoResult};
use crate::integrity::RelationSnapshot;
use crate::model::reservation::{NewReservation, Reservation, ReservationPatch, ReservationStatus};
use crate::model::{EntityId, ValidationError};
use crate::store::{KvStore, Version};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReservationRepository {
    inner: EntityRepository<Reservation>,
}

impl ReservationRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            inner: EntityRepository::new(store),
        }
    }

    pub fn with_namespace(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            inner: EntityRepository::with_namespace(store, namespace),
        }
    }

    pub fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    pub async fn get_all(&self) -> RepoResult<Vec<Reservation>> {
        self.inner.get_all().await
    }

    pub async fn find(&self, id: EntityId) -> RepoResult<Option<Reservation>> {
        self.inner.find(id).await
    }

    pub async fn version(&self) -> RepoResult<Version> {
        self.inner.version().await
    }

    /// Creates a pending reservation.
    ///
    /// # Errors
    /// - `Validation(InitialStatusNotPending)` for any other initial status.
    /// - `ReferentialIntegrity` when the user or resource is unknown.
    /// - `Overlap` when the slot is already held on that resource.
    pub async fn create(
        &self,
        draft: NewReservation,
        relations: &RelationSnapshot,
    ) -> RepoResult<Reservation> {
        if draft.status != ReservationStatus::Pending {
            return Err(RepoError::Validation(
                ValidationError::InitialStatusNotPending(draft.status),
            ));
        }

        self.inner
            .create_checked(draft, |existing, candidate| {
                relations.check(existing, candidate)
            })
            .await
    }

    /// Applies a partial update, enforcing the status workflow.
    pub async fn update(
        &self,
        id: EntityId,
        patch: ReservationPatch,
        relations: &RelationSnapshot,
    ) -> RepoResult<()> {
        self.inner
            .update_checked(id, patch, |others, current, candidate| {
                current.status.transition(candidate.status)?;
                relations.check(others, candidate)
            })
            .await
    }

    pub async fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.inner.delete(id).await
    }

    pub async fn reset(&self) -> RepoResult<()> {
        self.inner.reset().await
    }
}
