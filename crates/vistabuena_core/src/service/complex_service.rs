//! Use-case façade over the four complex repositories.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for users, resources, inventory and
//!   reservations.
//! - Enforce referential integrity and slot exclusivity across collections.
//!
//! # Invariants
//! - Reservation create/update and user/resource delete run under
//!   `relations_lock`, so a reference check and the write it guards never
//!   interleave with another such mutation in this process.
//! - The service never retries; repository errors are returned unchanged.

use crate::integrity::{check_unreferenced_resource, check_unreferenced_user, RelationSnapshot};
use crate::model::inventory::{InventoryItem, InventoryPatch, NewInventoryItem};
use crate::model::reservation::{NewReservation, Reservation, ReservationPatch, ReservationStatus};
use crate::model::resource::{NewResource, Resource, ResourcePatch};
use crate::model::user::{NewUser, User, UserPatch};
use crate::model::EntityId;
use crate::repo::{
    InventoryRepository, RepoResult, ReservationRepository, ResourceRepository, UserRepository,
};
use crate::store::KvStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry point for every record operation in the complex.
pub struct ComplexService {
    users: UserRepository,
    resources: ResourceRepository,
    inventory: InventoryRepository,
    reservations: ReservationRepository,
    relations_lock: Mutex<()>,
}

impl ComplexService {
    /// Binds all four repositories to their default namespaces in `store`.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::from_repositories(
            UserRepository::new(Arc::clone(&store)),
            ResourceRepository::new(Arc::clone(&store)),
            InventoryRepository::new(Arc::clone(&store)),
            ReservationRepository::new(store),
        )
    }

    pub fn from_repositories(
        users: UserRepository,
        resources: ResourceRepository,
        inventory: InventoryRepository,
        reservations: ReservationRepository,
    ) -> Self {
        Self {
            users,
            resources,
            inventory,
            reservations,
            relations_lock: Mutex::new(()),
        }
    }

    pub fn user_repository(&self) -> &UserRepository {
        &self.users
    }

    pub fn resource_repository(&self) -> &ResourceRepository {
        &self.resources
    }

    pub fn inventory_repository(&self) -> &InventoryRepository {
        &self.inventory
    }

    pub fn reservation_repository(&self) -> &ReservationRepository {
        &self.reservations
    }

    // Users

    pub async fn users(&self) -> RepoResult<Vec<User>> {
        self.users.get_all().await
    }

    pub async fn create_user(&self, draft: NewUser) -> RepoResult<User> {
        self.users.create(draft).await
    }

    pub async fn update_user(&self, id: EntityId, patch: UserPatch) -> RepoResult<()> {
        self.users.update(id, patch).await
    }

    /// Deletes a user that no reservation references.
    ///
    /// # Errors
    /// - `ReferentialIntegrity(UserInUse)` while reservations point at it.
    /// - `NotFound` when the user does not exist.
    pub async fn delete_user(&self, id: EntityId) -> RepoResult<()> {
        let _guard = self.relations_lock.lock().await;
        let reservations = self.reservations.get_all().await?;
        check_unreferenced_user(id, &reservations)?;
        self.users.delete(id).await
    }

    // Resources

    pub async fn resources(&self) -> RepoResult<Vec<Resource>> {
        self.resources.get_all().await
    }

    pub async fn create_resource(&self, draft: NewResource) -> RepoResult<Resource> {
        self.resources.create(draft).await
    }

    pub async fn update_resource(&self, id: EntityId, patch: ResourcePatch) -> RepoResult<()> {
        self.resources.update(id, patch).await
    }

    /// Deletes a resource that no reservation references.
    pub async fn delete_resource(&self, id: EntityId) -> RepoResult<()> {
        let _guard = self.relations_lock.lock().await;
        let reservations = self.reservations.get_all().await?;
        check_unreferenced_resource(id, &reservations)?;
        self.resources.delete(id).await
    }

    // Inventory

    pub async fn inventory(&self) -> RepoResult<Vec<InventoryItem>> {
        self.inventory.get_all().await
    }

    pub async fn create_inventory_item(&self, draft: NewInventoryItem) -> RepoResult<InventoryItem> {
        self.inventory.create(draft).await
    }

    pub async fn update_inventory_item(&self, id: EntityId, patch: InventoryPatch) -> RepoResult<()> {
        self.inventory.update(id, patch).await
    }

    pub async fn delete_inventory_item(&self, id: EntityId) -> RepoResult<()> {
        self.inventory.delete(id).await
    }

    // Reservations

    pub async fn reservations(&self) -> RepoResult<Vec<Reservation>> {
        self.reservations.get_all().await
    }

    /// Creates a pending reservation after reference and overlap checks.
    pub async fn create_reservation(&self, draft: NewReservation) -> RepoResult<Reservation> {
        let _guard = self.relations_lock.lock().await;
        let relations = self.relation_snapshot().await?;
        self.reservations.create(draft, &relations).await
    }

    /// Updates a reservation after workflow, reference and overlap checks.
    pub async fn update_reservation(&self, id: EntityId, patch: ReservationPatch) -> RepoResult<()> {
        let _guard = self.relations_lock.lock().await;
        let relations = self.relation_snapshot().await?;
        self.reservations.update(id, patch, &relations).await
    }

    pub async fn approve_reservation(&self, id: EntityId) -> RepoResult<()> {
        self.set_reservation_status(id, ReservationStatus::Approved)
            .await
    }

    pub async fn reject_reservation(&self, id: EntityId) -> RepoResult<()> {
        self.set_reservation_status(id, ReservationStatus::Rejected)
            .await
    }

    pub async fn complete_reservation(&self, id: EntityId) -> RepoResult<()> {
        self.set_reservation_status(id, ReservationStatus::Completed)
            .await
    }

    pub async fn delete_reservation(&self, id: EntityId) -> RepoResult<()> {
        self.reservations.delete(id).await
    }

    async fn set_reservation_status(&self, id: EntityId, status: ReservationStatus) -> RepoResult<()> {
        self.update_reservation(id, ReservationPatch::status(status))
            .await
    }

    async fn relation_snapshot(&self) -> RepoResult<RelationSnapshot> {
        let users = self.users.get_all().await?;
        let resources = self.resources.get_all().await?;
        Ok(RelationSnapshot::new(users, resources))
    }
}
