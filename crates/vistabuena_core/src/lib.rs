//! Persistence core for the Vista Buena residential complex.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod db;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig, LoggingConfig};
pub use integrity::RelationSnapshot;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::inventory::{InventoryItem, InventoryPatch, NewInventoryItem};
pub use model::reservation::{NewReservation, Reservation, ReservationPatch, ReservationStatus};
pub use model::resource::{NewResource, Resource, ResourcePatch, ResourceType};
pub use model::user::{NewUser, User, UserPatch, UserRole};
pub use model::{Entity, EntityId, ValidationError};
pub use repo::{
    EntityRepository, InventoryRepository, ReferenceViolation, RepoError, RepoResult,
    ReservationRepository, ResourceRepository, UserRepository,
};
pub use service::complex_service::ComplexService;
pub use store::{KvStore, SqliteStore, StoreError, StoreResult, StoredValue, Version};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
