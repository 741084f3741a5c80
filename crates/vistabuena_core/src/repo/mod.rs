//! Repository layer over the namespace store.
//!
//! # Responsibility
//! - Provide one generic CRUD engine reused by every record kind.
//! - Translate store, decode and rule failures into semantic errors.
//!
//! # Invariants
//! - Writes validate the full record before persisting.
//! - Reads reject invalid persisted state instead of masking it.
//! - A failed operation never persists a partial change.

use crate::model::{EntityId, ValidationError};
use crate::store::{StoreError, Version};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity_repo;
pub mod reservation_repo;

pub use entity_repo::{
    EntityRepository, InventoryRepository, ResourceRepository, UserRepository,
};
pub use reservation_repo::ReservationRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Which foreign-key rule a mutation broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceViolation {
    MissingUser(EntityId),
    MissingResource(EntityId),
    /// The user still owns the listed reservations.
    UserInUse {
        user_id: EntityId,
        reservations: Vec<EntityId>,
    },
    /// The resource is still booked by the listed reservations.
    ResourceInUse {
        resource_id: EntityId,
        reservations: Vec<EntityId>,
    },
}

impl Display for ReferenceViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUser(id) => write!(f, "reservation references unknown user {id}"),
            Self::MissingResource(id) => {
                write!(f, "reservation references unknown resource {id}")
            }
            Self::UserInUse {
                user_id,
                reservations,
            } => write!(
                f,
                "user {user_id} is referenced by {} reservation(s)",
                reservations.len()
            ),
            Self::ResourceInUse {
                resource_id,
                reservations,
            } => write!(
                f,
                "resource {resource_id} is referenced by {} reservation(s)",
                reservations.len()
            ),
        }
    }
}

/// Repository error for every entity kind.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    /// Stored bytes could not be decoded or hold invalid records.
    StorageCorruption {
        namespace: String,
        message: String,
    },
    NotFound {
        kind: &'static str,
        id: EntityId,
    },
    ReferentialIntegrity(ReferenceViolation),
    /// Another active reservation already holds part of the slot.
    Overlap {
        resource_id: EntityId,
        date: NaiveDate,
        conflicting_id: EntityId,
    },
    /// The namespace changed between load and persist.
    Conflict {
        namespace: String,
        expected: Version,
        actual: Version,
    },
    Validation(ValidationError),
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::StorageCorruption { namespace, message } => {
                write!(f, "stored data in `{namespace}` is corrupt: {message}")
            }
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::ReferentialIntegrity(violation) => write!(f, "{violation}"),
            Self::Overlap {
                resource_id,
                date,
                conflicting_id,
            } => write!(
                f,
                "resource {resource_id} is already reserved on {date} by {conflicting_id}"
            ),
            Self::Conflict {
                namespace,
                expected,
                actual,
            } => write!(
                f,
                "concurrent write to `{namespace}`: loaded version {expected}, found {actual}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode collection: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::StorageCorruption { .. }
            | Self::NotFound { .. }
            | Self::ReferentialIntegrity(_)
            | Self::Overlap { .. }
            | Self::Conflict { .. } => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionMismatch {
                namespace,
                expected,
                actual,
            } => Self::Conflict {
                namespace,
                expected,
                actual,
            },
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReferenceViolation> for RepoError {
    fn from(value: ReferenceViolation) -> Self {
        Self::ReferentialIntegrity(value)
    }
}
