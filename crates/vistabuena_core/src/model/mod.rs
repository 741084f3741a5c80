//! Domain records for the residential complex.
//!
//! # Responsibility
//! - Define the four persisted record shapes and their create/patch inputs.
//! - Own per-record validation shared by write and read paths.
//!
//! # Invariants
//! - Every record is identified by a repository-generated `EntityId`.
//! - Patches never carry `id`; identity is immutable after creation.
//! - Persisted field names follow the camelCase collection layout.

use chrono::{DateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod inventory;
pub mod reservation;
pub mod resource;
pub mod user;
pub mod wall_clock;

/// Stable identifier shared by every record kind.
pub type EntityId = Uuid;

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier must not be the nil UUID.
    NilId,
    /// Required text field is empty or whitespace-only.
    BlankField(&'static str),
    InvalidEmail(String),
    InvalidImageUri(String),
    /// Reservation times are stored at minute precision.
    SubMinuteTime {
        field: &'static str,
        value: NaiveTime,
    },
    /// `end` must be strictly later than `start`.
    InvalidTimeWindow { start: NaiveTime, end: NaiveTime },
    /// Reservations may only be created as `pending`.
    InitialStatusNotPending(reservation::ReservationStatus),
    InvalidStatusTransition {
        from: reservation::ReservationStatus,
        to: reservation::ReservationStatus,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "id must not be nil"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::InvalidImageUri(value) => write!(f, "image must be a URI, got `{value}`"),
            Self::SubMinuteTime { field, value } => write!(
                f,
                "{field} must be a whole minute (HH:MM), got {}",
                value.format("%H:%M:%S%.f")
            ),
            Self::InvalidTimeWindow { start, end } => write!(
                f,
                "endTime ({}) must be after startTime ({})",
                end.format("%H:%M"),
                start.format("%H:%M")
            ),
            Self::InitialStatusNotPending(status) => {
                write!(f, "reservations must be created as pending, got {status}")
            }
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "reservation status cannot change from {from} to {to}")
            }
        }
    }
}

impl Error for ValidationError {}

/// A record kind the generic repository can persist.
///
/// `Draft` is the record minus `id`; `Patch` holds optional replacements for
/// each mutable field.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    /// Human-readable kind used in errors and log lines.
    const KIND: &'static str;
    /// Default storage namespace for this kind.
    const NAMESPACE: &'static str;

    fn id(&self) -> EntityId;

    /// Builds a full record from caller fields and a generated id.
    fn from_draft(id: EntityId, draft: Self::Draft) -> Self;

    /// Overwrites every field set in `patch`; unset fields are retained.
    fn merge(&mut self, patch: Self::Patch);

    /// Checks field-level rules.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Stamps repository-owned bookkeeping fields on create and update.
    fn touch(&mut self, _at: DateTime<Utc>) {}
}

pub(crate) fn require_id(id: EntityId) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::NilId);
    }
    Ok(())
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

/// Replaces `target` when the patch carries a value.
pub(crate) fn assign<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
