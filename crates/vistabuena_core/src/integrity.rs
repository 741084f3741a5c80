//! Cross-collection rules for reservations.
//!
//! # Responsibility
//! - Check that reservations point at existing users and resources.
//! - Check temporal exclusivity of active reservations per resource.
//! - Check that users and resources are unreferenced before deletion.
//!
//! # Invariants
//! - Every check is pure: it inspects loaded collections and returns a tagged
//!   result, never mutating state.
//! - Only `pending` and `approved` reservations hold a slot.
//! - Deletion is blocked by references in any status.

use crate::model::reservation::Reservation;
use crate::model::resource::Resource;
use crate::model::user::User;
use crate::model::EntityId;
use crate::repo::entity_repo::error_code;
use crate::repo::{ReferenceViolation, RepoError, RepoResult};
use log::warn;

/// Users and resources loaded for one reservation mutation.
#[derive(Debug, Clone, Default)]
pub struct RelationSnapshot {
    pub users: Vec<User>,
    pub resources: Vec<Resource>,
}

impl RelationSnapshot {
    pub fn new(users: Vec<User>, resources: Vec<Resource>) -> Self {
        Self { users, resources }
    }

    /// Runs reference and overlap checks for `candidate`.
    ///
    /// `others` must not contain `candidate` itself.
    pub fn check(&self, others: &[Reservation], candidate: &Reservation) -> RepoResult<()> {
        check_references(candidate, &self.users, &self.resources)?;
        check_overlap(candidate, others)
    }
}

/// Fails when the reservation's user or resource does not exist.
pub fn check_references(
    reservation: &Reservation,
    users: &[User],
    resources: &[Resource],
) -> RepoResult<()> {
    if !resources
        .iter()
        .any(|resource| resource.id == reservation.resource_id)
    {
        return Err(violation(ReferenceViolation::MissingResource(
            reservation.resource_id,
        )));
    }
    if !users.iter().any(|user| user.id == reservation.user_id) {
        return Err(violation(ReferenceViolation::MissingUser(
            reservation.user_id,
        )));
    }
    Ok(())
}

/// Fails when an active `candidate` overlaps another active reservation.
pub fn check_overlap(candidate: &Reservation, others: &[Reservation]) -> RepoResult<()> {
    if !candidate.status.holds_slot() {
        return Ok(());
    }

    let clash = others.iter().find(|other| {
        other.id != candidate.id && other.status.holds_slot() && other.overlaps(candidate)
    });

    match clash {
        Some(other) => Err(violation(RepoError::Overlap {
            resource_id: candidate.resource_id,
            date: candidate.date,
            conflicting_id: other.id,
        })),
        None => Ok(()),
    }
}

/// Fails when any reservation still references `user_id`.
pub fn check_unreferenced_user(user_id: EntityId, reservations: &[Reservation]) -> RepoResult<()> {
    let referencing = referencing(reservations, |reservation| reservation.user_id == user_id);
    if referencing.is_empty() {
        return Ok(());
    }
    Err(violation(ReferenceViolation::UserInUse {
        user_id,
        reservations: referencing,
    }))
}

/// Fails when any reservation still references `resource_id`.
pub fn check_unreferenced_resource(
    resource_id: EntityId,
    reservations: &[Reservation],
) -> RepoResult<()> {
    let referencing = referencing(reservations, |reservation| {
        reservation.resource_id == resource_id
    });
    if referencing.is_empty() {
        return Ok(());
    }
    Err(violation(ReferenceViolation::ResourceInUse {
        resource_id,
        reservations: referencing,
    }))
}

fn referencing(
    reservations: &[Reservation],
    predicate: impl Fn(&Reservation) -> bool,
) -> Vec<EntityId> {
    reservations
        .iter()
        .filter(|reservation| predicate(reservation))
        .map(|reservation| reservation.id)
        .collect()
}

fn violation(err: impl Into<RepoError>) -> RepoError {
    let err = err.into();
    warn!(
        "event=integrity_violation module=integrity status=error error_code={}",
        error_code(&err)
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::reservation::ReservationStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn reservation(resource_id: EntityId, start: u32, end: u32, status: ReservationStatus) -> Reservation {
        Reservation {
            id: EntityId::new_v4(),
            resource_id,
            user_id: EntityId::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn finished_reservations_do_not_hold_slots() {
        let resource = EntityId::new_v4();
        let existing = [
            reservation(resource, 10, 12, ReservationStatus::Rejected),
            reservation(resource, 10, 12, ReservationStatus::Completed),
        ];
        let candidate = reservation(resource, 11, 13, ReservationStatus::Pending);

        assert!(check_overlap(&candidate, &existing).is_ok());
    }

    #[test]
    fn approved_reservation_blocks_overlapping_candidate() {
        let resource = EntityId::new_v4();
        let existing = [reservation(resource, 10, 12, ReservationStatus::Approved)];
        let candidate = reservation(resource, 11, 13, ReservationStatus::Pending);

        let err = check_overlap(&candidate, &existing).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Overlap { conflicting_id, .. } if conflicting_id == existing[0].id
        ));
    }

    #[test]
    fn other_resources_never_overlap() {
        let existing = [reservation(EntityId::new_v4(), 10, 12, ReservationStatus::Approved)];
        let candidate = reservation(EntityId::new_v4(), 10, 12, ReservationStatus::Pending);

        assert!(check_overlap(&candidate, &existing).is_ok());
    }

    #[test]
    fn unreferenced_checks_list_every_referencing_reservation() {
        let resource = EntityId::new_v4();
        let reservations = [
            reservation(resource, 8, 9, ReservationStatus::Completed),
            reservation(resource, 9, 10, ReservationStatus::Pending),
            reservation(EntityId::new_v4(), 9, 10, ReservationStatus::Pending),
        ];

        let err = check_unreferenced_resource(resource, &reservations).unwrap_err();
        match err {
            RepoError::ReferentialIntegrity(ReferenceViolation::ResourceInUse {
                resource_id,
                reservations: ids,
            }) => {
                assert_eq!(resource_id, resource);
                assert_eq!(ids, vec![reservations[0].id, reservations[1].id]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
