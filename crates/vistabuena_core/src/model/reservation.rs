//! Resource reservation records and the status state machine.
//!
//! # Invariants
//! - New reservations start as `pending`.
//! - Allowed transitions: `pending -> approved | rejected`,
//!   `approved -> completed`. `rejected` and `completed` are terminal.
//! - Times are whole minutes, matching the `HH:MM` stored form.
//! - `start_time < end_time`; the booked slot is the half-open interval
//!   `[start_time, end_time)` on `date`.

use super::{assign, require_id, wall_clock, Entity, EntityId, ValidationError};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Whether a reservation in this status still holds its time slot.
    pub fn holds_slot(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Completed)
        )
    }

    /// Validates moving from `self` to `next`.
    ///
    /// Re-asserting the current status is not a transition and is accepted.
    pub fn transition(self, next: Self) -> Result<Self, ValidationError> {
        if self == next || self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl Display for ReservationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: EntityId,
    pub resource_id: EntityId,
    pub user_id: EntityId,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    pub status: ReservationStatus,
}

impl Reservation {
    /// Whether both reservations claim overlapping time on the same resource.
    ///
    /// Intervals are half-open, so back-to-back slots do not overlap. Status
    /// is not considered here.
    pub fn overlaps(&self, other: &Reservation) -> bool {
        self.resource_id == other.resource_id
            && self.date == other.date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// Fields accepted when creating a reservation.
///
/// `status` defaults to `pending` and must stay `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub resource_id: EntityId,
    pub user_id: EntityId,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ReservationPatch {
    pub resource_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub date: Option<NaiveDate>,
    #[serde(with = "wall_clock::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "wall_clock::option")]
    pub end_time: Option<NaiveTime>,
    pub status: Option<ReservationStatus>,
}

impl ReservationPatch {
    /// Patch that only changes status.
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Entity for Reservation {
    type Draft = NewReservation;
    type Patch = ReservationPatch;

    const KIND: &'static str = "reservation";
    const NAMESPACE: &'static str = "vista_buena_reservations";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewReservation) -> Self {
        Self {
            id,
            resource_id: draft.resource_id,
            user_id: draft.user_id,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: draft.status,
        }
    }

    fn merge(&mut self, patch: ReservationPatch) {
        assign(&mut self.resource_id, patch.resource_id);
        assign(&mut self.user_id, patch.user_id);
        assign(&mut self.date, patch.date);
        assign(&mut self.start_time, patch.start_time);
        assign(&mut self.end_time, patch.end_time);
        assign(&mut self.status, patch.status);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_id(self.id)?;
        for (field, value) in [("startTime", self.start_time), ("endTime", self.end_time)] {
            if !wall_clock::is_whole_minute(value) {
                return Err(ValidationError::SubMinuteTime { field, value });
            }
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::InvalidTimeWindow {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ReservationStatus::{Approved, Completed, Pending, Rejected};
    use super::*;

    #[test]
    fn only_documented_transitions_are_allowed() {
        let all = [Pending, Approved, Rejected, Completed];
        let allowed = [(Pending, Approved), (Pending, Rejected), (Approved, Completed)];

        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "allowed" } else { "rejected" }
                );
            }
        }
    }

    #[test]
    fn terminal_states_reject_every_change() {
        for terminal in [Rejected, Completed] {
            assert!(terminal.is_terminal());
            for to in [Pending, Approved, Rejected, Completed] {
                if to == terminal {
                    continue;
                }
                assert_eq!(
                    terminal.transition(to).unwrap_err(),
                    ValidationError::InvalidStatusTransition { from: terminal, to }
                );
            }
        }
    }

    #[test]
    fn reasserting_current_status_is_not_a_transition() {
        assert_eq!(Completed.transition(Completed).unwrap(), Completed);
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        let resource = EntityId::new_v4();
        let slot = |start: u32, end: u32| Reservation {
            id: EntityId::new_v4(),
            resource_id: resource,
            user_id: EntityId::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            status: Pending,
        };

        assert!(!slot(10, 11).overlaps(&slot(11, 12)));
        assert!(slot(10, 12).overlaps(&slot(11, 13)));
        assert!(slot(9, 14).overlaps(&slot(10, 11)));
    }
}
