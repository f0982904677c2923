use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Place;
use crate::error::{conflict_error, invalid_transition_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub status: Status,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub origin: Place,
    pub destination: Place,
    pub stops: Vec<Place>,
    pub original_fare: Decimal,
    pub negotiated_fare: Option<Decimal>,
    pub final_fare: Option<Decimal>,
    pub seats: u8,
    pub promo_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Party>,
    pub cancel_reason: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "PENDING".into(),
            Self::Accepted => "ACCEPTED".into(),
            Self::InProgress => "IN_PROGRESS".into(),
            Self::Completed => "COMPLETED".into(),
            Self::Cancelled => "CANCELLED".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Rider,
    Driver,
}

impl Ride {
    pub fn new(
        rider_id: Uuid,
        origin: Place,
        destination: Place,
        stops: Vec<Place>,
        original_fare: Decimal,
        seats: u8,
        promo_id: Option<Uuid>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: Status::Pending,
            rider_id,
            driver_id: None,
            vehicle_id: None,
            origin,
            destination,
            stops,
            original_fare,
            negotiated_fare: None,
            final_fare: None,
            seats,
            promo_id,
            scheduled_at,
            created_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            Status::Pending | Status::Accepted | Status::InProgress
        )
    }

    /// Fare the settlement starts from when no explicit override is given:
    /// the accepted counter-offer if one exists, else the rider's original.
    pub fn base_fare(&self) -> Decimal {
        self.negotiated_fare.unwrap_or(self.original_fare)
    }

    #[tracing::instrument]
    pub fn accept(&mut self, driver_id: Uuid, vehicle_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Accepted;
                self.driver_id = Some(driver_id);
                self.vehicle_id = Some(vehicle_id);
                self.accepted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "ACCEPTED")),
        }
    }

    #[tracing::instrument]
    pub fn start(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Accepted => {
                self.status = Status::InProgress;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "IN_PROGRESS")),
        }
    }

    #[tracing::instrument]
    pub fn complete(&mut self, final_fare: Decimal) -> Result<(), Error> {
        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                self.final_fare = Some(final_fare);
                self.completed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "COMPLETED")),
        }
    }

    #[tracing::instrument]
    pub fn cancel(&mut self, by: Party, reason: Option<String>) -> Result<(), Error> {
        match self.status {
            Status::Pending | Status::Accepted => {
                self.status = Status::Cancelled;
                self.cancelled_at = Some(Utc::now());
                self.cancelled_by = Some(by);
                self.cancel_reason = reason;
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "CANCELLED")),
        }
    }

    /// An accepted counter-offer only reprices a ride that is still waiting
    /// for a match; it never changes ride status.
    pub fn set_negotiated_fare(&mut self, fare: Decimal) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.negotiated_fare = Some(fare);
                Ok(())
            }
            _ => Err(conflict_error("ride is already matched")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Coordinates, Place};
    use crate::error::Kind;

    fn place(latitude: f64, longitude: f64) -> Place {
        Place {
            coordinates: Coordinates::new(latitude, longitude),
            address: "somewhere".into(),
        }
    }

    fn pending_ride() -> Ride {
        Ride::new(
            Uuid::new_v4(),
            place(6.5244, 3.3792),
            place(6.4281, 3.4219),
            vec![],
            Decimal::from(1000),
            2,
            None,
            None,
        )
    }

    #[test]
    fn full_lifecycle_sets_bindings_and_timestamps() {
        let mut ride = pending_ride();
        let driver_id = Uuid::new_v4();
        let vehicle_id = Uuid::new_v4();

        ride.accept(driver_id, vehicle_id).unwrap();
        assert_eq!(ride.status, Status::Accepted);
        assert_eq!(ride.driver_id, Some(driver_id));
        assert_eq!(ride.vehicle_id, Some(vehicle_id));
        assert!(ride.accepted_at.is_some());

        ride.start().unwrap();
        assert_eq!(ride.status, Status::InProgress);
        assert!(ride.started_at.unwrap() >= ride.accepted_at.unwrap());

        ride.complete(Decimal::from(920)).unwrap();
        assert_eq!(ride.status, Status::Completed);
        assert_eq!(ride.final_fare, Some(Decimal::from(920)));
        assert!(!ride.is_active());
    }

    #[test]
    fn start_requires_accepted() {
        let mut ride = pending_ride();
        let err = ride.start().unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn complete_requires_in_progress() {
        let mut ride = pending_ride();
        ride.accept(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let err = ride.complete(Decimal::from(500)).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn cancel_allowed_from_pending_and_accepted_only() {
        let mut ride = pending_ride();
        ride.cancel(Party::Rider, Some("changed plans".into()))
            .unwrap();
        assert_eq!(ride.status, Status::Cancelled);
        assert_eq!(ride.cancelled_by, Some(Party::Rider));

        // a second cancel must be rejected
        let err = ride.cancel(Party::Driver, None).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn cancel_after_completion_fails() {
        let mut ride = pending_ride();
        ride.accept(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        ride.start().unwrap();
        ride.complete(Decimal::from(1000)).unwrap();

        let err = ride.cancel(Party::Rider, None).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn accept_twice_fails() {
        let mut ride = pending_ride();
        ride.accept(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let err = ride.accept(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn negotiated_fare_feeds_base_fare() {
        let mut ride = pending_ride();
        assert_eq!(ride.base_fare(), Decimal::from(1000));

        ride.set_negotiated_fare(Decimal::from(850)).unwrap();
        assert_eq!(ride.base_fare(), Decimal::from(850));

        ride.accept(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let err = ride.set_negotiated_fare(Decimal::from(700)).unwrap_err();
        assert_eq!(err.kind, Kind::Conflict);
    }
}
