use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{expired_error, invalid_transition_error, Error};

/// A rider-proposed price counter-offer tied to a pending ride. At most one
/// unexpired pending negotiation exists per ride; expiry is resolved lazily
/// by whichever call observes it first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Negotiation {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub proposed_fare: Decimal,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "PENDING".into(),
            Self::Accepted => "ACCEPTED".into(),
            Self::Rejected => "REJECTED".into(),
            Self::Expired => "EXPIRED".into(),
        }
    }
}

impl Negotiation {
    pub fn new(ride_id: Uuid, rider_id: Uuid, proposed_fare: Decimal, window: Duration) -> Self {
        let created_at = Utc::now();

        Self {
            id: Uuid::new_v4(),
            ride_id,
            rider_id,
            driver_id: None,
            proposed_fare,
            status: Status::Pending,
            created_at,
            expires_at: created_at + window,
            responded_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn expire(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Expired;
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "EXPIRED")),
        }
    }

    #[tracing::instrument]
    pub fn accept(&mut self, driver_id: Uuid, now: DateTime<Utc>) -> Result<(), Error> {
        self.respond(driver_id, Status::Accepted, now)
    }

    #[tracing::instrument]
    pub fn reject(&mut self, driver_id: Uuid, now: DateTime<Utc>) -> Result<(), Error> {
        self.respond(driver_id, Status::Rejected, now)
    }

    fn respond(&mut self, driver_id: Uuid, outcome: Status, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending if self.is_expired(now) => {
                Err(expired_error("negotiation window has passed"))
            }
            Status::Pending => {
                self.status = outcome;
                self.driver_id = Some(driver_id);
                self.responded_at = Some(now);
                Ok(())
            }
            Status::Expired => Err(expired_error("negotiation window has passed")),
            _ => Err(invalid_transition_error(&self.status.name(), &outcome.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    fn proposal() -> Negotiation {
        Negotiation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::from(800),
            Duration::minutes(5),
        )
    }

    #[test]
    fn respondable_until_the_window_closes() {
        let mut negotiation = proposal();
        let just_in_time = negotiation.expires_at;

        negotiation.accept(Uuid::new_v4(), just_in_time).unwrap();
        assert_eq!(negotiation.status, Status::Accepted);
        assert_eq!(negotiation.responded_at, Some(just_in_time));
    }

    #[test]
    fn expired_after_the_window() {
        let mut negotiation = proposal();
        let too_late = negotiation.expires_at + Duration::seconds(1);

        let err = negotiation.accept(Uuid::new_v4(), too_late).unwrap_err();
        assert_eq!(err.kind, Kind::Expired);
        // the entity is untouched; persistence of the lazy expiry is the
        // caller's job
        assert_eq!(negotiation.status, Status::Pending);
    }

    #[test]
    fn rejection_records_the_responder() {
        let mut negotiation = proposal();
        let driver_id = Uuid::new_v4();

        negotiation.reject(driver_id, Utc::now()).unwrap();
        assert_eq!(negotiation.status, Status::Rejected);
        assert_eq!(negotiation.driver_id, Some(driver_id));
    }

    #[test]
    fn responding_twice_fails() {
        let mut negotiation = proposal();
        negotiation.accept(Uuid::new_v4(), Utc::now()).unwrap();

        let err = negotiation.reject(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn expire_only_from_pending() {
        let mut negotiation = proposal();
        negotiation.expire().unwrap();
        assert_eq!(negotiation.status, Status::Expired);
        assert!(negotiation.expire().is_err());
    }
}
