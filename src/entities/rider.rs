use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver::AccountStatus;
use crate::error::{conflict_error, forbidden_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub account_status: AccountStatus,
    pub engagement: Engagement,
    pub total_rides: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Mirrors the driver-side binding: a rider holds at most one ride across
/// PENDING/ACCEPTED/IN_PROGRESS, enforced under the rider row lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engagement {
    Idle,
    OnRide { ride_id: Uuid },
}

impl Engagement {
    pub fn name(&self) -> String {
        match self {
            Self::Idle => "IDLE".into(),
            Self::OnRide { ride_id: _ } => "ON_RIDE".into(),
        }
    }
}

impl Rider {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            account_status: AccountStatus::Active,
            engagement: Engagement::Idle,
            total_rides: 0,
            created_at: Utc::now(),
            last_active_at: None,
        }
    }

    pub fn is_account_active(&self) -> bool {
        self.account_status == AccountStatus::Active
    }

    #[tracing::instrument]
    pub fn begin_ride(&mut self, ride_id: Uuid) -> Result<(), Error> {
        if !self.is_account_active() {
            return Err(forbidden_error("rider account is not active"));
        }

        match self.engagement {
            Engagement::Idle => {
                self.engagement = Engagement::OnRide { ride_id };
                Ok(())
            }
            Engagement::OnRide { ride_id: _ } => {
                Err(conflict_error("rider already has an active ride"))
            }
        }
    }

    /// See [`crate::entities::Driver::release`] for the leniency rationale.
    #[tracing::instrument]
    pub fn finish_ride(&mut self, ride_id: Uuid) {
        if let Engagement::OnRide { ride_id: current } = self.engagement {
            if current == ride_id {
                self.engagement = Engagement::Idle;
            }
        }
    }

    pub fn record_completion(&mut self) {
        self.total_rides += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn one_active_ride_at_a_time() {
        let mut rider = Rider::new(Uuid::new_v4());
        let ride_id = Uuid::new_v4();

        rider.begin_ride(ride_id).unwrap();
        let err = rider.begin_ride(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind, Kind::Conflict);

        rider.finish_ride(ride_id);
        assert!(rider.begin_ride(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn suspended_rider_cannot_request() {
        let mut rider = Rider::new(Uuid::new_v4());
        rider.account_status = AccountStatus::Suspended;

        let err = rider.begin_ride(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind, Kind::Forbidden);
    }
}
