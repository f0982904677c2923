use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{conflict_error, forbidden_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub account_status: AccountStatus,
    pub verified: bool,
    pub availability: Availability,
    pub total_rides: u64,
    pub total_earnings: Decimal,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
}

/// The ride binding lives in the availability state. Flipping it under a row
/// lock is what keeps a driver from ever holding two active rides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Offline,
    Online,
    OnRide { ride_id: Uuid },
}

impl Availability {
    pub fn name(&self) -> String {
        match self {
            Self::Offline => "OFFLINE".into(),
            Self::Online => "ONLINE".into(),
            Self::OnRide { ride_id: _ } => "ON_RIDE".into(),
        }
    }
}

impl Driver {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            account_status: AccountStatus::Active,
            verified: false,
            availability: Availability::Offline,
            total_rides: 0,
            total_earnings: Decimal::ZERO,
            created_at: Utc::now(),
            last_active_at: None,
        }
    }

    pub fn is_account_active(&self) -> bool {
        self.account_status == AccountStatus::Active
    }

    /// Eligibility gate for accepting a ride: verified, in good standing,
    /// online and not already bound.
    pub fn check_can_accept(&self) -> Result<(), Error> {
        if !self.is_account_active() {
            return Err(forbidden_error("driver account is not active"));
        }

        if !self.verified {
            return Err(forbidden_error("driver is not verified"));
        }

        match self.availability {
            Availability::Offline => Err(forbidden_error("driver is offline")),
            Availability::OnRide { ride_id: _ } => {
                Err(conflict_error("driver already has an active ride"))
            }
            Availability::Online => Ok(()),
        }
    }

    #[tracing::instrument]
    pub fn assign(&mut self, ride_id: Uuid) -> Result<(), Error> {
        self.check_can_accept()?;
        self.availability = Availability::OnRide { ride_id };
        Ok(())
    }

    /// Unbinds the driver when the named ride reaches a terminal state.
    /// Lenient on anything else so that cancellation of an unbound ride
    /// never trips over driver state.
    #[tracing::instrument]
    pub fn release(&mut self, ride_id: Uuid) {
        if let Availability::OnRide { ride_id: current } = self.availability {
            if current == ride_id {
                self.availability = Availability::Online;
            }
        }
    }

    #[tracing::instrument]
    pub fn go_online(&mut self) -> Result<(), Error> {
        if !self.is_account_active() {
            return Err(forbidden_error("driver account is not active"));
        }

        if self.availability == Availability::Offline {
            self.availability = Availability::Online;
        }

        Ok(())
    }

    #[tracing::instrument]
    pub fn go_offline(&mut self) -> Result<(), Error> {
        match self.availability {
            Availability::OnRide { ride_id: _ } => {
                Err(conflict_error("cannot go offline during an active ride"))
            }
            _ => {
                self.availability = Availability::Offline;
                Ok(())
            }
        }
    }

    pub fn record_completion(&mut self, earning: Decimal) {
        self.total_rides += 1;
        self.total_earnings += earning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    fn online_driver() -> Driver {
        let mut driver = Driver::new(Uuid::new_v4());
        driver.verified = true;
        driver.go_online().unwrap();
        driver
    }

    #[test]
    fn assign_binds_a_single_ride() {
        let mut driver = online_driver();
        let first = Uuid::new_v4();

        driver.assign(first).unwrap();
        assert_eq!(driver.availability, Availability::OnRide { ride_id: first });

        let err = driver.assign(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.kind, Kind::Conflict);
    }

    #[test]
    fn release_frees_only_the_bound_ride() {
        let mut driver = online_driver();
        let ride_id = Uuid::new_v4();
        driver.assign(ride_id).unwrap();

        driver.release(Uuid::new_v4());
        assert_eq!(driver.availability, Availability::OnRide { ride_id });

        driver.release(ride_id);
        assert_eq!(driver.availability, Availability::Online);
    }

    #[test]
    fn offline_and_unverified_drivers_cannot_accept() {
        let mut driver = Driver::new(Uuid::new_v4());
        driver.verified = true;
        assert_eq!(driver.check_can_accept().unwrap_err().kind, Kind::Forbidden);

        driver.go_online().unwrap();
        driver.verified = false;
        assert_eq!(driver.check_can_accept().unwrap_err().kind, Kind::Forbidden);
    }

    #[test]
    fn cannot_go_offline_mid_ride() {
        let mut driver = online_driver();
        driver.assign(Uuid::new_v4()).unwrap();

        let err = driver.go_offline().unwrap_err();
        assert_eq!(err.kind, Kind::Conflict);
    }

    #[test]
    fn completion_updates_running_totals() {
        let mut driver = online_driver();
        driver.record_completion(Decimal::from(782));
        driver.record_completion(Decimal::from(218));

        assert_eq!(driver.total_rides, 2);
        assert_eq!(driver.total_earnings, Decimal::from(1000));
    }
}
