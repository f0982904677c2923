use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{
    negotiation::Negotiation,
    payment::{self, Payment},
    ride::{self, Ride},
    Coordinates, Driver, Place,
};
use crate::error::{validation_error, Error};

pub const MAX_SEATS: u8 = 8;

/// One explicit request type per mutation so the state machine is matched
/// exhaustively at compile time instead of over loose payloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRide {
    pub rider_id: Uuid,
    pub origin: Place,
    pub destination: Place,
    #[serde(default)]
    pub stops: Vec<Place>,
    pub fare: Decimal,
    pub seats: u8,
    pub promo_code: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateRide {
    pub fn validate(&self) -> Result<(), Error> {
        self.origin.validate()?;
        self.destination.validate()?;

        for stop in &self.stops {
            stop.validate()?;
        }

        if self.fare <= Decimal::ZERO {
            return Err(validation_error("fare must be greater than zero"));
        }

        if self.seats == 0 || self.seats > MAX_SEATS {
            return Err(validation_error(format!(
                "seats must be between 1 and {MAX_SEATS}"
            )));
        }

        Ok(())
    }
}

/// Returned by ride creation: the stored ride plus the provisional pricing
/// shown to the rider. The discount is only committed at completion.
#[derive(Clone, Debug, Serialize)]
pub struct CreatedRide {
    pub ride: Ride,
    pub discount: Decimal,
    pub estimated_total: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptRide {
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartRide {
    pub driver_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteRide {
    pub driver_id: Uuid,
    pub final_fare: Option<Decimal>,
    pub ride_time_secs: Option<i64>,
    pub distance_km: Option<f64>,
    pub payment_method: Option<payment::Method>,
}

impl CompleteRide {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(fare) = self.final_fare {
            if fare <= Decimal::ZERO {
                return Err(validation_error("final fare must be greater than zero"));
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelRide {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletedRide {
    pub ride: Ride,
    pub payment: Payment,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RideFilter {
    pub rider_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<ride::Status>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposeNegotiation {
    pub rider_id: Uuid,
    pub proposed_fare: Decimal,
}

impl ProposeNegotiation {
    pub fn validate(&self) -> Result<(), Error> {
        if self.proposed_fare <= Decimal::ZERO {
            return Err(validation_error("proposed fare must be greater than zero"));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RespondNegotiation {
    pub driver_id: Uuid,
    pub accept: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NearbySearch {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

impl NearbySearch {
    pub fn point(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AvailableSearch {
    pub driver_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

impl AvailableSearch {
    pub fn point(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NearbyDriver {
    pub driver_id: Uuid,
    pub coordinates: Coordinates,
    pub distance_km: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AvailableRide {
    pub ride: Ride,
    pub distance_km: f64,
    pub negotiation: Option<Negotiation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatePaymentStatus {
    pub status: payment::Status,
    pub transaction_id: Option<String>,
}

#[async_trait]
pub trait RideAPI {
    async fn create_ride(&self, params: CreateRide) -> Result<CreatedRide, Error>;
    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error>;
    async fn list_rides(&self, filter: RideFilter) -> Result<Vec<Ride>, Error>;
    async fn accept_ride(&self, id: Uuid, params: AcceptRide) -> Result<Ride, Error>;
    async fn start_ride(&self, id: Uuid, params: StartRide) -> Result<Ride, Error>;
    async fn complete_ride(&self, id: Uuid, params: CompleteRide) -> Result<CompletedRide, Error>;
    async fn cancel_ride(&self, id: Uuid, params: CancelRide) -> Result<Ride, Error>;
}

#[async_trait]
pub trait NegotiationAPI {
    async fn propose_negotiation(
        &self,
        ride_id: Uuid,
        params: ProposeNegotiation,
    ) -> Result<Negotiation, Error>;

    async fn respond_negotiation(
        &self,
        id: Uuid,
        params: RespondNegotiation,
    ) -> Result<Negotiation, Error>;
}

#[async_trait]
pub trait SearchAPI {
    async fn nearby_drivers(&self, params: NearbySearch) -> Result<Vec<NearbyDriver>, Error>;
    async fn available_rides(&self, params: AvailableSearch) -> Result<Vec<AvailableRide>, Error>;
}

#[async_trait]
pub trait DriverAPI {
    async fn find_driver(&self, id: Uuid) -> Result<Driver, Error>;
    async fn go_online(&self, id: Uuid) -> Result<Driver, Error>;
    async fn go_offline(&self, id: Uuid) -> Result<Driver, Error>;
    async fn update_driver_location(&self, id: Uuid, coordinates: Coordinates)
        -> Result<(), Error>;
}

#[async_trait]
pub trait PaymentAPI {
    async fn update_payment_status(
        &self,
        id: Uuid,
        params: UpdatePaymentStatus,
    ) -> Result<Payment, Error>;
}

pub trait API: RideAPI + NegotiationAPI + SearchAPI + DriverAPI + PaymentAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    fn place(latitude: f64, longitude: f64) -> Place {
        Place {
            coordinates: Coordinates::new(latitude, longitude),
            address: "somewhere".into(),
        }
    }

    fn request() -> CreateRide {
        CreateRide {
            rider_id: Uuid::new_v4(),
            origin: place(6.5244, 3.3792),
            destination: place(6.4281, 3.4219),
            stops: vec![],
            fare: Decimal::from(1000),
            seats: 2,
            promo_code: None,
            scheduled_at: None,
        }
    }

    #[test]
    fn create_ride_bounds_are_enforced() {
        assert!(request().validate().is_ok());

        let mut bad_fare = request();
        bad_fare.fare = Decimal::ZERO;
        assert_eq!(bad_fare.validate().unwrap_err().kind, Kind::Validation);

        let mut no_seats = request();
        no_seats.seats = 0;
        assert_eq!(no_seats.validate().unwrap_err().kind, Kind::Validation);

        let mut too_many = request();
        too_many.seats = 9;
        assert_eq!(too_many.validate().unwrap_err().kind, Kind::Validation);

        let mut bad_origin = request();
        bad_origin.origin = place(95.0, 3.0);
        assert_eq!(bad_origin.validate().unwrap_err().kind, Kind::Validation);
    }

    #[test]
    fn complete_ride_rejects_non_positive_override() {
        let params = CompleteRide {
            driver_id: Uuid::new_v4(),
            final_fare: Some(Decimal::ZERO),
            ride_time_secs: None,
            distance_km: None,
            payment_method: None,
        };

        assert_eq!(params.validate().unwrap_err().kind, Kind::Validation);
    }
}
