use super::helpers::{
    count_promo_usages, fetch_driver_for_update, fetch_promo, fetch_promo_by_code_for_update,
    fetch_rider_for_update, fetch_ride_for_update, fetch_vehicles_of, update_driver, update_promo,
    update_ride_guarded, update_rider,
};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::{
        AcceptRide, CancelRide, CompleteRide, CompletedRide, CreateRide, CreatedRide, RideAPI,
        RideFilter, StartRide,
    },
    entities::{ride, Party, Payment, Place, Ride},
    error::{forbidden_error, not_found_error, validation_error, Error},
    external::{notifier, Notification, Topic},
    fare,
};

#[async_trait]
impl RideAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_ride(&self, params: CreateRide) -> Result<CreatedRide, Error> {
        params.validate()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut rider = fetch_rider_for_update(&mut tx, &params.rider_id).await?;

        // the rider row lock serializes concurrent creations by one rider
        let promo = match &params.promo_code {
            Some(code) => {
                let mut promo = fetch_promo_by_code_for_update(&mut tx, code).await?;
                let prior_uses = count_promo_usages(&mut tx, &promo.id, &rider.id).await?;

                promo.check_usable(params.fare, prior_uses, Utc::now())?;
                promo.consume();
                update_promo(&mut tx, &promo).await?;

                Some(promo)
            }
            None => None,
        };

        let breakdown = fare::settle(params.fare, promo.as_ref(), self.config.commission_rate);

        let ride = Ride::new(
            rider.id,
            params.origin.clone(),
            params.destination.clone(),
            params.stops.clone(),
            params.fare,
            params.seats,
            promo.as_ref().map(|p| p.id),
            params.scheduled_at,
        );

        rider.begin_ride(ride.id)?;
        update_rider(&mut tx, &rider).await?;

        tx.execute(
            sqlx::query("INSERT INTO rides (id, status, data) VALUES ($1, $2, $3)")
                .bind(&ride.id)
                .bind(ride.status.name())
                .bind(Json(&ride)),
        )
        .await?;

        if let Some(promo) = &promo {
            tx.execute(
                sqlx::query(
                    "INSERT INTO promo_usages (promo_id, rider_id, ride_id, used_at) VALUES ($1, $2, $3, $4)",
                )
                .bind(&promo.id)
                .bind(&rider.id)
                .bind(&ride.id)
                .bind(Utc::now()),
            )
            .await?;
        }

        record_recent_location(&mut tx, &rider.id, &ride.origin).await?;
        record_recent_location(&mut tx, &rider.id, &ride.destination).await?;

        tx.commit().await?;

        Ok(CreatedRide {
            ride,
            discount: breakdown.discount,
            estimated_total: breakdown.total,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(ride): Json<Ride> = conn
            .fetch_optional(sqlx::query("SELECT data FROM rides WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| not_found_error("ride"))?
            .try_get("data")?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn list_rides(&self, filter: RideFilter) -> Result<Vec<Ride>, Error> {
        let mut conn = self.pool.acquire().await?;

        let query = "
            SELECT data FROM rides
            WHERE
                ($1::uuid IS NULL OR (data->>'rider_id')::uuid = $1)
                AND ($2::uuid IS NULL OR (data->>'driver_id')::uuid = $2)
                AND ($3::varchar IS NULL OR status = $3)
                AND ($4::timestamptz IS NULL OR (data->>'created_at')::timestamptz >= $4)
                AND ($5::timestamptz IS NULL OR (data->>'created_at')::timestamptz <= $5)
            ORDER BY (data->>'created_at')::timestamptz DESC
            LIMIT $6 OFFSET $7
        ";

        let rows = conn
            .fetch_all(
                sqlx::query(query)
                    .bind(filter.rider_id)
                    .bind(filter.driver_id)
                    .bind(filter.status.map(|s| s.name()))
                    .bind(filter.from)
                    .bind(filter.to)
                    .bind(filter.limit.unwrap_or(50))
                    .bind(filter.offset.unwrap_or(0)),
            )
            .await?;

        let mut rides = Vec::with_capacity(rows.len());

        for row in rows.iter() {
            let Json(ride): Json<Ride> = row.try_get("data")?;
            rides.push(ride);
        }

        // touch the requesting actor's last-active marker
        if let Some(rider_id) = filter.rider_id {
            conn.execute(
                sqlx::query("UPDATE riders SET data = jsonb_set(data, '{last_active_at}', to_jsonb(now())) WHERE id = $1")
                    .bind(rider_id),
            )
            .await?;
        }

        if let Some(driver_id) = filter.driver_id {
            conn.execute(
                sqlx::query("UPDATE drivers SET data = jsonb_set(data, '{last_active_at}', to_jsonb(now())) WHERE id = $1")
                    .bind(driver_id),
            )
            .await?;
        }

        Ok(rides)
    }

    #[tracing::instrument(skip(self))]
    async fn accept_ride(&self, id: Uuid, params: AcceptRide) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;
        let mut driver = fetch_driver_for_update(&mut tx, &params.driver_id).await?;

        driver.check_can_accept()?;

        let vehicles = fetch_vehicles_of(&mut tx, &driver.id).await?;
        let vehicle = match params.vehicle_id {
            Some(vehicle_id) => {
                let vehicle = vehicles
                    .into_iter()
                    .find(|v| v.id == vehicle_id)
                    .ok_or_else(|| not_found_error("vehicle"))?;

                if !vehicle.qualifies_for(ride.seats) {
                    return Err(validation_error(format!(
                        "vehicle cannot carry {} seats",
                        ride.seats
                    )));
                }

                vehicle
            }
            None => {
                let mut candidates: Vec<_> = vehicles
                    .into_iter()
                    .filter(|v| v.qualifies_for(ride.seats))
                    .collect();

                candidates.sort_by_key(|v| v.created_at);
                candidates
                    .into_iter()
                    .next()
                    .ok_or_else(|| not_found_error("qualifying vehicle"))?
            }
        };

        driver.assign(ride.id)?;
        ride.accept(driver.id, vehicle.id)?;

        update_driver(&mut tx, &driver).await?;
        update_ride_guarded(&mut tx, &ride, ride::Status::Pending).await?;

        tx.commit().await?;

        self.notify(
            ride.rider_id,
            Notification::new(
                notifier::Kind::RideAccepted,
                "Driver found",
                "A driver has accepted your ride and is on the way",
                json!({ "ride_id": ride.id, "driver_id": driver.id, "vehicle_id": vehicle.id }),
            ),
        )
        .await;

        self.publish(
            Topic::Rider(ride.rider_id),
            "ride.accepted",
            json!({ "ride_id": ride.id, "driver_id": driver.id }),
        )
        .await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn start_ride(&self, id: Uuid, params: StartRide) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        if ride.driver_id != Some(params.driver_id) {
            return Err(forbidden_error("only the assigned driver may start the ride"));
        }

        ride.start()?;
        update_ride_guarded(&mut tx, &ride, ride::Status::Accepted).await?;

        tx.commit().await?;

        self.notify(
            ride.rider_id,
            Notification::new(
                notifier::Kind::RideStarted,
                "Ride started",
                "Your ride is now in progress",
                json!({ "ride_id": ride.id }),
            ),
        )
        .await;

        self.publish(
            Topic::Rider(ride.rider_id),
            "ride.started",
            json!({ "ride_id": ride.id }),
        )
        .await;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn complete_ride(&self, id: Uuid, params: CompleteRide) -> Result<CompletedRide, Error> {
        params.validate()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        if ride.driver_id != Some(params.driver_id) {
            return Err(forbidden_error(
                "only the assigned driver may complete the ride",
            ));
        }

        let promo = match ride.promo_id {
            Some(promo_id) => Some(fetch_promo(&mut tx, &promo_id).await?),
            None => None,
        };

        let base_fare = params.final_fare.unwrap_or_else(|| ride.base_fare());
        let breakdown = fare::settle(base_fare, promo.as_ref(), self.config.commission_rate);

        ride.complete(breakdown.total)?;

        let payment = Payment::new(
            ride.id,
            ride.rider_id,
            params.driver_id,
            &breakdown,
            params.payment_method.unwrap_or(crate::entities::payment::Method::Cash),
        );

        tx.execute(
            sqlx::query("INSERT INTO payments (id, ride_id, status, data) VALUES ($1, $2, $3, $4)")
                .bind(&payment.id)
                .bind(&payment.ride_id)
                .bind(payment.status.name())
                .bind(Json(&payment)),
        )
        .await?;

        let mut driver = fetch_driver_for_update(&mut tx, &params.driver_id).await?;
        driver.release(ride.id);
        driver.record_completion(breakdown.driver_earning);
        update_driver(&mut tx, &driver).await?;

        let mut rider = fetch_rider_for_update(&mut tx, &ride.rider_id).await?;
        rider.finish_ride(ride.id);
        rider.record_completion();
        update_rider(&mut tx, &rider).await?;

        let day = ride
            .completed_at
            .unwrap_or_else(Utc::now)
            .date_naive();

        tx.execute(
            sqlx::query(
                "INSERT INTO driver_daily_earnings (driver_id, day, rides, earnings) VALUES ($1, $2, 1, $3)
                 ON CONFLICT (driver_id, day) DO UPDATE
                 SET rides = driver_daily_earnings.rides + 1,
                     earnings = driver_daily_earnings.earnings + EXCLUDED.earnings",
            )
            .bind(&driver.id)
            .bind(day)
            .bind(breakdown.driver_earning),
        )
        .await?;

        update_ride_guarded(&mut tx, &ride, ride::Status::InProgress).await?;

        tx.commit().await?;

        let rider_note = Notification::new(
            notifier::Kind::RideCompleted,
            "Ride completed",
            format!("Your ride is complete. Total: {}", breakdown.total),
            json!({ "ride_id": ride.id, "amount": breakdown.total }),
        );
        let driver_note = Notification::new(
            notifier::Kind::RideCompleted,
            "Ride completed",
            format!("You earned {} on this ride", breakdown.driver_earning),
            json!({ "ride_id": ride.id, "earning": breakdown.driver_earning }),
        );

        join_all(vec![
            self.notify(ride.rider_id, rider_note),
            self.notify(driver.id, driver_note),
        ])
        .await;

        self.publish(
            Topic::Rider(ride.rider_id),
            "ride.completed",
            json!({ "ride_id": ride.id, "final_fare": breakdown.total }),
        )
        .await;
        self.publish(
            Topic::Driver(driver.id),
            "ride.completed",
            json!({ "ride_id": ride.id, "earning": breakdown.driver_earning }),
        )
        .await;

        Ok(CompletedRide { ride, payment })
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_ride(&self, id: Uuid, params: CancelRide) -> Result<Ride, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut ride = fetch_ride_for_update(&mut tx, &id).await?;

        let party = if params.actor_id == ride.rider_id {
            Party::Rider
        } else if ride.driver_id == Some(params.actor_id) {
            Party::Driver
        } else {
            return Err(forbidden_error("actor is not a party to this ride"));
        };

        let prior = ride.status;
        ride.cancel(party, params.reason.clone())?;

        if let Some(driver_id) = ride.driver_id {
            let mut driver = fetch_driver_for_update(&mut tx, &driver_id).await?;
            driver.release(ride.id);
            update_driver(&mut tx, &driver).await?;
        }

        let mut rider = fetch_rider_for_update(&mut tx, &ride.rider_id).await?;
        rider.finish_ride(ride.id);
        update_rider(&mut tx, &rider).await?;

        update_ride_guarded(&mut tx, &ride, prior).await?;

        tx.commit().await?;

        let (attribution, counterparty) = match party {
            Party::Rider => ("rider", ride.driver_id),
            Party::Driver => ("driver", Some(ride.rider_id)),
        };

        if let Some(user_id) = counterparty {
            self.notify(
                user_id,
                Notification::new(
                    notifier::Kind::RideCancelled,
                    "Ride cancelled",
                    format!("The ride was cancelled by the {attribution}"),
                    json!({ "ride_id": ride.id, "cancelled_by": attribution }),
                ),
            )
            .await;
        }

        self.publish(
            Topic::Rider(ride.rider_id),
            "ride.cancelled",
            json!({ "ride_id": ride.id, "cancelled_by": attribution }),
        )
        .await;

        if let Some(driver_id) = ride.driver_id {
            self.publish(
                Topic::Driver(driver_id),
                "ride.cancelled",
                json!({ "ride_id": ride.id, "cancelled_by": attribution }),
            )
            .await;
        }

        Ok(ride)
    }
}

async fn record_recent_location(
    tx: &mut sqlx::Transaction<'_, super::Database>,
    rider_id: &Uuid,
    place: &Place,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO recent_locations (id, rider_id, latitude, longitude, address, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(rider_id)
        .bind(place.coordinates.latitude)
        .bind(place.coordinates.longitude)
        .bind(&place.address)
        .bind(Utc::now()),
    )
    .await?;

    Ok(())
}
