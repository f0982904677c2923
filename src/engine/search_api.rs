use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{types::Json, Executor, Row};
use std::cmp::Ordering;

use crate::{
    api::{AvailableRide, AvailableSearch, NearbyDriver, NearbySearch, SearchAPI},
    entities::{Coordinates, Driver, Negotiation, Ride},
    error::Error,
    geo,
};

/// Matching is a linear scan over the status-filtered candidate set; the
/// ordering contract is ascending distance with creation time as the stable
/// tie-break.
#[async_trait]
impl SearchAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn nearby_drivers(&self, params: NearbySearch) -> Result<Vec<NearbyDriver>, Error> {
        let point = params.point();
        point.validate()?;

        let radius_km = params.radius_km.unwrap_or(self.config.search_radius_km);
        let limit = params.limit.unwrap_or(self.config.search_limit);

        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(
                sqlx::query(
                    "SELECT d.data AS driver, l.latitude, l.longitude
                     FROM drivers d
                     JOIN driver_locations l ON d.id = l.driver_id
                     WHERE d.status = 'ONLINE' AND l.expires_at > $1",
                )
                .bind(Utc::now()),
            )
            .await?;

        let mut hits = vec![];

        for row in rows.iter() {
            let Json(driver): Json<Driver> = row.try_get("driver")?;

            if !driver.verified || !driver.is_account_active() {
                continue;
            }

            let coordinates = Coordinates::new(row.try_get("latitude")?, row.try_get("longitude")?);
            let distance_km = geo::haversine_km(&point, &coordinates);

            if distance_km <= radius_km {
                hits.push((driver.created_at, NearbyDriver {
                    driver_id: driver.id,
                    coordinates,
                    distance_km,
                }));
            }
        }

        hits.sort_by(|(a_created, a), (b_created, b)| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
                .then(a_created.cmp(b_created))
        });
        hits.truncate(limit);

        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn available_rides(&self, params: AvailableSearch) -> Result<Vec<AvailableRide>, Error> {
        let point = params.point();
        point.validate()?;

        let radius_km = params.radius_km.unwrap_or(self.config.search_radius_km);
        let limit = params.limit.unwrap_or(self.config.search_limit);
        let now = Utc::now();

        let mut conn = self.pool.acquire().await?;

        // due now, or scheduled close enough to start matching
        let horizon = now + self.config.pickup_window();

        let rows = conn
            .fetch_all(
                sqlx::query(
                    "SELECT data FROM rides
                     WHERE status = 'PENDING'
                       AND ((data->>'scheduled_at') IS NULL OR (data->>'scheduled_at')::timestamptz <= $1)",
                )
                .bind(horizon),
            )
            .await?;

        let mut hits = vec![];

        for row in rows.iter() {
            let Json(ride): Json<Ride> = row.try_get("data")?;
            let distance_km = geo::haversine_km(&ride.origin.coordinates, &point);

            if distance_km <= radius_km {
                hits.push((ride, distance_km));
            }
        }

        hits.sort_by(|(a_ride, a_distance), (b_ride, b_distance)| {
            a_distance
                .partial_cmp(b_distance)
                .unwrap_or(Ordering::Equal)
                .then(a_ride.created_at.cmp(&b_ride.created_at))
        });
        hits.truncate(limit);

        // stale proposals are retired on read so each hit carries only a live
        // counter-offer
        conn.execute(
            sqlx::query(
                "UPDATE negotiations SET status = 'EXPIRED', data = jsonb_set(data, '{status}', '\"EXPIRED\"')
                 WHERE status = 'PENDING' AND (data->>'expires_at')::timestamptz <= $1",
            )
            .bind(now),
        )
        .await?;

        let mut results = Vec::with_capacity(hits.len());

        for (ride, distance_km) in hits {
            let negotiation = match conn
                .fetch_optional(
                    sqlx::query(
                        "SELECT data FROM negotiations WHERE ride_id = $1 AND status = 'PENDING'",
                    )
                    .bind(&ride.id),
                )
                .await?
            {
                Some(row) => {
                    let Json(negotiation): Json<Negotiation> = row.try_get("data")?;
                    Some(negotiation)
                }
                None => None,
            };

            results.push(AvailableRide {
                ride,
                distance_km,
                negotiation,
            });
        }

        Ok(results)
    }
}
