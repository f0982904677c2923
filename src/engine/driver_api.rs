use super::helpers::{fetch_driver_for_update, update_driver};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::DriverAPI,
    entities::{Coordinates, Driver},
    error::{not_found_error, Error},
};

#[async_trait]
impl DriverAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_driver(&self, id: Uuid) -> Result<Driver, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(driver): Json<Driver> = conn
            .fetch_optional(sqlx::query("SELECT data FROM drivers WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| not_found_error("driver"))?
            .try_get("data")?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn go_online(&self, id: Uuid) -> Result<Driver, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut driver = fetch_driver_for_update(&mut tx, &id).await?;
        driver.go_online()?;
        update_driver(&mut tx, &driver).await?;

        tx.commit().await?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn go_offline(&self, id: Uuid) -> Result<Driver, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut driver = fetch_driver_for_update(&mut tx, &id).await?;
        driver.go_offline()?;
        update_driver(&mut tx, &driver).await?;

        tx.commit().await?;

        Ok(driver)
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        id: Uuid,
        coordinates: Coordinates,
    ) -> Result<(), Error> {
        coordinates.validate()?;

        let mut conn = self.pool.acquire().await?;

        // pings decay: the matcher ignores anything past its TTL
        let expires_at = Utc::now() + self.config.driver_location_ttl();

        let result = conn
            .execute(
                sqlx::query(
                    "INSERT INTO driver_locations (driver_id, latitude, longitude, expires_at)
                     SELECT $1, $2, $3, $4 WHERE EXISTS (SELECT 1 FROM drivers WHERE id = $1)
                     ON CONFLICT (driver_id) DO UPDATE
                     SET latitude = EXCLUDED.latitude,
                         longitude = EXCLUDED.longitude,
                         expires_at = EXCLUDED.expires_at",
                )
                .bind(&id)
                .bind(coordinates.latitude)
                .bind(coordinates.longitude)
                .bind(expires_at),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("driver"));
        }

        Ok(())
    }
}
