use super::Database;

use sqlx::{types::Json, Executor, Row, Transaction};
use uuid::Uuid;

use crate::{
    entities::{ride, Driver, Negotiation, Payment, PromoCode, Ride, Rider, Vehicle},
    error::{not_found_error, stale_state_error, Error},
};

#[tracing::instrument(skip(tx))]
pub async fn fetch_ride_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Ride, Error> {
    let Json(ride): Json<Ride> = tx
        .fetch_optional(sqlx::query("SELECT data FROM rides WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error("ride"))?
        .try_get("data")?;

    Ok(ride)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_rider_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Rider, Error> {
    let Json(rider): Json<Rider> = tx
        .fetch_optional(sqlx::query("SELECT data FROM riders WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error("rider"))?
        .try_get("data")?;

    Ok(rider)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_driver_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Driver, Error> {
    let Json(driver): Json<Driver> = tx
        .fetch_optional(sqlx::query("SELECT data FROM drivers WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error("driver"))?
        .try_get("data")?;

    Ok(driver)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_negotiation_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Negotiation, Error> {
    let Json(negotiation): Json<Negotiation> = tx
        .fetch_optional(
            sqlx::query("SELECT data FROM negotiations WHERE id = $1 FOR UPDATE").bind(id),
        )
        .await?
        .ok_or_else(|| not_found_error("negotiation"))?
        .try_get("data")?;

    Ok(negotiation)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_payment_for_update(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Payment, Error> {
    let Json(payment): Json<Payment> = tx
        .fetch_optional(sqlx::query("SELECT data FROM payments WHERE id = $1 FOR UPDATE").bind(id))
        .await?
        .ok_or_else(|| not_found_error("payment"))?
        .try_get("data")?;

    Ok(payment)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_promo_by_code_for_update(
    tx: &mut Transaction<'_, Database>,
    code: &str,
) -> Result<PromoCode, Error> {
    let Json(promo): Json<PromoCode> = tx
        .fetch_optional(sqlx::query("SELECT data FROM promos WHERE code = $1 FOR UPDATE").bind(code))
        .await?
        .ok_or_else(|| not_found_error("promo code"))?
        .try_get("data")?;

    Ok(promo)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_promo(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<PromoCode, Error> {
    let Json(promo): Json<PromoCode> = tx
        .fetch_optional(sqlx::query("SELECT data FROM promos WHERE id = $1").bind(id))
        .await?
        .ok_or_else(|| not_found_error("promo code"))?
        .try_get("data")?;

    Ok(promo)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_vehicles_of(
    tx: &mut Transaction<'_, Database>,
    driver_id: &Uuid,
) -> Result<Vec<Vehicle>, Error> {
    let rows = tx
        .fetch_all(sqlx::query("SELECT data FROM vehicles WHERE driver_id = $1").bind(driver_id))
        .await?;

    let mut vehicles = Vec::with_capacity(rows.len());

    for row in rows.iter() {
        let Json(vehicle): Json<Vehicle> = row.try_get("data")?;
        vehicles.push(vehicle);
    }

    Ok(vehicles)
}

#[tracing::instrument(skip(tx))]
pub async fn count_promo_usages(
    tx: &mut Transaction<'_, Database>,
    promo_id: &Uuid,
    rider_id: &Uuid,
) -> Result<u64, Error> {
    let uses: i64 = tx
        .fetch_one(
            sqlx::query(
                "SELECT COUNT(*) AS uses FROM promo_usages WHERE promo_id = $1 AND rider_id = $2",
            )
            .bind(promo_id)
            .bind(rider_id),
        )
        .await?
        .try_get("uses")?;

    Ok(uses as u64)
}

/// Conditional update guarding the ride's state transition: the write only
/// lands if the row is still in the status the transition started from, so
/// concurrent movers lose with a typed error instead of clobbering.
#[tracing::instrument(skip(tx))]
pub async fn update_ride_guarded(
    tx: &mut Transaction<'_, Database>,
    ride: &Ride,
    expected: ride::Status,
) -> Result<(), Error> {
    let result = tx
        .execute(
            sqlx::query("UPDATE rides SET status = $2, data = $3 WHERE id = $1 AND status = $4")
                .bind(&ride.id)
                .bind(ride.status.name())
                .bind(Json(ride))
                .bind(expected.name()),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(stale_state_error(&expected.name()));
    }

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_rider(tx: &mut Transaction<'_, Database>, rider: &Rider) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE riders SET status = $2, data = $3 WHERE id = $1")
            .bind(&rider.id)
            .bind(rider.engagement.name())
            .bind(Json(rider)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_driver(
    tx: &mut Transaction<'_, Database>,
    driver: &Driver,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE drivers SET status = $2, data = $3 WHERE id = $1")
            .bind(&driver.id)
            .bind(driver.availability.name())
            .bind(Json(driver)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_negotiation(
    tx: &mut Transaction<'_, Database>,
    negotiation: &Negotiation,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE negotiations SET status = $2, data = $3 WHERE id = $1")
            .bind(&negotiation.id)
            .bind(negotiation.status.name())
            .bind(Json(negotiation)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_payment(
    tx: &mut Transaction<'_, Database>,
    payment: &Payment,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE payments SET status = $2, data = $3 WHERE id = $1")
            .bind(&payment.id)
            .bind(payment.status.name())
            .bind(Json(payment)),
    )
    .await?;

    Ok(())
}

#[tracing::instrument(skip(tx))]
pub async fn update_promo(
    tx: &mut Transaction<'_, Database>,
    promo: &PromoCode,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query("UPDATE promos SET data = $2 WHERE id = $1")
            .bind(&promo.id)
            .bind(Json(promo)),
    )
    .await?;

    Ok(())
}
