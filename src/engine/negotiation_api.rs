use super::helpers::{fetch_negotiation_for_update, fetch_ride_for_update, update_negotiation, update_ride_guarded};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::{types::Json, Acquire, Executor};
use uuid::Uuid;

use crate::{
    api::{NegotiationAPI, ProposeNegotiation, RespondNegotiation},
    entities::{ride, Negotiation},
    error::{conflict_error, expired_error, forbidden_error, invalid_transition_error, Error},
    external::{notifier, Notification, Topic},
};

#[async_trait]
impl NegotiationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn propose_negotiation(
        &self,
        ride_id: Uuid,
        params: ProposeNegotiation,
    ) -> Result<Negotiation, Error> {
        params.validate()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let ride = fetch_ride_for_update(&mut tx, &ride_id).await?;

        if ride.rider_id != params.rider_id {
            return Err(forbidden_error("only the ride's rider may propose a price"));
        }

        if ride.status != ride::Status::Pending {
            return Err(invalid_transition_error(
                &ride.status.name(),
                "NEGOTIATING",
            ));
        }

        // lazily retire anything whose window has already closed, then check
        // whether a live proposal is still outstanding
        tx.execute(
            sqlx::query(
                "UPDATE negotiations SET status = 'EXPIRED', data = jsonb_set(data, '{status}', '\"EXPIRED\"')
                 WHERE ride_id = $1 AND status = 'PENDING' AND (data->>'expires_at')::timestamptz <= $2",
            )
            .bind(&ride_id)
            .bind(Utc::now()),
        )
        .await?;

        let outstanding = tx
            .fetch_optional(
                sqlx::query(
                    "SELECT id FROM negotiations WHERE ride_id = $1 AND status = 'PENDING' FOR UPDATE",
                )
                .bind(&ride_id),
            )
            .await?;

        if outstanding.is_some() {
            return Err(conflict_error("ride already has a pending negotiation"));
        }

        let negotiation = Negotiation::new(
            ride.id,
            ride.rider_id,
            params.proposed_fare,
            self.config.negotiation_window(),
        );

        tx.execute(
            sqlx::query(
                "INSERT INTO negotiations (id, ride_id, status, data) VALUES ($1, $2, $3, $4)",
            )
            .bind(&negotiation.id)
            .bind(&negotiation.ride_id)
            .bind(negotiation.status.name())
            .bind(Json(&negotiation)),
        )
        .await?;

        tx.commit().await?;

        Ok(negotiation)
    }

    #[tracing::instrument(skip(self))]
    async fn respond_negotiation(
        &self,
        id: Uuid,
        params: RespondNegotiation,
    ) -> Result<Negotiation, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut negotiation = fetch_negotiation_for_update(&mut tx, &id).await?;
        let now = Utc::now();

        // lazy expiry: persist the transition before surfacing the failure
        if negotiation.status == crate::entities::negotiation::Status::Pending
            && negotiation.is_expired(now)
        {
            negotiation.expire()?;
            update_negotiation(&mut tx, &negotiation).await?;
            tx.commit().await?;

            return Err(expired_error("negotiation window has passed"));
        }

        if params.accept {
            negotiation.accept(params.driver_id, now)?;

            let mut ride = fetch_ride_for_update(&mut tx, &negotiation.ride_id).await?;
            let prior = ride.status;
            ride.set_negotiated_fare(negotiation.proposed_fare)?;
            update_ride_guarded(&mut tx, &ride, prior).await?;
        } else {
            negotiation.reject(params.driver_id, now)?;
        }

        update_negotiation(&mut tx, &negotiation).await?;
        tx.commit().await?;

        let (title, message) = if params.accept {
            (
                "Offer accepted",
                format!("A driver accepted your offer of {}", negotiation.proposed_fare),
            )
        } else {
            (
                "Offer declined",
                format!("A driver declined your offer of {}", negotiation.proposed_fare),
            )
        };

        self.notify(
            negotiation.rider_id,
            Notification::new(
                notifier::Kind::NegotiationResolved,
                title,
                message,
                json!({
                    "negotiation_id": negotiation.id,
                    "ride_id": negotiation.ride_id,
                    "accepted": params.accept,
                }),
            ),
        )
        .await;

        self.publish(
            Topic::Rider(negotiation.rider_id),
            "negotiation.resolved",
            json!({ "negotiation_id": negotiation.id, "accepted": params.accept }),
        )
        .await;

        Ok(negotiation)
    }
}
