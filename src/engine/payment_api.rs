use super::helpers::{fetch_payment_for_update, update_payment};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::{Acquire, Executor};
use uuid::Uuid;

use crate::{
    api::{PaymentAPI, UpdatePaymentStatus},
    entities::payment::{Method, Payment, Status},
    error::{insufficient_funds_error, invalid_transition_error, Error},
    external::{notifier, Notification, Topic},
};

#[async_trait]
impl PaymentAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn update_payment_status(
        &self,
        id: Uuid,
        params: UpdatePaymentStatus,
    ) -> Result<Payment, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut payment = fetch_payment_for_update(&mut tx, &id).await?;
        let now = Utc::now();

        match params.status {
            Status::Paid => {
                payment.mark_paid(params.transaction_id.clone(), now)?;

                if payment.method == Method::Wallet {
                    debit_wallet(&mut tx, &payment).await?;
                }
            }
            Status::Failed => payment.mark_failed(now)?,
            Status::Refunded => {
                payment.refund(now)?;

                if payment.method == Method::Wallet {
                    credit_wallet(&mut tx, &payment).await?;
                }
            }
            Status::Pending => {
                return Err(invalid_transition_error(
                    &payment.status.name(),
                    "PENDING",
                ));
            }
        }

        update_payment(&mut tx, &payment).await?;
        tx.commit().await?;

        self.notify(
            payment.rider_id,
            Notification::new(
                notifier::Kind::PaymentUpdated,
                "Payment update",
                format!("Your payment is now {}", payment.status.name()),
                json!({ "payment_id": payment.id, "status": payment.status }),
            ),
        )
        .await;

        self.publish(
            Topic::Rider(payment.rider_id),
            "payment.updated",
            json!({ "payment_id": payment.id, "status": payment.status }),
        )
        .await;

        Ok(payment)
    }
}

/// Check-then-decrement as a single conditional statement: the balance guard
/// and the write are one atomic step, and a short balance aborts the whole
/// payment-status transaction.
async fn debit_wallet(
    tx: &mut sqlx::Transaction<'_, super::Database>,
    payment: &Payment,
) -> Result<(), Error> {
    let result = tx
        .execute(
            sqlx::query("UPDATE wallets SET balance = balance - $2 WHERE user_id = $1 AND balance >= $2")
                .bind(&payment.rider_id)
                .bind(payment.amount),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(insufficient_funds_error());
    }

    record_wallet_entry(tx, payment, "DEBIT").await
}

async fn credit_wallet(
    tx: &mut sqlx::Transaction<'_, super::Database>,
    payment: &Payment,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance",
        )
        .bind(&payment.rider_id)
        .bind(payment.amount),
    )
    .await?;

    record_wallet_entry(tx, payment, "CREDIT").await
}

async fn record_wallet_entry(
    tx: &mut sqlx::Transaction<'_, super::Database>,
    payment: &Payment,
    direction: &str,
) -> Result<(), Error> {
    tx.execute(
        sqlx::query(
            "INSERT INTO wallet_entries (id, user_id, payment_id, amount, direction, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(&payment.rider_id)
        .bind(&payment.id)
        .bind(payment.amount)
        .bind(direction)
        .bind(Utc::now()),
    )
    .await?;

    Ok(())
}
