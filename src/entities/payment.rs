use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_transition_error, Error};
use crate::fare::FareBreakdown;

/// Settlement record, created exactly once when a ride completes. The
/// amount/fee/earning split is copied verbatim from the fare breakdown, so
/// `platform_fee + driver_earning == amount` holds by construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Uuid,
    pub amount: Decimal,
    pub method: Method,
    pub status: Status,
    pub promo_discount: Decimal,
    pub platform_fee: Decimal,
    pub driver_earning: Decimal,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    Cash,
    Card,
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "PENDING".into(),
            Self::Paid => "PAID".into(),
            Self::Failed => "FAILED".into(),
            Self::Refunded => "REFUNDED".into(),
        }
    }
}

impl Payment {
    pub fn new(
        ride_id: Uuid,
        rider_id: Uuid,
        driver_id: Uuid,
        breakdown: &FareBreakdown,
        method: Method,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            rider_id,
            driver_id,
            amount: breakdown.total,
            method,
            status: Status::Pending,
            promo_discount: breakdown.discount,
            platform_fee: breakdown.platform_fee,
            driver_earning: breakdown.driver_earning,
            transaction_id: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    #[tracing::instrument]
    pub fn mark_paid(
        &mut self,
        transaction_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Paid;
                self.transaction_id = transaction_id;
                self.processed_at = Some(now);
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "PAID")),
        }
    }

    #[tracing::instrument]
    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Failed;
                self.processed_at = Some(now);
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "FAILED")),
        }
    }

    #[tracing::instrument]
    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Paid => {
                self.status = Status::Refunded;
                self.processed_at = Some(now);
                Ok(())
            }
            _ => Err(invalid_transition_error(&self.status.name(), "REFUNDED")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    fn pending_payment() -> Payment {
        let breakdown = FareBreakdown {
            base_fare: Decimal::from(1000),
            discount: Decimal::from(80),
            total: Decimal::from(920),
            platform_fee: Decimal::from(138),
            driver_earning: Decimal::from(782),
        };

        Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            &breakdown,
            Method::Wallet,
        )
    }

    #[test]
    fn split_copied_from_breakdown() {
        let payment = pending_payment();
        assert_eq!(payment.amount, Decimal::from(920));
        assert_eq!(
            payment.platform_fee + payment.driver_earning,
            payment.amount
        );
    }

    #[test]
    fn paid_then_refunded() {
        let mut payment = pending_payment();
        payment
            .mark_paid(Some("txn-123".into()), Utc::now())
            .unwrap();
        assert_eq!(payment.status, Status::Paid);

        payment.refund(Utc::now()).unwrap();
        assert_eq!(payment.status, Status::Refunded);
    }

    #[test]
    fn refund_requires_paid() {
        let mut payment = pending_payment();
        let err = payment.refund(Utc::now()).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }

    #[test]
    fn failed_is_terminal() {
        let mut payment = pending_payment();
        payment.mark_failed(Utc::now()).unwrap();
        let err = payment.mark_paid(None, Utc::now()).unwrap_err();
        assert_eq!(err.kind, Kind::InvalidTransition);
    }
}
