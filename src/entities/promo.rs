use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{validation_error, Error};

/// Discount rule owned by the promotions collaborator. The engine only reads
/// it and bumps the usage counters inside the ride-creation transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_ride_amount: Option<Decimal>,
    pub usage_limit: Option<u64>,
    pub per_user_limit: Option<u64>,
    pub used_count: u64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

impl PromoCode {
    pub fn check_usable(
        &self,
        fare: Decimal,
        prior_uses_by_rider: u64,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        if !self.active {
            return Err(validation_error("promo code is not active"));
        }

        if now < self.valid_from || now > self.valid_until {
            return Err(validation_error("promo code is outside its validity window"));
        }

        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return Err(validation_error("promo code usage limit reached"));
            }
        }

        if let Some(limit) = self.per_user_limit {
            if prior_uses_by_rider >= limit {
                return Err(validation_error("promo code already used up by this rider"));
            }
        }

        if let Some(min) = self.min_ride_amount {
            if fare < min {
                return Err(validation_error(format!(
                    "fare is below the promo minimum of {min}"
                )));
            }
        }

        Ok(())
    }

    pub fn consume(&mut self) {
        self.used_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percentage_promo() -> PromoCode {
        let now = Utc::now();

        PromoCode {
            id: Uuid::new_v4(),
            code: "TENOFF".into(),
            kind: DiscountKind::Percentage,
            value: Decimal::from(10),
            max_discount: Some(Decimal::from(80)),
            min_ride_amount: Some(Decimal::from(500)),
            usage_limit: Some(100),
            per_user_limit: Some(2),
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            active: true,
        }
    }

    #[test]
    fn usable_within_all_limits() {
        let promo = percentage_promo();
        assert!(promo
            .check_usable(Decimal::from(1000), 0, Utc::now())
            .is_ok());
    }

    #[test]
    fn rejected_when_inactive() {
        let mut promo = percentage_promo();
        promo.active = false;
        assert!(promo
            .check_usable(Decimal::from(1000), 0, Utc::now())
            .is_err());
    }

    #[test]
    fn rejected_outside_validity_window() {
        let promo = percentage_promo();
        let too_late = promo.valid_until + Duration::seconds(1);
        assert!(promo.check_usable(Decimal::from(1000), 0, too_late).is_err());
    }

    #[test]
    fn rejected_when_usage_limits_hit() {
        let mut promo = percentage_promo();
        promo.used_count = 100;
        assert!(promo
            .check_usable(Decimal::from(1000), 0, Utc::now())
            .is_err());

        promo.used_count = 0;
        assert!(promo
            .check_usable(Decimal::from(1000), 2, Utc::now())
            .is_err());
    }

    #[test]
    fn rejected_below_minimum_fare() {
        let promo = percentage_promo();
        assert!(promo
            .check_usable(Decimal::from(499), 0, Utc::now())
            .is_err());
    }
}
