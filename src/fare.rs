//! Fare and settlement arithmetic. Pure functions over `Decimal` so that
//! settlement figures never pick up binary floating-point drift and the
//! whole computation is testable without storage.

use rust_decimal::Decimal;

use crate::entities::{DiscountKind, PromoCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FareBreakdown {
    pub base_fare: Decimal,
    pub discount: Decimal,
    /// What the rider pays: base fare less discount, floored at zero.
    pub total: Decimal,
    pub platform_fee: Decimal,
    pub driver_earning: Decimal,
}

/// Discount a promo yields on a given base fare: percentage or fixed value,
/// clamped to the promo's cap and never more than the fare itself.
pub fn discount_for(promo: &PromoCode, base_fare: Decimal) -> Decimal {
    let raw = match promo.kind {
        DiscountKind::Percentage => (base_fare * promo.value / Decimal::ONE_HUNDRED).round_dp(2),
        DiscountKind::Fixed => promo.value,
    };

    let capped = match promo.max_discount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    };

    capped.min(base_fare)
}

/// Settles a ride: discount, rider total, platform fee at the configured
/// commission rate, and the driver's remainder. The fee is rounded to cents
/// and the earning is the exact complement, so fee + earning == total.
pub fn settle(
    base_fare: Decimal,
    promo: Option<&PromoCode>,
    commission_rate: Decimal,
) -> FareBreakdown {
    let discount = promo
        .map(|p| discount_for(p, base_fare))
        .unwrap_or(Decimal::ZERO);

    let total = base_fare - discount;
    let platform_fee = (total * commission_rate).round_dp(2);
    let driver_earning = total - platform_fee;

    FareBreakdown {
        base_fare,
        discount,
        total,
        platform_fee,
        driver_earning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn promo(kind: DiscountKind, value: i64, max_discount: Option<i64>) -> PromoCode {
        let now = Utc::now();

        PromoCode {
            id: Uuid::new_v4(),
            code: "PROMO".into(),
            kind,
            value: Decimal::from(value),
            max_discount: max_discount.map(Decimal::from),
            min_ride_amount: None,
            usage_limit: None,
            per_user_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            active: true,
        }
    }

    #[test]
    fn percentage_promo_capped_at_max_discount() {
        let promo = promo(DiscountKind::Percentage, 10, Some(80));
        let breakdown = settle(
            Decimal::from(1000),
            Some(&promo),
            Decimal::new(15, 2), // 0.15
        );

        assert_eq!(breakdown.discount, Decimal::from(80));
        assert_eq!(breakdown.total, Decimal::from(920));
        assert_eq!(breakdown.platform_fee, Decimal::new(13800, 2));
        assert_eq!(breakdown.driver_earning, Decimal::new(78200, 2));
    }

    #[test]
    fn fixed_promo_subtracts_its_value() {
        let promo = promo(DiscountKind::Fixed, 150, None);
        let breakdown = settle(Decimal::from(1000), Some(&promo), Decimal::new(15, 2));

        assert_eq!(breakdown.discount, Decimal::from(150));
        assert_eq!(breakdown.total, Decimal::from(850));
    }

    #[test]
    fn discount_never_exceeds_the_fare() {
        let promo = promo(DiscountKind::Fixed, 500, None);
        let breakdown = settle(Decimal::from(300), Some(&promo), Decimal::new(15, 2));

        assert_eq!(breakdown.discount, Decimal::from(300));
        assert_eq!(breakdown.total, Decimal::ZERO);
        assert_eq!(breakdown.platform_fee, Decimal::ZERO);
        assert_eq!(breakdown.driver_earning, Decimal::ZERO);
    }

    #[test]
    fn no_promo_means_no_discount() {
        let breakdown = settle(Decimal::from(640), None, Decimal::new(15, 2));

        assert_eq!(breakdown.discount, Decimal::ZERO);
        assert_eq!(breakdown.total, Decimal::from(640));
        assert_eq!(breakdown.platform_fee, Decimal::from(96));
        assert_eq!(breakdown.driver_earning, Decimal::from(544));
    }

    #[test]
    fn fee_plus_earning_is_exactly_the_total() {
        // awkward amounts whose fee needs rounding
        for cents in [99_999i64, 12_345, 101, 1] {
            let base = Decimal::new(cents, 2);
            let breakdown = settle(base, None, Decimal::new(15, 2));

            assert_eq!(
                breakdown.platform_fee + breakdown.driver_earning,
                breakdown.total,
                "drift at base fare {base}"
            );
        }
    }

    #[test]
    fn commission_rate_is_not_baked_in() {
        let breakdown = settle(Decimal::from(1000), None, Decimal::new(20, 2));
        assert_eq!(breakdown.platform_fee, Decimal::from(200));
    }
}
