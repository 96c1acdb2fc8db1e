use chrono::NaiveDate;
use giftbay_shared::{Coupon, CouponDiscount};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// A coupon applied to a cart total
#[derive(Debug, Clone, Serialize)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub discount: i64,
    pub final_total: i64,
}

/// Pick the single best usable coupon for a cart: soonest-expiring first,
/// then highest effective discount rate.
pub fn pick_best<'a>(
    coupons: &'a [Coupon],
    cart_total: i64,
    today: NaiveDate,
) -> Option<&'a Coupon> {
    coupons
        .iter()
        .filter(|coupon| coupon.is_usable(cart_total, today))
        .min_by(|a, b| {
            a.expiry_date.cmp(&b.expiry_date).then_with(|| {
                effective_rate(b)
                    .partial_cmp(&effective_rate(a))
                    .unwrap_or(Ordering::Equal)
            })
        })
}

// Estimated discount per unit of spend, on a common ratio scale for both
// kinds: a percent coupon is its fraction, a fixed coupon is estimated
// against its minimum purchase.
fn effective_rate(coupon: &Coupon) -> f64 {
    match coupon.discount {
        CouponDiscount::Percent(pct) => pct as f64 / 100.0,
        CouponDiscount::Fixed(amount) => {
            amount as f64 / coupon.min_purchase.unwrap_or(1).max(1) as f64
        }
    }
}

/// Apply a coupon: percent discounts floor, fixed discounts cap at the cart
/// total, and the final total never goes negative.
pub fn apply(coupon: &Coupon, cart_total: i64) -> AppliedCoupon {
    let discount = match coupon.discount {
        CouponDiscount::Percent(pct) => cart_total * pct as i64 / 100,
        CouponDiscount::Fixed(amount) => amount.min(cart_total),
    };
    AppliedCoupon {
        coupon_id: coupon.id,
        discount,
        final_total: (cart_total - discount).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn coupon(
        discount: CouponDiscount,
        min_purchase: Option<i64>,
        expiry: NaiveDate,
    ) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            name: None,
            discount,
            min_purchase,
            expiry_date: expiry,
        }
    }

    const TODAY: (i32, u32, u32) = (2026, 8, 1);

    #[test]
    fn test_expired_and_under_minimum_coupons_are_filtered_out() {
        let today = date(TODAY.0, TODAY.1, TODAY.2);
        let coupons = vec![
            coupon(CouponDiscount::Percent(50), None, date(2026, 7, 31)),
            coupon(CouponDiscount::Percent(40), Some(100_000), date(2026, 12, 31)),
        ];
        assert!(pick_best(&coupons, 10_000, today).is_none());
    }

    #[test]
    fn test_soonest_expiry_wins_over_a_better_rate() {
        let today = date(TODAY.0, TODAY.1, TODAY.2);
        let expiring = coupon(CouponDiscount::Percent(5), None, date(2026, 8, 10));
        let generous = coupon(CouponDiscount::Percent(30), None, date(2026, 12, 31));
        let expiring_id = expiring.id;

        let coupons = [generous, expiring];
        let best = pick_best(&coupons, 10_000, today).unwrap();
        assert_eq!(best.id, expiring_id);
    }

    #[test]
    fn test_rate_breaks_equal_expiry_across_both_kinds() {
        let today = date(TODAY.0, TODAY.1, TODAY.2);
        let expiry = date(2026, 9, 1);
        // 10% vs 2000/10000 = 20%
        let percent = coupon(CouponDiscount::Percent(10), None, expiry);
        let fixed = coupon(CouponDiscount::Fixed(2000), Some(10_000), expiry);
        let fixed_id = fixed.id;

        let coupons = [percent, fixed];
        let best = pick_best(&coupons, 20_000, today).unwrap();
        assert_eq!(best.id, fixed_id);
    }

    #[test]
    fn test_percent_application_floors() {
        let c = coupon(CouponDiscount::Percent(33), None, date(2026, 12, 31));
        let applied = apply(&c, 1000);
        assert_eq!(applied.discount, 330);
        assert_eq!(applied.final_total, 670);

        let applied = apply(&c, 101);
        assert_eq!(applied.discount, 33); // floor of 33.33
        assert_eq!(applied.final_total, 68);
    }

    #[test]
    fn test_fixed_application_caps_at_the_cart_total() {
        let c = coupon(CouponDiscount::Fixed(5000), None, date(2026, 12, 31));
        let applied = apply(&c, 3000);
        assert_eq!(applied.discount, 3000);
        assert_eq!(applied.final_total, 0);
    }
}
