use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discount kind carried by a coupon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponDiscount {
    /// Percentage off the cart total
    Percent(u32),
    /// Fixed amount off, in minor currency units
    Fixed(i64),
}

/// A discount coupon applicable to a cart at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub name: Option<String>,
    pub discount: CouponDiscount,
    /// Minimum cart total required to use the coupon, if any
    pub min_purchase: Option<i64>,
    pub expiry_date: NaiveDate,
}

impl Coupon {
    pub fn is_usable(&self, cart_total: i64, today: NaiveDate) -> bool {
        self.expiry_date >= today && self.min_purchase.map_or(true, |min| cart_total >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_usability_gates_on_expiry_and_min_purchase() {
        let coupon = Coupon {
            id: Uuid::new_v4(),
            name: None,
            discount: CouponDiscount::Percent(10),
            min_purchase: Some(5000),
            expiry_date: date(2026, 6, 30),
        };

        assert!(coupon.is_usable(5000, date(2026, 6, 30)));
        assert!(!coupon.is_usable(4999, date(2026, 6, 30)));
        assert!(!coupon.is_usable(5000, date(2026, 7, 1)));

        let no_minimum = Coupon {
            min_purchase: None,
            ..coupon
        };
        assert!(no_minimum.is_usable(1, date(2026, 6, 1)));
    }
}
