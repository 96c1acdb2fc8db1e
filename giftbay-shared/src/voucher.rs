use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sale status of a voucher, persisted in its SCREAMING_SNAKE_CASE string form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    ForSale,
    Reserved,
    Sold,
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoucherStatus::ForSale => "FOR_SALE",
            VoucherStatus::Reserved => "RESERVED",
            VoucherStatus::Sold => "SOLD",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VoucherStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOR_SALE" => Ok(VoucherStatus::ForSale),
            "RESERVED" => Ok(VoucherStatus::Reserved),
            "SOLD" => Ok(VoucherStatus::Sold),
            other => Err(format!("unknown voucher status: {}", other)),
        }
    }
}

/// A discounted, brand-specific gift voucher in the resale pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub brand: String,
    pub display_name: Option<String>,
    /// Face value in minor currency units
    pub original_price: i64,
    /// Asking price in minor currency units, never above the face value
    pub sale_price: i64,
    pub expiry_date: NaiveDate,
    pub status: VoucherStatus,
    pub reserved_by: Option<String>,
    pub reserved_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Create a new for-sale listing
    pub fn new(
        brand: impl Into<String>,
        original_price: i64,
        sale_price: i64,
        expiry_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            brand: brand.into(),
            display_name: None,
            original_price,
            sale_price,
            expiry_date,
            status: VoucherStatus::ForSale,
            reserved_by: None,
            reserved_at: None,
        }
    }

    /// Rate-of-return-style ranking metric: discount relative to what the
    /// buyer pays. Order comparisons should go through the ranking module,
    /// which cross-multiplies instead of comparing floats.
    pub fn discount_efficiency(&self) -> f64 {
        (self.original_price - self.sale_price) as f64 / self.sale_price as f64
    }

    /// Fixed-width currency bucket the face value falls in
    pub fn price_bucket(&self, bucket_size: i64) -> i64 {
        (self.original_price / bucket_size) * bucket_size
    }

    /// The voucher is unusable once its expiry date has passed
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// `Reserved` carries both reservation fields; `ForSale`/`Sold` carry neither
    pub fn reservation_fields_consistent(&self) -> bool {
        match self.status {
            VoucherStatus::Reserved => self.reserved_by.is_some() && self.reserved_at.is_some(),
            VoucherStatus::ForSale | VoucherStatus::Sold => {
                self.reserved_by.is_none() && self.reserved_at.is_none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            VoucherStatus::ForSale,
            VoucherStatus::Reserved,
            VoucherStatus::Sold,
        ] {
            assert_eq!(status.to_string().parse::<VoucherStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<VoucherStatus>().is_err());
    }

    #[test]
    fn test_price_bucket() {
        let voucher = Voucher::new("cafe-latte", 3700, 3200, date(2027, 1, 1));
        assert_eq!(voucher.price_bucket(1000), 3000);
        assert_eq!(voucher.price_bucket(500), 3500);

        let exact = Voucher::new("cafe-latte", 5000, 4000, date(2027, 1, 1));
        assert_eq!(exact.price_bucket(1000), 5000);
    }

    #[test]
    fn test_expiry_is_exclusive_of_the_expiry_date() {
        let voucher = Voucher::new("cafe-latte", 3000, 2700, date(2026, 6, 1));
        assert!(!voucher.is_expired(date(2026, 6, 1)));
        assert!(voucher.is_expired(date(2026, 6, 2)));
    }

    #[test]
    fn test_new_listing_is_for_sale_with_clear_reservation_fields() {
        let voucher = Voucher::new("cafe-latte", 3000, 2700, date(2027, 1, 1));
        assert_eq!(voucher.status, VoucherStatus::ForSale);
        assert!(voucher.reservation_fields_consistent());
    }
}
