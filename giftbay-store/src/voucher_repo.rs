use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use giftbay_core::{StoreError, Transition, VoucherStore};
use giftbay_shared::{Voucher, VoucherStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Postgres-backed voucher store. Each `try_*` transition is one conditional
/// `UPDATE ... WHERE status = ... RETURNING`, so the status column acts as an
/// optimistic lock; a follow-up read-only SELECT is issued only to classify
/// why an update matched no row.
pub struct PostgresVoucherStore {
    pub pool: PgPool,
}

const VOUCHER_COLUMNS: &str =
    "id, brand, display_name, original_price, sale_price, expiry_date, status, reserved_by, reserved_at";

impl PostgresVoucherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain a conditional update that matched no row. `reserve_today` is
    /// set on the reserve path (its precondition includes expiry);
    /// `owner_checked` on release/finalize paths that carried an owner
    /// predicate.
    async fn classify_miss(
        &self,
        id: Uuid,
        reserve_today: Option<NaiveDate>,
        owner_checked: bool,
    ) -> Result<Transition, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE id = $1",
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(Transition::Missing);
        };
        let voucher = row_to_voucher(&row)?;

        if let Some(today) = reserve_today {
            if voucher.status == VoucherStatus::ForSale && voucher.is_expired(today) {
                return Ok(Transition::Expired);
            }
            return Ok(Transition::StatusMismatch(voucher.status));
        }
        if owner_checked && voucher.status == VoucherStatus::Reserved {
            return Ok(Transition::OwnerMismatch);
        }
        Ok(Transition::StatusMismatch(voucher.status))
    }
}

#[async_trait]
impl VoucherStore for PostgresVoucherStore {
    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO vouchers
                (id, brand, display_name, original_price, sale_price, expiry_date, status, reserved_by, reserved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(voucher.id)
        .bind(&voucher.brand)
        .bind(&voucher.display_name)
        .bind(voucher.original_price)
        .bind(voucher.sale_price)
        .bind(voucher.expiry_date)
        .bind(voucher.status.to_string())
        .bind(&voucher.reserved_by)
        .bind(voucher.reserved_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE id = $1",
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_voucher).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE id = ANY($1)",
            VOUCHER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_voucher).collect()
    }

    async fn list_for_sale(&self, brand: &str) -> Result<Vec<Voucher>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE brand = $1 AND status = 'FOR_SALE'",
            VOUCHER_COLUMNS
        ))
        .bind(brand)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_voucher).collect()
    }

    async fn list_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE status = $1",
            VOUCHER_COLUMNS
        ))
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_voucher).collect()
    }

    async fn list_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Voucher>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vouchers WHERE status = 'RESERVED' AND reserved_at < $1",
            VOUCHER_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_voucher).collect()
    }

    async fn try_reserve(
        &self,
        id: Uuid,
        buyer_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE vouchers
            SET status = 'RESERVED', reserved_by = $2, reserved_at = $3
            WHERE id = $1 AND status = 'FOR_SALE' AND expiry_date >= $4
            RETURNING {}
            "#,
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .bind(buyer_id)
        .bind(now)
        .bind(today)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match updated {
            Some(row) => Ok(Transition::Applied(row_to_voucher(&row)?)),
            None => self.classify_miss(id, Some(today), false).await,
        }
    }

    async fn try_release(
        &self,
        id: Uuid,
        expected_buyer: Option<&str>,
    ) -> Result<Transition, StoreError> {
        let updated = match expected_buyer {
            Some(buyer) => sqlx::query(&format!(
                r#"
                UPDATE vouchers
                SET status = 'FOR_SALE', reserved_by = NULL, reserved_at = NULL
                WHERE id = $1 AND status = 'RESERVED' AND reserved_by = $2
                RETURNING {}
                "#,
                VOUCHER_COLUMNS
            ))
            .bind(id)
            .bind(buyer)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?,
            None => sqlx::query(&format!(
                r#"
                UPDATE vouchers
                SET status = 'FOR_SALE', reserved_by = NULL, reserved_at = NULL
                WHERE id = $1 AND status = 'RESERVED'
                RETURNING {}
                "#,
                VOUCHER_COLUMNS
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?,
        };

        match updated {
            Some(row) => Ok(Transition::Applied(row_to_voucher(&row)?)),
            None => self.classify_miss(id, None, expected_buyer.is_some()).await,
        }
    }

    async fn try_finalize(
        &self,
        id: Uuid,
        expected_buyer: &str,
    ) -> Result<Transition, StoreError> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE vouchers
            SET status = 'SOLD', reserved_by = NULL, reserved_at = NULL
            WHERE id = $1 AND status = 'RESERVED' AND reserved_by = $2
            RETURNING {}
            "#,
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .bind(expected_buyer)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match updated {
            Some(row) => Ok(Transition::Applied(row_to_voucher(&row)?)),
            None => self.classify_miss(id, None, true).await,
        }
    }
}

fn row_to_voucher(row: &PgRow) -> Result<Voucher, StoreError> {
    let id: Uuid = row.try_get("id").map_err(db_err)?;
    let status_raw: String = row.try_get("status").map_err(db_err)?;
    let status = status_raw
        .parse::<VoucherStatus>()
        .map_err(|detail| StoreError::Corrupt { id, detail })?;

    Ok(Voucher {
        id,
        brand: row.try_get("brand").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        original_price: row.try_get("original_price").map_err(db_err)?,
        sale_price: row.try_get("sale_price").map_err(db_err)?,
        expiry_date: row.try_get("expiry_date").map_err(db_err)?,
        status,
        reserved_by: row.try_get("reserved_by").map_err(db_err)?,
        reserved_at: row.try_get("reserved_at").map_err(db_err)?,
    })
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
