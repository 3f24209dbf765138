// File: spinwheel-core/src/repositories/postgres/vouchers.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Row};
use uuid::Uuid;

use spinwheel_common::error::Error;
use spinwheel_common::models::voucher::{RedeemAttempt, ValidationFailure, Voucher, VoucherDetail};
use spinwheel_common::traits::repository_traits::VoucherRepository;

pub struct PostgresVoucherRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresVoucherRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const VOUCHER_COLUMNS: &str = r#"
    voucher_id,
    code,
    spin_id,
    prize_id,
    user_id,
    tenant_id,
    created_at,
    expires_at,
    redemption_limit,
    redemption_count,
    is_redeemed,
    redeemed_at,
    redeemed_by,
    qr_image_url
"#;

fn detail_from_row(row: &sqlx::postgres::PgRow) -> Result<VoucherDetail, Error> {
    Ok(VoucherDetail {
        voucher: Voucher::from_row(row)?,
        prize_name: row.try_get("prize_name")?,
        prize_description: row.try_get("prize_description")?,
        customer_name: row.try_get("customer_name")?,
        customer_phone: row.try_get("customer_phone")?,
    })
}

#[async_trait]
impl VoucherRepository for PostgresVoucherRepository {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO vouchers (
                voucher_id,
                code,
                spin_id,
                prize_id,
                user_id,
                tenant_id,
                created_at,
                expires_at,
                redemption_limit,
                redemption_count,
                is_redeemed,
                redeemed_at,
                redeemed_by,
                qr_image_url
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            "#,
        )
        .bind(voucher.voucher_id)
        .bind(&voucher.code)
        .bind(voucher.spin_id)
        .bind(voucher.prize_id)
        .bind(voucher.user_id)
        .bind(voucher.tenant_id)
        .bind(voucher.created_at)
        .bind(voucher.expires_at)
        .bind(voucher.redemption_limit)
        .bind(voucher.redemption_count)
        .bind(voucher.is_redeemed)
        .bind(voucher.redeemed_at)
        .bind(voucher.redeemed_by)
        .bind(&voucher.qr_image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Voucher>, Error> {
        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    async fn get_detail_by_code(&self, code: &str) -> Result<Option<VoucherDetail>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                v.voucher_id,
                v.code,
                v.spin_id,
                v.prize_id,
                v.user_id,
                v.tenant_id,
                v.created_at,
                v.expires_at,
                v.redemption_limit,
                v.redemption_count,
                v.is_redeemed,
                v.redeemed_at,
                v.redeemed_by,
                v.qr_image_url,
                p.name AS prize_name,
                p.description AS prize_description,
                u.display_name AS customer_name,
                u.phone AS customer_phone
            FROM vouchers v
            JOIN prizes p ON p.prize_id = v.prize_id
            LEFT JOIN users u ON u.user_id = v.user_id
            WHERE v.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row_opt {
            Some(row) => Ok(Some(detail_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn code_exists(&self, code: &str) -> Result<bool, Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM vouchers WHERE code = $1) AS found")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("found")?)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Voucher>, Error> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            r#"
            SELECT {VOUCHER_COLUMNS}
            FROM vouchers
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    async fn search_for_tenant(
        &self,
        tenant_id: Uuid,
        search: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<VoucherDetail>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                v.voucher_id,
                v.code,
                v.spin_id,
                v.prize_id,
                v.user_id,
                v.tenant_id,
                v.created_at,
                v.expires_at,
                v.redemption_limit,
                v.redemption_count,
                v.is_redeemed,
                v.redeemed_at,
                v.redeemed_by,
                v.qr_image_url,
                p.name AS prize_name,
                p.description AS prize_description,
                u.display_name AS customer_name,
                u.phone AS customer_phone
            FROM vouchers v
            JOIN prizes p ON p.prize_id = v.prize_id
            LEFT JOIN users u ON u.user_id = v.user_id
            WHERE v.tenant_id = $1
              AND ($2::text IS NULL
                   OR v.code ILIKE '%' || $2 || '%'
                   OR u.phone ILIKE '%' || $2 || '%')
              AND ($3::timestamptz IS NULL OR v.created_at >= $3)
              AND ($4::timestamptz IS NULL OR v.created_at <= $4)
            ORDER BY v.created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(search)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::new();
        for row in rows {
            details.push(detail_from_row(&row)?);
        }
        Ok(details)
    }

    async fn list_by_phone(
        &self,
        tenant_id: Uuid,
        phone: &str,
    ) -> Result<Vec<VoucherDetail>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                v.voucher_id,
                v.code,
                v.spin_id,
                v.prize_id,
                v.user_id,
                v.tenant_id,
                v.created_at,
                v.expires_at,
                v.redemption_limit,
                v.redemption_count,
                v.is_redeemed,
                v.redeemed_at,
                v.redeemed_by,
                v.qr_image_url,
                p.name AS prize_name,
                p.description AS prize_description,
                u.display_name AS customer_name,
                u.phone AS customer_phone
            FROM vouchers v
            JOIN prizes p ON p.prize_id = v.prize_id
            JOIN users u ON u.user_id = v.user_id
            WHERE v.tenant_id = $1
              AND u.phone = $2
            ORDER BY v.created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::new();
        for row in rows {
            details.push(detail_from_row(&row)?);
        }
        Ok(details)
    }

    async fn redeem_guarded(
        &self,
        code: &str,
        tenant_id: Uuid,
        merchant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedeemAttempt, Error> {
        let mut tx = self.pool.begin().await?;

        // Row lock so two concurrent redemptions of the same code serialize
        // here; the loser re-reads the incremented counters.
        let row_opt = sqlx::query(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = $1 FOR UPDATE"
        ))
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row_opt else {
            tx.rollback().await?;
            return Ok(RedeemAttempt::Blocked(ValidationFailure::NotFound));
        };
        let voucher = Voucher::from_row(&row)?;

        if let Some(reason) = voucher.check_redeemable(tenant_id, now) {
            tx.rollback().await?;
            return Ok(RedeemAttempt::Blocked(reason));
        }

        let will_be_fully_redeemed = voucher.redemption_count + 1 >= voucher.redemption_limit;

        let updated_row = sqlx::query(&format!(
            r#"
            UPDATE vouchers
            SET redemption_count = redemption_count + 1,
                is_redeemed = $1,
                redeemed_at = $2,
                redeemed_by = $3
            WHERE voucher_id = $4
            RETURNING {VOUCHER_COLUMNS}
            "#
        ))
        .bind(will_be_fully_redeemed)
        .bind(now)
        .bind(merchant_id)
        .bind(voucher.voucher_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated = Voucher::from_row(&updated_row)?;
        tx.commit().await?;

        Ok(RedeemAttempt::Redeemed(updated))
    }
}
