// File: spinwheel-core/src/repositories/postgres/monthly_usage.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use spinwheel_common::error::Error;
use spinwheel_common::models::usage::MonthlyUsage;
use spinwheel_common::traits::repository_traits::MonthlyUsageRepository;

#[derive(Clone)]
pub struct PostgresMonthlyUsageRepository {
    pool: Pool<Postgres>,
}

impl PostgresMonthlyUsageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonthlyUsageRepository for PostgresMonthlyUsageRepository {
    async fn get_month(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<Option<MonthlyUsage>, Error> {
        let usage = sqlx::query_as::<_, MonthlyUsage>(
            r#"
            SELECT usage_id, tenant_id, month, year,
                   spins_used, vouchers_used, created_at, updated_at
            FROM monthly_usage
            WHERE tenant_id = $1 AND month = $2 AND year = $3
            "#,
        )
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    async fn get_or_create_month(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<MonthlyUsage, Error> {
        let now = Utc::now();

        // DO NOTHING keeps concurrent first-touch callers from failing the
        // unique key; whoever loses the insert still reads the same row.
        sqlx::query(
            r#"
            INSERT INTO monthly_usage (
                usage_id, tenant_id, month, year,
                spins_used, vouchers_used, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 0, 0, $5, $5)
            ON CONFLICT (tenant_id, month, year) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let usage = sqlx::query_as::<_, MonthlyUsage>(
            r#"
            SELECT usage_id, tenant_id, month, year,
                   spins_used, vouchers_used, created_at, updated_at
            FROM monthly_usage
            WHERE tenant_id = $1 AND month = $2 AND year = $3
            "#,
        )
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(usage)
    }

    async fn increment_spins(&self, tenant_id: Uuid, month: i32, year: i32) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO monthly_usage (
                usage_id, tenant_id, month, year,
                spins_used, vouchers_used, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 1, 0, $5, $5)
            ON CONFLICT (tenant_id, month, year) DO UPDATE
                SET spins_used = monthly_usage.spins_used + 1,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_vouchers(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO monthly_usage (
                usage_id, tenant_id, month, year,
                spins_used, vouchers_used, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 0, 1, $5, $5)
            ON CONFLICT (tenant_id, month, year) DO UPDATE
                SET vouchers_used = monthly_usage.vouchers_used + 1,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_month(&self, tenant_id: Uuid, month: i32, year: i32) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO monthly_usage (
                usage_id, tenant_id, month, year,
                spins_used, vouchers_used, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, 0, 0, $5, $5)
            ON CONFLICT (tenant_id, month, year) DO UPDATE
                SET spins_used = 0,
                    vouchers_used = 0,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(month)
        .bind(year)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
