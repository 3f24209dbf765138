// File: spinwheel-core/src/repositories/postgres/limit_overrides.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use spinwheel_common::error::Error;
use spinwheel_common::models::tenant::TenantLimitOverride;
use spinwheel_common::traits::repository_traits::LimitOverrideRepository;

#[derive(Clone)]
pub struct PostgresLimitOverrideRepository {
    pool: Pool<Postgres>,
}

impl PostgresLimitOverrideRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LimitOverrideRepository for PostgresLimitOverrideRepository {
    async fn grant(&self, bonus: &TenantLimitOverride) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO tenant_limit_overrides (
                override_id, tenant_id, bonus_spins, bonus_vouchers,
                is_active, expires_at, reason, granted_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(bonus.override_id)
        .bind(bonus.tenant_id)
        .bind(bonus.bonus_spins)
        .bind(bonus.bonus_vouchers)
        .bind(bonus.is_active)
        .bind(bonus.expires_at)
        .bind(&bonus.reason)
        .bind(&bonus.granted_by)
        .bind(bonus.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate(&self, override_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE tenant_limit_overrides SET is_active = FALSE WHERE override_id = $1")
            .bind(override_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<TenantLimitOverride>, Error> {
        let overrides = sqlx::query_as::<_, TenantLimitOverride>(
            r#"
            SELECT override_id, tenant_id, bonus_spins, bonus_vouchers,
                   is_active, expires_at, reason, granted_by, created_at
            FROM tenant_limit_overrides
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(overrides)
    }

    async fn list_active(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<TenantLimitOverride>, Error> {
        let overrides = sqlx::query_as::<_, TenantLimitOverride>(
            r#"
            SELECT override_id, tenant_id, bonus_spins, bonus_vouchers,
                   is_active, expires_at, reason, granted_by, created_at
            FROM tenant_limit_overrides
            WHERE tenant_id = $1
              AND is_active = TRUE
              AND (expires_at IS NULL OR expires_at >= $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(overrides)
    }
}
