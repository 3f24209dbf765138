// File: spinwheel-core/src/repositories/postgres/tenants.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use spinwheel_common::error::Error;
use spinwheel_common::models::tenant::{PlanLimit, SubscriptionPlan, Tenant};
use spinwheel_common::traits::repository_traits::TenantRepository;

pub struct PostgresTenantRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresTenantRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, slug, name, plan_id, created_at
            FROM tenants
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, slug, name, plan_id, created_at
            FROM tenants
            WHERE LOWER(slug) = LOWER($1)
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn get_plan_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<SubscriptionPlan>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT p.plan_id,
                   p.name,
                   p.spins_per_month,
                   p.vouchers_per_month
            FROM tenants t
            JOIN subscription_plans p ON p.plan_id = t.plan_id
            WHERE t.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row_opt {
            let spins: Option<i32> = r.try_get("spins_per_month")?;
            let vouchers: Option<i32> = r.try_get("vouchers_per_month")?;
            Ok(Some(SubscriptionPlan {
                plan_id: r.try_get("plan_id")?,
                name: r.try_get("name")?,
                spins_per_month: PlanLimit::from_column(spins.map(i64::from)),
                vouchers_per_month: PlanLimit::from_column(vouchers.map(i64::from)),
            }))
        } else {
            Ok(None)
        }
    }
}
