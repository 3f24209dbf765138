use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::tenant::{SubscriptionPlan, Tenant, TenantLimitOverride};
use crate::models::usage::MonthlyUsage;
use crate::models::voucher::{RedeemAttempt, Voucher, VoucherDetail};

/// Storage for vouchers. The sole writer of voucher rows.
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    async fn create_voucher(&self, voucher: &Voucher) -> Result<(), Error>;

    async fn get_by_code(&self, code: &str) -> Result<Option<Voucher>, Error>;

    /// Voucher joined with its prize and customer, for display paths.
    async fn get_detail_by_code(&self, code: &str) -> Result<Option<VoucherDetail>, Error>;

    /// Uniqueness probe for code generation. Codes are unique across all
    /// tenants, so this check is deliberately not tenant-scoped.
    async fn code_exists(&self, code: &str) -> Result<bool, Error>;

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Voucher>, Error>;

    /// Tenant-scoped search joined with prize/customer data. `search`
    /// matches the code or the customer phone, case-insensitively; the date
    /// bounds apply to creation time.
    async fn search_for_tenant(
        &self,
        tenant_id: Uuid,
        search: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<VoucherDetail>, Error>;

    async fn list_by_phone(&self, tenant_id: Uuid, phone: &str)
        -> Result<Vec<VoucherDetail>, Error>;

    /// Guarded redemption transition. Re-fetches the row under a row lock,
    /// re-runs the tenant/expiry/limit checks inside the transaction, and
    /// either applies the increment-by-one (stamping `redeemed_at`,
    /// `redeemed_by`, and the exhaustion flag) or aborts with no write.
    async fn redeem_guarded(
        &self,
        code: &str,
        tenant_id: Uuid,
        merchant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RedeemAttempt, Error>;
}

/// Storage for the per-tenant, per-calendar-month counter pair.
#[async_trait]
pub trait MonthlyUsageRepository: Send + Sync {
    async fn get_month(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<Option<MonthlyUsage>, Error>;

    /// Get-or-create with both counters at zero. Race-safe: concurrent
    /// callers for the same key all land on the same row.
    async fn get_or_create_month(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<MonthlyUsage, Error>;

    /// Atomic upsert-with-increment of exactly one spin.
    async fn increment_spins(&self, tenant_id: Uuid, month: i32, year: i32) -> Result<(), Error>;

    /// Atomic upsert-with-increment of exactly one voucher.
    async fn increment_vouchers(&self, tenant_id: Uuid, month: i32, year: i32)
        -> Result<(), Error>;

    /// Administrative zeroing of both counters (upsert).
    async fn reset_month(&self, tenant_id: Uuid, month: i32, year: i32) -> Result<(), Error>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, Error>;

    async fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, Error>;

    /// The plan the tenant is subscribed to, if the tenant exists and has one.
    async fn get_plan_for_tenant(&self, tenant_id: Uuid)
        -> Result<Option<SubscriptionPlan>, Error>;
}

/// Admin surface for limit-override grants.
#[async_trait]
pub trait LimitOverrideRepository: Send + Sync {
    async fn grant(&self, bonus: &TenantLimitOverride) -> Result<(), Error>;

    async fn deactivate(&self, override_id: Uuid) -> Result<(), Error>;

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<TenantLimitOverride>, Error>;

    /// Overrides passing the active predicate (`is_active` and not expired)
    /// at the given instant.
    async fn list_active(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<TenantLimitOverride>, Error>;
}
