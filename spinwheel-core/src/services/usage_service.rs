// File: spinwheel-core/src/services/usage_service.rs

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use spinwheel_common::models::tenant::EffectiveLimits;
use spinwheel_common::models::usage::{
    change_percent, MonthUsageSummary, MonthlyUsage, ResourceUsage, UsageWithTrend,
};
use spinwheel_common::traits::repository_traits::{
    LimitOverrideRepository, MonthlyUsageRepository, TenantRepository,
};

use crate::utils::clock::Clock;
use crate::utils::time::{days_until_next_month, month_year, previous_month};
use crate::Error;

/// The usage tracker: the only component that reads or writes monthly usage
/// counters or computes effective limits. Every limit decision passes
/// through here.
///
/// "Monthly reset" is implicit: a new month has no row yet, so its counters
/// start at zero while older rows stay behind as permanent history.
pub struct UsageService {
    usage_repo: Arc<dyn MonthlyUsageRepository + Send + Sync>,
    tenant_repo: Arc<dyn TenantRepository + Send + Sync>,
    override_repo: Arc<dyn LimitOverrideRepository + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl UsageService {
    pub fn new(
        usage_repo: Arc<dyn MonthlyUsageRepository + Send + Sync>,
        tenant_repo: Arc<dyn TenantRepository + Send + Sync>,
        override_repo: Arc<dyn LimitOverrideRepository + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            usage_repo,
            tenant_repo,
            override_repo,
            clock,
        }
    }

    /// The current calendar month's row for the tenant, created with both
    /// counters at zero if this is the first touch of the month.
    pub async fn get_or_create_current_month(
        &self,
        tenant_id: Uuid,
    ) -> Result<MonthlyUsage, Error> {
        let (month, year) = month_year(self.clock.now());
        self.usage_repo
            .get_or_create_month(tenant_id, month, year)
            .await
    }

    /// Read-only lookup of an arbitrary month; historical rows remain
    /// readable after rollover.
    pub async fn get_month_usage(
        &self,
        tenant_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<Option<MonthlyUsage>, Error> {
        self.usage_repo.get_month(tenant_id, month, year).await
    }

    /// Add exactly one spin to the current month, atomically.
    pub async fn increment_spins(&self, tenant_id: Uuid) -> Result<(), Error> {
        let (month, year) = month_year(self.clock.now());
        self.usage_repo
            .increment_spins(tenant_id, month, year)
            .await
    }

    /// Add exactly one voucher to the current month, atomically.
    pub async fn increment_vouchers(&self, tenant_id: Uuid) -> Result<(), Error> {
        let (month, year) = month_year(self.clock.now());
        self.usage_repo
            .increment_vouchers(tenant_id, month, year)
            .await
    }

    /// Plan limits with every currently-active override bonus folded in.
    /// The fold is plain addition, so override order cannot matter;
    /// unlimited plans stay unlimited regardless of bonuses.
    pub async fn effective_limits(&self, tenant_id: Uuid) -> Result<EffectiveLimits, Error> {
        let plan = self
            .tenant_repo
            .get_plan_for_tenant(tenant_id)
            .await?
            .ok_or(Error::TenantNotFound(tenant_id))?;

        let overrides = self
            .override_repo
            .list_active(tenant_id, self.clock.now())
            .await?;

        let mut spins = plan.spins_per_month;
        let mut vouchers = plan.vouchers_per_month;
        for bonus in &overrides {
            spins = spins.plus(i64::from(bonus.bonus_spins));
            vouchers = vouchers.plus(i64::from(bonus.bonus_vouchers));
        }

        debug!(
            "effective limits for tenant {}: {:?} ({} active overrides)",
            tenant_id,
            EffectiveLimits { spins, vouchers },
            overrides.len()
        );
        Ok(EffectiveLimits { spins, vouchers })
    }

    /// Pure check: may the tenant record another spin this month? Denies at
    /// `used == limit`. Reads only; an absent row counts as zero usage.
    pub async fn can_spin(&self, tenant_id: Uuid) -> Result<bool, Error> {
        let limits = self.effective_limits(tenant_id).await?;
        let used = self.current_usage(tenant_id).await?.0;
        Ok(limits.spins.allows(i64::from(used)))
    }

    /// Pure check: may the tenant mint another voucher this month?
    pub async fn can_create_voucher(&self, tenant_id: Uuid) -> Result<bool, Error> {
        let limits = self.effective_limits(tenant_id).await?;
        let used = self.current_usage(tenant_id).await?.1;
        Ok(limits.vouchers.allows(i64::from(used)))
    }

    /// Administrative zeroing of the current month's counters, distinct
    /// from the automatic rollover.
    pub async fn reset_usage(&self, tenant_id: Uuid) -> Result<(), Error> {
        let (month, year) = month_year(self.clock.now());
        self.usage_repo.reset_month(tenant_id, month, year).await?;
        info!(
            "usage counters reset for tenant {} ({:04}-{:02})",
            tenant_id, year, month
        );
        Ok(())
    }

    /// Dashboard report: current and previous month against the effective
    /// limits, month-over-month swing, and days left until rollover.
    pub async fn usage_with_trend(&self, tenant_id: Uuid) -> Result<UsageWithTrend, Error> {
        let now = self.clock.now();
        let (month, year) = month_year(now);
        let (prev_year, prev_month) = previous_month(year, month);

        let limits = self.effective_limits(tenant_id).await?;
        let (spins_used, vouchers_used) = self.current_usage(tenant_id).await?;
        let (prev_spins, prev_vouchers) = match self
            .usage_repo
            .get_month(tenant_id, prev_month, prev_year)
            .await?
        {
            Some(row) => (row.spins_used, row.vouchers_used),
            None => (0, 0),
        };

        Ok(UsageWithTrend {
            current: summarize(month, year, spins_used, vouchers_used, &limits),
            previous: summarize(prev_month, prev_year, prev_spins, prev_vouchers, &limits),
            spins_change_percent: change_percent(prev_spins, spins_used),
            vouchers_change_percent: change_percent(prev_vouchers, vouchers_used),
            days_until_reset: days_until_next_month(now)?,
        })
    }

    /// `(spins_used, vouchers_used)` for the current month without creating
    /// the row; an absent month reads as zero so the limit checks stay free
    /// of side effects.
    async fn current_usage(&self, tenant_id: Uuid) -> Result<(i32, i32), Error> {
        let (month, year) = month_year(self.clock.now());
        Ok(
            match self.usage_repo.get_month(tenant_id, month, year).await? {
                Some(row) => (row.spins_used, row.vouchers_used),
                None => (0, 0),
            },
        )
    }
}

fn summarize(
    month: i32,
    year: i32,
    spins_used: i32,
    vouchers_used: i32,
    limits: &EffectiveLimits,
) -> MonthUsageSummary {
    MonthUsageSummary {
        month,
        year,
        spins: ResourceUsage {
            used: spins_used,
            limit: limits.spins,
            percent_used: limits.spins.percent_used(i64::from(spins_used)),
        },
        vouchers: ResourceUsage {
            used: vouchers_used,
            limit: limits.vouchers,
            percent_used: limits.vouchers.percent_used(i64::from(vouchers_used)),
        },
    }
}
