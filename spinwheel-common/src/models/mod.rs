// File: spinwheel-common/src/models/mod.rs
pub mod tenant;
pub mod usage;
pub mod voucher;

pub use tenant::{EffectiveLimits, PlanLimit, SubscriptionPlan, Tenant, TenantLimitOverride};
pub use usage::{change_percent, MonthlyUsage, MonthUsageSummary, ResourceUsage, UsageWithTrend};
pub use voucher::{
    Pagination, RedeemAttempt, RedemptionOutcome, ValidationFailure, ValidationOutcome, Voucher,
    VoucherDetail, VoucherFilters, VoucherPage, VoucherStats, VoucherStatus, VoucherSummary,
    VoucherWithStatus,
};
