// File: spinwheel-core/src/repositories/postgres/mod.rs

pub mod limit_overrides;
pub mod monthly_usage;
pub mod tenants;
pub mod vouchers;

pub use limit_overrides::PostgresLimitOverrideRepository;
pub use monthly_usage::PostgresMonthlyUsageRepository;
pub use tenants::PostgresTenantRepository;
pub use vouchers::PostgresVoucherRepository;
