// File: spinwheel-core/src/repositories/mod.rs

pub mod postgres;

pub use spinwheel_common::traits::repository_traits::{
    LimitOverrideRepository, MonthlyUsageRepository, TenantRepository, VoucherRepository,
};
