// File: spinwheel-core/src/services/mod.rs

pub mod usage_service;
pub mod voucher_service;

pub use usage_service::UsageService;
pub use voucher_service::{CreateVoucherParams, VoucherService};
