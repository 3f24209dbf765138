// File: spinwheel-common/src/models/usage.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tenant::PlanLimit;

/// One tenant's consumption counters for one calendar month.
///
/// Rows are permanent history: a new month simply has no row yet, which is
/// what implements the "monthly reset". Counters only move via atomic
/// upsert-with-increment, never read-modify-write.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyUsage {
    pub usage_id: Uuid,
    pub tenant_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub spins_used: i32,
    pub vouchers_used: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usage of a single resource against its effective limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub used: i32,
    pub limit: PlanLimit,
    pub percent_used: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthUsageSummary {
    pub month: i32,
    pub year: i32,
    pub spins: ResourceUsage,
    pub vouchers: ResourceUsage,
}

/// Dashboard view: this month, last month, and the month-over-month swing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageWithTrend {
    pub current: MonthUsageSummary,
    pub previous: MonthUsageSummary,
    pub spins_change_percent: i64,
    pub vouchers_change_percent: i64,
    pub days_until_reset: i64,
}

/// Month-over-month percentage change. A jump from zero counts as 100%,
/// zero-to-zero as 0%.
pub fn change_percent(previous: i32, current: i32) -> i64 {
    if previous == 0 {
        if current > 0 {
            100
        } else {
            0
        }
    } else {
        (((current - previous) as f64 / previous as f64) * 100.0).round() as i64
    }
}
