// File: spinwheel-common/src/models/tenant.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One client business running prize wheels on the platform.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub slug: String,
    pub name: String,
    pub plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A monthly allowance for one resource: either a concrete ceiling or
/// unmetered. Stored as a nullable integer column (NULL = unlimited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanLimit {
    Limited(i64),
    Unlimited,
}

impl PlanLimit {
    pub fn from_column(value: Option<i64>) -> Self {
        match value {
            Some(n) => PlanLimit::Limited(n),
            None => PlanLimit::Unlimited,
        }
    }

    pub fn into_column(self) -> Option<i64> {
        match self {
            PlanLimit::Limited(n) => Some(n),
            PlanLimit::Unlimited => None,
        }
    }

    /// Add a bonus onto the limit. Unlimited absorbs any bonus.
    pub fn plus(self, bonus: i64) -> Self {
        match self {
            PlanLimit::Limited(n) => PlanLimit::Limited(n + bonus),
            PlanLimit::Unlimited => PlanLimit::Unlimited,
        }
    }

    /// Strict check: one more unit may be consumed only while `used < limit`.
    pub fn allows(self, used: i64) -> bool {
        match self {
            PlanLimit::Limited(n) => used < n,
            PlanLimit::Unlimited => true,
        }
    }

    /// Rounded percentage of the limit consumed; 0 for unmetered plans.
    pub fn percent_used(self, used: i64) -> i64 {
        match self {
            PlanLimit::Limited(n) if n > 0 => {
                ((used as f64 / n as f64) * 100.0).round() as i64
            }
            PlanLimit::Limited(_) => 100,
            PlanLimit::Unlimited => 0,
        }
    }
}

/// Read-only view of the subscription tier a tenant is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub plan_id: Uuid,
    pub name: String,
    pub spins_per_month: PlanLimit,
    pub vouchers_per_month: PlanLimit,
}

/// A temporary or permanent bonus added on top of a tenant's plan limits.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantLimitOverride {
    pub override_id: Uuid,
    pub tenant_id: Uuid,
    pub bonus_spins: i32,
    pub bonus_vouchers: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub granted_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantLimitOverride {
    /// An override contributes its bonuses while switched on and not past
    /// its expiry (no expiry = permanent).
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp >= now)
    }
}

/// Plan limits with all currently-active override bonuses folded in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EffectiveLimits {
    pub spins: PlanLimit,
    pub vouchers: PlanLimit,
}
