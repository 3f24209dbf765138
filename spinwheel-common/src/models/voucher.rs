// File: spinwheel-common/src/models/voucher.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One redeemable reward grant, minted when a spin lands on a prize.
///
/// `is_redeemed` duplicates `redemption_count >= redemption_limit` so the
/// column can be indexed; every read path derives status through
/// [`Voucher::status_at`] and the redeem transition recomputes the flag from
/// the same formula, so the two cannot diverge in application logic.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voucher {
    pub voucher_id: Uuid,
    pub code: String,
    pub spin_id: Uuid,
    pub prize_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redemption_limit: i32,
    pub redemption_count: i32,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image_url: Option<String>,
}

impl Voucher {
    /// Whether every redemption slot has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.redemption_count >= self.redemption_limit
    }

    /// Rule evaluation shared by the read-only validate path and the
    /// transactional re-check before a redemption write. Checks run in a
    /// fixed order and the first failure wins, so the reasons are mutually
    /// exclusive.
    pub fn check_redeemable(
        &self,
        requesting_tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<ValidationFailure> {
        if self.tenant_id != requesting_tenant_id {
            Some(ValidationFailure::WrongTenant)
        } else if now > self.expires_at {
            Some(ValidationFailure::Expired {
                expires_at: self.expires_at,
            })
        } else if self.is_redeemed {
            Some(ValidationFailure::Redeemed {
                redeemed_at: self.redeemed_at,
                redeemed_by: self.redeemed_by,
            })
        } else if self.is_exhausted() {
            Some(ValidationFailure::LimitReached)
        } else {
            None
        }
    }

    /// Display status. Redeemed takes precedence over expired.
    pub fn status_at(&self, now: DateTime<Utc>) -> VoucherStatus {
        if self.is_redeemed || self.is_exhausted() {
            VoucherStatus::Redeemed
        } else if now > self.expires_at {
            VoucherStatus::Expired
        } else {
            VoucherStatus::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Active,
    Redeemed,
    Expired,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Active => "active",
            VoucherStatus::Redeemed => "redeemed",
            VoucherStatus::Expired => "expired",
        }
    }
}

/// A voucher joined with the prize and customer it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherDetail {
    pub voucher: Voucher,
    pub prize_name: String,
    pub prize_description: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherWithStatus {
    pub detail: VoucherDetail,
    pub status: VoucherStatus,
}

/// What a merchant sees when a code checks out as valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherSummary {
    pub code: String,
    pub prize_name: String,
    pub prize_description: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub redemption_count: i32,
    pub redemption_limit: i32,
}

/// Why a code failed validation. These are expected, user-facing outcomes
/// and are returned as values, never raised as errors. The variants are
/// mutually exclusive and evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationFailure {
    NotFound,
    WrongTenant,
    Expired {
        expires_at: DateTime<Utc>,
    },
    Redeemed {
        redeemed_at: Option<DateTime<Utc>>,
        redeemed_by: Option<Uuid>,
    },
    LimitReached,
}

impl ValidationFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationFailure::NotFound => "not_found",
            ValidationFailure::WrongTenant => "wrong_tenant",
            ValidationFailure::Expired { .. } => "expired",
            ValidationFailure::Redeemed { .. } => "redeemed",
            ValidationFailure::LimitReached => "limit_reached",
        }
    }

    /// Human-readable message shown to the redeeming merchant. A tenant
    /// mismatch is masked as a generic invalid code so the existence of the
    /// voucher under another tenant never leaks.
    pub fn to_message(&self) -> String {
        match self {
            ValidationFailure::NotFound => "Voucher not found".to_string(),
            ValidationFailure::WrongTenant => "Invalid voucher".to_string(),
            ValidationFailure::Expired { expires_at } => {
                format!("Voucher expired on {}", expires_at.format("%Y-%m-%d"))
            }
            ValidationFailure::Redeemed { .. } => "Voucher already redeemed".to_string(),
            ValidationFailure::LimitReached => "Voucher redemption limit reached".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Valid { voucher: VoucherSummary },
    Invalid { reason: ValidationFailure },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }
}

/// Result of the guarded redeem transition inside the store transaction.
#[derive(Debug, Clone)]
pub enum RedeemAttempt {
    Redeemed(Voucher),
    Blocked(ValidationFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RedemptionOutcome {
    Success { voucher: Voucher },
    Failure { error: String },
}

impl RedemptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RedemptionOutcome::Success { .. })
    }
}

/// Filters for the tenant-scoped voucher listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherFilters {
    pub status: Option<VoucherStatus>,
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherPage {
    pub vouchers: Vec<VoucherWithStatus>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStats {
    pub total: i64,
    pub active: i64,
    pub redeemed: i64,
    pub expired: i64,
}
