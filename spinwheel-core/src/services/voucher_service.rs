// File: spinwheel-core/src/services/voucher_service.rs

use std::sync::Arc;

use chrono::Days;
use tracing::{info, warn};
use uuid::Uuid;

use spinwheel_common::models::voucher::{
    Pagination, RedeemAttempt, RedemptionOutcome, ValidationOutcome, ValidationFailure, Voucher,
    VoucherFilters, VoucherPage, VoucherStats, VoucherStatus, VoucherSummary, VoucherWithStatus,
};
use spinwheel_common::traits::repository_traits::VoucherRepository;

use crate::codes::{self, DEFAULT_CODE_ATTEMPTS};
use crate::qr::QrImageService;
use crate::services::usage_service::UsageService;
use crate::utils::clock::Clock;
use crate::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Parameters for minting a voucher after a qualifying prize win.
#[derive(Debug, Clone)]
pub struct CreateVoucherParams {
    pub spin_id: Uuid,
    pub prize_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub validity_days: u32,
    pub redemption_limit: i32,
    pub generate_qr: bool,
}

/// The voucher store: owns creation, read-only validation, and the guarded
/// redemption transition. The sole writer of voucher rows.
pub struct VoucherService {
    voucher_repo: Arc<dyn VoucherRepository + Send + Sync>,
    usage: Arc<UsageService>,
    qr: Arc<dyn QrImageService + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    max_code_attempts: u32,
}

impl VoucherService {
    pub fn new(
        voucher_repo: Arc<dyn VoucherRepository + Send + Sync>,
        usage: Arc<UsageService>,
        qr: Arc<dyn QrImageService + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            voucher_repo,
            usage,
            qr,
            clock,
            max_code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// Raise the code-generation attempt budget for deployments with heavy
    /// per-tenant volume.
    pub fn with_max_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts;
        self
    }

    /// Mint a voucher: limit gate, unique code, expiry arithmetic, optional
    /// QR, persist, then count it against the month.
    pub async fn create(&self, params: CreateVoucherParams) -> Result<Voucher, Error> {
        if !self.usage.can_create_voucher(params.tenant_id).await? {
            info!(
                "voucher creation denied for tenant {}: monthly limit reached",
                params.tenant_id
            );
            return Err(Error::LimitExceeded {
                tenant_id: params.tenant_id,
                resource: "vouchers".to_string(),
            });
        }

        let code = codes::generate_unique_code(
            self.voucher_repo.as_ref(),
            &params.tenant_slug,
            self.max_code_attempts,
        )
        .await?;

        let now = self.clock.now();
        let expires_at = now
            .checked_add_days(Days::new(u64::from(params.validity_days)))
            .ok_or_else(|| {
                Error::Parse(format!(
                    "invalid validity window: {} days",
                    params.validity_days
                ))
            })?;

        // QR failure degrades to a fallback URL inside the collaborator;
        // a voucher without a hosted image is still redeemable.
        let qr_image_url = if params.generate_qr {
            Some(self.qr.create_and_upload(&code).await)
        } else {
            None
        };

        let voucher = Voucher {
            voucher_id: Uuid::new_v4(),
            code,
            spin_id: params.spin_id,
            prize_id: params.prize_id,
            user_id: params.user_id,
            tenant_id: params.tenant_id,
            created_at: now,
            expires_at,
            redemption_limit: params.redemption_limit,
            redemption_count: 0,
            is_redeemed: false,
            redeemed_at: None,
            redeemed_by: None,
            qr_image_url,
        };
        self.voucher_repo.create_voucher(&voucher).await?;

        // The voucher row and the usage counter live in different
        // aggregates; a failure here leaves the month undercounted until
        // the periodic audit reconciles it.
        if let Err(e) = self.usage.increment_vouchers(params.tenant_id).await {
            warn!(
                "voucher {} persisted but usage increment failed: {}",
                voucher.code, e
            );
        }

        info!(
            "voucher {} created for tenant {} (expires {})",
            voucher.code, voucher.tenant_id, voucher.expires_at
        );
        Ok(voucher)
    }

    /// Read-only rule evaluation. Reasons short-circuit in a fixed order:
    /// not_found, wrong_tenant, expired, redeemed, limit_reached.
    pub async fn validate(
        &self,
        code: &str,
        requesting_tenant_id: Uuid,
    ) -> Result<ValidationOutcome, Error> {
        let Some(detail) = self.voucher_repo.get_detail_by_code(code).await? else {
            return Ok(ValidationOutcome::Invalid {
                reason: ValidationFailure::NotFound,
            });
        };

        if let Some(reason) = detail
            .voucher
            .check_redeemable(requesting_tenant_id, self.clock.now())
        {
            return Ok(ValidationOutcome::Invalid { reason });
        }

        Ok(ValidationOutcome::Valid {
            voucher: VoucherSummary {
                code: detail.voucher.code.clone(),
                prize_name: detail.prize_name,
                prize_description: detail.prize_description,
                customer_name: detail.customer_name,
                customer_phone: detail.customer_phone,
                expires_at: detail.voucher.expires_at,
                redemption_count: detail.voucher.redemption_count,
                redemption_limit: detail.voucher.redemption_limit,
            },
        })
    }

    /// Redeem one slot of a voucher. Validates first without touching
    /// state, then runs the guarded transition, which re-validates inside
    /// the transaction to close the race window between the two steps.
    pub async fn redeem(
        &self,
        code: &str,
        merchant_id: Uuid,
        requesting_tenant_id: Uuid,
    ) -> Result<RedemptionOutcome, Error> {
        if let ValidationOutcome::Invalid { reason } =
            self.validate(code, requesting_tenant_id).await?
        {
            return Ok(RedemptionOutcome::Failure {
                error: reason.to_message(),
            });
        }

        match self
            .voucher_repo
            .redeem_guarded(code, requesting_tenant_id, merchant_id, self.clock.now())
            .await?
        {
            RedeemAttempt::Redeemed(voucher) => {
                info!(
                    "voucher {} redeemed by merchant {} ({}/{})",
                    voucher.code, merchant_id, voucher.redemption_count, voucher.redemption_limit
                );
                Ok(RedemptionOutcome::Success { voucher })
            }
            RedeemAttempt::Blocked(reason) => {
                info!(
                    "voucher {} redemption blocked mid-flight: {}",
                    code,
                    reason.reason()
                );
                Ok(RedemptionOutcome::Failure {
                    error: reason.to_message(),
                })
            }
        }
    }

    /// All of a customer's vouchers under the tenant, each with its display
    /// status. Empty list when nothing matches, never an error.
    pub async fn vouchers_by_phone(
        &self,
        phone: &str,
        tenant_id: Uuid,
    ) -> Result<Vec<VoucherWithStatus>, Error> {
        let now = self.clock.now();
        let details = self.voucher_repo.list_by_phone(tenant_id, phone).await?;

        Ok(details
            .into_iter()
            .map(|detail| {
                let status = detail.voucher.status_at(now);
                VoucherWithStatus { detail, status }
            })
            .collect())
    }

    /// Tenant-scoped listing. Search and date bounds run in SQL; the status
    /// filter is a derived multi-field predicate, so it (and pagination)
    /// apply to the fetched set.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: VoucherFilters,
    ) -> Result<VoucherPage, Error> {
        let now = self.clock.now();
        let details = self
            .voucher_repo
            .search_for_tenant(
                tenant_id,
                filters.search.clone(),
                filters.start_date,
                filters.end_date,
            )
            .await?;

        let mut rows: Vec<VoucherWithStatus> = details
            .into_iter()
            .map(|detail| {
                let status = detail.voucher.status_at(now);
                VoucherWithStatus { detail, status }
            })
            .collect();

        if let Some(status) = filters.status {
            rows.retain(|row| row.status == status);
        }

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let total = rows.len() as u64;
        let total_pages = total.div_ceil(u64::from(limit)) as u32;

        let offset = (page as usize - 1) * limit as usize;
        let vouchers = rows
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        Ok(VoucherPage {
            vouchers,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    /// Aggregate counts using the same status derivation as every other
    /// read path.
    pub async fn stats(&self, tenant_id: Uuid) -> Result<VoucherStats, Error> {
        let now = self.clock.now();
        let vouchers = self.voucher_repo.list_for_tenant(tenant_id).await?;

        let mut stats = VoucherStats {
            total: vouchers.len() as i64,
            ..Default::default()
        };
        for voucher in &vouchers {
            match voucher.status_at(now) {
                VoucherStatus::Active => stats.active += 1,
                VoucherStatus::Redeemed => stats.redeemed += 1,
                VoucherStatus::Expired => stats.expired += 1,
            }
        }
        Ok(stats)
    }
}
