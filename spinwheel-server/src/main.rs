// File: spinwheel-server/src/main.rs
//
// Thin HTTP layer over the voucher/usage services. No business rules live
// here, only request/response mapping; see spinwheel-core for the rules.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use spinwheel_common::models::voucher::{
    RedemptionOutcome, ValidationOutcome, Voucher, VoucherFilters, VoucherPage, VoucherStats,
    VoucherStatus, VoucherWithStatus,
};
use spinwheel_common::models::usage::UsageWithTrend;
use spinwheel_core::qr::HttpQrImageService;
use spinwheel_core::repositories::postgres::{
    PostgresLimitOverrideRepository, PostgresMonthlyUsageRepository, PostgresTenantRepository,
    PostgresVoucherRepository,
};
use spinwheel_core::services::{CreateVoucherParams, UsageService, VoucherService};
use spinwheel_core::utils::clock::SystemClock;
use spinwheel_core::{Database, Error};

#[derive(Parser, Debug, Clone)]
#[command(name = "spinwheel")]
#[command(author, version, about = "Spinwheel - multi-tenant spin-to-win voucher service")]
struct Args {
    /// Address to which the server will bind
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// Postgres connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://spinwheel@localhost:5432/spinwheel"
    )]
    db_url: String,

    /// QR image uploader endpoint; omitted = public fallback URLs only.
    #[arg(long, env = "QR_UPLOAD_URL")]
    qr_upload_url: Option<String>,
}

#[derive(Clone)]
struct AppState {
    vouchers: Arc<VoucherService>,
    usage: Arc<UsageService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let db = Database::new(&args.db_url).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    let clock = Arc::new(SystemClock);
    let usage = Arc::new(UsageService::new(
        Arc::new(PostgresMonthlyUsageRepository::new(pool.clone())),
        Arc::new(PostgresTenantRepository::new(pool.clone())),
        Arc::new(PostgresLimitOverrideRepository::new(pool.clone())),
        clock.clone(),
    ));
    let vouchers = Arc::new(VoucherService::new(
        Arc::new(PostgresVoucherRepository::new(pool.clone())),
        usage.clone(),
        Arc::new(HttpQrImageService::new(args.qr_upload_url.clone())),
        clock,
    ));

    let app = Router::new()
        .route("/vouchers", post(create_voucher).get(list_vouchers))
        .route("/vouchers/validate", post(validate_voucher))
        .route("/vouchers/redeem", post(redeem_voucher))
        .route("/vouchers/by-phone", get(vouchers_by_phone))
        .route("/vouchers/stats", get(voucher_stats))
        .route("/usage", get(usage_with_trend))
        .route("/usage/reset", post(reset_usage))
        .with_state(AppState { vouchers, usage });

    let addr: SocketAddr = args.bind_addr.parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

type ApiError = (StatusCode, Json<Value>);

fn request_error(e: Error) -> ApiError {
    match e {
        Error::LimitExceeded { .. } => {
            (StatusCode::FORBIDDEN, Json(json!({ "error": e.to_string() })))
        }
        Error::TenantNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() })))
        }
        other => {
            error!("request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateVoucherRequest {
    spin_id: Uuid,
    prize_id: Uuid,
    user_id: Uuid,
    tenant_id: Uuid,
    tenant_slug: String,
    validity_days: u32,
    redemption_limit: i32,
    #[serde(default)]
    generate_qr: bool,
}

async fn create_voucher(
    State(state): State<AppState>,
    Json(req): Json<CreateVoucherRequest>,
) -> Result<Json<Voucher>, ApiError> {
    let voucher = state
        .vouchers
        .create(CreateVoucherParams {
            spin_id: req.spin_id,
            prize_id: req.prize_id,
            user_id: req.user_id,
            tenant_id: req.tenant_id,
            tenant_slug: req.tenant_slug,
            validity_days: req.validity_days,
            redemption_limit: req.redemption_limit,
            generate_qr: req.generate_qr,
        })
        .await
        .map_err(request_error)?;

    Ok(Json(voucher))
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    code: String,
    tenant_id: Uuid,
}

async fn validate_voucher(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .vouchers
        .validate(&req.code, req.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(match outcome {
        ValidationOutcome::Valid { voucher } => json!({ "valid": true, "voucher": voucher }),
        ValidationOutcome::Invalid { reason } => {
            let mut body = serde_json::to_value(&reason).map_err(|e| request_error(e.into()))?;
            body["valid"] = json!(false);
            body
        }
    }))
}

#[derive(Debug, Deserialize)]
struct RedeemRequest {
    code: String,
    merchant_id: Uuid,
    tenant_id: Uuid,
}

async fn redeem_voucher(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .vouchers
        .redeem(&req.code, req.merchant_id, req.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(match outcome {
        RedemptionOutcome::Success { voucher } => json!({ "success": true, "voucher": voucher }),
        RedemptionOutcome::Failure { error } => json!({ "success": false, "error": error }),
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tenant_id: Uuid,
    status: Option<VoucherStatus>,
    search: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_vouchers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<VoucherPage>, ApiError> {
    let page = state
        .vouchers
        .list(
            query.tenant_id,
            VoucherFilters {
                status: query.status,
                search: query.search,
                start_date: query.start_date,
                end_date: query.end_date,
                page: query.page,
                limit: query.limit,
            },
        )
        .await
        .map_err(request_error)?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct PhoneQuery {
    tenant_id: Uuid,
    phone: String,
}

async fn vouchers_by_phone(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<Vec<VoucherWithStatus>>, ApiError> {
    let vouchers = state
        .vouchers
        .vouchers_by_phone(&query.phone, query.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(vouchers))
}

#[derive(Debug, Deserialize)]
struct TenantQuery {
    tenant_id: Uuid,
}

async fn voucher_stats(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<VoucherStats>, ApiError> {
    let stats = state
        .vouchers
        .stats(query.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(stats))
}

async fn usage_with_trend(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<UsageWithTrend>, ApiError> {
    let report = state
        .usage
        .usage_with_trend(query.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(report))
}

async fn reset_usage(
    State(state): State<AppState>,
    Json(req): Json<TenantQuery>,
) -> Result<Json<Value>, ApiError> {
    state
        .usage
        .reset_usage(req.tenant_id)
        .await
        .map_err(request_error)?;

    Ok(Json(json!({ "success": true })))
}
