// File: spinwheel-core/tests/repository_tests.rs
//
// Postgres-backed tests for the repositories and the end-to-end voucher
// flow. They need a live database (TEST_DATABASE_URL, defaulting to
// postgres://spinwheel@localhost/spinwheel_test) and are #[ignore]d so the
// default suite runs without one:
//
//     cargo test -- --ignored

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use spinwheel_common::models::tenant::TenantLimitOverride;
use spinwheel_common::models::voucher::{
    RedeemAttempt, RedemptionOutcome, ValidationFailure, ValidationOutcome, Voucher,
};
use spinwheel_common::traits::repository_traits::{
    LimitOverrideRepository, MonthlyUsageRepository, TenantRepository, VoucherRepository,
};
use spinwheel_core::qr::{fallback_qr_url, QrImageService};
use spinwheel_core::repositories::postgres::{
    PostgresLimitOverrideRepository, PostgresMonthlyUsageRepository, PostgresTenantRepository,
    PostgresVoucherRepository,
};
use spinwheel_core::services::{CreateVoucherParams, UsageService, VoucherService};
use spinwheel_core::test_utils::helpers::*;
use spinwheel_core::utils::clock::SystemClock;
use spinwheel_core::Error;

struct StubQr;

#[async_trait]
impl QrImageService for StubQr {
    async fn create_and_upload(&self, text: &str) -> String {
        fallback_qr_url(text)
    }
}

struct World {
    tenant_id: Uuid,
    user_id: Uuid,
    prize_id: Uuid,
    spin_id: Uuid,
}

/// Seed a tenant (with the given voucher limit), one customer, one prize,
/// and one winning spin.
async fn seed_world(
    pool: &sqlx::Pool<sqlx::Postgres>,
    slug: &str,
    vouchers_per_month: Option<i32>,
) -> Result<World, Error> {
    let tenant = seed_tenant(pool, slug, Some(1_000), vouchers_per_month).await?;
    let user_id = seed_customer(pool, tenant.tenant_id, "Dana", "+15550001111").await?;
    let prize_id = seed_prize(pool, tenant.tenant_id, "Free Coffee").await?;
    let spin_id = seed_spin(pool, tenant.tenant_id, user_id, prize_id).await?;
    Ok(World {
        tenant_id: tenant.tenant_id,
        user_id,
        prize_id,
        spin_id,
    })
}

fn voucher_row(code: &str, world: &World, expires_at: DateTime<Utc>, limit: i32) -> Voucher {
    Voucher {
        voucher_id: Uuid::new_v4(),
        code: code.to_string(),
        spin_id: world.spin_id,
        prize_id: world.prize_id,
        user_id: world.user_id,
        tenant_id: world.tenant_id,
        created_at: Utc::now(),
        expires_at,
        redemption_limit: limit,
        redemption_count: 0,
        is_redeemed: false,
        redeemed_at: None,
        redeemed_by: None,
        qr_image_url: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_voucher_repository_crud() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    let voucher = voucher_row(
        "ACME-CRUD2345678X",
        &world,
        Utc::now() + Duration::days(30),
        1,
    );
    repo.create_voucher(&voucher).await?;

    assert!(repo.code_exists("ACME-CRUD2345678X").await?);
    assert!(!repo.code_exists("ACME-NOSUCHCODEXX").await?);

    let fetched = repo
        .get_by_code("ACME-CRUD2345678X")
        .await?
        .expect("voucher should exist");
    assert_eq!(fetched.voucher_id, voucher.voucher_id);
    assert_eq!(fetched.redemption_count, 0);
    assert!(!fetched.is_redeemed);

    let detail = repo
        .get_detail_by_code("ACME-CRUD2345678X")
        .await?
        .expect("detail should exist");
    assert_eq!(detail.prize_name, "Free Coffee");
    assert_eq!(detail.customer_phone.as_deref(), Some("+15550001111"));

    let by_phone = repo.list_by_phone(world.tenant_id, "+15550001111").await?;
    assert_eq!(by_phone.len(), 1);

    let listed = repo.list_for_tenant(world.tenant_id).await?;
    assert_eq!(listed.len(), 1);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_voucher_search_filters() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    for code in ["ACME-AAAA2222BBBB", "ACME-CCCC3333DDDD"] {
        repo.create_voucher(&voucher_row(
            code,
            &world,
            Utc::now() + Duration::days(30),
            1,
        ))
        .await?;
    }

    // Case-insensitive substring over the code.
    let hits = repo
        .search_for_tenant(world.tenant_id, Some("aaaa".to_string()), None, None)
        .await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].voucher.code, "ACME-AAAA2222BBBB");

    // Phone substring matches every voucher of that customer.
    let hits = repo
        .search_for_tenant(world.tenant_id, Some("0001111".to_string()), None, None)
        .await?;
    assert_eq!(hits.len(), 2);

    // Creation-date window excluding everything.
    let hits = repo
        .search_for_tenant(
            world.tenant_id,
            None,
            Some(Utc::now() + Duration::days(1)),
            None,
        )
        .await?;
    assert!(hits.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_monthly_usage_counters() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresMonthlyUsageRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    // First touch lazily creates the row at zero.
    let row = repo.get_or_create_month(world.tenant_id, 6, 2025).await?;
    assert_eq!((row.spins_used, row.vouchers_used), (0, 0));

    for _ in 0..3 {
        repo.increment_spins(world.tenant_id, 6, 2025).await?;
    }
    repo.increment_vouchers(world.tenant_id, 6, 2025).await?;

    let row = repo
        .get_month(world.tenant_id, 6, 2025)
        .await?
        .expect("row should exist");
    assert_eq!(row.spins_used, 3);
    assert_eq!(row.vouchers_used, 1);

    // Increment works without a prior get-or-create as well.
    repo.increment_spins(world.tenant_id, 7, 2025).await?;
    let july = repo
        .get_month(world.tenant_id, 7, 2025)
        .await?
        .expect("row should exist");
    assert_eq!((july.spins_used, july.vouchers_used), (1, 0));

    repo.reset_month(world.tenant_id, 6, 2025).await?;
    let row = repo
        .get_month(world.tenant_id, 6, 2025)
        .await?
        .expect("row should exist");
    assert_eq!((row.spins_used, row.vouchers_used), (0, 0));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_month_rollover_keeps_history() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresMonthlyUsageRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    for _ in 0..5 {
        repo.increment_spins(world.tenant_id, 5, 2025).await?;
    }

    // The next month has no row until first touch, and starts at zero.
    assert!(repo.get_month(world.tenant_id, 6, 2025).await?.is_none());
    let june = repo.get_or_create_month(world.tenant_id, 6, 2025).await?;
    assert_eq!(june.spins_used, 0);

    // The old month's row is unchanged history.
    let may = repo
        .get_month(world.tenant_id, 5, 2025)
        .await?
        .expect("history should remain");
    assert_eq!(may.spins_used, 5);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_concurrent_increments_lose_nothing() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = PostgresMonthlyUsageRepository::new(db.pool().clone());
        let tenant_id = world.tenant_id;
        handles.push(tokio::spawn(async move {
            repo.increment_spins(tenant_id, 6, 2025).await
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic")?;
    }

    let repo = PostgresMonthlyUsageRepository::new(db.pool().clone());
    let row = repo
        .get_month(world.tenant_id, 6, 2025)
        .await?
        .expect("row should exist");
    assert_eq!(row.spins_used, 10);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_redeem_transition_multi_use() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;
    let merchant = Uuid::new_v4();

    repo.create_voucher(&voucher_row(
        "ACME-MULTI222333X",
        &world,
        Utc::now() + Duration::days(30),
        3,
    ))
    .await?;

    // Two of three uses: counter moves, flag stays down.
    for expected_count in 1..=2 {
        match repo
            .redeem_guarded("ACME-MULTI222333X", world.tenant_id, merchant, Utc::now())
            .await?
        {
            RedeemAttempt::Redeemed(v) => {
                assert_eq!(v.redemption_count, expected_count);
                assert!(!v.is_redeemed);
                assert_eq!(v.redeemed_by, Some(merchant));
                assert!(v.redeemed_at.is_some());
            }
            RedeemAttempt::Blocked(reason) => panic!("unexpected block: {reason:?}"),
        }
    }

    // The last use flips the flag.
    match repo
        .redeem_guarded("ACME-MULTI222333X", world.tenant_id, merchant, Utc::now())
        .await?
    {
        RedeemAttempt::Redeemed(v) => {
            assert_eq!(v.redemption_count, 3);
            assert!(v.is_redeemed);
        }
        RedeemAttempt::Blocked(reason) => panic!("unexpected block: {reason:?}"),
    }

    // And the one after that is refused with no write.
    match repo
        .redeem_guarded("ACME-MULTI222333X", world.tenant_id, merchant, Utc::now())
        .await?
    {
        RedeemAttempt::Blocked(ValidationFailure::Redeemed { .. }) => {}
        other => panic!("expected redeemed block, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_redeem_race_yields_single_success() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;

    repo.create_voucher(&voucher_row(
        "ACME-RACE22233344",
        &world,
        Utc::now() + Duration::days(30),
        1,
    ))
    .await?;

    let (a, b) = tokio::join!(
        repo.redeem_guarded(
            "ACME-RACE22233344",
            world.tenant_id,
            Uuid::new_v4(),
            Utc::now()
        ),
        repo.redeem_guarded(
            "ACME-RACE22233344",
            world.tenant_id,
            Uuid::new_v4(),
            Utc::now()
        ),
    );

    let outcomes = [a?, b?];
    let successes = outcomes
        .iter()
        .filter(|o| matches!(o, RedeemAttempt::Redeemed(_)))
        .count();
    assert_eq!(successes, 1, "exactly one of two racers may win");

    let v = repo
        .get_by_code("ACME-RACE22233344")
        .await?
        .expect("voucher should exist");
    assert_eq!(v.redemption_count, 1);
    assert!(v.is_redeemed);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_tenant_isolation_on_redeem() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;
    let other = seed_world(db.pool(), "other-shop", Some(100)).await?;

    repo.create_voucher(&voucher_row(
        "ACME-ISOLATE22334",
        &world,
        Utc::now() + Duration::days(30),
        1,
    ))
    .await?;

    match repo
        .redeem_guarded(
            "ACME-ISOLATE22334",
            other.tenant_id,
            Uuid::new_v4(),
            Utc::now(),
        )
        .await?
    {
        RedeemAttempt::Blocked(ValidationFailure::WrongTenant) => {}
        other => panic!("expected wrong_tenant block, got {other:?}"),
    }

    // Nothing was written.
    let v = repo
        .get_by_code("ACME-ISOLATE22334")
        .await?
        .expect("voucher should exist");
    assert_eq!(v.redemption_count, 0);
    assert!(!v.is_redeemed);
    assert!(v.redeemed_at.is_none());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_limit_override_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresLimitOverrideRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(100)).await?;
    let now = Utc::now();

    let permanent = TenantLimitOverride {
        override_id: Uuid::new_v4(),
        tenant_id: world.tenant_id,
        bonus_spins: 100,
        bonus_vouchers: 10,
        is_active: true,
        expires_at: None,
        reason: Some("launch promo".to_string()),
        granted_by: Some("support".to_string()),
        created_at: now,
    };
    let lapsed = TenantLimitOverride {
        override_id: Uuid::new_v4(),
        expires_at: Some(now - Duration::days(1)),
        ..permanent.clone()
    };
    repo.grant(&permanent).await?;
    repo.grant(&lapsed).await?;

    assert_eq!(repo.list_for_tenant(world.tenant_id).await?.len(), 2);

    let active = repo.list_active(world.tenant_id, now).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].override_id, permanent.override_id);

    repo.deactivate(permanent.override_id).await?;
    assert!(repo.list_active(world.tenant_id, now).await?.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_tenant_repository_plan_lookup() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresTenantRepository::new(db.pool().clone());
    let world = seed_world(db.pool(), "acme-shop", Some(50)).await?;

    let tenant = repo
        .get_tenant(world.tenant_id)
        .await?
        .expect("tenant should exist");
    assert_eq!(tenant.slug, "acme-shop");

    let by_slug = repo
        .get_tenant_by_slug("ACME-SHOP")
        .await?
        .expect("slug lookup is case-insensitive");
    assert_eq!(by_slug.tenant_id, world.tenant_id);

    let plan = repo
        .get_plan_for_tenant(world.tenant_id)
        .await?
        .expect("plan should exist");
    assert_eq!(plan.vouchers_per_month.into_column(), Some(50));

    assert!(repo.get_tenant(Uuid::new_v4()).await?.is_none());
    assert!(repo.get_plan_for_tenant(Uuid::new_v4()).await?.is_none());

    Ok(())
}

fn wire_services(db: &spinwheel_core::Database) -> (Arc<UsageService>, VoucherService) {
    let pool = db.pool().clone();
    let clock = Arc::new(SystemClock);
    let usage = Arc::new(UsageService::new(
        Arc::new(PostgresMonthlyUsageRepository::new(pool.clone())),
        Arc::new(PostgresTenantRepository::new(pool.clone())),
        Arc::new(PostgresLimitOverrideRepository::new(pool.clone())),
        clock.clone(),
    ));
    let vouchers = VoucherService::new(
        Arc::new(PostgresVoucherRepository::new(pool)),
        usage.clone(),
        Arc::new(StubQr),
        clock,
    );
    (usage, vouchers)
}

#[tokio::test]
#[ignore]
async fn test_voucher_service_happy_path() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let world = seed_world(db.pool(), "acme-shop", Some(10)).await?;
    let (usage, vouchers) = wire_services(&db);
    let merchant = Uuid::new_v4();

    let voucher = vouchers
        .create(CreateVoucherParams {
            spin_id: world.spin_id,
            prize_id: world.prize_id,
            user_id: world.user_id,
            tenant_id: world.tenant_id,
            tenant_slug: "acme-shop".to_string(),
            validity_days: 30,
            redemption_limit: 1,
            generate_qr: false,
        })
        .await?;
    assert!(voucher.code.starts_with("ACME-"));
    assert_eq!(voucher.code.len(), 17);

    // The creation was counted against the month.
    let month = usage.get_or_create_current_month(world.tenant_id).await?;
    assert_eq!(month.vouchers_used, 1);

    match vouchers.validate(&voucher.code, world.tenant_id).await? {
        ValidationOutcome::Valid { voucher: summary } => {
            assert_eq!(summary.prize_name, "Free Coffee");
        }
        other => panic!("expected valid, got {other:?}"),
    }

    match vouchers
        .redeem(&voucher.code, merchant, world.tenant_id)
        .await?
    {
        RedemptionOutcome::Success { voucher: redeemed } => {
            assert_eq!(redeemed.redemption_count, 1);
            assert!(redeemed.is_redeemed);
            assert_eq!(redeemed.redeemed_by, Some(merchant));
        }
        other => panic!("expected success, got {other:?}"),
    }

    match vouchers
        .redeem(&voucher.code, merchant, world.tenant_id)
        .await?
    {
        RedemptionOutcome::Failure { error } => {
            assert_eq!(error, "Voucher already redeemed");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_create_denied_when_month_is_spent() -> Result<(), Error> {
    let db = setup_test_database().await?;
    // A plan with no voucher allowance at all.
    let world = seed_world(db.pool(), "acme-shop", Some(0)).await?;
    let (_usage, vouchers) = wire_services(&db);

    let err = vouchers
        .create(CreateVoucherParams {
            spin_id: world.spin_id,
            prize_id: world.prize_id,
            user_id: world.user_id,
            tenant_id: world.tenant_id,
            tenant_slug: "acme-shop".to_string(),
            validity_days: 30,
            redemption_limit: 1,
            generate_qr: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LimitExceeded { .. }));

    // No voucher row and no usage were left behind.
    let repo = PostgresVoucherRepository::new(db.pool().clone());
    assert!(repo.list_for_tenant(world.tenant_id).await?.is_empty());

    Ok(())
}
