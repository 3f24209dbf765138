// File: spinwheel-core/src/test_utils/helpers.rs

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use spinwheel_common::models::tenant::Tenant;
use spinwheel_common::models::voucher::Voucher;

use crate::utils::clock::Clock;
use crate::{Database, Error};

/// Create a connection pool to the test DB.
/// By default looks for `TEST_DATABASE_URL` in env,
/// else uses `postgres://spinwheel@localhost/spinwheel_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://spinwheel@localhost/spinwheel_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    Ok(pool)
}

/// Wipes out test data so each test can start fresh.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            vouchers,
            spins,
            prizes,
            users,
            monthly_usage,
            tenant_limit_overrides,
            tenants,
            subscription_plans
        RESTART IDENTITY CASCADE;
    "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns a fully migrated, emptied Database.
pub async fn setup_test_database() -> Result<Database, Error> {
    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;
    Ok(db)
}

/// Settable clock for steering month rollovers and expiry without sleeping.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Insert a plan + tenant pair and return the tenant. `None` limits mean
/// unlimited.
pub async fn seed_tenant(
    pool: &Pool<Postgres>,
    slug: &str,
    spins_per_month: Option<i32>,
    vouchers_per_month: Option<i32>,
) -> Result<Tenant, Error> {
    let plan_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO subscription_plans (plan_id, name, spins_per_month, vouchers_per_month)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(plan_id)
    .bind(format!("{slug}-plan"))
    .bind(spins_per_month)
    .bind(vouchers_per_month)
    .execute(pool)
    .await?;

    let tenant = Tenant {
        tenant_id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: slug.to_string(),
        plan_id: Some(plan_id),
        created_at: Utc::now(),
    };
    sqlx::query(
        r#"
        INSERT INTO tenants (tenant_id, slug, name, plan_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(tenant.tenant_id)
    .bind(&tenant.slug)
    .bind(&tenant.name)
    .bind(tenant.plan_id)
    .bind(tenant.created_at)
    .execute(pool)
    .await?;

    Ok(tenant)
}

pub async fn seed_customer(
    pool: &Pool<Postgres>,
    tenant_id: Uuid,
    name: &str,
    phone: &str,
) -> Result<Uuid, Error> {
    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (user_id, tenant_id, display_name, phone, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(tenant_id)
    .bind(name)
    .bind(phone)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(user_id)
}

pub async fn seed_prize(
    pool: &Pool<Postgres>,
    tenant_id: Uuid,
    name: &str,
) -> Result<Uuid, Error> {
    let prize_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO prizes (prize_id, tenant_id, name, description, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(prize_id)
    .bind(tenant_id)
    .bind(name)
    .bind(format!("{name} prize"))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(prize_id)
}

pub async fn seed_spin(
    pool: &Pool<Postgres>,
    tenant_id: Uuid,
    user_id: Uuid,
    prize_id: Uuid,
) -> Result<Uuid, Error> {
    let spin_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO spins (spin_id, tenant_id, user_id, prize_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(spin_id)
    .bind(tenant_id)
    .bind(user_id)
    .bind(prize_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(spin_id)
}

/// An unredeemed voucher value for rule tests; tweak fields as needed.
pub fn make_voucher(tenant_id: Uuid, expires_at: DateTime<Utc>, redemption_limit: i32) -> Voucher {
    Voucher {
        voucher_id: Uuid::new_v4(),
        code: "TEST-ABCDEFGHJKMN".to_string(),
        spin_id: Uuid::new_v4(),
        prize_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        tenant_id,
        created_at: expires_at - Duration::days(30),
        expires_at,
        redemption_limit,
        redemption_count: 0,
        is_redeemed: false,
        redeemed_at: None,
        redeemed_by: None,
        qr_image_url: None,
    }
}
