//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently. All id columns are TEXT UUIDs; timestamps are TEXT in
//! RFC 3339, date-only columns are TEXT in YYYY-MM-DD.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_tenant_users_table(pool).await?;
    create_breeding_plans_table(pool).await?;
    create_offspring_groups_table(pool).await?;
    create_offspring_table(pool).await?;
    create_offspring_group_events_table(pool).await?;
    Ok(())
}

/// Tenant membership with a per-tenant role
async fn create_tenant_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenant_users (
            tenant_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'MEMBER',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (tenant_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Breeding plans are owned by a separate domain; this service only reads
/// them, but the table lives here so a single database serves both.
async fn create_breeding_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS breeding_plans (
            guid TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name TEXT,
            species TEXT,
            dam_id TEXT,
            sire_id TEXT,
            dam_name TEXT,
            sire_name TEXT,
            expected_birth_date TEXT,
            locked_ovulation_date TEXT,
            committed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_breeding_plans_tenant ON breeding_plans (tenant_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_offspring_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offspring_groups (
            guid TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            plan_id TEXT,
            link_state TEXT NOT NULL DEFAULT 'orphan',
            name TEXT,
            species TEXT,
            dam_id TEXT,
            sire_id TEXT,
            expected_birth_on TEXT,
            actual_birth_on TEXT,
            born_count INTEGER NOT NULL DEFAULT 0,
            live_count INTEGER NOT NULL DEFAULT 0,
            stillborn_count INTEGER NOT NULL DEFAULT 0,
            male_count INTEGER NOT NULL DEFAULT 0,
            female_count INTEGER NOT NULL DEFAULT 0,
            weaned_count INTEGER NOT NULL DEFAULT 0,
            placed_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one group per (tenant, plan) when a plan is linked
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_offspring_groups_tenant_plan
        ON offspring_groups (tenant_id, plan_id)
        WHERE plan_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_offspring_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offspring (
            guid TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            group_id TEXT NOT NULL,
            name TEXT,
            sex TEXT,
            species TEXT,
            breed TEXT,
            born_at TEXT,
            life_state TEXT NOT NULL DEFAULT 'ALIVE',
            placement_state TEXT NOT NULL DEFAULT 'UNASSIGNED',
            keeper_intent TEXT NOT NULL DEFAULT 'AVAILABLE',
            financial_state TEXT NOT NULL DEFAULT 'NONE',
            paperwork_state TEXT NOT NULL DEFAULT 'NONE',
            died_at TEXT,
            placed_at TEXT,
            paid_in_full_at TEXT,
            contract_id TEXT,
            contract_signed_at TEXT,
            promoted_animal_id TEXT,
            buyer_party_id TEXT,
            deposit_cents INTEGER,
            price_cents INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (group_id) REFERENCES offspring_groups (guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_offspring_tenant_group ON offspring (tenant_id, group_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Append-only audit log of group linkage changes. Rows are never updated
/// or deleted; the group row remains the source of truth.
async fn create_offspring_group_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offspring_group_events (
            guid TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            offspring_group_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            field TEXT,
            before_json TEXT,
            after_json TEXT,
            notes TEXT,
            recorded_by TEXT,
            occurred_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_group_events_tenant_group
        ON offspring_group_events (tenant_id, offspring_group_id)
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
