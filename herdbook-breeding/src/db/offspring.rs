//! Offspring reads and writes
//!
//! Every mutation funnels through the state normalizer: a row is loaded,
//! the patch is resolved against it, and only the fully explicit result
//! is persisted. Nothing else in the service writes status columns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::parse_opt_datetime;
use crate::offspring::{
    normalize, FinancialState, KeeperIntent, LifeState, OffspringPatch, OffspringState,
    PaperworkState, PlacementState,
};
use crate::{Error, Result};
use herdbook_common::uuid_utils;

/// One individual animal in an offspring group
#[derive(Debug, Clone, Serialize)]
pub struct OffspringRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub group_id: Uuid,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub born_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: OffspringState,
}

fn status_column<T>(raw: &str, parsed: Option<T>) -> Result<T> {
    parsed.ok_or_else(|| Error::Internal(format!("Unknown status column value '{}'", raw)))
}

fn offspring_from_row(row: &SqliteRow) -> Result<OffspringRecord> {
    let life_raw: String = row.get("life_state");
    let placement_raw: String = row.get("placement_state");
    let keeper_raw: String = row.get("keeper_intent");
    let financial_raw: String = row.get("financial_state");
    let paperwork_raw: String = row.get("paperwork_state");

    let state = OffspringState {
        life: status_column(&life_raw, LifeState::parse(&life_raw))?,
        placement: status_column(&placement_raw, PlacementState::parse(&placement_raw))?,
        keeper: status_column(&keeper_raw, KeeperIntent::parse(&keeper_raw))?,
        financial: status_column(&financial_raw, FinancialState::parse(&financial_raw))?,
        paperwork: status_column(&paperwork_raw, PaperworkState::parse(&paperwork_raw))?,
        died_at: parse_opt_datetime(row.get("died_at"))?,
        placed_at: parse_opt_datetime(row.get("placed_at"))?,
        paid_in_full_at: parse_opt_datetime(row.get("paid_in_full_at"))?,
        contract_id: uuid_utils::parse_optional_column(row.get("contract_id"))?,
        contract_signed_at: parse_opt_datetime(row.get("contract_signed_at"))?,
        promoted_animal_id: uuid_utils::parse_optional_column(row.get("promoted_animal_id"))?,
        buyer_party_id: uuid_utils::parse_optional_column(row.get("buyer_party_id"))?,
        deposit_cents: row.get("deposit_cents"),
        price_cents: row.get("price_cents"),
    };

    Ok(OffspringRecord {
        id: uuid_utils::parse_column(&row.get::<String, _>("guid"))?,
        tenant_id: uuid_utils::parse_column(&row.get::<String, _>("tenant_id"))?,
        group_id: uuid_utils::parse_column(&row.get::<String, _>("group_id"))?,
        name: row.get("name"),
        sex: row.get("sex"),
        species: row.get("species"),
        breed: row.get("breed"),
        born_at: parse_opt_datetime(row.get("born_at"))?,
        state,
    })
}

const OFFSPRING_COLUMNS: &str = r#"
    guid, tenant_id, group_id, name, sex, species, breed, born_at,
    life_state, placement_state, keeper_intent, financial_state, paperwork_state,
    died_at, placed_at, paid_in_full_at, contract_id, contract_signed_at,
    promoted_animal_id, buyer_party_id, deposit_cents, price_cents
"#;

/// Get one offspring scoped to the tenant
pub async fn get_offspring<'e, E>(
    executor: E,
    tenant_id: Uuid,
    offspring_id: Uuid,
) -> Result<Option<OffspringRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM offspring WHERE guid = ? AND tenant_id = ?",
        OFFSPRING_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(offspring_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(offspring_from_row).transpose()
}

/// List a group's offspring in insertion order
pub async fn list_for_group<'e, E>(
    executor: E,
    tenant_id: Uuid,
    group_id: Uuid,
) -> Result<Vec<OffspringRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM offspring WHERE group_id = ? AND tenant_id = ? ORDER BY created_at, guid",
        OFFSPRING_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(group_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(offspring_from_row).collect()
}

async fn insert_offspring<'e, E>(executor: E, record: &OffspringRecord) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO offspring (
            guid, tenant_id, group_id, name, sex, species, breed, born_at,
            life_state, placement_state, keeper_intent, financial_state, paperwork_state,
            died_at, placed_at, paid_in_full_at, contract_id, contract_signed_at,
            promoted_animal_id, buyer_party_id, deposit_cents, price_cents
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.tenant_id.to_string())
    .bind(record.group_id.to_string())
    .bind(&record.name)
    .bind(&record.sex)
    .bind(&record.species)
    .bind(&record.breed)
    .bind(record.born_at.map(|dt| dt.to_rfc3339()))
    .bind(record.state.life.as_str())
    .bind(record.state.placement.as_str())
    .bind(record.state.keeper.as_str())
    .bind(record.state.financial.as_str())
    .bind(record.state.paperwork.as_str())
    .bind(record.state.died_at.map(|dt| dt.to_rfc3339()))
    .bind(record.state.placed_at.map(|dt| dt.to_rfc3339()))
    .bind(record.state.paid_in_full_at.map(|dt| dt.to_rfc3339()))
    .bind(record.state.contract_id.map(|id| id.to_string()))
    .bind(record.state.contract_signed_at.map(|dt| dt.to_rfc3339()))
    .bind(record.state.promoted_animal_id.map(|id| id.to_string()))
    .bind(record.state.buyer_party_id.map(|id| id.to_string()))
    .bind(record.state.deposit_cents)
    .bind(record.state.price_cents)
    .execute(executor)
    .await?;
    Ok(())
}

async fn update_state<'e, E>(
    executor: E,
    tenant_id: Uuid,
    offspring_id: Uuid,
    state: &OffspringState,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE offspring
        SET life_state = ?, placement_state = ?, keeper_intent = ?,
            financial_state = ?, paperwork_state = ?, died_at = ?, placed_at = ?,
            paid_in_full_at = ?, contract_id = ?, contract_signed_at = ?,
            promoted_animal_id = ?, buyer_party_id = ?, deposit_cents = ?,
            price_cents = ?, updated_at = ?
        WHERE guid = ? AND tenant_id = ?
        "#,
    )
    .bind(state.life.as_str())
    .bind(state.placement.as_str())
    .bind(state.keeper.as_str())
    .bind(state.financial.as_str())
    .bind(state.paperwork.as_str())
    .bind(state.died_at.map(|dt| dt.to_rfc3339()))
    .bind(state.placed_at.map(|dt| dt.to_rfc3339()))
    .bind(state.paid_in_full_at.map(|dt| dt.to_rfc3339()))
    .bind(state.contract_id.map(|id| id.to_string()))
    .bind(state.contract_signed_at.map(|dt| dt.to_rfc3339()))
    .bind(state.promoted_animal_id.map(|id| id.to_string()))
    .bind(state.buyer_party_id.map(|id| id.to_string()))
    .bind(state.deposit_cents)
    .bind(state.price_cents)
    .bind(Utc::now().to_rfc3339())
    .bind(offspring_id.to_string())
    .bind(tenant_id.to_string())
    .execute(executor)
    .await?;
    Ok(())
}

/// Identity fields supplied when recording a new individual
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct NewOffspring {
    pub name: Option<String>,
    pub sex: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub born_at: Option<DateTime<Utc>>,
}

/// Record a new individual in a group. The initial status runs through
/// the normalizer with no current state, so defaults and forcings apply
/// from the first write.
pub async fn create_offspring(
    pool: &SqlitePool,
    tenant_id: Uuid,
    group_id: Uuid,
    identity: NewOffspring,
    patch: &OffspringPatch,
    now: DateTime<Utc>,
) -> Result<OffspringRecord> {
    let mut tx = pool.begin().await?;

    crate::db::groups::get_group(&mut *tx, tenant_id, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;

    let state = normalize(None, patch, now)?;
    let record = OffspringRecord {
        id: uuid_utils::generate(),
        tenant_id,
        group_id,
        name: identity.name,
        sex: identity.sex,
        species: identity.species,
        breed: identity.breed,
        born_at: identity.born_at,
        state,
    };
    insert_offspring(&mut *tx, &record).await?;
    tx.commit().await?;

    tracing::debug!(offspring_id = %record.id, group_id = %group_id, "Recorded offspring");
    Ok(record)
}

/// Apply a status patch to an existing individual. Load, normalize, and
/// persist happen inside one transaction; an invariant violation rolls
/// everything back.
pub async fn apply_patch(
    pool: &SqlitePool,
    tenant_id: Uuid,
    offspring_id: Uuid,
    patch: &OffspringPatch,
    now: DateTime<Utc>,
) -> Result<OffspringRecord> {
    let mut tx = pool.begin().await?;

    let mut record = get_offspring(&mut *tx, tenant_id, offspring_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("offspring {}", offspring_id)))?;

    let state = normalize(Some(&record.state), patch, now)?;
    update_state(&mut *tx, tenant_id, offspring_id, &state).await?;
    tx.commit().await?;

    record.state = state;
    Ok(record)
}
