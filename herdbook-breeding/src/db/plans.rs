//! Breeding plan reads
//!
//! Plans are owned by a separate domain; this service only reads them to
//! drive linkage and suggestions, and never mutates a plan row.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

use crate::db::parse_opt_datetime;
use crate::Result;
use herdbook_common::uuid_utils;

/// Gestation length used to derive an expected birth date from a locked
/// ovulation date when the plan carries no explicit expectation.
pub const GESTATION_DAYS: i64 = 63;

/// A breeding plan as read from the plans table
#[derive(Debug, Clone, Serialize)]
pub struct BreedingPlan {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: Option<String>,
    pub species: Option<String>,
    pub dam_id: Option<Uuid>,
    pub sire_id: Option<Uuid>,
    pub dam_name: Option<String>,
    pub sire_name: Option<String>,
    pub expected_birth_date: Option<DateTime<Utc>>,
    pub locked_ovulation_date: Option<DateTime<Utc>>,
    pub committed: bool,
}

impl BreedingPlan {
    /// Best-known expected birth: the explicit expectation when present,
    /// else locked ovulation plus gestation, else unknown.
    pub fn resolved_expected_birth(&self) -> Option<DateTime<Utc>> {
        self.expected_birth_date
            .or_else(|| self.locked_ovulation_date.map(|d| d + Duration::days(GESTATION_DAYS)))
    }
}

fn plan_from_row(row: &SqliteRow) -> Result<BreedingPlan> {
    Ok(BreedingPlan {
        id: uuid_utils::parse_column(&row.get::<String, _>("guid"))?,
        tenant_id: uuid_utils::parse_column(&row.get::<String, _>("tenant_id"))?,
        name: row.get("name"),
        species: row.get("species"),
        dam_id: uuid_utils::parse_optional_column(row.get("dam_id"))?,
        sire_id: uuid_utils::parse_optional_column(row.get("sire_id"))?,
        dam_name: row.get("dam_name"),
        sire_name: row.get("sire_name"),
        expected_birth_date: parse_opt_datetime(row.get("expected_birth_date"))?,
        locked_ovulation_date: parse_opt_datetime(row.get("locked_ovulation_date"))?,
        committed: row.get::<i64, _>("committed") != 0,
    })
}

/// Get one plan scoped to the tenant
pub async fn get_plan<'e, E>(executor: E, tenant_id: Uuid, plan_id: Uuid) -> Result<Option<BreedingPlan>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT guid, tenant_id, name, species, dam_id, sire_id, dam_name, sire_name,
               expected_birth_date, locked_ovulation_date, committed
        FROM breeding_plans
        WHERE guid = ? AND tenant_id = ?
        "#,
    )
    .bind(plan_id.to_string())
    .bind(tenant_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(plan_from_row).transpose()
}

/// List committed plans for the tenant, in insertion order. Used as the
/// candidate pool for link suggestions.
pub async fn list_committed_plans<'e, E>(executor: E, tenant_id: Uuid) -> Result<Vec<BreedingPlan>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT guid, tenant_id, name, species, dam_id, sire_id, dam_name, sire_name,
               expected_birth_date, locked_ovulation_date, committed
        FROM breeding_plans
        WHERE tenant_id = ? AND committed = 1
        ORDER BY created_at, guid
        "#,
    )
    .bind(tenant_id.to_string())
    .fetch_all(executor)
    .await?;

    rows.iter().map(plan_from_row).collect()
}
