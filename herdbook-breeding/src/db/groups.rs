//! Offspring group reads and writes
//!
//! A group is one litter/clutch. It is either linked to exactly one
//! breeding plan or an orphan; the UNIQUE(tenant_id, plan_id) index in
//! the schema backs the at-most-one-group-per-plan invariant.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

use crate::db::parse_opt_date;
use crate::Result;
use herdbook_common::uuid_utils;

/// Whether the group is associated with a breeding plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Linked,
    Orphan,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Linked => "linked",
            LinkState::Orphan => "orphan",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linked" => Some(LinkState::Linked),
            "orphan" => Some(LinkState::Orphan),
            _ => None,
        }
    }
}

/// One litter/clutch row. The aggregate counts are denormalized summary
/// fields recorded at birth; per-individual accounting is done separately
/// by the summarizer.
#[derive(Debug, Clone, Serialize)]
pub struct OffspringGroup {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub link_state: LinkState,
    pub name: Option<String>,
    pub species: Option<String>,
    pub dam_id: Option<Uuid>,
    pub sire_id: Option<Uuid>,
    pub expected_birth_on: Option<NaiveDate>,
    pub actual_birth_on: Option<NaiveDate>,
    pub born_count: i64,
    pub live_count: i64,
    pub stillborn_count: i64,
    pub male_count: i64,
    pub female_count: i64,
    pub weaned_count: i64,
    pub placed_count: i64,
}

impl OffspringGroup {
    /// Fresh orphan group with zeroed counts
    pub fn new(tenant_id: Uuid) -> Self {
        OffspringGroup {
            id: uuid_utils::generate(),
            tenant_id,
            plan_id: None,
            link_state: LinkState::Orphan,
            name: None,
            species: None,
            dam_id: None,
            sire_id: None,
            expected_birth_on: None,
            actual_birth_on: None,
            born_count: 0,
            live_count: 0,
            stillborn_count: 0,
            male_count: 0,
            female_count: 0,
            weaned_count: 0,
            placed_count: 0,
        }
    }

    /// Best-known birth date for scoring: expectation first, else the
    /// recorded actual date.
    pub fn best_known_birth(&self) -> Option<NaiveDate> {
        self.expected_birth_on.or(self.actual_birth_on)
    }
}

fn group_from_row(row: &SqliteRow) -> Result<OffspringGroup> {
    let link_state_raw: String = row.get("link_state");
    let link_state = LinkState::parse(&link_state_raw).unwrap_or(LinkState::Orphan);
    Ok(OffspringGroup {
        id: uuid_utils::parse_column(&row.get::<String, _>("guid"))?,
        tenant_id: uuid_utils::parse_column(&row.get::<String, _>("tenant_id"))?,
        plan_id: uuid_utils::parse_optional_column(row.get("plan_id"))?,
        link_state,
        name: row.get("name"),
        species: row.get("species"),
        dam_id: uuid_utils::parse_optional_column(row.get("dam_id"))?,
        sire_id: uuid_utils::parse_optional_column(row.get("sire_id"))?,
        expected_birth_on: parse_opt_date(row.get("expected_birth_on"))?,
        actual_birth_on: parse_opt_date(row.get("actual_birth_on"))?,
        born_count: row.get("born_count"),
        live_count: row.get("live_count"),
        stillborn_count: row.get("stillborn_count"),
        male_count: row.get("male_count"),
        female_count: row.get("female_count"),
        weaned_count: row.get("weaned_count"),
        placed_count: row.get("placed_count"),
    })
}

const GROUP_COLUMNS: &str = r#"
    guid, tenant_id, plan_id, link_state, name, species, dam_id, sire_id,
    expected_birth_on, actual_birth_on, born_count, live_count,
    stillborn_count, male_count, female_count, weaned_count, placed_count
"#;

/// Get one group scoped to the tenant
pub async fn get_group<'e, E>(executor: E, tenant_id: Uuid, group_id: Uuid) -> Result<Option<OffspringGroup>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM offspring_groups WHERE guid = ? AND tenant_id = ?",
        GROUP_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(group_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(group_from_row).transpose()
}

/// Get the group linked to a plan, if any
pub async fn get_group_by_plan<'e, E>(
    executor: E,
    tenant_id: Uuid,
    plan_id: Uuid,
) -> Result<Option<OffspringGroup>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM offspring_groups WHERE plan_id = ? AND tenant_id = ?",
        GROUP_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(plan_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(group_from_row).transpose()
}

/// Insert a new group row
pub async fn insert_group<'e, E>(executor: E, group: &OffspringGroup) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO offspring_groups (
            guid, tenant_id, plan_id, link_state, name, species, dam_id, sire_id,
            expected_birth_on, actual_birth_on, born_count, live_count,
            stillborn_count, male_count, female_count, weaned_count, placed_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(group.id.to_string())
    .bind(group.tenant_id.to_string())
    .bind(group.plan_id.map(|id| id.to_string()))
    .bind(group.link_state.as_str())
    .bind(&group.name)
    .bind(&group.species)
    .bind(group.dam_id.map(|id| id.to_string()))
    .bind(group.sire_id.map(|id| id.to_string()))
    .bind(group.expected_birth_on.map(|d| d.to_string()))
    .bind(group.actual_birth_on.map(|d| d.to_string()))
    .bind(group.born_count)
    .bind(group.live_count)
    .bind(group.stillborn_count)
    .bind(group.male_count)
    .bind(group.female_count)
    .bind(group.weaned_count)
    .bind(group.placed_count)
    .execute(executor)
    .await?;
    Ok(())
}

/// Update the linkage-owned columns of a group (plan association, link
/// state, and the backfillable descriptive fields).
pub async fn update_group_linkage<'e, E>(executor: E, group: &OffspringGroup) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE offspring_groups
        SET plan_id = ?, link_state = ?, name = ?, species = ?, dam_id = ?,
            sire_id = ?, expected_birth_on = ?, updated_at = ?
        WHERE guid = ? AND tenant_id = ?
        "#,
    )
    .bind(group.plan_id.map(|id| id.to_string()))
    .bind(group.link_state.as_str())
    .bind(&group.name)
    .bind(&group.species)
    .bind(group.dam_id.map(|id| id.to_string()))
    .bind(group.sire_id.map(|id| id.to_string()))
    .bind(group.expected_birth_on.map(|d| d.to_string()))
    .bind(Utc::now().to_rfc3339())
    .bind(group.id.to_string())
    .bind(group.tenant_id.to_string())
    .execute(executor)
    .await?;
    Ok(())
}
