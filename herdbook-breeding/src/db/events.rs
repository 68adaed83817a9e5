//! Offspring group audit events
//!
//! Append-only log answering "why did this group's plan association
//! change". Rows carry JSON before/after snapshots and are never updated
//! or deleted; the group row stays the source of truth (no replay).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

use crate::db::parse_datetime;
use crate::{Error, Result};
use herdbook_common::uuid_utils;

/// Kinds of audit events recorded against an offspring group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupEventType {
    Link,
    Unlink,
    Change,
    Note,
    StatusOverride,
    BuyerMove,
}

impl GroupEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupEventType::Link => "LINK",
            GroupEventType::Unlink => "UNLINK",
            GroupEventType::Change => "CHANGE",
            GroupEventType::Note => "NOTE",
            GroupEventType::StatusOverride => "STATUS_OVERRIDE",
            GroupEventType::BuyerMove => "BUYER_MOVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LINK" => Some(GroupEventType::Link),
            "UNLINK" => Some(GroupEventType::Unlink),
            "CHANGE" => Some(GroupEventType::Change),
            "NOTE" => Some(GroupEventType::Note),
            "STATUS_OVERRIDE" => Some(GroupEventType::StatusOverride),
            "BUYER_MOVE" => Some(GroupEventType::BuyerMove),
            _ => None,
        }
    }
}

/// One append-only audit record
#[derive(Debug, Clone, Serialize)]
pub struct GroupEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub group_id: Uuid,
    pub event_type: GroupEventType,
    pub field: Option<String>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl GroupEvent {
    /// Build a linkage event ready for appending
    pub fn linkage(
        tenant_id: Uuid,
        group_id: Uuid,
        event_type: GroupEventType,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        recorded_by: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        GroupEvent {
            id: uuid_utils::generate(),
            tenant_id,
            group_id,
            event_type,
            field: Some("plan_id".to_string()),
            before,
            after,
            notes: None,
            recorded_by: Some(recorded_by),
            occurred_at,
        }
    }
}

fn event_from_row(row: &SqliteRow) -> Result<GroupEvent> {
    let event_type_raw: String = row.get("event_type");
    let event_type = GroupEventType::parse(&event_type_raw)
        .ok_or_else(|| Error::Internal(format!("Unknown event type '{}'", event_type_raw)))?;
    let before: Option<String> = row.get("before_json");
    let after: Option<String> = row.get("after_json");
    Ok(GroupEvent {
        id: uuid_utils::parse_column(&row.get::<String, _>("guid"))?,
        tenant_id: uuid_utils::parse_column(&row.get::<String, _>("tenant_id"))?,
        group_id: uuid_utils::parse_column(&row.get::<String, _>("offspring_group_id"))?,
        event_type,
        field: row.get("field"),
        before: before
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid before_json: {}", e)))?,
        after: after
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid after_json: {}", e)))?,
        notes: row.get("notes"),
        recorded_by: uuid_utils::parse_optional_column(row.get("recorded_by"))?,
        occurred_at: parse_datetime(&row.get::<String, _>("occurred_at"))?,
    })
}

/// Append one event. There is deliberately no update or delete query in
/// this module.
pub async fn append_event<'e, E>(executor: E, event: &GroupEvent) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO offspring_group_events (
            guid, tenant_id, offspring_group_id, event_type, field,
            before_json, after_json, notes, recorded_by, occurred_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(event.tenant_id.to_string())
    .bind(event.group_id.to_string())
    .bind(event.event_type.as_str())
    .bind(&event.field)
    .bind(event.before.as_ref().map(|v| v.to_string()))
    .bind(event.after.as_ref().map(|v| v.to_string()))
    .bind(&event.notes)
    .bind(event.recorded_by.map(|id| id.to_string()))
    .bind(event.occurred_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

/// List a group's events in the order they occurred
pub async fn list_events<'e, E>(executor: E, tenant_id: Uuid, group_id: Uuid) -> Result<Vec<GroupEvent>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT guid, tenant_id, offspring_group_id, event_type, field,
               before_json, after_json, notes, recorded_by, occurred_at
        FROM offspring_group_events
        WHERE tenant_id = ? AND offspring_group_id = ?
        ORDER BY occurred_at, guid
        "#,
    )
    .bind(tenant_id.to_string())
    .bind(group_id.to_string())
    .fetch_all(executor)
    .await?;

    rows.iter().map(event_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codes() {
        for t in [
            GroupEventType::Link,
            GroupEventType::Unlink,
            GroupEventType::Change,
            GroupEventType::Note,
            GroupEventType::StatusOverride,
            GroupEventType::BuyerMove,
        ] {
            assert_eq!(GroupEventType::parse(t.as_str()), Some(t));
        }
        assert_eq!(GroupEventType::parse("RELINK"), None);
    }
}
