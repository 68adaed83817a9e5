//! Group-to-plan linkage workflow
//!
//! A group's link state moves between `linked` and `orphan` through three
//! transactional operations. Each operation runs inside one transaction
//! covering the plan lookup, the group mutation, and exactly one appended
//! audit event; if anything fails the whole operation rolls back, so a
//! group update without its event (or vice versa) is never observable.

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::ensure_admin;
use crate::db::events::{append_event, GroupEvent, GroupEventType};
use crate::db::groups::{
    get_group, get_group_by_plan, insert_group, update_group_linkage, LinkState, OffspringGroup,
};
use crate::db::plans::{get_plan, BreedingPlan};
use crate::{Error, Result};

/// Transactional linkage operations over groups and plans
pub struct LinkageService {
    db: SqlitePool,
}

impl LinkageService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Idempotent "get or create" for the group belonging to a committed
    /// plan. A second call with the same plan returns the existing group
    /// and appends nothing. Two callers racing past the existence check
    /// are serialized by the unique (tenant, plan) index: the loser
    /// re-reads and returns the winner's group.
    pub async fn ensure_group_for_committed_plan(
        &self,
        tenant_id: Uuid,
        plan_id: Uuid,
        actor_id: Uuid,
    ) -> Result<OffspringGroup> {
        let plan = get_plan(&self.db, tenant_id, plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("breeding plan {}", plan_id)))?;

        if let Some(existing) = get_group_by_plan(&self.db, tenant_id, plan_id).await? {
            tracing::debug!(group_id = %existing.id, plan_id = %plan_id, "Group already exists for plan");
            return Ok(existing);
        }

        match self.create_group_for_plan(tenant_id, &plan, actor_id).await {
            Ok(created) => {
                tracing::info!(group_id = %created.id, plan_id = %plan_id, "Created group for committed plan");
                Ok(created)
            }
            Err(err) if is_unique_violation(&err) => {
                let existing = get_group_by_plan(&self.db, tenant_id, plan_id)
                    .await?
                    .ok_or(err)?;
                tracing::debug!(group_id = %existing.id, plan_id = %plan_id, "Concurrent caller created the group first");
                Ok(existing)
            }
            Err(err) => Err(err),
        }
    }

    /// Insert a plan's group together with its LINK event in one
    /// transaction. Hits the unique (tenant, plan) index when another
    /// caller created the group in the meantime; nothing is persisted in
    /// that case.
    async fn create_group_for_plan(
        &self,
        tenant_id: Uuid,
        plan: &BreedingPlan,
        actor_id: Uuid,
    ) -> Result<OffspringGroup> {
        let expected_birth_on = plan.resolved_expected_birth().map(|dt| dt.date_naive());
        let name = plan
            .name
            .clone()
            .unwrap_or_else(|| derive_group_name(plan.dam_name.as_deref(), expected_birth_on));

        let mut group = OffspringGroup::new(tenant_id);
        group.plan_id = Some(plan.id);
        group.link_state = LinkState::Linked;
        group.name = Some(name);
        group.species = plan.species.clone();
        group.dam_id = plan.dam_id;
        group.sire_id = plan.sire_id;
        group.expected_birth_on = expected_birth_on;

        let mut tx = self.db.begin().await?;

        insert_group(&mut *tx, &group).await?;

        let event = GroupEvent::linkage(
            tenant_id,
            group.id,
            GroupEventType::Link,
            None,
            Some(serde_json::json!({ "plan_id": plan.id })),
            actor_id,
            Utc::now(),
        );
        append_event(&mut *tx, &event).await?;

        let created = get_group(&mut *tx, tenant_id, group.id)
            .await?
            .ok_or_else(|| Error::Internal("group vanished inside transaction".to_string()))?;
        tx.commit().await?;

        Ok(created)
    }

    /// Link an existing group to a plan. Backfills descriptive fields the
    /// group is missing from the plan; never overwrites a field the group
    /// already has.
    pub async fn link_group_to_plan(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        plan_id: Uuid,
        actor_id: Uuid,
    ) -> Result<OffspringGroup> {
        let mut tx = self.db.begin().await?;

        let group = get_group(&mut *tx, tenant_id, group_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;
        let plan = get_plan(&mut *tx, tenant_id, plan_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("breeding plan {}", plan_id)))?;

        let before = snapshot(&group)?;

        let mut updated = group;
        updated.plan_id = Some(plan_id);
        updated.link_state = LinkState::Linked;
        backfill_from_plan(&mut updated, &plan);

        update_group_linkage(&mut *tx, &updated).await?;

        let fresh = get_group(&mut *tx, tenant_id, group_id)
            .await?
            .ok_or_else(|| Error::Internal("group vanished inside transaction".to_string()))?;

        let event = GroupEvent::linkage(
            tenant_id,
            group_id,
            GroupEventType::Link,
            Some(before),
            Some(snapshot(&fresh)?),
            actor_id,
            Utc::now(),
        );
        append_event(&mut *tx, &event).await?;

        tx.commit().await?;

        tracing::info!(group_id = %group_id, plan_id = %plan_id, "Linked group to plan");
        Ok(fresh)
    }

    /// Detach a group from its plan. Admin-only.
    pub async fn unlink_group(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        actor_id: Uuid,
    ) -> Result<OffspringGroup> {
        let mut tx = self.db.begin().await?;

        ensure_admin(&mut *tx, tenant_id, actor_id).await?;

        let group = get_group(&mut *tx, tenant_id, group_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;

        let before = snapshot(&group)?;

        let mut updated = group;
        updated.plan_id = None;
        updated.link_state = LinkState::Orphan;

        update_group_linkage(&mut *tx, &updated).await?;

        let fresh = get_group(&mut *tx, tenant_id, group_id)
            .await?
            .ok_or_else(|| Error::Internal("group vanished inside transaction".to_string()))?;

        let event = GroupEvent::linkage(
            tenant_id,
            group_id,
            GroupEventType::Unlink,
            Some(before),
            Some(snapshot(&fresh)?),
            actor_id,
            Utc::now(),
        );
        append_event(&mut *tx, &event).await?;

        tx.commit().await?;

        tracing::info!(group_id = %group_id, "Unlinked group from plan");
        Ok(fresh)
    }
}

fn is_unique_violation(err: &Error) -> bool {
    matches!(err, Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation())
}

/// Copy descriptive fields from the plan onto the group where the group
/// has none. Linkage is additive, not destructive.
fn backfill_from_plan(group: &mut OffspringGroup, plan: &BreedingPlan) {
    if group.species.is_none() {
        group.species = plan.species.clone();
    }
    if group.dam_id.is_none() {
        group.dam_id = plan.dam_id;
    }
    if group.sire_id.is_none() {
        group.sire_id = plan.sire_id;
    }
    if group.expected_birth_on.is_none() {
        group.expected_birth_on = plan.resolved_expected_birth().map(|dt| dt.date_naive());
    }
    if group.name.is_none() {
        group.name = Some(plan.name.clone().unwrap_or_else(|| {
            derive_group_name(plan.dam_name.as_deref(), group.expected_birth_on)
        }));
    }
}

fn snapshot(group: &OffspringGroup) -> Result<serde_json::Value> {
    serde_json::to_value(group)
        .map_err(|e| Error::Internal(format!("Failed to snapshot group: {}", e)))
}

/// Tentative display name for a group created from a plan with no
/// explicit name: dam name (or a placeholder) plus the season of the
/// expected birth. With no expected date the dam name stands alone.
fn derive_group_name(dam_name: Option<&str>, expected_birth_on: Option<NaiveDate>) -> String {
    let dam = dam_name.unwrap_or("Unnamed Dam");
    match expected_birth_on {
        Some(date) => format!("{} • {}", dam, season_label(date)),
        None => dam.to_string(),
    }
}

/// Season bucket for a date: Winter/Spring/Summer/Fall plus the year,
/// with December rolling into the next year's Winter.
fn season_label(date: NaiveDate) -> String {
    let (season, year) = match date.month() {
        12 => ("Winter", date.year() + 1),
        1 | 2 => ("Winter", date.year()),
        3..=5 => ("Spring", date.year()),
        6..=8 => ("Summer", date.year()),
        _ => ("Fall", date.year()),
    };
    format!("{} {}", season, year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdbook_common::db::create_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    struct PlanSeed {
        name: Option<&'static str>,
        species: Option<&'static str>,
        dam_id: Option<Uuid>,
        sire_id: Option<Uuid>,
        dam_name: Option<&'static str>,
        expected_birth_date: Option<&'static str>,
        locked_ovulation_date: Option<&'static str>,
    }

    impl Default for PlanSeed {
        fn default() -> Self {
            PlanSeed {
                name: None,
                species: Some("DOG"),
                dam_id: Some(Uuid::new_v4()),
                sire_id: Some(Uuid::new_v4()),
                dam_name: Some("Willow"),
                expected_birth_date: None,
                locked_ovulation_date: None,
            }
        }
    }

    async fn insert_plan(pool: &SqlitePool, tenant_id: Uuid, seed: PlanSeed) -> Uuid {
        let plan_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO breeding_plans (
                guid, tenant_id, name, species, dam_id, sire_id, dam_name,
                expected_birth_date, locked_ovulation_date, committed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(plan_id.to_string())
        .bind(tenant_id.to_string())
        .bind(seed.name)
        .bind(seed.species)
        .bind(seed.dam_id.map(|id| id.to_string()))
        .bind(seed.sire_id.map(|id| id.to_string()))
        .bind(seed.dam_name)
        .bind(seed.expected_birth_date)
        .bind(seed.locked_ovulation_date)
        .execute(pool)
        .await
        .unwrap();
        plan_id
    }

    async fn add_admin(pool: &SqlitePool, tenant_id: Uuid) -> Uuid {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO tenant_users (tenant_id, user_id, role) VALUES (?, ?, 'ADMIN')")
            .bind(tenant_id.to_string())
            .bind(user_id.to_string())
            .execute(pool)
            .await
            .unwrap();
        user_id
    }

    async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_season_labels() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(season_label(d(2024, 1, 15)), "Winter 2024");
        assert_eq!(season_label(d(2024, 4, 1)), "Spring 2024");
        assert_eq!(season_label(d(2024, 7, 31)), "Summer 2024");
        assert_eq!(season_label(d(2024, 10, 5)), "Fall 2024");
        // December rolls into next year's Winter
        assert_eq!(season_label(d(2024, 12, 20)), "Winter 2025");
    }

    #[test]
    fn test_derive_group_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(derive_group_name(Some("Willow"), date), "Willow • Spring 2024");
        assert_eq!(derive_group_name(None, date), "Unnamed Dam • Spring 2024");
        assert_eq!(derive_group_name(None, None), "Unnamed Dam");
    }

    #[tokio::test]
    async fn test_ensure_creates_linked_group_with_event() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let plan_id = insert_plan(
            &pool,
            tenant_id,
            PlanSeed {
                expected_birth_date: Some("2024-03-01T00:00:00+00:00"),
                ..PlanSeed::default()
            },
        )
        .await;

        let service = LinkageService::new(pool.clone());
        let group = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, actor_id)
            .await
            .unwrap();

        assert_eq!(group.plan_id, Some(plan_id));
        assert_eq!(group.link_state, LinkState::Linked);
        assert_eq!(group.species.as_deref(), Some("DOG"));
        assert_eq!(group.expected_birth_on, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(group.name.as_deref(), Some("Willow • Spring 2024"));

        let events = crate::db::events::list_events(&pool, tenant_id, group.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GroupEventType::Link);
        assert_eq!(events[0].before, None);
        assert_eq!(
            events[0].after,
            Some(serde_json::json!({ "plan_id": plan_id }))
        );
        assert_eq!(events[0].recorded_by, Some(actor_id));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;

        let service = LinkageService::new(pool.clone());
        let first = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, actor_id)
            .await
            .unwrap();
        let second = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, actor_id)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(count_rows(&pool, "offspring_groups").await, 1);
        assert_eq!(count_rows(&pool, "offspring_group_events").await, 1);
    }

    #[tokio::test]
    async fn test_lost_creation_race_rolls_back_and_yields_existing_group() {
        // Simulates two ensure calls racing past the existence check: the
        // winner's row is in place, so the loser's insert must hit the
        // (tenant, plan) unique index, persist nothing, and the re-read
        // must hand back the winner's group.
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;

        let service = LinkageService::new(pool.clone());
        let winner = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, actor_id)
            .await
            .unwrap();

        let plan = get_plan(&pool, tenant_id, plan_id).await.unwrap().unwrap();
        let err = service
            .create_group_for_plan(tenant_id, &plan, actor_id)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // The losing transaction left no trace
        assert_eq!(count_rows(&pool, "offspring_groups").await, 1);
        assert_eq!(count_rows(&pool, "offspring_group_events").await, 1);

        // And the public operation still resolves to the winner
        let resolved = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, actor_id)
            .await
            .unwrap();
        assert_eq!(resolved.id, winner.id);
    }

    #[tokio::test]
    async fn test_ensure_derives_date_from_ovulation() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let plan_id = insert_plan(
            &pool,
            tenant_id,
            PlanSeed {
                locked_ovulation_date: Some("2024-01-01T00:00:00+00:00"),
                ..PlanSeed::default()
            },
        )
        .await;

        let service = LinkageService::new(pool.clone());
        let group = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, Uuid::new_v4())
            .await
            .unwrap();

        // 2024-01-01 + 63 days of gestation
        assert_eq!(group.expected_birth_on, NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[tokio::test]
    async fn test_ensure_prefers_explicit_plan_name() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let plan_id = insert_plan(
            &pool,
            tenant_id,
            PlanSeed {
                name: Some("Willow x Ranger 2024"),
                ..PlanSeed::default()
            },
        )
        .await;

        let service = LinkageService::new(pool.clone());
        let group = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(group.name.as_deref(), Some("Willow x Ranger 2024"));
    }

    #[tokio::test]
    async fn test_ensure_missing_plan_is_not_found() {
        let pool = setup_test_db().await;
        let service = LinkageService::new(pool.clone());
        let err = service
            .ensure_group_for_committed_plan(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(count_rows(&pool, "offspring_groups").await, 0);
        assert_eq!(count_rows(&pool, "offspring_group_events").await, 0);
    }

    #[tokio::test]
    async fn test_ensure_ignores_other_tenants_plan() {
        let pool = setup_test_db().await;
        let owner_tenant = Uuid::new_v4();
        let plan_id = insert_plan(&pool, owner_tenant, PlanSeed::default()).await;

        let service = LinkageService::new(pool.clone());
        let err = service
            .ensure_group_for_committed_plan(Uuid::new_v4(), plan_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_link_backfills_only_missing_fields() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let plan_id = insert_plan(
            &pool,
            tenant_id,
            PlanSeed {
                expected_birth_date: Some("2024-03-01T00:00:00+00:00"),
                ..PlanSeed::default()
            },
        )
        .await;

        // Orphan group that already knows its species
        let mut orphan = OffspringGroup::new(tenant_id);
        orphan.species = Some("CAT".to_string());
        insert_group(&pool, &orphan).await.unwrap();

        let service = LinkageService::new(pool.clone());
        let linked = service
            .link_group_to_plan(tenant_id, orphan.id, plan_id, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(linked.plan_id, Some(plan_id));
        assert_eq!(linked.link_state, LinkState::Linked);
        // Existing species untouched; missing fields filled from the plan
        assert_eq!(linked.species.as_deref(), Some("CAT"));
        assert!(linked.dam_id.is_some());
        assert_eq!(linked.expected_birth_on, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(linked.name.is_some());

        let events = crate::db::events::list_events(&pool, tenant_id, orphan.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GroupEventType::Link);
        let before = events[0].before.as_ref().unwrap();
        let after = events[0].after.as_ref().unwrap();
        assert_eq!(before["link_state"], "orphan");
        assert_eq!(after["link_state"], "linked");
    }

    #[tokio::test]
    async fn test_link_missing_group_or_plan_is_not_found() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;
        let orphan = OffspringGroup::new(tenant_id);
        insert_group(&pool, &orphan).await.unwrap();

        let service = LinkageService::new(pool.clone());
        let err = service
            .link_group_to_plan(tenant_id, Uuid::new_v4(), plan_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = service
            .link_group_to_plan(tenant_id, orphan.id, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // No partial state: nothing was linked, nothing was logged
        assert_eq!(count_rows(&pool, "offspring_group_events").await, 0);
    }

    #[tokio::test]
    async fn test_unlink_requires_admin() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;
        let service = LinkageService::new(pool.clone());
        let group = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, Uuid::new_v4())
            .await
            .unwrap();

        let err = service
            .unlink_group(tenant_id, group.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        // Group untouched, only the original LINK event exists
        let still_linked = get_group(&pool, tenant_id, group.id).await.unwrap().unwrap();
        assert_eq!(still_linked.link_state, LinkState::Linked);
        assert_eq!(count_rows(&pool, "offspring_group_events").await, 1);
    }

    #[tokio::test]
    async fn test_unlink_by_admin_orphans_group() {
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let admin_id = add_admin(&pool, tenant_id).await;
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;
        let service = LinkageService::new(pool.clone());
        let group = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, admin_id)
            .await
            .unwrap();

        let orphaned = service.unlink_group(tenant_id, group.id, admin_id).await.unwrap();
        assert_eq!(orphaned.plan_id, None);
        assert_eq!(orphaned.link_state, LinkState::Orphan);

        let events = crate::db::events::list_events(&pool, tenant_id, group.id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, GroupEventType::Unlink);
        assert_eq!(events[1].before.as_ref().unwrap()["link_state"], "linked");
        assert_eq!(events[1].after.as_ref().unwrap()["link_state"], "orphan");
    }

    #[tokio::test]
    async fn test_unlink_then_ensure_creates_fresh_group() {
        // After an unlink the plan has no group again, so ensure builds a
        // new one rather than resurrecting the orphan.
        let pool = setup_test_db().await;
        let tenant_id = Uuid::new_v4();
        let admin_id = add_admin(&pool, tenant_id).await;
        let plan_id = insert_plan(&pool, tenant_id, PlanSeed::default()).await;
        let service = LinkageService::new(pool.clone());

        let first = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, admin_id)
            .await
            .unwrap();
        service.unlink_group(tenant_id, first.id, admin_id).await.unwrap();
        let second = service
            .ensure_group_for_committed_plan(tenant_id, plan_id, admin_id)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(count_rows(&pool, "offspring_groups").await, 2);
    }
}
