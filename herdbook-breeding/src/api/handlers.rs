//! Route handlers
//!
//! Each handler resolves its tenant context, calls one core operation,
//! and returns the operation's output as JSON. Domain errors map to
//! statuses in the crate-level `IntoResponse` impl.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::RequestContext;
use crate::db::events::GroupEvent;
use crate::db::groups::{get_group, OffspringGroup};
use crate::db::offspring::{self, NewOffspring, OffspringRecord};
use crate::db::plans::list_committed_plans;
use crate::groups::{suggest_plans, PlanSuggestion, DEFAULT_SUGGESTION_LIMIT};
use crate::offspring::{summarize, GroupSummary, OffspringPatch};
use crate::server::AppState;
use crate::{Error, Result};

/// POST /plans/:plan_id/group — idempotent group creation for a plan
pub async fn ensure_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<OffspringGroup>> {
    let group = state
        .linkage
        .ensure_group_for_committed_plan(ctx.tenant_id, plan_id, ctx.actor_id)
        .await?;
    Ok(Json(group))
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub plan_id: Uuid,
}

/// POST /groups/:group_id/link
pub async fn link_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
    Json(body): Json<LinkRequest>,
) -> Result<Json<OffspringGroup>> {
    let group = state
        .linkage
        .link_group_to_plan(ctx.tenant_id, group_id, body.plan_id, ctx.actor_id)
        .await?;
    Ok(Json(group))
}

/// POST /groups/:group_id/unlink — admin only
pub async fn unlink_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<OffspringGroup>> {
    let group = state
        .linkage
        .unlink_group(ctx.tenant_id, group_id, ctx.actor_id)
        .await?;
    Ok(Json(group))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub limit: Option<usize>,
}

/// GET /groups/:group_id/suggestions — ranked candidate plans
pub async fn group_suggestions(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<PlanSuggestion>>> {
    let group = get_group(&state.db, ctx.tenant_id, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;
    let candidates = list_committed_plans(&state.db, ctx.tenant_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    Ok(Json(suggest_plans(&group, &candidates, limit)))
}

/// GET /groups/:group_id/summary — per-individual accounting
pub async fn group_summary(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupSummary>> {
    get_group(&state.db, ctx.tenant_id, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;
    let records = offspring::list_for_group(&state.db, ctx.tenant_id, group_id).await?;
    let states: Vec<_> = records.into_iter().map(|r| r.state).collect();
    Ok(Json(summarize(&states)))
}

/// GET /groups/:group_id/events — the audit trail
pub async fn group_events(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<GroupEvent>>> {
    get_group(&state.db, ctx.tenant_id, group_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("offspring group {}", group_id)))?;
    let events = crate::db::events::list_events(&state.db, ctx.tenant_id, group_id).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct CreateOffspringRequest {
    #[serde(flatten)]
    pub identity: NewOffspring,
    #[serde(flatten)]
    pub patch: OffspringPatch,
}

/// POST /groups/:group_id/offspring
pub async fn create_offspring(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(group_id): Path<Uuid>,
    Json(body): Json<CreateOffspringRequest>,
) -> Result<Json<OffspringRecord>> {
    let record = offspring::create_offspring(
        &state.db,
        ctx.tenant_id,
        group_id,
        body.identity,
        &body.patch,
        Utc::now(),
    )
    .await?;
    Ok(Json(record))
}

/// PATCH /offspring/:offspring_id
pub async fn patch_offspring(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(offspring_id): Path<Uuid>,
    Json(patch): Json<OffspringPatch>,
) -> Result<Json<OffspringRecord>> {
    let record =
        offspring::apply_patch(&state.db, ctx.tenant_id, offspring_id, &patch, Utc::now()).await?;
    Ok(Json(record))
}
