//! Tenant membership and authorization
//!
//! Membership lives in the tenant_users table with a per-tenant role.
//! Authorization is checked inside the same transaction as the guarded
//! mutation, so a revoked role can't race a pending unlink.

use sqlx::Sqlite;
use uuid::Uuid;

use crate::{Error, Result};

/// Roles that may perform administrative group operations
const ADMIN_ROLES: &[&str] = &["OWNER", "ADMIN"];

/// Require that the actor is an admin (or owner) of the tenant.
/// A missing membership is Forbidden too, not NotFound, so the response
/// doesn't reveal whether the tenant exists.
pub async fn ensure_admin<'e, E>(executor: E, tenant_id: Uuid, actor_id: Uuid) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM tenant_users WHERE tenant_id = ? AND user_id = ?")
            .bind(tenant_id.to_string())
            .bind(actor_id.to_string())
            .fetch_optional(executor)
            .await?;

    match role {
        Some(r) if ADMIN_ROLES.contains(&r.as_str()) => Ok(()),
        _ => Err(Error::Forbidden(format!(
            "user {} is not an admin of tenant {}",
            actor_id, tenant_id
        ))),
    }
}
