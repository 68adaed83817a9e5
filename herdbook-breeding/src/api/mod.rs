//! HTTP API for the breeding service
//!
//! Thin handlers over the domain core. Tenant and actor identity arrive
//! as headers set by the gateway; everything else is delegated to the
//! linkage service, normalizer, scorer, and summarizer.

pub mod handlers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::Error;

/// Tenant and actor identity extracted from gateway headers
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, Response> {
    let raw = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request(&format!("missing {} header", name)))?;
    Uuid::parse_str(raw).map_err(|_| bad_request(&format!("invalid {} header", name)))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext {
            tenant_id: header_uuid(parts, "x-tenant-id")?,
            actor_id: header_uuid(parts, "x-actor-id")?,
        })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                tracing::error!(error = %self, "Request failed with infrastructure error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
