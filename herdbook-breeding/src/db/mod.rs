//! Database queries for the breeding service
//!
//! Every query in these modules filters by tenant id; callers outside
//! this layer never see a row belonging to another tenant. Column
//! conventions follow the shared schema in herdbook-common: TEXT UUIDs,
//! RFC 3339 timestamps, YYYY-MM-DD dates.

pub mod events;
pub mod groups;
pub mod offspring;
pub mod plans;

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Parse an RFC 3339 timestamp column
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp column value '{}': {}", s, e)))
}

/// Parse an optional RFC 3339 timestamp column (NULL stays None)
pub(crate) fn parse_opt_datetime(v: Option<String>) -> Result<Option<DateTime<Utc>>> {
    v.map(|s| parse_datetime(&s)).transpose()
}

/// Parse an optional YYYY-MM-DD date column (NULL stays None)
pub(crate) fn parse_opt_date(v: Option<String>) -> Result<Option<NaiveDate>> {
    v.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| Error::Internal(format!("Invalid date column value '{}': {}", s, e)))
    })
    .transpose()
}
