//! UUID utilities
//!
//! UUIDs are stored as TEXT columns in SQLite; these helpers centralize
//! generation and parsing so query modules don't repeat the conversion.

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a UUID read from a TEXT column
pub fn parse_column(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Invalid UUID column value: {}", e)))
}

/// Parse an optional UUID column (NULL stays None)
pub fn parse_optional_column(s: Option<String>) -> Result<Option<Uuid>> {
    s.map(|v| parse_column(&v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let id = generate();
        assert_eq!(parse_column(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_column("not-a-uuid").is_err());
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional_column(None).unwrap(), None);
        let id = generate();
        assert_eq!(
            parse_optional_column(Some(id.to_string())).unwrap(),
            Some(id)
        );
    }
}
