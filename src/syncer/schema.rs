use crate::error::{Result, SyncError};
use crate::models::{RequiredProperty, REQUIRED_PROPERTIES};
use crate::notion::Database;

/// Checks the database exposes every property the sync writes to.
pub fn validate_database(database: &Database) -> Result<()> {
    validate_properties(database, &REQUIRED_PROPERTIES)
}

/// Returns the first missing or mistyped property.
pub fn validate_properties(database: &Database, required: &[RequiredProperty]) -> Result<()> {
    for property in required {
        let schema = database.properties.get(property.name).ok_or_else(|| {
            SyncError::SchemaViolation(format!(
                "notion database is missing required property {}",
                property.name
            ))
        })?;

        if schema.kind != property.kind {
            return Err(SyncError::SchemaViolation(format!(
                "notion database property {} is of type {}, but should be {}",
                property.name, schema.kind, property.kind
            )));
        }
    }

    Ok(())
}
