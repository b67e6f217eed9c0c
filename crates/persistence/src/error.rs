//! Mapping from database errors to storage errors.

use domain::store::StoreError;

/// PostgreSQL SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for foreign_key_violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL SQLSTATE for check_violation.
pub const CHECK_VIOLATION: &str = "23514";

/// Translate a sqlx error into the storage contract's error type.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            },
            Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound,
            Some(CHECK_VIOLATION) => StoreError::CheckViolation {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            },
            _ => StoreError::Unavailable(format!("Database error: {}", db_err)),
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}
