use chrono::{DateTime, SecondsFormat, Utc};

use curio_core::ports::RepositoryError;

pub mod activity;
pub mod catalog;
pub mod memory;
pub mod recommendation;

pub use activity::SqlActivityStore;
pub use catalog::SqlCatalog;
pub use memory::{InMemoryActivityStore, InMemoryCatalog, InMemoryRecommendationStore};
pub use recommendation::SqlRecommendationStore;

pub(crate) fn db_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RepositoryError::Unavailable(error.to_string())
        }
        other => RepositoryError::Database(other.to_string()),
    }
}

pub(crate) fn decode_error(error: impl ToString) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

/// Fixed-width UTC text so that stored timestamps sort lexically.
pub(crate) fn encode_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_time(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}
