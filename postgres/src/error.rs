//! Error type shared by every repository implementation in this crate.

use thiserror::Error;

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors a [`sqlx`]-backed repository can raise.
///
/// Deliberately does not distinguish every `sqlx::Error` variant: callers in
/// `aegis-auth` only ever need to know whether a row was missing, a unique
/// constraint was violated, or an optimistic-concurrency write lost its
/// race — everything else is an opaque database failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No row matched the lookup.
    #[error("not found")]
    NotFound,

    /// A unique constraint was violated (duplicate email, `client_id`, etc).
    #[error("unique constraint violated: {constraint}")]
    Conflict {
        /// Name of the violated constraint, as reported by Postgres.
        constraint: String,
    },

    /// An `UPDATE ... WHERE version = $n` affected zero rows because the
    /// row's version had already moved.
    #[error("optimistic concurrency conflict")]
    VersionConflict,

    /// Any other database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Map a raw `sqlx::Error`, recognizing unique-violation and not-found
    /// cases so callers don't have to inspect `sqlx::Error` themselves.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if matches!(&err, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            let constraint = db_err
                .constraint()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string());
            return Self::Conflict { constraint };
        }
        Self::Database(err)
    }
}
