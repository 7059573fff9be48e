use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection settings: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("The identification number '{0}' is already registered.")]
    DuplicateIdentification(String),

    #[error("The customer has associated transactions or invoices and cannot be deleted.")]
    HasDependents,

    #[error("The requested data was not found in the database.")]
    NotFound,

    #[error("The import batch references missing rows: {0}")]
    InvalidImport(String),
}

impl DbError {
    /// Translates a failed `INSERT`/`UPDATE` on `customers`.
    pub(crate) fn from_customer_write(err: sqlx::Error, identification_number: &str) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                DbError::DuplicateIdentification(identification_number.to_string())
            }
            _ => DbError::QueryError(err),
        }
    }

    /// Translates a failed `DELETE` on `customers`.
    pub(crate) fn from_customer_delete(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => DbError::HasDependents,
            _ => DbError::QueryError(err),
        }
    }
}
