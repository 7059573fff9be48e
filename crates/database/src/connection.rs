use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

/// Opens the connection handle shared by every request.
///
/// The pool is capped at `max_connections`, which defaults to one: all
/// statements are then serialized on a single connection.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    if settings.host.is_empty() || settings.name.is_empty() {
        return Err(DbError::ConnectionConfigError(
            "database host and name must be set".to_string(),
        ));
    }

    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        database = %settings.name,
        "Connected to PostgreSQL."
    );
    Ok(pool)
}

/// Applies the embedded schema migrations. Safe to call on every startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
