use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Settings;
use database::{BillingStore, DbRepository};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod import;

pub use import::{ImportReport, ImportRunner, ImportStatus};

/// The shared application state that all handlers can access.
pub struct AppState {
    pub store: Arc<dyn BillingStore>,
    pub importer: Arc<ImportRunner>,
}

/// Builds the full application: the JSON API under `/api` and the frontend
/// files from `static_dir` for every other path.
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/customers",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route("/platforms", get(handlers::list_platforms))
        .route("/transactions", get(handlers::list_transactions))
        .route("/reports/total-paid", get(handlers::total_paid_report))
        .route(
            "/reports/pending-invoices",
            get(handlers::pending_invoices_report),
        )
        .route(
            "/reports/transactions-by-platform/:platform_id",
            get(handlers::transactions_by_platform),
        )
        .route(
            "/import-data",
            post(handlers::trigger_import).get(handlers::last_import),
        )
        .fallback(handlers::api_not_found)
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Connects to PostgreSQL, applies migrations and serves until shutdown.
pub async fn run_server(settings: &Settings) -> anyhow::Result<()> {
    let pool = database::connect(&settings.database).await?;
    database::run_migrations(&pool).await?;
    let store: Arc<dyn BillingStore> = Arc::new(DbRepository::new(pool));
    let importer = ImportRunner::from_settings(&settings.import);
    serve(store, importer, settings).await
}

/// Serves the application over `store` until Ctrl-C or SIGTERM, then closes the store.
///
/// `importer` must write into the same data `store` reads from.
pub async fn serve(
    store: Arc<dyn BillingStore>,
    importer: ImportRunner,
    settings: &Settings,
) -> anyhow::Result<()> {
    let addr = settings.server.socket_addr()?;
    let app_state = Arc::new(AppState {
        store: Arc::clone(&store),
        importer: Arc::new(importer),
    });
    let app = build_router(app_state, &settings.server.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped.");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received.");
}
