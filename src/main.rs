use clap::{Parser, Subcommand};
use database::{BillingStore, DbRepository, InMemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use web_server::ImportRunner;

/// The main entry point for the billing administration application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine: every setting has a default.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = configuration::load_settings()?;
    let _guard = configuration::init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, &settings).await,
        Commands::Import(args) => handle_import(args, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Customer, invoice and payment administration for billing platforms.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API and the frontend.
    Serve(ServeArgs),
    /// Load the CSV files into the database.
    Import(ImportArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Keep all data in memory instead of PostgreSQL. Nothing survives a restart;
    /// `POST /api/import-data` loads `import.data_dir` into that memory.
    #[arg(long)]
    in_memory: bool,
}

#[derive(Parser)]
struct ImportArgs {
    /// Directory holding the CSV files. Defaults to `import.data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, settings: &configuration::Settings) -> anyhow::Result<()> {
    if args.in_memory {
        tracing::warn!("Serving from an in-memory store.");
        let store: Arc<dyn BillingStore> = Arc::new(InMemoryStore::new());
        // The billing-import binary only reaches PostgreSQL.
        let importer =
            ImportRunner::in_process(Arc::clone(&store), settings.import.data_dir.clone());
        return web_server::serve(store, importer, settings).await;
    }
    web_server::run_server(settings).await
}

async fn handle_import(args: ImportArgs, settings: &configuration::Settings) -> anyhow::Result<()> {
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| settings.import.data_dir.clone());

    let pool = database::connect(&settings.database).await?;
    database::run_migrations(&pool).await?;
    let repo = DbRepository::new(pool);

    let result = importer::run_import(&repo, &data_dir).await;
    repo.close().await;

    let summary = result?;
    tracing::info!(
        platforms = summary.platforms,
        customers = summary.customers,
        invoices = summary.invoices,
        transactions = summary.transactions,
        "Import finished."
    );
    println!(
        "Imported {} platforms, {} customers, {} invoices and {} transactions from {}",
        summary.platforms,
        summary.customers,
        summary.invoices,
        summary.transactions,
        data_dir.display()
    );
    Ok(())
}
