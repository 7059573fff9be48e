use clap::Parser;
use database::{BillingStore, DbRepository};
use std::path::PathBuf;

/// Bulk-load platforms, customers, invoices and transactions from CSV files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the four CSV files. Defaults to `import.data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

// Progress goes to stdout and errors to stderr: the web server hands both back
// to the caller verbatim.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let settings = configuration::load_settings()?;
    let _guard = configuration::init_tracing(&settings.logging)?;

    let data_dir = args.data_dir.unwrap_or(settings.import.data_dir);
    println!("Importing CSV data from {}", data_dir.display());

    let pool = database::connect(&settings.database).await?;
    database::run_migrations(&pool).await?;
    let repo = DbRepository::new(pool);

    let result = importer::run_import(&repo, &data_dir).await;
    repo.close().await;

    let summary = result?;
    print!("{}", importer::summary_lines(&summary));
    println!("Import completed successfully.");
    Ok(())
}
