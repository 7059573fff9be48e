//! # Billing CSV Importer
//!
//! Bulk-loads platforms, customers, invoices and transactions from four CSV
//! files in a data directory. The whole load is written through
//! `BillingStore::import_batch`, so it either lands completely or not at all,
//! and re-running it with the same files leaves the data unchanged.
//!
//! The `billing-import` binary wraps this crate; the web server launches that
//! binary as a child process for `POST /api/import-data`.

use database::{BillingStore, ImportBatch, ImportSummary};
use std::path::Path;

pub mod error;
pub mod files;

pub use error::ImportError;
pub use files::{CUSTOMERS_FILE, INVOICES_FILE, PLATFORMS_FILE, TRANSACTIONS_FILE};

/// Parses the four CSV files in `data_dir` into a batch, in dependency order.
pub fn load_batch(data_dir: &Path) -> Result<ImportBatch, ImportError> {
    let batch = ImportBatch {
        platforms: files::read_platforms(data_dir)?,
        customers: files::read_customers(data_dir)?,
        invoices: files::read_invoices(data_dir)?,
        transactions: files::read_transactions(data_dir)?,
    };
    tracing::debug!(
        platforms = batch.platforms.len(),
        customers = batch.customers.len(),
        invoices = batch.invoices.len(),
        transactions = batch.transactions.len(),
        "CSV files parsed."
    );
    Ok(batch)
}

/// Parses `data_dir` and writes the result to `store`.
pub async fn run_import(
    store: &dyn BillingStore,
    data_dir: &Path,
) -> Result<ImportSummary, ImportError> {
    let batch = load_batch(data_dir)?;
    let summary = store.import_batch(&batch).await?;
    Ok(summary)
}

/// One progress line per table, in the order the tables are written.
pub fn summary_lines(summary: &ImportSummary) -> String {
    format!(
        "{} platforms imported\n{} customers imported\n\
         {} invoices imported\n{} transactions imported\n",
        summary.platforms, summary.customers, summary.invoices, summary.transactions
    )
}
