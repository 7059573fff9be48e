//! # Billing Database Crate
//!
//! This crate acts as the application-specific interface to the relational
//! store holding customers, platforms, invoices and transactions.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** Encapsulates all SQL. Callers see the `BillingStore` trait
//!   and never build a statement themselves; every statement is parameterized.
//! - **Explicit lifecycle:** The connection handle is created by `connect`,
//!   injected wherever it is needed and released with `BillingStore::close`.
//! - **Error translation:** Unique and foreign-key violations surface as
//!   `DuplicateIdentification` and `HasDependents`; everything else stays a
//!   generic query failure.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: open the PostgreSQL handle and apply the embedded schema.
//! - `BillingStore`: one async method per statement.
//! - `DbRepository`: the PostgreSQL implementation.
//! - `InMemoryStore`: a process-local implementation with the same semantics.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod reports;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::InMemoryStore;
pub use reports::{
    ImportBatch, ImportSummary, PendingInvoiceRow, PlatformTransactionRow, TotalPaidRow,
    TransactionListing,
};
pub use repository::DbRepository;
pub use store::BillingStore;
