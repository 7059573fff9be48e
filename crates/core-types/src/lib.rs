//! # Billing Core Types
//!
//! This crate defines the domain vocabulary shared by every other crate in the
//! workspace: the four persisted entities and the validated input used to
//! create or replace a customer.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** No knowledge of HTTP or of a particular storage engine. Row
//!   structs derive `sqlx::FromRow` so adapters can map them directly.
//! - **Validation at the boundary:** Loosely-typed request bodies are parsed
//!   into `CustomerPayload` and only become a `NewCustomer` once every field
//!   has been checked.
//!
//! ## Public API
//!
//! - `Customer`, `Platform`, `Invoice`, `Transaction`: the persisted entities.
//! - `CustomerPayload` / `NewCustomer`: wire-level and validated customer input.
//! - `TransactionStatus`: the status string counted as paid.
//! - `CoreError`: the specific error types that can be returned from this crate.

// Declare the modules that make up this crate.
pub mod entities;
pub mod error;
pub mod payload;
pub mod status;

// Re-export the core types to provide a clean public API.
pub use entities::{Customer, Invoice, Platform, Transaction};
pub use error::CoreError;
pub use payload::{CustomerPayload, NewCustomer};
pub use status::TransactionStatus;
