use chrono::{NaiveDate, NaiveDateTime};
use core_types::{Customer, Invoice, Platform, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A transaction with the display names of the rows it references.
///
/// Labels are optional because the listing uses outer joins.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TransactionListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: Transaction,
    pub customer_name: Option<String>,
    pub platform_name: Option<String>,
    pub invoice_number: Option<String>,
}

/// One row of the total-paid report: revenue from completed transactions per customer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TotalPaidRow {
    pub customer_id: i32,
    pub name: String,
    pub identification_number: String,
    pub total_paid: Decimal,
    pub transactions_count: i64,
}

/// One row of the pending-invoices report.
///
/// An invoice with several transactions appears once per transaction; an
/// invoice with none appears once with empty transaction columns.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PendingInvoiceRow {
    pub invoice_id: i32,
    pub number_invoices: String,
    pub billing_period: NaiveDate,
    pub billed_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub customer_id: i32,
    pub customer_name: String,
    pub email: String,
    pub transaction_id: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub transaction_status: Option<String>,
    pub transaction_datetime: Option<NaiveDateTime>,
}

/// One row of the transactions-by-platform report.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PlatformTransactionRow {
    pub transaction_id: String,
    pub transaction_datetime: NaiveDateTime,
    pub amount: Decimal,
    pub status: String,
    pub platform_name: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub number_invoices: String,
    pub billing_period: NaiveDate,
}

/// Rows loaded by the CSV importer, applied in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    pub platforms: Vec<Platform>,
    pub customers: Vec<Customer>,
    pub invoices: Vec<Invoice>,
    pub transactions: Vec<Transaction>,
}

/// Rows written per table by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub platforms: u64,
    pub customers: u64,
    pub invoices: u64,
    pub transactions: u64,
}
