use crate::error::ImportError;
use chrono::{NaiveDate, NaiveDateTime};
use core_types::{Customer, Invoice, Platform, Transaction};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const PLATFORMS_FILE: &str = "platforms.csv";
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const INVOICES_FILE: &str = "invoices.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct InvoiceRecord {
    invoice_id: i32,
    number_invoices: String,
    /// `YYYY-MM`
    billing_period: String,
    billed_amount: String,
    paid_amount: String,
    customer_id: i32,
}

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    transaction_id: String,
    transaction_datetime: String,
    amount: String,
    status: String,
    transaction_type: Option<String>,
    customer_id: i32,
    platform_id: i32,
    invoice_id: Option<i32>,
}

/// Reads every data row of `name` together with its line number.
///
/// Tolerates a leading UTF-8 BOM and surrounding whitespace in fields.
fn read_rows<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<(u64, T)>, ImportError> {
    let path = dir.join(name);
    let content = fs::read_to_string(&path).map_err(|source| ImportError::Io {
        file: path.clone(),
        source,
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let csv_error = |source| ImportError::Csv {
        file: path.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = record.deserialize::<T>(Some(&headers)).map_err(csv_error)?;
        rows.push((line, row));
    }
    Ok(rows)
}

fn invalid(file: &str, line: u64, column: &'static str, value: &str) -> ImportError {
    ImportError::InvalidValue {
        file: file.to_string(),
        line,
        column,
        value: value.to_string(),
    }
}

fn parse_amount(
    file: &str,
    line: u64,
    column: &'static str,
    value: &str,
) -> Result<Decimal, ImportError> {
    Decimal::from_str(value).map_err(|_| invalid(file, line, column, value))
}

pub fn read_platforms(dir: &Path) -> Result<Vec<Platform>, ImportError> {
    Ok(read_rows::<Platform>(dir, PLATFORMS_FILE)?
        .into_iter()
        .map(|(_, platform)| platform)
        .collect())
}

pub fn read_customers(dir: &Path) -> Result<Vec<Customer>, ImportError> {
    Ok(read_rows::<Customer>(dir, CUSTOMERS_FILE)?
        .into_iter()
        .map(|(_, customer)| customer)
        .collect())
}

pub fn read_invoices(dir: &Path) -> Result<Vec<Invoice>, ImportError> {
    read_rows::<InvoiceRecord>(dir, INVOICES_FILE)?
        .into_iter()
        .map(|(line, record)| {
            let billing_period =
                NaiveDate::parse_from_str(&format!("{}-01", record.billing_period), "%Y-%m-%d")
                    .map_err(|_| {
                        invalid(INVOICES_FILE, line, "billing_period", &record.billing_period)
                    })?;
            Ok(Invoice {
                invoice_id: record.invoice_id,
                number_invoices: record.number_invoices,
                billing_period,
                billed_amount: parse_amount(
                    INVOICES_FILE,
                    line,
                    "billed_amount",
                    &record.billed_amount,
                )?,
                paid_amount: parse_amount(INVOICES_FILE, line, "paid_amount", &record.paid_amount)?,
                customer_id: record.customer_id,
            })
        })
        .collect()
}

pub fn read_transactions(dir: &Path) -> Result<Vec<Transaction>, ImportError> {
    read_rows::<TransactionRecord>(dir, TRANSACTIONS_FILE)?
        .into_iter()
        .map(|(line, record)| {
            let transaction_datetime =
                NaiveDateTime::parse_from_str(&record.transaction_datetime, DATETIME_FORMAT)
                    .map_err(|_| {
                        invalid(
                            TRANSACTIONS_FILE,
                            line,
                            "transaction_datetime",
                            &record.transaction_datetime,
                        )
                    })?;
            Ok(Transaction {
                amount: parse_amount(TRANSACTIONS_FILE, line, "amount", &record.amount)?,
                transaction_id: record.transaction_id,
                transaction_datetime,
                status: record.status,
                transaction_type: record.transaction_type.filter(|t| !t.is_empty()),
                customer_id: record.customer_id,
                platform_id: record.platform_id,
                invoice_id: record.invoice_id,
            })
        })
        .collect()
}
