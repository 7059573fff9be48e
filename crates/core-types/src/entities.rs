use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customers` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i32,
    pub name: String,
    /// Unique across all customers.
    pub identification_number: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// A row from the `platforms` table. Reference data for where a transaction originated.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Platform {
    pub platform_id: i32,
    pub name: String,
}

/// A row from the `invoices` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: i32,
    pub number_invoices: String,
    /// First day of the billed month.
    pub billing_period: NaiveDate,
    pub billed_amount: Decimal,
    pub paid_amount: Decimal,
    pub customer_id: i32,
}

impl Invoice {
    /// Amount still owed. Negative when the invoice was overpaid.
    pub fn pending_amount(&self) -> Decimal {
        self.billed_amount - self.paid_amount
    }

    pub fn is_pending(&self) -> bool {
        self.paid_amount < self.billed_amount
    }
}

/// A row from the `transactions` table. Transactions are never modified through the API.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub transaction_datetime: NaiveDateTime,
    pub amount: Decimal,
    pub status: String,
    pub transaction_type: Option<String>,
    pub customer_id: i32,
    pub platform_id: i32,
    pub invoice_id: Option<i32>,
}
