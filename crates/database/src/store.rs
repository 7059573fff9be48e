use crate::error::DbError;
use crate::reports::{
    ImportBatch, ImportSummary, PendingInvoiceRow, PlatformTransactionRow, TotalPaidRow,
    TransactionListing,
};
use async_trait::async_trait;
use core_types::{Customer, NewCustomer, Platform};

/// Every statement the application issues, one method per statement.
///
/// Implemented by `DbRepository` for PostgreSQL and by `InMemoryStore` for
/// tests and demos. The web server only sees `Arc<dyn BillingStore>`.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Inserts a customer and returns its generated id.
    ///
    /// Fails with `DuplicateIdentification` when the identification number is taken.
    async fn create_customer(&self, customer: &NewCustomer) -> Result<i32, DbError>;

    /// All customers ordered by name.
    async fn list_customers(&self) -> Result<Vec<Customer>, DbError>;

    async fn get_customer(&self, customer_id: i32) -> Result<Customer, DbError>;

    /// Replaces all five fields. `NotFound` when the id does not exist; no row is created.
    async fn update_customer(&self, customer_id: i32, customer: &NewCustomer)
    -> Result<(), DbError>;

    /// `HasDependents` while transactions or invoices still reference the customer.
    async fn delete_customer(&self, customer_id: i32) -> Result<(), DbError>;

    async fn list_platforms(&self) -> Result<Vec<Platform>, DbError>;

    /// All transactions, newest first, with customer/platform/invoice labels.
    async fn list_transactions(&self) -> Result<Vec<TransactionListing>, DbError>;

    /// Sum and count of completed transactions per customer, highest total first.
    /// Customers without completed transactions are absent.
    async fn total_paid_report(&self) -> Result<Vec<TotalPaidRow>, DbError>;

    /// Invoices with `paid_amount < billed_amount`, largest outstanding balance first.
    async fn pending_invoices_report(&self) -> Result<Vec<PendingInvoiceRow>, DbError>;

    /// Transactions of one platform that are attached to an invoice, newest first.
    async fn transactions_by_platform(
        &self,
        platform_id: i32,
    ) -> Result<Vec<PlatformTransactionRow>, DbError>;

    /// Upserts a whole CSV load atomically: either every row is written or none.
    async fn import_batch(&self, batch: &ImportBatch) -> Result<ImportSummary, DbError>;

    /// Releases the underlying connection. Further calls fail.
    async fn close(&self);
}
