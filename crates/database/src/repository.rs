use crate::DbError;
use crate::reports::{
    ImportBatch, ImportSummary, PendingInvoiceRow, PlatformTransactionRow, TotalPaidRow,
    TransactionListing,
};
use crate::store::BillingStore;
use async_trait::async_trait;
use core_types::{Customer, NewCustomer, Platform, TransactionStatus};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;

/// Moves each identity sequence past the highest id present, so rows inserted
/// with explicit ids by the importer never collide with generated ones.
const RESYNC_SEQUENCES: [&str; 3] = [
    r#"
    SELECT setval(
        pg_get_serial_sequence('platforms', 'platform_id'),
        COALESCE((SELECT MAX(platform_id) FROM platforms), 0) + 1,
        false
    )
    "#,
    r#"
    SELECT setval(
        pg_get_serial_sequence('customers', 'customer_id'),
        COALESCE((SELECT MAX(customer_id) FROM customers), 0) + 1,
        false
    )
    "#,
    r#"
    SELECT setval(
        pg_get_serial_sequence('invoices', 'invoice_id'),
        COALESCE((SELECT MAX(invoice_id) FROM invoices), 0) + 1,
        false
    )
    "#,
];

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` over an already-connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for DbRepository {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<i32, DbError> {
        let customer_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO customers (name, identification_number, address, phone, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING customer_id
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.identification_number)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(&customer.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_customer_write(e, &customer.identification_number))?;

        Ok(customer_id)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, DbError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, identification_number, address, phone, email
            FROM customers
            ORDER BY name, customer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    async fn get_customer(&self, customer_id: i32) -> Result<Customer, DbError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, name, identification_number, address, phone, email
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(customer)
    }

    async fn update_customer(
        &self,
        customer_id: i32,
        customer: &NewCustomer,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = $1, identification_number = $2, address = $3, phone = $4, email = $5
            WHERE customer_id = $6
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.identification_number)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_customer_write(e, &customer.identification_number))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete_customer(&self, customer_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM customers WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_customer_delete)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn list_platforms(&self) -> Result<Vec<Platform>, DbError> {
        let platforms = sqlx::query_as::<_, Platform>(
            "SELECT platform_id, name FROM platforms ORDER BY platform_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(platforms)
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionListing>, DbError> {
        let rows = sqlx::query_as::<_, TransactionListing>(
            r#"
            SELECT
                t.transaction_id,
                t.transaction_datetime,
                t.amount,
                t.status,
                t.transaction_type,
                t.customer_id,
                t.platform_id,
                t.invoice_id,
                c.name AS customer_name,
                p.name AS platform_name,
                i.number_invoices AS invoice_number
            FROM transactions t
            LEFT JOIN customers c ON t.customer_id = c.customer_id
            LEFT JOIN platforms p ON t.platform_id = p.platform_id
            LEFT JOIN invoices i ON t.invoice_id = i.invoice_id
            ORDER BY t.transaction_datetime DESC, t.transaction_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn total_paid_report(&self) -> Result<Vec<TotalPaidRow>, DbError> {
        let rows = sqlx::query_as::<_, TotalPaidRow>(
            r#"
            SELECT
                c.customer_id,
                c.name,
                c.identification_number,
                SUM(t.amount) AS total_paid,
                COUNT(t.transaction_id) AS transactions_count
            FROM customers c
            JOIN transactions t ON c.customer_id = t.customer_id
            WHERE t.status = $1
            GROUP BY c.customer_id, c.name, c.identification_number
            ORDER BY total_paid DESC, c.customer_id
            "#,
        )
        .bind(TransactionStatus::COMPLETED)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pending_invoices_report(&self) -> Result<Vec<PendingInvoiceRow>, DbError> {
        let rows = sqlx::query_as::<_, PendingInvoiceRow>(
            r#"
            SELECT
                i.invoice_id,
                i.number_invoices,
                i.billing_period,
                i.billed_amount,
                i.paid_amount,
                (i.billed_amount - i.paid_amount) AS pending_amount,
                c.customer_id,
                c.name AS customer_name,
                c.email,
                t.transaction_id,
                t.amount AS transaction_amount,
                t.status AS transaction_status,
                t.transaction_datetime
            FROM invoices i
            JOIN customers c ON i.customer_id = c.customer_id
            LEFT JOIN transactions t ON i.invoice_id = t.invoice_id
            WHERE i.paid_amount < i.billed_amount
            ORDER BY pending_amount DESC, i.invoice_id, t.transaction_datetime
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn transactions_by_platform(
        &self,
        platform_id: i32,
    ) -> Result<Vec<PlatformTransactionRow>, DbError> {
        let rows = sqlx::query_as::<_, PlatformTransactionRow>(
            r#"
            SELECT
                t.transaction_id,
                t.transaction_datetime,
                t.amount,
                t.status,
                p.name AS platform_name,
                c.customer_id,
                c.name AS customer_name,
                i.number_invoices,
                i.billing_period
            FROM transactions t
            JOIN platforms p ON t.platform_id = p.platform_id
            JOIN customers c ON t.customer_id = c.customer_id
            JOIN invoices i ON t.invoice_id = i.invoice_id
            WHERE t.platform_id = $1
            ORDER BY t.transaction_datetime DESC, t.transaction_id
            "#,
        )
        .bind(platform_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Writes the batch within a single transaction, then resyncs the identity sequences.
    async fn import_batch(&self, batch: &ImportBatch) -> Result<ImportSummary, DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;
        let mut summary = ImportSummary::default();

        for platform in &batch.platforms {
            summary.platforms += sqlx::query(
                r#"
                INSERT INTO platforms (platform_id, name)
                VALUES ($1, $2)
                ON CONFLICT (platform_id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(platform.platform_id)
            .bind(&platform.name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for customer in &batch.customers {
            summary.customers += sqlx::query(
                r#"
                INSERT INTO customers
                    (customer_id, name, identification_number, address, phone, email)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (customer_id) DO UPDATE SET
                    name = EXCLUDED.name,
                    identification_number = EXCLUDED.identification_number,
                    address = EXCLUDED.address,
                    phone = EXCLUDED.phone,
                    email = EXCLUDED.email
                "#,
            )
            .bind(customer.customer_id)
            .bind(&customer.name)
            .bind(&customer.identification_number)
            .bind(&customer.address)
            .bind(&customer.phone)
            .bind(&customer.email)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_customer_write(e, &customer.identification_number))?
            .rows_affected();
        }

        for invoice in &batch.invoices {
            summary.invoices += sqlx::query(
                r#"
                INSERT INTO invoices (
                    invoice_id, number_invoices, billing_period,
                    billed_amount, paid_amount, customer_id
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (invoice_id) DO UPDATE SET number_invoices = EXCLUDED.number_invoices
                "#,
            )
            .bind(invoice.invoice_id)
            .bind(&invoice.number_invoices)
            .bind(invoice.billing_period)
            .bind(invoice.billed_amount)
            .bind(invoice.paid_amount)
            .bind(invoice.customer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for transaction in &batch.transactions {
            summary.transactions += sqlx::query(
                r#"
                INSERT INTO transactions (
                    transaction_id, transaction_datetime, amount, status,
                    transaction_type, customer_id, platform_id, invoice_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (transaction_id) DO NOTHING
                "#,
            )
            .bind(&transaction.transaction_id)
            .bind(transaction.transaction_datetime)
            .bind(transaction.amount)
            .bind(&transaction.status)
            .bind(&transaction.transaction_type)
            .bind(transaction.customer_id)
            .bind(transaction.platform_id)
            .bind(transaction.invoice_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for statement in RESYNC_SEQUENCES {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::info!(?summary, "Import batch committed.");
        Ok(summary)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed.");
    }
}
