//! A process-local `BillingStore` that mirrors the SQL semantics of
//! `DbRepository`: unique identification numbers, delete blocked by
//! references, the same report filters and orderings.

use crate::DbError;
use crate::reports::{
    ImportBatch, ImportSummary, PendingInvoiceRow, PlatformTransactionRow, TotalPaidRow,
    TransactionListing,
};
use crate::store::BillingStore;
use async_trait::async_trait;
use core_types::{Customer, Invoice, NewCustomer, Platform, Transaction, TransactionStatus};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: BTreeMap<i32, Customer>,
    platforms: BTreeMap<i32, Platform>,
    invoices: BTreeMap<i32, Invoice>,
    transactions: BTreeMap<String, Transaction>,
    next_customer_id: i32,
    closed: bool,
}

impl Tables {
    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed {
            return Err(DbError::QueryError(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn identification_taken(&self, identification_number: &str, except: Option<i32>) -> bool {
        self.customers.values().any(|c| {
            c.identification_number == identification_number && Some(c.customer_id) != except
        })
    }

    fn is_referenced(&self, customer_id: i32) -> bool {
        self.transactions.values().any(|t| t.customer_id == customer_id)
            || self.invoices.values().any(|i| i.customer_id == customer_id)
    }

    fn allocate_customer_id(&mut self) -> i32 {
        let highest = self.customers.keys().next_back().copied().unwrap_or(0);
        self.next_customer_id = self.next_customer_id.max(highest) + 1;
        self.next_customer_id
    }
}

/// An in-memory implementation of `BillingStore`, guarded by a single lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<i32, DbError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        if tables.identification_taken(&customer.identification_number, None) {
            return Err(DbError::DuplicateIdentification(
                customer.identification_number.clone(),
            ));
        }

        let customer_id = tables.allocate_customer_id();
        tables.customers.insert(
            customer_id,
            Customer {
                customer_id,
                name: customer.name.clone(),
                identification_number: customer.identification_number.clone(),
                address: customer.address.clone(),
                phone: customer.phone.clone(),
                email: customer.email.clone(),
            },
        );
        Ok(customer_id)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        let mut customers: Vec<Customer> = tables.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.customer_id.cmp(&b.customer_id)));
        Ok(customers)
    }

    async fn get_customer(&self, customer_id: i32) -> Result<Customer, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        tables
            .customers
            .get(&customer_id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn update_customer(
        &self,
        customer_id: i32,
        customer: &NewCustomer,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        if !tables.customers.contains_key(&customer_id) {
            return Err(DbError::NotFound);
        }
        if tables.identification_taken(&customer.identification_number, Some(customer_id)) {
            return Err(DbError::DuplicateIdentification(
                customer.identification_number.clone(),
            ));
        }

        if let Some(existing) = tables.customers.get_mut(&customer_id) {
            existing.name = customer.name.clone();
            existing.identification_number = customer.identification_number.clone();
            existing.address = customer.address.clone();
            existing.phone = customer.phone.clone();
            existing.email = customer.email.clone();
        }
        Ok(())
    }

    async fn delete_customer(&self, customer_id: i32) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;
        if !tables.customers.contains_key(&customer_id) {
            return Err(DbError::NotFound);
        }
        if tables.is_referenced(customer_id) {
            return Err(DbError::HasDependents);
        }
        tables.customers.remove(&customer_id);
        Ok(())
    }

    async fn list_platforms(&self) -> Result<Vec<Platform>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        Ok(tables.platforms.values().cloned().collect())
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionListing>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;
        let mut rows: Vec<TransactionListing> = tables
            .transactions
            .values()
            .map(|t| TransactionListing {
                transaction: t.clone(),
                customer_name: tables.customers.get(&t.customer_id).map(|c| c.name.clone()),
                platform_name: tables.platforms.get(&t.platform_id).map(|p| p.name.clone()),
                invoice_number: t
                    .invoice_id
                    .and_then(|id| tables.invoices.get(&id))
                    .map(|i| i.number_invoices.clone()),
            })
            .collect();
        // BTreeMap iteration already orders ties by transaction_id.
        rows.sort_by_key(|row| Reverse(row.transaction.transaction_datetime));
        Ok(rows)
    }

    async fn total_paid_report(&self) -> Result<Vec<TotalPaidRow>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;

        let mut totals: BTreeMap<i32, (Decimal, i64)> = BTreeMap::new();
        for t in tables
            .transactions
            .values()
            .filter(|t| TransactionStatus::is_completed(&t.status))
        {
            let entry = totals.entry(t.customer_id).or_insert((Decimal::ZERO, 0));
            entry.0 += t.amount;
            entry.1 += 1;
        }

        let mut rows: Vec<TotalPaidRow> = totals
            .into_iter()
            .filter_map(|(customer_id, (total_paid, transactions_count))| {
                tables.customers.get(&customer_id).map(|c| TotalPaidRow {
                    customer_id,
                    name: c.name.clone(),
                    identification_number: c.identification_number.clone(),
                    total_paid,
                    transactions_count,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total_paid
                .cmp(&a.total_paid)
                .then(a.customer_id.cmp(&b.customer_id))
        });
        Ok(rows)
    }

    async fn pending_invoices_report(&self) -> Result<Vec<PendingInvoiceRow>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;

        let mut rows = Vec::new();
        for invoice in tables.invoices.values().filter(|i| i.is_pending()) {
            let Some(customer) = tables.customers.get(&invoice.customer_id) else {
                continue;
            };
            let mut linked: Vec<&Transaction> = tables
                .transactions
                .values()
                .filter(|t| t.invoice_id == Some(invoice.invoice_id))
                .collect();
            linked.sort_by_key(|t| t.transaction_datetime);

            let base = PendingInvoiceRow {
                invoice_id: invoice.invoice_id,
                number_invoices: invoice.number_invoices.clone(),
                billing_period: invoice.billing_period,
                billed_amount: invoice.billed_amount,
                paid_amount: invoice.paid_amount,
                pending_amount: invoice.pending_amount(),
                customer_id: customer.customer_id,
                customer_name: customer.name.clone(),
                email: customer.email.clone(),
                transaction_id: None,
                transaction_amount: None,
                transaction_status: None,
                transaction_datetime: None,
            };

            if linked.is_empty() {
                rows.push(base);
                continue;
            }
            for t in linked {
                rows.push(PendingInvoiceRow {
                    transaction_id: Some(t.transaction_id.clone()),
                    transaction_amount: Some(t.amount),
                    transaction_status: Some(t.status.clone()),
                    transaction_datetime: Some(t.transaction_datetime),
                    ..base.clone()
                });
            }
        }
        // Stable sort keeps the invoice_id / datetime order within equal balances.
        rows.sort_by_key(|row| Reverse(row.pending_amount));
        Ok(rows)
    }

    async fn transactions_by_platform(
        &self,
        platform_id: i32,
    ) -> Result<Vec<PlatformTransactionRow>, DbError> {
        let tables = self.tables.read().await;
        tables.ensure_open()?;

        let Some(platform) = tables.platforms.get(&platform_id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<PlatformTransactionRow> = tables
            .transactions
            .values()
            .filter(|t| t.platform_id == platform_id)
            .filter_map(|t| {
                let customer = tables.customers.get(&t.customer_id)?;
                let invoice = tables.invoices.get(&t.invoice_id?)?;
                Some(PlatformTransactionRow {
                    transaction_id: t.transaction_id.clone(),
                    transaction_datetime: t.transaction_datetime,
                    amount: t.amount,
                    status: t.status.clone(),
                    platform_name: platform.name.clone(),
                    customer_id: customer.customer_id,
                    customer_name: customer.name.clone(),
                    number_invoices: invoice.number_invoices.clone(),
                    billing_period: invoice.billing_period,
                })
            })
            .collect();
        rows.sort_by_key(|row| Reverse(row.transaction_datetime));
        Ok(rows)
    }

    async fn import_batch(&self, batch: &ImportBatch) -> Result<ImportSummary, DbError> {
        let mut tables = self.tables.write().await;
        tables.ensure_open()?;

        // Work on a copy so a rejected batch leaves the store untouched.
        let mut staged = tables.clone();
        let mut summary = ImportSummary::default();

        for platform in &batch.platforms {
            staged.platforms.insert(platform.platform_id, platform.clone());
            summary.platforms += 1;
        }

        for customer in &batch.customers {
            let taken = staged
                .identification_taken(&customer.identification_number, Some(customer.customer_id));
            if taken {
                return Err(DbError::DuplicateIdentification(
                    customer.identification_number.clone(),
                ));
            }
            staged.customers.insert(customer.customer_id, customer.clone());
            summary.customers += 1;
        }

        for invoice in &batch.invoices {
            if !staged.customers.contains_key(&invoice.customer_id) {
                return Err(DbError::InvalidImport(format!(
                    "invoice {} references unknown customer {}",
                    invoice.invoice_id, invoice.customer_id
                )));
            }
            match staged.invoices.get_mut(&invoice.invoice_id) {
                Some(existing) => existing.number_invoices = invoice.number_invoices.clone(),
                None => {
                    staged.invoices.insert(invoice.invoice_id, invoice.clone());
                }
            }
            summary.invoices += 1;
        }

        for transaction in &batch.transactions {
            if !staged.customers.contains_key(&transaction.customer_id) {
                return Err(DbError::InvalidImport(format!(
                    "transaction {} references unknown customer {}",
                    transaction.transaction_id, transaction.customer_id
                )));
            }
            if !staged.platforms.contains_key(&transaction.platform_id) {
                return Err(DbError::InvalidImport(format!(
                    "transaction {} references unknown platform {}",
                    transaction.transaction_id, transaction.platform_id
                )));
            }
            if let Some(invoice_id) = transaction.invoice_id {
                if !staged.invoices.contains_key(&invoice_id) {
                    return Err(DbError::InvalidImport(format!(
                        "transaction {} references unknown invoice {}",
                        transaction.transaction_id, invoice_id
                    )));
                }
            }
            if !staged.transactions.contains_key(&transaction.transaction_id) {
                staged
                    .transactions
                    .insert(transaction.transaction_id.clone(), transaction.clone());
                summary.transactions += 1;
            }
        }

        *tables = staged;
        Ok(summary)
    }

    async fn close(&self) {
        self.tables.write().await.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn new_customer(name: &str, identification_number: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            identification_number: identification_number.to_string(),
            address: "Calle 1".to_string(),
            phone: "555".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn transaction(
        id: &str,
        when: &str,
        amount: Decimal,
        status: &str,
        customer_id: i32,
        invoice_id: Option<i32>,
    ) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            transaction_datetime: at(when),
            amount,
            status: status.to_string(),
            transaction_type: Some("Pago de Factura".to_string()),
            customer_id,
            platform_id: 1,
            invoice_id,
        }
    }

    fn invoice(invoice_id: i32, customer_id: i32, billed: Decimal, paid: Decimal) -> Invoice {
        Invoice {
            invoice_id,
            number_invoices: format!("FAC{invoice_id:03}"),
            billing_period: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            billed_amount: billed,
            paid_amount: paid,
            customer_id,
        }
    }

    fn platform() -> Platform {
        Platform { platform_id: 1, name: "Nequi".to_string() }
    }

    #[tokio::test]
    async fn identification_numbers_are_unique() {
        let store = InMemoryStore::new();
        store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        let err = store.create_customer(&new_customer("Otra", "123")).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateIdentification(id) if id == "123"));
        assert_eq!(store.list_customers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_may_keep_its_own_identification_number() {
        let store = InMemoryStore::new();
        let id = store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        store.update_customer(id, &new_customer("Ana Maria", "123")).await.unwrap();
        assert_eq!(store.get_customer(id).await.unwrap().name, "Ana Maria");
    }

    #[tokio::test]
    async fn customers_are_listed_by_name() {
        let store = InMemoryStore::new();
        store.create_customer(&new_customer("Zoe", "1")).await.unwrap();
        store.create_customer(&new_customer("Ana", "2")).await.unwrap();
        let names: Vec<String> = store
            .list_customers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Zoe"]);
    }

    #[tokio::test]
    async fn generated_ids_skip_imported_ones() {
        let store = InMemoryStore::new();
        let imported = Customer {
            customer_id: 10,
            name: "Imported".to_string(),
            identification_number: "999".to_string(),
            address: "X".to_string(),
            phone: "1".to_string(),
            email: "i@x.com".to_string(),
        };
        store
            .import_batch(&ImportBatch { customers: vec![imported], ..Default::default() })
            .await
            .unwrap();
        let id = store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        assert_eq!(id, 11);
    }

    #[tokio::test]
    async fn import_clashing_with_an_api_customer_is_rejected() {
        let store = InMemoryStore::new();
        let ana = store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        let clash = Customer {
            customer_id: ana + 10,
            name: "Imported".to_string(),
            identification_number: "123".to_string(),
            address: "X".to_string(),
            phone: "1".to_string(),
            email: "i@x.com".to_string(),
        };
        let batch = ImportBatch {
            platforms: vec![platform()],
            customers: vec![clash],
            ..Default::default()
        };

        let err = store.import_batch(&batch).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateIdentification(id) if id == "123"));
        let customers = store.list_customers().await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, "Ana");
        assert!(store.list_platforms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_import_leaves_store_untouched() {
        let store = InMemoryStore::new();
        let batch = ImportBatch {
            platforms: vec![platform()],
            transactions: vec![transaction(
                "TXN001",
                "2024-06-01 10:00:00",
                dec!(10),
                "Completada",
                42,
                None,
            )],
            ..Default::default()
        };
        let err = store.import_batch(&batch).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidImport(_)));
        assert!(store.list_platforms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_invoice_without_transactions_yields_one_row() {
        let store = InMemoryStore::new();
        let id = store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        let batch = ImportBatch {
            platforms: vec![platform()],
            invoices: vec![
                invoice(1, id, dec!(300), dec!(100)),
                invoice(2, id, dec!(500), dec!(0)),
                invoice(3, id, dec!(50), dec!(50)),
            ],
            transactions: vec![
                transaction("TXN001", "2024-06-02 10:00:00", dec!(60), "Completada", id, Some(1)),
                transaction("TXN002", "2024-06-01 10:00:00", dec!(40), "Completada", id, Some(1)),
            ],
            ..Default::default()
        };
        store.import_batch(&batch).await.unwrap();

        let rows = store.pending_invoices_report().await.unwrap();
        let shape: Vec<(i32, Option<&str>)> = rows
            .iter()
            .map(|r| (r.invoice_id, r.transaction_id.as_deref()))
            .collect();
        assert_eq!(shape, vec![(2, None), (1, Some("TXN002")), (1, Some("TXN001"))]);
        assert_eq!(rows[0].pending_amount, dec!(500));
    }

    #[tokio::test]
    async fn transactions_without_invoice_are_left_out_of_platform_report() {
        let store = InMemoryStore::new();
        let id = store.create_customer(&new_customer("Ana", "123")).await.unwrap();
        let batch = ImportBatch {
            platforms: vec![platform()],
            invoices: vec![invoice(1, id, dec!(100), dec!(100))],
            transactions: vec![
                transaction("TXN001", "2024-06-01 10:00:00", dec!(60), "Completada", id, Some(1)),
                transaction("TXN002", "2024-06-03 10:00:00", dec!(40), "Completada", id, None),
            ],
            ..Default::default()
        };
        store.import_batch(&batch).await.unwrap();

        let by_platform = store.transactions_by_platform(1).await.unwrap();
        assert_eq!(by_platform.len(), 1);
        assert_eq!(by_platform[0].platform_name, "Nequi");
        assert!(store.transactions_by_platform(2).await.unwrap().is_empty());

        let listing = store.list_transactions().await.unwrap();
        assert_eq!(listing[0].transaction.transaction_id, "TXN002");
        assert_eq!(listing[0].invoice_number, None);
        assert_eq!(listing[1].invoice_number.as_deref(), Some("FAC001"));
    }

    #[tokio::test]
    async fn closed_store_refuses_queries() {
        let store = InMemoryStore::new();
        store.close().await;
        assert!(store.list_customers().await.is_err());
    }
}
