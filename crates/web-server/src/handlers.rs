use crate::import::{ImportReport, ImportStatus};
use crate::{error::AppError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use core_types::{Customer, CustomerPayload, Platform};
use database::{PendingInvoiceRow, PlatformTransactionRow, TotalPaidRow, TransactionListing};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerCreated {
    pub message: String,
    pub customer_id: i32,
}

#[derive(Debug, Serialize)]
pub struct ImportSucceeded {
    pub message: String,
    pub output: String,
}

/// Path ids that are not integers cannot match any row.
fn parse_id(raw: &str, missing: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::NotFound(missing.to_string()))
}

fn customer_payload(
    payload: Result<Json<CustomerPayload>, JsonRejection>,
) -> Result<CustomerPayload, AppError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// # POST /api/customers
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CustomerPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerCreated>), AppError> {
    let customer = customer_payload(payload)?.validate_into()?;
    let customer_id = state.store.create_customer(&customer).await?;
    tracing::info!(customer_id, "Customer created.");
    Ok((
        StatusCode::CREATED,
        Json(CustomerCreated {
            message: "Customer created successfully".to_string(),
            customer_id,
        }),
    ))
}

/// # GET /api/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = state.store.list_customers().await?;
    Ok(Json(customers))
}

/// # GET /api/customers/:id
pub async fn get_customer(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Customer>, AppError> {
    let customer_id = parse_id(&id, "Customer not found")?;
    let customer = state
        .store
        .get_customer(customer_id)
        .await
        .map_err(AppError::customer)?;
    Ok(Json(customer))
}

/// # PUT /api/customers/:id
/// Replaces all five fields; never creates a customer.
pub async fn update_customer(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CustomerPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let customer = customer_payload(payload)?.validate_into()?;
    let customer_id = parse_id(&id, "Customer not found")?;
    state
        .store
        .update_customer(customer_id, &customer)
        .await
        .map_err(AppError::customer)?;
    tracing::info!(customer_id, "Customer updated.");
    Ok(MessageResponse::new("Customer updated successfully"))
}

/// # DELETE /api/customers/:id
pub async fn delete_customer(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let customer_id = parse_id(&id, "Customer not found")?;
    state
        .store
        .delete_customer(customer_id)
        .await
        .map_err(AppError::customer)?;
    tracing::info!(customer_id, "Customer deleted.");
    Ok(MessageResponse::new("Customer deleted successfully"))
}

/// # GET /api/platforms
pub async fn list_platforms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Platform>>, AppError> {
    let platforms = state.store.list_platforms().await?;
    Ok(Json(platforms))
}

/// # GET /api/transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransactionListing>>, AppError> {
    let transactions = state.store.list_transactions().await?;
    Ok(Json(transactions))
}

/// # GET /api/reports/total-paid
pub async fn total_paid_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TotalPaidRow>>, AppError> {
    let rows = state.store.total_paid_report().await?;
    Ok(Json(rows))
}

/// # GET /api/reports/pending-invoices
pub async fn pending_invoices_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PendingInvoiceRow>>, AppError> {
    let rows = state.store.pending_invoices_report().await?;
    Ok(Json(rows))
}

/// # GET /api/reports/transactions-by-platform/:platform_id
pub async fn transactions_by_platform(
    Path(platform_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlatformTransactionRow>>, AppError> {
    let platform_id = parse_id(&platform_id, "Platform not found")?;
    let rows = state.store.transactions_by_platform(platform_id).await?;
    Ok(Json(rows))
}

/// # POST /api/import-data
/// Runs the CSV importer and waits for it. The importer's own output is returned verbatim.
pub async fn trigger_import(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportSucceeded>, AppError> {
    let report = state.importer.run().await;
    match report.status {
        ImportStatus::Succeeded => Ok(Json(ImportSucceeded {
            message: "Data imported successfully".to_string(),
            output: report.output,
        })),
        ImportStatus::Failed => Err(AppError::ImportFailed {
            error: "Import failed".to_string(),
            details: report.output,
        }),
    }
}

/// # GET /api/import-data
/// The outcome of the most recent import.
pub async fn last_import(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportReport>, AppError> {
    state
        .importer
        .last_report()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No import has run yet".to_string()))
}

/// Any other path under `/api`.
pub async fn api_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
