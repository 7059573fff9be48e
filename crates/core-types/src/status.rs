/// The `transactions.status` value the reports filter on.
///
/// The column itself stays a plain string: imported data may carry any
/// status, and only `Completada` has a meaning to the reports.
pub struct TransactionStatus;

impl TransactionStatus {
    /// A settled transaction. The only status counted as revenue.
    pub const COMPLETED: &'static str = "Completada";

    /// Returns true if the status counts towards paid totals.
    pub fn is_completed(status: &str) -> bool {
        status == Self::COMPLETED
    }
}
