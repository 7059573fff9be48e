use thiserror::Error;

/// Input rejected before it reaches a store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("All fields are required (missing: {})", .0.join(", "))]
    MissingFields(Vec<String>),
}
