//! Service-layer error taxonomy
//!
//! Two variants cover the whole read/persistence path: a missing order is
//! surfaced distinctly, everything else collapses into `Persistence` and is
//! shown to callers as a generic failure. Decode and validation failures on
//! the ingestion path never reach this type; they are terminal per-message.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No order with the requested identifier
    #[error("order not found")]
    NotFound,
    /// Store unavailable or query failure
    #[error("persistence error: {0}")]
    Persistence(BoxError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ServiceError::NotFound,
            other => ServiceError::Persistence(other.into()),
        }
    }
}
