//! Persistence layer
//!
//! `OrderStore` is the seam between the cache core and durable storage;
//! the cache never sees SQL. `PgOrderStore` is the production
//! implementation, tests substitute a counting mock.

pub mod orders;

pub use orders::PgOrderStore;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{BoxError, ServiceError};
use crate::model::{Order, OrderPreview, OrderResponse};

/// Outcome of a save. The identifier is the natural upsert key; a
/// redelivered identifier leaves the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Duplicate,
}

/// Durable, queryable order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the full aggregate, or report a duplicate without writing.
    async fn save(&self, order: &Order) -> Result<SaveOutcome, ServiceError>;
    /// Fetch the read view for one identifier.
    async fn get_by_id(&self, id: &str) -> Result<OrderResponse, ServiceError>;
    /// Fetch previews for the list endpoint. Zero rows is `NotFound`.
    async fn list_previews(&self) -> Result<Vec<OrderPreview>, ServiceError>;
    /// Bounded bulk read of full read views, used by the cache warm-load.
    async fn fetch_full(&self, limit: i64) -> Result<Vec<OrderResponse>, ServiceError>;
}

/// Connect the pool and run embedded migrations.
pub async fn connect(database_url: &str) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("connected to postgres");
    Ok(pool)
}
