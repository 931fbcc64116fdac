//! Shared application state

use std::sync::Arc;

use crate::cache::OrderCache;

/// Handler state; `Arc` makes clones cheap.
#[derive(Clone)]
pub struct AppState {
    /// Cache-fronted order reads
    pub cache: Arc<OrderCache>,
}
