//! Resource store interface used by the dispatcher's existence checks.
//!
//! The dispatcher only ever opens a transaction, counts matching records
//! and commits. Writes are the business handlers' own concern and go
//! through whatever API the concrete store offers.
//!
//! # Backends
//!
//! - [`InMemoryResourceStore`](memory::InMemoryResourceStore) -- thread-safe
//!   map-backed store, used in tests and demos.

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

pub use memory::InMemoryResourceStore;

/// Field/value pairs a record must match to be counted.
pub type Filter = Map<String, Value>;

/// Filter selecting a single resource by id.
pub fn id_filter(id: &str) -> Filter {
    let mut filter = Filter::new();
    filter.insert("id".to_string(), Value::String(id.to_string()));
    filter
}

/// A store of resources, grouped by resource type.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// [`StoreError::Begin`] if the backend cannot start one.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// A transaction scope over a [`ResourceStore`].
#[async_trait]
pub trait Transaction: Send {
    /// Counts records of `resource_type` matching every entry of `filter`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Query`] on backend failure.
    async fn count(&mut self, resource_type: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Ends the transaction.
    ///
    /// # Errors
    ///
    /// [`StoreError::Commit`] on backend failure.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
