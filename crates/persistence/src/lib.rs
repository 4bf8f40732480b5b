//! Persistence for the SMS receptionist
//!
//! Everything is stored as append-only rows in two tabs per tenant:
//! - `messages`: inbound/outbound turns, compliance events, delivery
//!   callbacks, and session/proposal snapshots carried in the notes column
//! - `bookings`: booking versions; the latest row per booking id is current
//!
//! The row store is either process-local (development, tests) or ScyllaDB.
//! Callers use the narrow [`BookingRepository`] on top of it.

pub mod client;
pub mod error;
pub mod history;
pub mod repository;
pub mod rows;
pub mod schema;
pub mod store;

use std::sync::Arc;

use receptionist_config::{PersistenceConfig, StorageBackend};

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use history::{collect_turns, HistoryQuery, HistoryWindow};
pub use repository::{BookingRepository, RowBookingRepository};
pub use rows::{Direction, MessageRow, BOOKING_COLUMNS};
pub use store::{InMemoryRowStore, RowRange, RowStore, ScyllaRowStore, Tab};

/// Row store plus the repository built on it
#[derive(Clone)]
pub struct PersistenceLayer {
    pub store: Arc<dyn RowStore>,
    pub repository: Arc<dyn BookingRepository>,
}

impl PersistenceLayer {
    pub fn from_store(store: Arc<dyn RowStore>, scan_limit: usize) -> Self {
        let repository = Arc::new(RowBookingRepository::new(store.clone(), scan_limit));
        Self { store, repository }
    }

    pub fn in_memory(scan_limit: usize) -> Self {
        Self::from_store(Arc::new(InMemoryRowStore::new()), scan_limit)
    }
}

/// Initialize the configured backend. ScyllaDB connects and ensures the
/// schema before returning.
pub async fn init(config: &PersistenceConfig) -> Result<PersistenceLayer, PersistenceError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory row store");
            Ok(PersistenceLayer::in_memory(config.scan_limit))
        },
        StorageBackend::Scylla => {
            let client = ScyllaClient::connect(ScyllaConfig::from(config)).await?;
            client.ensure_schema().await?;
            Ok(PersistenceLayer::from_store(
                Arc::new(ScyllaRowStore::new(client)),
                config.scan_limit,
            ))
        },
    }
}
