//! Append-only tabular row store
//!
//! Two tabs per tenant: the messages log and the bookings log. Rows are
//! opaque string columns; encoding lives in [`crate::rows`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Messages,
    Bookings,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Messages => "messages",
            Tab::Bookings => "bookings",
        }
    }
}

/// Which rows to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRange {
    All,
    /// The most recent N rows
    Last(usize),
}

#[async_trait]
pub trait RowStore: Send + Sync {
    async fn append_row(&self, tenant: &str, tab: Tab, columns: Vec<String>) -> Result<(), PersistenceError>;

    /// Rows in append order, oldest first.
    async fn read_rows(&self, tenant: &str, tab: Tab, range: RowRange) -> Result<Vec<Vec<String>>, PersistenceError>;
}

/// Process-local store for development and tests
#[derive(Default)]
pub struct InMemoryRowStore {
    tabs: RwLock<HashMap<(String, Tab), Vec<Vec<String>>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn append_row(&self, tenant: &str, tab: Tab, columns: Vec<String>) -> Result<(), PersistenceError> {
        self.tabs
            .write()
            .entry((tenant.to_string(), tab))
            .or_default()
            .push(columns);
        Ok(())
    }

    async fn read_rows(&self, tenant: &str, tab: Tab, range: RowRange) -> Result<Vec<Vec<String>>, PersistenceError> {
        let tabs = self.tabs.read();
        let Some(rows) = tabs.get(&(tenant.to_string(), tab)) else {
            return Ok(Vec::new());
        };
        let skip = match range {
            RowRange::All => 0,
            RowRange::Last(n) => rows.len().saturating_sub(n),
        };
        Ok(rows[skip..].to_vec())
    }
}

/// ScyllaDB-backed store
pub struct ScyllaRowStore {
    client: ScyllaClient,
    /// Strictly increasing append clock so rows written in the same
    /// microsecond keep their order.
    last_micros: AtomicI64,
}

impl ScyllaRowStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self {
            client,
            last_micros: AtomicI64::new(0),
        }
    }

    fn next_micros(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let mut current = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(current + 1);
            match self
                .last_micros
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

#[async_trait]
impl RowStore for ScyllaRowStore {
    async fn append_row(&self, tenant: &str, tab: Tab, columns: Vec<String>) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.rows (tenant, tab, appended_at, row_id, columns) VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (tenant, tab.as_str(), self.next_micros(), Uuid::new_v4(), columns))
            .await?;

        Ok(())
    }

    async fn read_rows(&self, tenant: &str, tab: Tab, range: RowRange) -> Result<Vec<Vec<String>>, PersistenceError> {
        let result = match range {
            RowRange::All => {
                let query = format!(
                    "SELECT columns FROM {}.rows WHERE tenant = ? AND tab = ?",
                    self.client.keyspace()
                );
                self.client
                    .session()
                    .query_unpaged(query, (tenant, tab.as_str()))
                    .await?
            },
            RowRange::Last(n) => {
                let query = format!(
                    "SELECT columns FROM {}.rows WHERE tenant = ? AND tab = ? LIMIT ?",
                    self.client.keyspace()
                );
                let limit = i32::try_from(n).unwrap_or(i32::MAX);
                self.client
                    .session()
                    .query_unpaged(query, (tenant, tab.as_str(), limit))
                    .await?
            },
        };

        let mut out = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (columns,): (Option<Vec<String>>,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                out.push(columns.unwrap_or_default());
            }
        }
        // Stored newest first
        out.reverse();
        Ok(out)
    }
}
