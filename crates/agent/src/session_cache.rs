//! Warm session cache and per-sender turn locks
//!
//! The row store is the source of truth. Entries here are written through on
//! every transition and expire after a short TTL, so a cold or stale cache
//! only costs a snapshot read. The turn locks serialize turns from the same
//! sender within this process.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;

use receptionist_core::BookingSession;

/// (tenant id, normalized sender)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub tenant: String,
    pub sender: String,
}

impl SessionKey {
    pub fn new(tenant: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            sender: sender.into(),
        }
    }
}

/// Table size above which stale entries and idle locks are pruned
const PRUNE_THRESHOLD: usize = 1_024;

pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<SessionKey, (BookingSession, Instant)>>,
    locks: Mutex<HashMap<SessionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &SessionKey) -> Option<BookingSession> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some((session, stored)) if stored.elapsed() < self.ttl => Some(session.clone()),
            _ => None,
        }
    }

    pub fn put(&self, key: SessionKey, session: BookingSession) {
        let mut entries = self.entries.write();
        if entries.len() >= PRUNE_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, (_, stored)| stored.elapsed() < ttl);
        }
        entries.insert(key, (session, Instant::now()));
    }

    pub fn invalidate(&self, key: &SessionKey) {
        self.entries.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for exclusive use of this sender's session.
    pub async fn lock(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
