//! Booking repository over the append-only row store
//!
//! The conversation engine only talks to [`BookingRepository`]. Lookups are
//! linear scans of the most recent `scan_limit` rows of a tab; the "current"
//! version of anything is the last matching row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use receptionist_core::{phones_match, Booking, BookingSession, ConversationTurn, Proposal, TurnStatus};

use crate::error::PersistenceError;
use crate::history::{collect_turns, HistoryQuery, HistoryWindow};
use crate::rows::{booking_from_columns, booking_to_columns, MessageRow};
use crate::store::{RowRange, RowStore, Tab};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Most recent session snapshot written for this customer
    async fn latest_session_snapshot(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<BookingSession>, PersistenceError>;

    async fn save_session_snapshot(
        &self,
        tenant: &str,
        customer: &str,
        business: &str,
        session: &BookingSession,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Proposals for this customer, newest first
    async fn recent_proposals(&self, tenant: &str, customer: &str) -> Result<Vec<Proposal>, PersistenceError>;

    async fn save_proposal(
        &self,
        tenant: &str,
        customer: &str,
        business: &str,
        proposal: &Proposal,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Current version of every pending or confirmed booking for this phone,
    /// oldest first
    async fn list_active_bookings(&self, tenant: &str, phone: &str) -> Result<Vec<Booking>, PersistenceError>;

    /// Append a booking version
    async fn append_booking(&self, booking: &Booking) -> Result<(), PersistenceError>;

    async fn append_audit_row(&self, row: &MessageRow) -> Result<(), PersistenceError>;

    async fn history(&self, query: &HistoryQuery<'_>, window: &HistoryWindow)
        -> Result<Vec<ConversationTurn>, PersistenceError>;

    /// Whether the latest opt-out/opt-in row for this customer is an opt-out
    async fn is_opted_out(&self, tenant: &str, customer: &str) -> Result<bool, PersistenceError>;
}

/// [`BookingRepository`] backed by any [`RowStore`]
pub struct RowBookingRepository {
    store: Arc<dyn RowStore>,
    scan_limit: usize,
}

impl RowBookingRepository {
    pub fn new(store: Arc<dyn RowStore>, scan_limit: usize) -> Self {
        Self {
            store,
            scan_limit: scan_limit.max(1),
        }
    }

    async fn recent_messages(&self, tenant: &str) -> Result<Vec<MessageRow>, PersistenceError> {
        let rows = self
            .store
            .read_rows(tenant, Tab::Messages, RowRange::Last(self.scan_limit))
            .await?;
        Ok(rows.iter().filter_map(|columns| MessageRow::from_columns(columns)).collect())
    }

    async fn append_message(&self, row: &MessageRow) -> Result<(), PersistenceError> {
        self.store.append_row(&row.tenant, Tab::Messages, row.to_columns()).await
    }
}

fn snapshot_json<'a>(row: &'a MessageRow, tenant: &str, customer: &str, status: &TurnStatus) -> Option<&'a str> {
    (row.status == *status && row.tenant == tenant && phones_match(row.customer(), customer))
        .then_some(row.notes.as_str())
}

#[async_trait]
impl BookingRepository for RowBookingRepository {
    async fn latest_session_snapshot(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<BookingSession>, PersistenceError> {
        let rows = self.recent_messages(tenant).await?;
        for row in rows.iter().rev() {
            let Some(json) = snapshot_json(row, tenant, customer, &TurnStatus::Session) else {
                continue;
            };
            match serde_json::from_str::<BookingSession>(json) {
                Ok(session) => return Ok(Some(session)),
                Err(e) => tracing::warn!(tenant, error = %e, "Skipping unreadable session snapshot"),
            }
        }
        Ok(None)
    }

    async fn save_session_snapshot(
        &self,
        tenant: &str,
        customer: &str,
        business: &str,
        session: &BookingSession,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let row = MessageRow::internal(tenant, customer, business, TurnStatus::Session, at)
            .with_notes(serde_json::to_string(session)?);
        self.append_message(&row).await
    }

    async fn recent_proposals(&self, tenant: &str, customer: &str) -> Result<Vec<Proposal>, PersistenceError> {
        let rows = self.recent_messages(tenant).await?;
        let proposals = rows
            .iter()
            .rev()
            .filter_map(|row| snapshot_json(row, tenant, customer, &TurnStatus::Proposal))
            .filter_map(|json| match serde_json::from_str::<Proposal>(json) {
                Ok(proposal) => Some(proposal),
                Err(e) => {
                    tracing::warn!(tenant, error = %e, "Skipping unreadable proposal");
                    None
                },
            })
            .collect();
        Ok(proposals)
    }

    async fn save_proposal(
        &self,
        tenant: &str,
        customer: &str,
        business: &str,
        proposal: &Proposal,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let row = MessageRow::internal(tenant, customer, business, TurnStatus::Proposal, at)
            .with_notes(serde_json::to_string(proposal)?);
        self.append_message(&row).await
    }

    async fn list_active_bookings(&self, tenant: &str, phone: &str) -> Result<Vec<Booking>, PersistenceError> {
        let rows = self
            .store
            .read_rows(tenant, Tab::Bookings, RowRange::Last(self.scan_limit))
            .await?;

        // Fold versions by id; the last row wins, first-seen order is kept
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, Booking> = HashMap::new();
        for booking in rows.iter().filter_map(|columns| booking_from_columns(columns)) {
            if booking.tenant != tenant || !phones_match(&booking.phone, phone) {
                continue;
            }
            if !latest.contains_key(&booking.id) {
                order.push(booking.id.clone());
            }
            latest.insert(booking.id.clone(), booking);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .filter(Booking::is_active)
            .collect())
    }

    async fn append_booking(&self, booking: &Booking) -> Result<(), PersistenceError> {
        self.store
            .append_row(&booking.tenant, Tab::Bookings, booking_to_columns(booking))
            .await
    }

    async fn append_audit_row(&self, row: &MessageRow) -> Result<(), PersistenceError> {
        self.append_message(row).await
    }

    async fn history(
        &self,
        query: &HistoryQuery<'_>,
        window: &HistoryWindow,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        let rows = self.recent_messages(query.tenant).await?;
        Ok(collect_turns(&rows, query, window))
    }

    async fn is_opted_out(&self, tenant: &str, customer: &str) -> Result<bool, PersistenceError> {
        let rows = self.recent_messages(tenant).await?;
        let latest = rows.iter().rev().find(|row| {
            matches!(row.status, TurnStatus::OptOut | TurnStatus::OptIn)
                && row.tenant == tenant
                && phones_match(row.customer(), customer)
        });
        Ok(matches!(latest, Some(row) if row.status == TurnStatus::OptOut))
    }
}
