use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Client, ClientId, DueDate, GstReturn, Invoice, Notice, Notification, NotificationDraft,
    NotificationId, Obligation, ObligationKind, UserId,
};
use super::repository::{ClientWithObligations, EntityStore, ReportingWindow, StoreError};

/// Point-in-time copy of the practice data, loadable from JSON.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub returns: Vec<GstReturn>,
    #[serde(default)]
    pub notices: Vec<Notice>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

/// Mutex-guarded store used by the CLI, the demo server, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntityStore {
    state: Arc<Mutex<StoreSnapshot>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreSnapshot>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    pub fn insert_client(&self, client: Client) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.clients.iter().any(|existing| existing.id == client.id) {
            return Err(StoreError::Rejected(format!(
                "client {} already exists",
                client.id
            )));
        }
        state.clients.push(client);
        Ok(())
    }

    pub fn insert_return(&self, record: GstReturn) -> Result<(), StoreError> {
        self.lock()?.returns.push(record);
        Ok(())
    }

    pub fn insert_notice(&self, record: Notice) -> Result<(), StoreError> {
        self.lock()?.notices.push(record);
        Ok(())
    }

    pub fn insert_invoice(&self, record: Invoice) -> Result<(), StoreError> {
        self.lock()?.invoices.push(record);
        Ok(())
    }

    /// Replace a stored return with the same id, e.g. after it was filed.
    pub fn update_return(&self, record: GstReturn) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let slot = state
            .returns
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| StoreError::Rejected(format!("return {} not found", record.id)))?;
        *slot = record;
        Ok(())
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self.lock()?.notifications.clone())
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.lock()?.clone())
    }
}

fn due_on_or_before(due: &DueDate, limit: NaiveDate) -> bool {
    due.parse().map_or(true, |date| date <= limit)
}

fn due_within(due: &DueDate, window: ReportingWindow) -> bool {
    due.parse().map_or(false, |date| window.contains(date))
}

impl EntityStore for InMemoryEntityStore {
    fn find_outstanding(
        &self,
        kind: ObligationKind,
        before_or_on: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError> {
        let state = self.lock()?;
        let records: Vec<Obligation> = match kind {
            ObligationKind::ReturnFiling => state
                .returns
                .iter()
                .filter(|record| !record.status.is_complete())
                .filter(|record| due_on_or_before(&record.due_date, before_or_on))
                .cloned()
                .map(Obligation::Return)
                .collect(),
            ObligationKind::NoticeReply => state
                .notices
                .iter()
                .filter(|record| !record.status.is_complete())
                .filter(|record| due_on_or_before(&record.due_date, before_or_on))
                .cloned()
                .map(Obligation::Notice)
                .collect(),
            ObligationKind::InvoicePayment => state
                .invoices
                .iter()
                .filter(|record| !record.status.is_complete())
                .filter(|record| due_on_or_before(&record.due_date, before_or_on))
                .cloned()
                .map(Obligation::Invoice)
                .collect(),
        };
        Ok(records)
    }

    fn find_notifications_since(
        &self,
        recipient: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .filter(|notification| &notification.recipient == recipient)
            .filter(|notification| notification.created_at >= since)
            .cloned()
            .collect())
    }

    fn create_notification(&self, draft: NotificationDraft) -> Result<Notification, StoreError> {
        let mut state = self.lock()?;
        let notification = Notification {
            id: next_notification_id(&state.notifications),
            recipient: draft.recipient,
            title: draft.title,
            message: draft.message,
            severity: draft.severity,
            read: false,
            created_at: draft.created_at,
        };
        state.notifications.push(notification.clone());
        Ok(notification)
    }

    fn find_all_clients_with_obligations(
        &self,
        window: ReportingWindow,
    ) -> Result<Vec<ClientWithObligations>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .clients
            .iter()
            .map(|client| ClientWithObligations {
                client: client.clone(),
                returns: state
                    .returns
                    .iter()
                    .filter(|record| record.client_id == client.id)
                    .filter(|record| due_within(&record.due_date, window))
                    .cloned()
                    .collect(),
                notices: state
                    .notices
                    .iter()
                    .filter(|record| record.client_id == client.id)
                    .filter(|record| due_within(&record.due_date, window))
                    .cloned()
                    .collect(),
                invoices: state
                    .invoices
                    .iter()
                    .filter(|record| record.client_id == client.id)
                    .filter(|record| due_within(&record.due_date, window))
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, StoreError> {
        let state = self.lock()?;
        Ok(state.clients.iter().find(|client| &client.id == id).cloned())
    }

    fn find_invoices_issued_in(&self, year: i32) -> Result<Vec<Invoice>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .invoices
            .iter()
            .filter(|invoice| invoice.issued_on.year() == year)
            .cloned()
            .collect())
    }
}

/// One past the highest `ntf-<n>` id, so snapshots with gaps never reuse an id.
fn next_notification_id(existing: &[Notification]) -> NotificationId {
    let highest = existing
        .iter()
        .filter_map(|notification| notification.id.0.strip_prefix("ntf-"))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let next = highest.max(existing.len() as u64).saturating_add(1);
    NotificationId(format!("ntf-{next:06}"))
}
