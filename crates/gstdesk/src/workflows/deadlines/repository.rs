use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Client, ClientId, GstReturn, Invoice, Notice, Notification, NotificationDraft, Obligation,
    ObligationKind, UserId,
};

/// Year, optionally narrowed to a single month, used to scope reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingWindow {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
}

impl ReportingWindow {
    pub fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && self.month.map_or(true, |month| date.month() == month)
    }
}

/// Client together with the obligations that fall into a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientWithObligations {
    pub client: Client,
    #[serde(default)]
    pub returns: Vec<GstReturn>,
    #[serde(default)]
    pub notices: Vec<Notice>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

/// Storage abstraction over the practice database.
///
/// Implementations serialize their own writes; the engine issues plain
/// sequential calls and never holds locks across them.
pub trait EntityStore: Send + Sync {
    /// Incomplete obligations of `kind` due on or before `before_or_on`.
    ///
    /// Records whose due date cannot be interpreted are returned as well so the
    /// caller can report them.
    fn find_outstanding(
        &self,
        kind: ObligationKind,
        before_or_on: NaiveDate,
    ) -> Result<Vec<Obligation>, StoreError>;

    fn find_notifications_since(
        &self,
        recipient: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>, StoreError>;

    fn create_notification(&self, draft: NotificationDraft) -> Result<Notification, StoreError>;

    /// Every client, each with the obligations due inside `window`.
    fn find_all_clients_with_obligations(
        &self,
        window: ReportingWindow,
    ) -> Result<Vec<ClientWithObligations>, StoreError>;

    fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, StoreError>;

    fn find_invoices_issued_in(&self, year: i32) -> Result<Vec<Invoice>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached; the current run cannot continue.
    #[error("entity store unavailable: {0}")]
    Unavailable(String),
    /// The store refused a single write.
    #[error("entity store rejected write: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
