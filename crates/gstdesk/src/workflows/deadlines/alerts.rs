use chrono::{DateTime, Utc};
use tracing::debug;

use super::clock::DayBoundary;
use super::domain::{
    ClientId, Notification, NotificationSeverity, Obligation, ObligationKind, UserId,
};
use super::repository::{EntityStore, StoreError};

/// Identity of an alert for deduplication purposes.
///
/// Titles never carry a separate key column, so the notification store is
/// searched by a marker embedded in every title this engine writes. The marker
/// is bracketed so that `Invoice INV-1` does not match `Invoice INV-10`, and
/// scoped by client because two clients share return periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub kind: ObligationKind,
    pub client_id: ClientId,
    pub reference: String,
}

impl AlertKey {
    pub fn new(kind: ObligationKind, client_id: ClientId, reference: impl Into<String>) -> Self {
        Self {
            kind,
            client_id,
            reference: reference.into(),
        }
    }

    pub fn for_obligation(obligation: &Obligation) -> Self {
        Self::new(
            obligation.kind(),
            obligation.client_id().clone(),
            obligation.reference(),
        )
    }

    pub fn marker(&self) -> String {
        format!("[{} / {}]", self.reference, self.client_id)
    }

    pub fn matches(&self, title: &str) -> bool {
        title.contains(&self.marker())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    Allow,
    Suppress,
}

/// At-most-once-per-day gate backed by the notification store.
#[derive(Debug, Clone, Copy)]
pub struct AlertDeduplicator {
    boundary: DayBoundary,
}

impl AlertDeduplicator {
    pub fn new(boundary: DayBoundary) -> Self {
        Self { boundary }
    }

    /// Decide against notifications already fetched for the recipient.
    pub fn decide(&self, key: &AlertKey, todays_notifications: &[Notification]) -> DedupDecision {
        // Filing confirmations carry the marker too but never stand in for an alert.
        if todays_notifications.iter().any(|notification| {
            notification.severity != NotificationSeverity::Success
                && key.matches(&notification.title)
        })
        {
            DedupDecision::Suppress
        } else {
            DedupDecision::Allow
        }
    }

    pub fn check<S>(
        &self,
        store: &S,
        recipient: &UserId,
        key: &AlertKey,
        now: DateTime<Utc>,
    ) -> Result<DedupDecision, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let since = self.boundary.local_midnight(now);
        let existing = store.find_notifications_since(recipient, since)?;
        let decision = self.decide(key, &existing);

        if decision == DedupDecision::Suppress {
            debug!(
                %recipient,
                marker = %key.marker(),
                %since,
                "alert already sent today"
            );
        }

        Ok(decision)
    }
}
