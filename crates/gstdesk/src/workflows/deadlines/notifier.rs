use chrono::{DateTime, Utc};

use super::alerts::AlertKey;
use super::domain::{Client, Notification, NotificationDraft, NotificationSeverity, Obligation};
use super::repository::{EntityStore, StoreError};
use super::scanner::{DeadlineSeverity, ScannedObligation};

/// Builds notification records and hands them to the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationEmitter;

impl NotificationEmitter {
    pub fn compose(
        &self,
        scanned: &ScannedObligation,
        client: &Client,
        now: DateTime<Utc>,
    ) -> NotificationDraft {
        let key = AlertKey::for_obligation(&scanned.obligation);
        let title = format!(
            "{} {} {}",
            scanned.obligation.kind().label(),
            state_phrase(scanned),
            key.marker()
        );

        let mut message = format!(
            "{}: {} is {} (due {}).",
            client.name,
            key.reference,
            delta_phrase(scanned.days_until_due),
            scanned.due_date.format("%d %b %Y")
        );
        if let Obligation::Invoice(invoice) = &scanned.obligation {
            message.push_str(&format!(" Amount outstanding: {}.", invoice.amount));
        }

        NotificationDraft {
            recipient: client.practitioner.clone(),
            title,
            message,
            severity: scanned.severity.notification_severity(),
            created_at: now,
        }
    }

    pub fn emit<S>(
        &self,
        store: &S,
        scanned: &ScannedObligation,
        client: &Client,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        store.create_notification(self.compose(scanned, client, now))
    }

    /// Confirmation for an explicit completion event such as a filed return.
    pub fn emit_success<S>(
        &self,
        store: &S,
        obligation: &Obligation,
        client: &Client,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let key = AlertKey::for_obligation(obligation);
        let verb = match obligation {
            Obligation::Return(_) => "filed",
            Obligation::Notice(_) => "resolved",
            Obligation::Invoice(_) => "paid",
        };

        store.create_notification(NotificationDraft {
            recipient: client.practitioner.clone(),
            title: format!("{} {} {}", obligation.kind().label(), verb, key.marker()),
            message: format!("{}: {} marked {}.", client.name, key.reference, verb),
            severity: NotificationSeverity::Success,
            created_at: now,
        })
    }
}

fn state_phrase(scanned: &ScannedObligation) -> &'static str {
    if scanned.is_overdue() {
        "overdue"
    } else if scanned.is_due_today() {
        "due today"
    } else if scanned.severity == DeadlineSeverity::Info {
        "upcoming"
    } else {
        "due soon"
    }
}

fn delta_phrase(days_until_due: i64) -> String {
    match days_until_due {
        0 => "due today".to_string(),
        days if days < 0 => format!("{} day(s) overdue", -days),
        days => format!("due in {days} day(s)"),
    }
}
