use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for practice clients.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

/// Identifier shared by returns, notices, and invoices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObligationId(pub String);

/// Practitioner account that receives notifications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Amount in paise. Kept integral so report totals are exact.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees.saturating_mul(100))
    }

    pub fn paise(self) -> i64 {
        self.0
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}Rs {}.{:02}", abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    ReturnFiling,
    NoticeReply,
    InvoicePayment,
}

impl ObligationKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::ReturnFiling, Self::NoticeReply, Self::InvoicePayment]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ReturnFiling => "Return filing",
            Self::NoticeReply => "Notice reply",
            Self::InvoicePayment => "Invoice payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    #[serde(rename = "GSTR-1")]
    Gstr1,
    #[serde(rename = "GSTR-3B")]
    Gstr3b,
    #[serde(rename = "GSTR-4")]
    Gstr4,
    #[serde(rename = "GSTR-9")]
    Gstr9,
    #[serde(rename = "GSTR-9C")]
    Gstr9c,
    #[serde(rename = "CMP-08")]
    Cmp08,
}

impl ReturnType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gstr1 => "GSTR-1",
            Self::Gstr3b => "GSTR-3B",
            Self::Gstr4 => "GSTR-4",
            Self::Gstr9 => "GSTR-9",
            Self::Gstr9c => "GSTR-9C",
            Self::Cmp08 => "CMP-08",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Draft,
    Pending,
    Filed,
}

impl ReturnStatus {
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Filed)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Filed => "Filed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeStatus {
    Pending,
    InProgress,
    Resolved,
}

impl NoticeStatus {
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Resolved)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Overdue,
    Paid,
}

impl InvoiceStatus {
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Paid)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Overdue => "Overdue",
            Self::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
}

/// Business registered with the practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub gstin: String,
    pub registration_status: RegistrationStatus,
    pub status: ClientStatus,
    /// Practitioner who receives this client's deadline alerts.
    pub practitioner: UserId,
}

/// Due date exactly as the data source supplied it.
///
/// Records coming from the GST portal or older imports are not guaranteed to
/// carry a well-formed date, so interpretation is deferred to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DueDate(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DueDateError {
    #[error("unrecognised due date '{raw}'")]
    Unrecognised { raw: String },
    /// Parsed, but too close to the calendar limits to place in the engine timezone.
    #[error("due date '{raw}' is outside the supported calendar range")]
    OutOfRange { raw: String },
}

impl DueDateError {
    pub fn raw(&self) -> &str {
        match self {
            Self::Unrecognised { raw } | Self::OutOfRange { raw } => raw,
        }
    }
}

const DUE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

impl DueDate {
    pub fn parse(&self) -> Result<NaiveDate, DueDateError> {
        let trimmed = self.0.trim();

        for format in DUE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(date);
            }
        }

        if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(timestamp.date_naive());
        }

        Err(DueDateError::Unrecognised {
            raw: self.0.clone(),
        })
    }
}

impl From<NaiveDate> for DueDate {
    fn from(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstReturn {
    pub id: ObligationId,
    pub client_id: ClientId,
    pub return_type: ReturnType,
    /// Tax period as shown on the portal, e.g. `10-2024`.
    pub period: String,
    pub due_date: DueDate,
    pub status: ReturnStatus,
    #[serde(default)]
    pub filed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tax_liability: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: ObligationId,
    pub client_id: ClientId,
    pub notice_number: String,
    pub subject: String,
    pub due_date: DueDate,
    pub status: NoticeStatus,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub demand_amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: ObligationId,
    pub client_id: ClientId,
    pub invoice_number: String,
    pub issued_on: NaiveDate,
    pub due_date: DueDate,
    pub amount: Money,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// A due-dated unit of work owned by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Obligation {
    Return(GstReturn),
    Notice(Notice),
    Invoice(Invoice),
}

impl Obligation {
    pub fn kind(&self) -> ObligationKind {
        match self {
            Self::Return(_) => ObligationKind::ReturnFiling,
            Self::Notice(_) => ObligationKind::NoticeReply,
            Self::Invoice(_) => ObligationKind::InvoicePayment,
        }
    }

    pub fn id(&self) -> &ObligationId {
        match self {
            Self::Return(record) => &record.id,
            Self::Notice(record) => &record.id,
            Self::Invoice(record) => &record.id,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        match self {
            Self::Return(record) => &record.client_id,
            Self::Notice(record) => &record.client_id,
            Self::Invoice(record) => &record.client_id,
        }
    }

    pub fn due_date(&self) -> &DueDate {
        match self {
            Self::Return(record) => &record.due_date,
            Self::Notice(record) => &record.due_date,
            Self::Invoice(record) => &record.due_date,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Return(record) => record.status.is_complete(),
            Self::Notice(record) => record.status.is_complete(),
            Self::Invoice(record) => record.status.is_complete(),
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Return(record) => record.filed_at,
            Self::Notice(record) => record.resolved_at,
            Self::Invoice(record) => record.paid_at,
        }
    }

    pub fn amount(&self) -> Option<Money> {
        match self {
            Self::Return(record) => record.tax_liability,
            Self::Notice(record) => record.demand_amount,
            Self::Invoice(record) => Some(record.amount),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Return(record) => record.status.label(),
            Self::Notice(record) => record.status.label(),
            Self::Invoice(record) => record.status.label(),
        }
    }

    /// Human readable reference that stays stable for the obligation's lifetime.
    pub fn reference(&self) -> String {
        match self {
            Self::Return(record) => format!("{} - {}", record.return_type.label(), record.period),
            Self::Notice(record) => format!("Notice {}", record.notice_number),
            Self::Invoice(record) => format!("Invoice {}", record.invoice_number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Success => "Success",
        }
    }
}

/// Notification that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    pub severity: NotificationSeverity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    pub severity: NotificationSeverity,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_date_accepts_portal_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 18).expect("valid date");
        for raw in [
            "2024-11-18",
            "18-11-2024",
            "18/11/2024",
            " 2024-11-18 ",
            "2024-11-18T00:00:00Z",
        ] {
            assert_eq!(DueDate(raw.to_string()).parse(), Ok(expected), "{raw}");
        }
    }

    #[test]
    fn due_date_rejects_garbage() {
        let err = DueDate("next tuesday".to_string())
            .parse()
            .expect_err("not a date");
        assert_eq!(err.raw(), "next tuesday");
        assert!(DueDate("2024-02-30".to_string()).parse().is_err());
    }

    #[test]
    fn references_embed_type_and_period() {
        let record = Obligation::Return(GstReturn {
            id: ObligationId("ret-1".to_string()),
            client_id: ClientId("c-1".to_string()),
            return_type: ReturnType::Gstr3b,
            period: "10-2024".to_string(),
            due_date: DueDate("2024-11-20".to_string()),
            status: ReturnStatus::Draft,
            filed_at: None,
            tax_liability: None,
        });

        assert_eq!(record.reference(), "GSTR-3B - 10-2024");
        assert_eq!(record.kind(), ObligationKind::ReturnFiling);
        assert!(!record.is_complete());
    }

    #[test]
    fn money_formats_in_rupees() {
        assert_eq!(Money(123_456).to_string(), "Rs 1234.56");
        assert_eq!(Money(-5).to_string(), "-Rs 0.05");
        assert_eq!(Money::from_rupees(12), Money(1200));
    }
}
