//! Deadline scanning, daily alert deduplication, and compliance reporting.
//!
//! A scheduler calls [`ComplianceEngine::scan_and_notify`] with the current
//! instant; the engine classifies every outstanding return, notice, and invoice,
//! writes at most one notification per obligation per day, and reports how many
//! it wrote. Reports are read-only projections over the same store and are
//! recomputed on every call.

pub mod alerts;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod memory;
pub mod notifier;
pub mod report;
pub mod repository;
pub mod router;
pub mod scanner;

#[cfg(test)]
mod tests;

pub use alerts::{AlertDeduplicator, AlertKey, DedupDecision};
pub use clock::{Clock, DayBoundary, FixedClock, SystemClock};
pub use config::{DeadlineWindows, EngineConfig, SeverityWindow};
pub use domain::{
    Client, ClientId, ClientStatus, DueDate, DueDateError, GstReturn, Invoice, InvoiceStatus,
    Money, Notice, NoticeStatus, Notification, NotificationDraft, NotificationId,
    NotificationSeverity, Obligation, ObligationId, ObligationKind, RegistrationStatus,
    ReturnStatus, ReturnType, UserId,
};
pub use engine::{ComplianceEngine, EngineError, KindSummary, ScanSummary, MAX_TREND_MONTHS};
pub use memory::{InMemoryEntityStore, SnapshotError, StoreSnapshot};
pub use notifier::NotificationEmitter;
pub use report::{
    ClientCompliance, ComplianceBucket, ComplianceMetric, ComplianceReport, RevenueData,
    RevenueTrend, TopClient,
};
pub use repository::{ClientWithObligations, EntityStore, ReportingWindow, StoreError};
pub use router::{compliance_router, ComplianceApi};
pub use scanner::{DeadlineScanner, DeadlineSeverity, ScannedObligation};
