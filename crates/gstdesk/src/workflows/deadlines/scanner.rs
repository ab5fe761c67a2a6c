use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::clock::DayBoundary;
use super::config::{EngineConfig, SeverityWindow};
use super::domain::{DueDateError, NotificationSeverity, Obligation, ObligationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSeverity {
    Info,
    Warning,
    Critical,
}

impl DeadlineSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    pub const fn notification_severity(self) -> NotificationSeverity {
        match self {
            Self::Info => NotificationSeverity::Info,
            Self::Warning => NotificationSeverity::Warning,
            Self::Critical => NotificationSeverity::Error,
        }
    }
}

pub fn classify(days_until_due: i64, window: SeverityWindow) -> DeadlineSeverity {
    if days_until_due < 0 {
        return DeadlineSeverity::Critical;
    }

    if let Some(critical_days) = window.critical_days {
        if days_until_due <= i64::from(critical_days) {
            return DeadlineSeverity::Critical;
        }
    }

    if days_until_due <= i64::from(window.warning_days) {
        DeadlineSeverity::Warning
    } else {
        DeadlineSeverity::Info
    }
}

/// Outstanding obligation with its position relative to "now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedObligation {
    pub obligation: Obligation,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
    pub severity: DeadlineSeverity,
}

impl ScannedObligation {
    pub fn is_overdue(&self) -> bool {
        self.days_until_due < 0
    }

    pub fn is_due_today(&self) -> bool {
        self.days_until_due == 0
    }
}

/// Obligation the scanner could not place on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedObligation {
    pub obligation: Obligation,
    pub error: DueDateError,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanBatch {
    pub due: Vec<ScannedObligation>,
    pub skipped: Vec<SkippedObligation>,
}

/// Stateless classifier for outstanding obligations.
#[derive(Debug, Clone)]
pub struct DeadlineScanner {
    boundary: DayBoundary,
    config: EngineConfig,
}

impl DeadlineScanner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            boundary: DayBoundary::new(config.timezone),
            config,
        }
    }

    pub fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    /// Last due date worth fetching for `kind` on the day of `now`.
    pub fn horizon(&self, kind: ObligationKind, now: DateTime<Utc>) -> NaiveDate {
        let window = self.config.windows.for_kind(kind);
        let days = if self.config.include_info {
            self.config.info_horizon_days.max(window.reach())
        } else {
            window.reach()
        };
        self.boundary
            .today(now)
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Classify a single obligation; `Ok(None)` means nothing to alert on.
    pub fn evaluate(
        &self,
        obligation: &Obligation,
        now: DateTime<Utc>,
    ) -> Result<Option<ScannedObligation>, DueDateError> {
        if obligation.is_complete() {
            return Ok(None);
        }

        let due_date = obligation.due_date().parse()?;
        let days_until_due = self
            .boundary
            .days_until(due_date, now)
            .ok_or_else(|| DueDateError::OutOfRange {
                raw: obligation.due_date().0.clone(),
            })?;
        let severity = classify(days_until_due, self.config.windows.for_kind(obligation.kind()));

        if severity == DeadlineSeverity::Info && !self.config.include_info {
            return Ok(None);
        }

        Ok(Some(ScannedObligation {
            obligation: obligation.clone(),
            due_date,
            days_until_due,
            severity,
        }))
    }

    /// Classify a batch, isolating per-item failures.
    pub fn scan(&self, obligations: Vec<Obligation>, now: DateTime<Utc>) -> ScanBatch {
        let mut batch = ScanBatch::default();

        for obligation in obligations {
            match self.evaluate(&obligation, now) {
                Ok(Some(scanned)) => batch.due.push(scanned),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        obligation_id = %obligation.id(),
                        kind = obligation.kind().label(),
                        %error,
                        "skipping obligation with malformed due date"
                    );
                    batch.skipped.push(SkippedObligation { obligation, error });
                }
            }
        }

        batch
            .due
            .sort_by(|a, b| (a.due_date, a.obligation.id()).cmp(&(b.due_date, b.obligation.id())));

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::deadlines::config::DeadlineWindows;
    use crate::workflows::deadlines::domain::{
        ClientId, DueDate, GstReturn, Invoice, InvoiceStatus, Money, Notice, NoticeStatus,
        ObligationId, ReturnStatus, ReturnType,
    };
    use chrono::{Duration, FixedOffset};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-11-20T09:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn gst_return(id: &str, due: &str, status: ReturnStatus) -> Obligation {
        Obligation::Return(GstReturn {
            id: ObligationId(id.to_string()),
            client_id: ClientId("client-1".to_string()),
            return_type: ReturnType::Gstr3b,
            period: "10-2024".to_string(),
            due_date: DueDate(due.to_string()),
            status,
            filed_at: None,
            tax_liability: None,
        })
    }

    fn notice(due: &str) -> Obligation {
        Obligation::Notice(Notice {
            id: ObligationId("notice-1".to_string()),
            client_id: ClientId("client-1".to_string()),
            notice_number: "ASMT-10/2024/17".to_string(),
            subject: "Scrutiny of returns".to_string(),
            due_date: DueDate(due.to_string()),
            status: NoticeStatus::Pending,
            resolved_at: None,
            demand_amount: None,
        })
    }

    fn invoice(due: &str) -> Obligation {
        Obligation::Invoice(Invoice {
            id: ObligationId("inv-1".to_string()),
            client_id: ClientId("client-1".to_string()),
            invoice_number: "INV-1".to_string(),
            issued_on: NaiveDate::from_ymd_opt(2024, 11, 1).expect("valid date"),
            due_date: DueDate(due.to_string()),
            amount: Money::from_rupees(5_000),
            status: InvoiceStatus::Sent,
            paid_at: None,
        })
    }

    fn scanner() -> DeadlineScanner {
        DeadlineScanner::new(EngineConfig::default())
    }

    #[test]
    fn classify_follows_return_windows() {
        let window = SeverityWindow::new(Some(3), 7);

        assert_eq!(classify(-2, window), DeadlineSeverity::Critical);
        assert_eq!(classify(0, window), DeadlineSeverity::Critical);
        assert_eq!(classify(3, window), DeadlineSeverity::Critical);
        assert_eq!(classify(4, window), DeadlineSeverity::Warning);
        assert_eq!(classify(7, window), DeadlineSeverity::Warning);
        assert_eq!(classify(8, window), DeadlineSeverity::Info);
    }

    #[test]
    fn notices_and_invoices_only_turn_critical_once_overdue() {
        let scanner = scanner();

        let due_today = scanner
            .evaluate(&notice("2024-11-20"), now())
            .expect("valid date")
            .expect("within window");
        assert_eq!(due_today.severity, DeadlineSeverity::Warning);
        assert!(due_today.is_due_today());

        let overdue = scanner
            .evaluate(&invoice("2024-11-19"), now())
            .expect("valid date")
            .expect("within window");
        assert_eq!(overdue.severity, DeadlineSeverity::Critical);
        assert_eq!(
            overdue.severity.notification_severity(),
            NotificationSeverity::Error
        );
    }

    #[test]
    fn return_due_today_is_critical() {
        let scanned = scanner()
            .evaluate(&gst_return("r-1", "2024-11-20", ReturnStatus::Draft), now())
            .expect("valid date")
            .expect("within window");

        assert_eq!(scanned.days_until_due, 0);
        assert_eq!(scanned.severity, DeadlineSeverity::Critical);
        assert!(!scanned.is_overdue());
    }

    #[test]
    fn filed_returns_are_never_classified() {
        let scanned = scanner()
            .evaluate(&gst_return("r-1", "2024-11-19", ReturnStatus::Filed), now())
            .expect("valid date");

        assert!(scanned.is_none());
    }

    #[test]
    fn info_band_is_suppressed_unless_enabled() {
        let far = gst_return("r-1", "2024-12-20", ReturnStatus::Pending);
        assert!(scanner().evaluate(&far, now()).expect("valid").is_none());

        let config = EngineConfig {
            include_info: true,
            ..EngineConfig::default()
        };
        let scanned = DeadlineScanner::new(config)
            .evaluate(&far, now())
            .expect("valid")
            .expect("info emitted");
        assert_eq!(scanned.severity, DeadlineSeverity::Info);
    }

    #[test]
    fn scan_isolates_malformed_due_dates() {
        let batch = scanner().scan(
            vec![
                gst_return("r-bad", "31st of never", ReturnStatus::Draft),
                gst_return("r-2", "2024-11-22", ReturnStatus::Draft),
                gst_return("r-1", "2024-11-18", ReturnStatus::Pending),
            ],
            now(),
        );

        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].obligation.id().0, "r-bad");
        let ids: Vec<&str> = batch
            .due
            .iter()
            .map(|item| item.obligation.id().0.as_str())
            .collect();
        assert_eq!(ids, vec!["r-1", "r-2"]);
    }

    #[test]
    fn horizon_extends_to_warning_window() {
        let scanner = scanner();
        let today = NaiveDate::from_ymd_opt(2024, 11, 20).expect("valid date");

        assert_eq!(
            scanner.horizon(ObligationKind::ReturnFiling, now()),
            today + Duration::days(7)
        );
        assert_eq!(
            scanner.horizon(ObligationKind::InvoicePayment, now()),
            today + Duration::days(3)
        );
    }

    #[test]
    fn horizon_covers_a_critical_band_wider_than_warning() {
        let config = EngineConfig {
            windows: DeadlineWindows {
                returns: SeverityWindow::new(Some(3), 2),
                ..DeadlineWindows::default()
            },
            ..EngineConfig::default()
        };
        let scanner = DeadlineScanner::new(config);
        let today = NaiveDate::from_ymd_opt(2024, 11, 20).expect("valid date");

        assert_eq!(
            scanner.horizon(ObligationKind::ReturnFiling, now()),
            today + Duration::days(3)
        );
        let scanned = scanner
            .evaluate(&gst_return("r-1", "2024-11-23", ReturnStatus::Draft), now())
            .expect("valid date")
            .expect("within window");
        assert_eq!(scanned.severity, DeadlineSeverity::Critical);
    }

    #[test]
    fn horizon_saturates_at_the_last_representable_date() {
        let config = EngineConfig {
            include_info: true,
            info_horizon_days: u32::MAX,
            ..EngineConfig::default()
        };
        let scanner = DeadlineScanner::new(config);

        assert_eq!(
            scanner.horizon(ObligationKind::NoticeReply, now()),
            NaiveDate::MAX
        );
    }

    #[test]
    fn due_dates_at_the_calendar_limit_are_skipped_not_fatal() {
        let config = EngineConfig {
            timezone: FixedOffset::east_opt(5 * 3600 + 1800).expect("valid offset"),
            ..EngineConfig::default()
        };
        let batch = DeadlineScanner::new(config).scan(
            vec![
                gst_return("r-ancient", "-262143-01-01", ReturnStatus::Draft),
                gst_return("r-1", "2024-11-18", ReturnStatus::Draft),
            ],
            now(),
        );

        assert_eq!(batch.skipped.len(), 1);
        assert!(matches!(
            batch.skipped[0].error,
            DueDateError::OutOfRange { .. }
        ));
        assert_eq!(batch.due.len(), 1);
        assert_eq!(batch.due[0].obligation.id().0, "r-1");
    }
}
