use chrono::{FixedOffset, Offset, Utc};

use super::domain::ObligationKind;

/// Day thresholds for one obligation kind.
///
/// Anything already past due is critical. When `critical_days` is `None` the
/// critical band holds only overdue items, so "due today" stays a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityWindow {
    pub critical_days: Option<u32>,
    pub warning_days: u32,
}

impl SeverityWindow {
    pub const fn new(critical_days: Option<u32>, warning_days: u32) -> Self {
        Self {
            critical_days,
            warning_days,
        }
    }

    /// Furthest day count that still classifies above Info.
    pub fn reach(&self) -> u32 {
        self.critical_days.unwrap_or(0).max(self.warning_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineWindows {
    pub returns: SeverityWindow,
    pub notices: SeverityWindow,
    pub invoices: SeverityWindow,
}

impl DeadlineWindows {
    pub fn for_kind(&self, kind: ObligationKind) -> SeverityWindow {
        match kind {
            ObligationKind::ReturnFiling => self.returns,
            ObligationKind::NoticeReply => self.notices,
            ObligationKind::InvoicePayment => self.invoices,
        }
    }
}

impl Default for DeadlineWindows {
    fn default() -> Self {
        Self {
            returns: SeverityWindow::new(Some(3), 7),
            notices: SeverityWindow::new(None, 5),
            invoices: SeverityWindow::new(None, 3),
        }
    }
}

/// Tunables for scanning and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Offset used for "today", local midnight, and late-filing dates.
    pub timezone: FixedOffset,
    pub windows: DeadlineWindows,
    /// Emit informational alerts for obligations beyond the warning band.
    pub include_info: bool,
    pub info_horizon_days: u32,
    pub trend_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Utc.fix(),
            windows: DeadlineWindows::default(),
            include_info: false,
            info_horizon_days: 30,
            trend_months: 12,
        }
    }
}
