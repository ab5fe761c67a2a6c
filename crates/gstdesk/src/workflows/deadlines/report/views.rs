use serde::{Deserialize, Serialize};

use super::super::domain::{ClientId, Money};
use super::super::repository::ReportingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceBucket {
    FullyCompliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ComplianceBucket {
    pub const fn for_score(score: u8) -> Self {
        if score >= 100 {
            Self::FullyCompliant
        } else if score >= 70 {
            Self::PartiallyCompliant
        } else {
            Self::NonCompliant
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FullyCompliant => "Fully compliant",
            Self::PartiallyCompliant => "Partially compliant",
            Self::NonCompliant => "Non-compliant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCompliance {
    pub client_id: ClientId,
    pub client_name: String,
    pub gstin: String,
    pub overdue_returns: u32,
    pub pending_notices: u32,
    pub compliance_score: u8,
    pub bucket: ComplianceBucket,
    pub bucket_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub window: ReportingWindow,
    pub total_clients: usize,
    pub fully_compliant: usize,
    pub partially_compliant: usize,
    pub non_compliant: usize,
    pub average_compliance_score: f64,
    pub clients: Vec<ClientCompliance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceMetric {
    pub year: i32,
    pub month: u32,
    /// Short label such as `Nov 2024`.
    pub label: String,
    pub returns_filed: u32,
    pub returns_due: u32,
    pub late_filings: u32,
    pub compliance_rate: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueData {
    pub month: u32,
    pub label: String,
    pub invoice_count: u32,
    pub total: Money,
    pub paid: Money,
    pub pending: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopClient {
    pub client_id: ClientId,
    pub client_name: String,
    pub invoice_count: u32,
    pub total_billed: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueTrend {
    pub year: i32,
    pub months: Vec<RevenueData>,
    pub yearly_total: Money,
    pub yearly_paid: Money,
    pub yearly_pending: Money,
    pub top_clients: Vec<TopClient>,
}
