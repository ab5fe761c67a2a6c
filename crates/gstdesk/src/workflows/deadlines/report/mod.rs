mod compliance;
mod revenue;
mod trend;
pub mod views;

pub use compliance::compliance_score;
pub use trend::trailing_months;
pub use views::{
    ClientCompliance, ComplianceBucket, ComplianceMetric, ComplianceReport, RevenueData,
    RevenueTrend, TopClient,
};

pub(crate) use compliance::build_compliance_report;
pub(crate) use revenue::build_revenue_trend;
pub(crate) use trend::month_metric;
