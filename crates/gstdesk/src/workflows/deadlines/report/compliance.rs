use chrono::NaiveDate;
use tracing::warn;

use super::super::domain::{DueDate, ObligationId};
use super::super::repository::{ClientWithObligations, ReportingWindow};
use super::views::{ClientCompliance, ComplianceBucket, ComplianceReport};

const OVERDUE_RETURN_PENALTY: i64 = 10;
const PENDING_NOTICE_PENALTY: i64 = 20;

/// `max(0, 100 - 10 x overdue returns - 20 x pending notices)`.
pub fn compliance_score(overdue_returns: u32, pending_notices: u32) -> u8 {
    let penalty = OVERDUE_RETURN_PENALTY * i64::from(overdue_returns)
        + PENDING_NOTICE_PENALTY * i64::from(pending_notices);
    (100 - penalty).clamp(0, 100) as u8
}

fn is_past_due(id: &ObligationId, due: &DueDate, today: NaiveDate) -> bool {
    match due.parse() {
        Ok(date) => date < today,
        Err(error) => {
            warn!(obligation_id = %id, %error, "ignoring obligation with malformed due date");
            false
        }
    }
}

pub(crate) fn client_compliance(
    entry: &ClientWithObligations,
    today: NaiveDate,
) -> ClientCompliance {
    let overdue_returns = entry
        .returns
        .iter()
        .filter(|record| !record.status.is_complete())
        .filter(|record| is_past_due(&record.id, &record.due_date, today))
        .count() as u32;
    let pending_notices = entry
        .notices
        .iter()
        .filter(|record| !record.status.is_complete())
        .filter(|record| is_past_due(&record.id, &record.due_date, today))
        .count() as u32;

    let compliance_score = compliance_score(overdue_returns, pending_notices);
    let bucket = ComplianceBucket::for_score(compliance_score);

    ClientCompliance {
        client_id: entry.client.id.clone(),
        client_name: entry.client.name.clone(),
        gstin: entry.client.gstin.clone(),
        overdue_returns,
        pending_notices,
        compliance_score,
        bucket,
        bucket_label: bucket.label().to_string(),
    }
}

pub(crate) fn build_compliance_report(
    window: ReportingWindow,
    clients: &[ClientWithObligations],
    today: NaiveDate,
) -> ComplianceReport {
    let mut breakdown: Vec<ClientCompliance> = clients
        .iter()
        .map(|entry| client_compliance(entry, today))
        .collect();
    breakdown.sort_by(|a, b| {
        (a.client_name.as_str(), &a.client_id).cmp(&(b.client_name.as_str(), &b.client_id))
    });

    let count_bucket = |bucket: ComplianceBucket| {
        breakdown
            .iter()
            .filter(|entry| entry.bucket == bucket)
            .count()
    };
    let fully_compliant = count_bucket(ComplianceBucket::FullyCompliant);
    let partially_compliant = count_bucket(ComplianceBucket::PartiallyCompliant);
    let non_compliant = count_bucket(ComplianceBucket::NonCompliant);

    let average_compliance_score = if breakdown.is_empty() {
        0.0
    } else {
        let total: u64 = breakdown
            .iter()
            .map(|entry| u64::from(entry.compliance_score))
            .sum();
        let mean = total as f64 / breakdown.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    ComplianceReport {
        window,
        total_clients: breakdown.len(),
        fully_compliant,
        partially_compliant,
        non_compliant,
        average_compliance_score,
        clients: breakdown,
    }
}
