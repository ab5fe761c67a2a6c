use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::alerts::{AlertDeduplicator, AlertKey, DedupDecision};
use super::clock::DayBoundary;
use super::config::EngineConfig;
use super::domain::{ClientId, GstReturn, Notification, Obligation, ObligationKind};
use super::notifier::NotificationEmitter;
use super::report::{
    build_compliance_report, build_revenue_trend, month_metric, trailing_months,
    ComplianceMetric, ComplianceReport, RevenueTrend,
};
use super::repository::{EntityStore, ReportingWindow, StoreError};
use super::scanner::{DeadlineScanner, ScannedObligation};

/// Longest trailing window `compute_monthly_metrics` accepts.
pub const MAX_TREND_MONTHS: u32 = 120;

/// Failure that ends an engine invocation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid reporting window: {0}")]
    InvalidWindow(String),
    #[error("client {0} not found")]
    UnknownClient(ClientId),
}

/// Per-kind counters for one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub scanned: usize,
    pub created: usize,
    pub suppressed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of `scan_and_notify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub now: DateTime<Utc>,
    /// Notifications written during this run.
    pub created: usize,
    pub suppressed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub by_kind: BTreeMap<ObligationKind, KindSummary>,
}

impl ScanSummary {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            created: 0,
            suppressed: 0,
            skipped: 0,
            failed: 0,
            by_kind: BTreeMap::new(),
        }
    }

    fn record(&mut self, kind: ObligationKind, outcome: ItemOutcome) {
        let entry = self.by_kind.entry(kind).or_default();
        match outcome {
            ItemOutcome::Created => {
                entry.created += 1;
                self.created += 1;
            }
            ItemOutcome::Suppressed => {
                entry.suppressed += 1;
                self.suppressed += 1;
            }
            ItemOutcome::Skipped => {
                entry.skipped += 1;
                self.skipped += 1;
            }
            ItemOutcome::Failed => {
                entry.failed += 1;
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Created,
    Suppressed,
    Skipped,
    Failed,
}

/// Scans deadlines and produces compliance reports over an `EntityStore`.
///
/// Holds no mutable state: every call reads the store afresh and all
/// idempotence comes from notifications already persisted there.
pub struct ComplianceEngine<S> {
    store: Arc<S>,
    scanner: DeadlineScanner,
    dedup: AlertDeduplicator,
    emitter: NotificationEmitter,
    boundary: DayBoundary,
    config: EngineConfig,
}

impl<S> ComplianceEngine<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let scanner = DeadlineScanner::new(config.clone());
        let boundary = scanner.boundary();

        Self {
            store,
            scanner,
            dedup: AlertDeduplicator::new(boundary),
            emitter: NotificationEmitter,
            boundary,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run scanner, deduplicator, and emitter across every obligation kind.
    pub fn scan_and_notify(&self, now: DateTime<Utc>) -> Result<ScanSummary, EngineError> {
        let mut summary = ScanSummary::new(now);

        for kind in ObligationKind::ordered() {
            let horizon = self.scanner.horizon(kind, now);
            let outstanding = self.store.find_outstanding(kind, horizon)?;
            summary.by_kind.entry(kind).or_default().scanned = outstanding.len();

            let batch = self.scanner.scan(outstanding, now);
            for _ in &batch.skipped {
                summary.record(kind, ItemOutcome::Skipped);
            }

            for scanned in &batch.due {
                let outcome = self.process(scanned, now)?;
                summary.record(kind, outcome);
            }
        }

        info!(
            created = summary.created,
            suppressed = summary.suppressed,
            skipped = summary.skipped,
            failed = summary.failed,
            %now,
            "deadline scan finished"
        );

        Ok(summary)
    }

    /// Dedupe and emit one classified obligation.
    ///
    /// Data problems and rejected writes are absorbed into the outcome; only
    /// an unreachable store is returned as an error.
    fn process(
        &self,
        scanned: &ScannedObligation,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, EngineError> {
        let obligation = &scanned.obligation;

        let client = match self.store.fetch_client(obligation.client_id())? {
            Some(client) => client,
            None => {
                warn!(
                    obligation_id = %obligation.id(),
                    client_id = %obligation.client_id(),
                    "skipping obligation with unknown client"
                );
                return Ok(ItemOutcome::Skipped);
            }
        };

        let key = AlertKey::for_obligation(obligation);
        if self
            .dedup
            .check(self.store.as_ref(), &client.practitioner, &key, now)?
            == DedupDecision::Suppress
        {
            return Ok(ItemOutcome::Suppressed);
        }

        match self.emitter.emit(self.store.as_ref(), scanned, &client, now) {
            Ok(notification) => {
                debug!(
                    notification_id = %notification.id.0,
                    obligation_id = %obligation.id(),
                    severity = scanned.severity.label(),
                    days_until_due = scanned.days_until_due,
                    "deadline alert created"
                );
                Ok(ItemOutcome::Created)
            }
            Err(error) if error.is_unavailable() => Err(error.into()),
            Err(error) => {
                warn!(
                    obligation_id = %obligation.id(),
                    %error,
                    "failed to persist deadline alert"
                );
                Ok(ItemOutcome::Failed)
            }
        }
    }

    /// Write a success notification for a return that has just been filed.
    pub fn notify_return_filed(
        &self,
        record: &GstReturn,
        now: DateTime<Utc>,
    ) -> Result<Notification, EngineError> {
        let client = self
            .store
            .fetch_client(&record.client_id)?
            .ok_or_else(|| EngineError::UnknownClient(record.client_id.clone()))?;

        let obligation = Obligation::Return(record.clone());
        let notification = self
            .emitter
            .emit_success(self.store.as_ref(), &obligation, &client, now)?;
        Ok(notification)
    }

    pub fn compute_compliance_report(
        &self,
        window: ReportingWindow,
        now: DateTime<Utc>,
    ) -> Result<ComplianceReport, EngineError> {
        validate_window(window)?;

        let clients = self.store.find_all_clients_with_obligations(window)?;
        let report = build_compliance_report(window, &clients, self.boundary.today(now));

        debug!(
            year = window.year,
            month = ?window.month,
            total_clients = report.total_clients,
            average = report.average_compliance_score,
            "compliance report computed"
        );

        Ok(report)
    }

    /// One metric per month for the trailing `months_back` months, oldest first.
    pub fn compute_monthly_metrics(
        &self,
        months_back: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ComplianceMetric>, EngineError> {
        if !(1..=MAX_TREND_MONTHS).contains(&months_back) {
            return Err(EngineError::InvalidWindow(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}, got {months_back}"
            )));
        }

        let today = self.boundary.today(now);
        let mut metrics = Vec::with_capacity(months_back as usize);

        for (year, month) in trailing_months(today, months_back) {
            let clients = self
                .store
                .find_all_clients_with_obligations(ReportingWindow::month(year, month))?;
            let returns: Vec<GstReturn> = clients
                .into_iter()
                .flat_map(|entry| entry.returns)
                .collect();
            metrics.push(month_metric(year, month, &returns, self.boundary));
        }

        Ok(metrics)
    }

    pub fn compute_revenue_trend(&self, year: i32) -> Result<RevenueTrend, EngineError> {
        let invoices = self.store.find_invoices_issued_in(year)?;

        let mut client_names = BTreeMap::new();
        for invoice in &invoices {
            if client_names.contains_key(&invoice.client_id) {
                continue;
            }
            match self.store.fetch_client(&invoice.client_id)? {
                Some(client) => {
                    client_names.insert(invoice.client_id.clone(), client.name);
                }
                None => warn!(
                    invoice_id = %invoice.id,
                    client_id = %invoice.client_id,
                    "invoice references unknown client"
                ),
            }
        }

        Ok(build_revenue_trend(year, &invoices, &client_names))
    }
}

fn validate_window(window: ReportingWindow) -> Result<(), EngineError> {
    if let Some(month) = window.month {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidWindow(format!(
                "month {month} is outside 1..=12"
            )));
        }
    }
    if !(1900..=9999).contains(&window.year) {
        return Err(EngineError::InvalidWindow(format!(
            "year {} is out of range",
            window.year
        )));
    }
    Ok(())
}
