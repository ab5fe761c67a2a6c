use crate::infra::{load_practice, parse_timestamp, LoadedPractice};
use chrono::{DateTime, Datelike, Utc};
use clap::Args;
use gstdesk::config::AppConfig;
use gstdesk::error::AppError;
use gstdesk::telemetry;
use gstdesk::workflows::deadlines::{
    Clock, ComplianceEngine, ComplianceMetric, ComplianceReport, DayBoundary, EngineError,
    InMemoryEntityStore, ReportingWindow, RevenueTrend, ScanSummary, SnapshotError, SystemClock,
    MAX_TREND_MONTHS,
};
use gstdesk::workflows::portal::{MergeSummary, RejectedRow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Practice snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// GST portal return-status export merged before scanning
    #[arg(long)]
    pub(crate) returns_csv: Option<PathBuf>,
    /// Write the snapshot, including new notifications, to this path
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ComplianceArgs {
    /// Practice snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Reporting year; defaults to the current year
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Restrict the report to one month (1-12)
    #[arg(long)]
    pub(crate) month: Option<u32>,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// GST portal return-status export merged before reporting
    #[arg(long)]
    pub(crate) returns_csv: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TrendArgs {
    /// Practice snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Number of trailing months (1-120); defaults to REPORT_TREND_MONTHS
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TREND_MONTHS)))]
    pub(crate) months: Option<u32>,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RevenueArgs {
    /// Practice snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Invoice issue year; defaults to the current year
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Print JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

struct Session {
    config: AppConfig,
    engine: ComplianceEngine<InMemoryEntityStore>,
    store: InMemoryEntityStore,
    merged: Option<MergeSummary>,
    rejected: Vec<RejectedRow>,
}

impl Session {
    fn open(snapshot: &Path, returns_csv: Option<&Path>) -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry, config.environment)?;

        let LoadedPractice {
            store,
            merged,
            rejected,
        } = load_practice(snapshot, returns_csv)?;
        let engine = ComplianceEngine::new(Arc::new(store.clone()), config.engine.clone());

        Ok(Self {
            config,
            engine,
            store,
            merged,
            rejected,
        })
    }

    fn current_year(&self, now: DateTime<Utc>) -> i32 {
        DayBoundary::new(self.config.engine.timezone).today(now).year()
    }

    fn print_import(&self) {
        if let Some(merged) = self.merged {
            println!(
                "Portal export: {} return(s) updated, {} added, {} row(s) rejected",
                merged.updated,
                merged.inserted,
                self.rejected.len()
            );
            for row in &self.rejected {
                println!("  - line {}: {}", row.line, row.reason);
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(SnapshotError::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let session = Session::open(&args.snapshot, args.returns_csv.as_deref())?;
    let now = args.now.unwrap_or_else(|| SystemClock.now());
    let summary = session.engine.scan_and_notify(now)?;

    if let Some(path) = &args.output {
        let snapshot = session.store.snapshot().map_err(EngineError::from)?;
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &snapshot)
            .map_err(SnapshotError::from)?;
    }

    if args.json {
        return print_json(&summary);
    }

    session.print_import();
    render_scan(&summary);
    let notifications = session.store.notifications().map_err(EngineError::from)?;
    for notification in notifications
        .iter()
        .filter(|notification| notification.created_at == now)
    {
        println!(
            "  [{}] {} - {}",
            notification.severity.label(),
            notification.title,
            notification.message
        );
    }
    Ok(())
}

pub(crate) fn run_compliance_report(args: ComplianceArgs) -> Result<(), AppError> {
    let session = Session::open(&args.snapshot, args.returns_csv.as_deref())?;
    let now = args.now.unwrap_or_else(|| SystemClock.now());
    let window = ReportingWindow {
        year: args.year.unwrap_or_else(|| session.current_year(now)),
        month: args.month,
    };
    let report = session.engine.compute_compliance_report(window, now)?;

    if args.json {
        return print_json(&report);
    }
    session.print_import();
    render_compliance(&report);
    Ok(())
}

pub(crate) fn run_trend_report(args: TrendArgs) -> Result<(), AppError> {
    let session = Session::open(&args.snapshot, None)?;
    let now = args.now.unwrap_or_else(|| SystemClock.now());
    let months = args.months.unwrap_or(session.config.engine.trend_months);
    let metrics = session.engine.compute_monthly_metrics(months, now)?;

    if args.json {
        return print_json(&metrics);
    }
    render_trend(&metrics);
    Ok(())
}

pub(crate) fn run_revenue_report(args: RevenueArgs) -> Result<(), AppError> {
    let session = Session::open(&args.snapshot, None)?;
    let year = args
        .year
        .unwrap_or_else(|| session.current_year(SystemClock.now()));
    let trend = session.engine.compute_revenue_trend(year)?;

    if args.json {
        return print_json(&trend);
    }
    render_revenue(&trend);
    Ok(())
}

pub(crate) fn render_scan(summary: &ScanSummary) {
    println!("Deadline scan at {}", summary.now.to_rfc3339());
    println!(
        "- {} alert(s) created | {} already sent today | {} skipped | {} failed",
        summary.created, summary.suppressed, summary.skipped, summary.failed
    );
    for (kind, counts) in &summary.by_kind {
        println!(
            "  - {}: {} outstanding, {} created, {} suppressed",
            kind.label(),
            counts.scanned,
            counts.created,
            counts.suppressed
        );
    }
}

pub(crate) fn render_compliance(report: &ComplianceReport) {
    let scope = match report.window.month {
        Some(month) => format!("{:02}/{}", month, report.window.year),
        None => report.window.year.to_string(),
    };
    println!("Compliance report for {scope}");
    println!(
        "- {} client(s) | average score {:.2}",
        report.total_clients, report.average_compliance_score
    );
    println!(
        "- {} fully compliant | {} partially compliant | {} non-compliant",
        report.fully_compliant, report.partially_compliant, report.non_compliant
    );
    for client in &report.clients {
        println!(
            "  - {} ({}): {} [{}] {} overdue return(s), {} pending notice(s)",
            client.client_name,
            client.gstin,
            client.compliance_score,
            client.bucket_label,
            client.overdue_returns,
            client.pending_notices
        );
    }
}

pub(crate) fn render_trend(metrics: &[ComplianceMetric]) {
    println!("Filing trend ({} month(s))", metrics.len());
    for metric in metrics {
        println!(
            "  - {}: {}/{} filed ({}%), {} late",
            metric.label,
            metric.returns_filed,
            metric.returns_due,
            metric.compliance_rate,
            metric.late_filings
        );
    }
}

pub(crate) fn render_revenue(trend: &RevenueTrend) {
    println!("Revenue for {}", trend.year);
    println!(
        "- billed {} | paid {} | pending {}",
        trend.yearly_total, trend.yearly_paid, trend.yearly_pending
    );
    for month in trend.months.iter().filter(|month| month.invoice_count > 0) {
        println!(
            "  - {}: {} invoice(s), {} billed, {} paid",
            month.label, month.invoice_count, month.total, month.paid
        );
    }
    if !trend.top_clients.is_empty() {
        println!("Top clients:");
        for client in &trend.top_clients {
            println!(
                "  - {}: {} across {} invoice(s)",
                client.client_name, client.total_billed, client.invoice_count
            );
        }
    }
}
