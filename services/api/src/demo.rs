use crate::infra::{parse_timestamp, LoadedPractice};
use crate::report::{render_compliance, render_revenue, render_scan, render_trend};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use clap::Args;
use gstdesk::config::AppConfig;
use gstdesk::error::AppError;
use gstdesk::telemetry;
use gstdesk::workflows::deadlines::{
    Client, ClientId, ClientStatus, Clock, ComplianceEngine, DayBoundary, DueDate, EngineConfig,
    EngineError, GstReturn, InMemoryEntityStore, Invoice, InvoiceStatus, Money, Notice,
    NoticeStatus, Notification, ObligationId, RegistrationStatus, ReportingWindow, ReturnStatus,
    ReturnType, StoreSnapshot, SystemClock, UserId,
};
use gstdesk::workflows::portal::PortalReturnImporter;
use std::sync::Arc;

const PRACTITIONER: &str = "ca-demo";
const SHARMA_GSTIN: &str = "27AAACS1234F1ZV";
const KAVERI_GSTIN: &str = "29AABCK5678L1ZP";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Skip the portal export merge
    #[arg(long)]
    pub(crate) skip_portal: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let now = args.now.unwrap_or_else(|| SystemClock.now());
    let today = DayBoundary::new(config.engine.timezone).today(now);

    println!("GST practice demo for {today}");
    let LoadedPractice {
        store,
        merged,
        rejected,
    } = seed_practice(today, !args.skip_portal)?;
    if let Some(merged) = merged {
        println!(
            "- Portal export: {} return(s) updated, {} added, {} row(s) rejected",
            merged.updated,
            merged.inserted,
            rejected.len()
        );
        for row in &rejected {
            println!("  - line {}: {}", row.line, row.reason);
        }
    }

    let engine = demo_engine(store.clone(), config.engine.clone());

    println!("\nFirst scan");
    let summary = engine.scan_and_notify(now)?;
    render_scan(&summary);
    print_notifications(&store, now)?;

    println!("\nSecond scan an hour later (same day alerts are suppressed)");
    let summary = engine.scan_and_notify(now + Duration::hours(1))?;
    render_scan(&summary);

    println!("\nFiling the overdue GSTR-3B for Sharma Textiles");
    let overdue = store
        .snapshot()
        .map_err(EngineError::from)?
        .returns
        .into_iter()
        .find(|record| record.id.0 == "ret-sharma-3b");
    match overdue {
        Some(mut record) => {
            record.status = ReturnStatus::Filed;
            record.filed_at = Some(now);
            store.update_return(record.clone()).map_err(EngineError::from)?;
            let notification = engine.notify_return_filed(&record, now)?;
            println!(
                "  [{}] {} - {}",
                notification.severity.label(),
                notification.title,
                notification.message
            );
        }
        None => println!("  Seeded return not found; nothing to confirm"),
    }

    println!();
    let report = engine.compute_compliance_report(
        ReportingWindow {
            year: today.year(),
            month: None,
        },
        now,
    )?;
    render_compliance(&report);

    println!();
    let metrics = engine.compute_monthly_metrics(config.engine.trend_months, now)?;
    render_trend(&metrics);

    println!();
    let revenue = engine.compute_revenue_trend(today.year())?;
    render_revenue(&revenue);

    Ok(())
}

fn demo_engine(
    store: InMemoryEntityStore,
    config: EngineConfig,
) -> ComplianceEngine<InMemoryEntityStore> {
    ComplianceEngine::new(Arc::new(store), config)
}

fn print_notifications(store: &InMemoryEntityStore, now: DateTime<Utc>) -> Result<(), AppError> {
    let notifications: Vec<Notification> = store
        .notifications()
        .map_err(EngineError::from)?
        .into_iter()
        .filter(|notification| notification.created_at == now)
        .collect();
    for notification in notifications {
        println!(
            "  [{}] {} - {}",
            notification.severity.label(),
            notification.title,
            notification.message
        );
    }
    Ok(())
}

/// Two clients whose deadlines sit around `today`, optionally refreshed from a
/// small portal export.
fn seed_practice(today: NaiveDate, with_portal: bool) -> Result<LoadedPractice, AppError> {
    let last_month = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    let two_months_ago = today.checked_sub_months(Months::new(2)).unwrap_or(today);
    let period = last_month.format("%m-%Y").to_string();
    let earlier_period = two_months_ago.format("%m-%Y").to_string();
    let offset = |days: i64| DueDate::from(today + Duration::days(days));

    let mut snapshot = StoreSnapshot {
        clients: vec![
            demo_client("sharma", "Sharma Textiles", SHARMA_GSTIN),
            demo_client("kaveri", "Kaveri Foods", KAVERI_GSTIN),
        ],
        returns: vec![
            demo_return(
                "ret-sharma-3b",
                "sharma",
                ReturnType::Gstr3b,
                &period,
                offset(-5),
                ReturnStatus::Draft,
                Some(Money::from_rupees(84_500)),
            ),
            demo_return(
                "ret-sharma-1",
                "sharma",
                ReturnType::Gstr1,
                &period,
                offset(2),
                ReturnStatus::Pending,
                None,
            ),
            demo_return(
                "ret-kaveri-3b",
                "kaveri",
                ReturnType::Gstr3b,
                &period,
                offset(-1),
                ReturnStatus::Draft,
                Some(Money::from_rupees(12_750)),
            ),
            demo_return(
                "ret-kaveri-3b-prev",
                "kaveri",
                ReturnType::Gstr3b,
                &earlier_period,
                offset(-31),
                ReturnStatus::Filed,
                None,
            ),
        ],
        notices: vec![Notice {
            id: ObligationId("notice-kaveri-asmt".to_string()),
            client_id: ClientId("kaveri".to_string()),
            notice_number: "ASMT-10/2024/118".to_string(),
            subject: "Mismatch between GSTR-1 and GSTR-3B outward supplies".to_string(),
            due_date: offset(4),
            status: NoticeStatus::Pending,
            resolved_at: None,
            demand_amount: Some(Money::from_rupees(23_400)),
        }],
        invoices: vec![
            demo_invoice(
                "inv-sharma-q3",
                "sharma",
                today - Duration::days(20),
                offset(-1),
                15_000,
                InvoiceStatus::Sent,
            ),
            demo_invoice(
                "inv-kaveri-q3",
                "kaveri",
                today - Duration::days(40),
                offset(-10),
                9_500,
                InvoiceStatus::Paid,
            ),
        ],
        notifications: Vec::new(),
    };

    if let Some(filed) = snapshot
        .returns
        .iter_mut()
        .find(|record| record.status == ReturnStatus::Filed)
    {
        filed.filed_at = (today - Duration::days(33))
            .and_hms_opt(11, 0, 0)
            .map(|naive| naive.and_utc());
    }

    if !with_portal {
        return Ok(LoadedPractice {
            store: InMemoryEntityStore::from_snapshot(snapshot),
            merged: None,
            rejected: Vec::new(),
        });
    }

    let export = portal_export(today, &period);
    let import = PortalReturnImporter::from_reader(export.as_bytes(), &snapshot.clients)?;
    let merged = import.merge_into(&mut snapshot);

    Ok(LoadedPractice {
        store: InMemoryEntityStore::from_snapshot(snapshot),
        merged: Some(merged),
        rejected: import.rejected,
    })
}

/// Portal export marking Kaveri's GSTR-3B filed, adding its GSTR-1, and one
/// row for a GSTIN the practice does not serve.
fn portal_export(today: NaiveDate, period: &str) -> String {
    let date = |days: i64| (today + Duration::days(days)).format("%d-%m-%Y").to_string();
    format!(
        "GSTIN,Return Type,Tax Period,Due Date,Status,Date of Filing\n\
         {KAVERI_GSTIN},GSTR-3B,{period},{},Filed,{}\n\
         {KAVERI_GSTIN},GSTR-1,{period},{},Not Filed,\n\
         07AAAPL9999Q1Z5,GSTR-3B,{period},{},Filed,{}\n",
        date(-1),
        date(-2),
        date(6),
        date(-1),
        date(-3),
    )
}

fn demo_client(id: &str, name: &str, gstin: &str) -> Client {
    Client {
        id: ClientId(id.to_string()),
        name: name.to_string(),
        gstin: gstin.to_string(),
        registration_status: RegistrationStatus::Active,
        status: ClientStatus::Active,
        practitioner: UserId(PRACTITIONER.to_string()),
    }
}

fn demo_return(
    id: &str,
    client_id: &str,
    return_type: ReturnType,
    period: &str,
    due_date: DueDate,
    status: ReturnStatus,
    tax_liability: Option<Money>,
) -> GstReturn {
    GstReturn {
        id: ObligationId(id.to_string()),
        client_id: ClientId(client_id.to_string()),
        return_type,
        period: period.to_string(),
        due_date,
        status,
        filed_at: None,
        tax_liability,
    }
}

fn demo_invoice(
    id: &str,
    client_id: &str,
    issued_on: NaiveDate,
    due_date: DueDate,
    rupees: i64,
    status: InvoiceStatus,
) -> Invoice {
    Invoice {
        id: ObligationId(id.to_string()),
        client_id: ClientId(client_id.to_string()),
        invoice_number: id.to_uppercase(),
        issued_on,
        due_date,
        amount: Money::from_rupees(rupees),
        status,
        paid_at: None,
    }
}
