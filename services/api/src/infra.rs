use chrono::{DateTime, NaiveDate, Utc};
use gstdesk::error::AppError;
use gstdesk::workflows::deadlines::{InMemoryEntityStore, StoreSnapshot};
use gstdesk::workflows::portal::{MergeSummary, PortalReturnImporter, RejectedRow};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot contents after an optional portal export was merged in.
pub(crate) struct LoadedPractice {
    pub(crate) store: InMemoryEntityStore,
    pub(crate) merged: Option<MergeSummary>,
    pub(crate) rejected: Vec<RejectedRow>,
}

pub(crate) fn load_practice(
    snapshot: &Path,
    returns_csv: Option<&Path>,
) -> Result<LoadedPractice, AppError> {
    let mut data = StoreSnapshot::from_path(snapshot)?;
    info!(
        path = %snapshot.display(),
        clients = data.clients.len(),
        returns = data.returns.len(),
        notices = data.notices.len(),
        invoices = data.invoices.len(),
        "snapshot loaded"
    );

    let (merged, rejected) = match returns_csv {
        Some(path) => {
            let import = PortalReturnImporter::from_path(path, &data.clients)?;
            let summary = import.merge_into(&mut data);
            (Some(summary), import.rejected)
        }
        None => (None, Vec::new()),
    };

    Ok(LoadedPractice {
        store: InMemoryEntityStore::from_snapshot(data),
        merged,
        rejected,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts RFC 3339 timestamps or a bare date, which means midnight UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = parse_date(raw)
        .map_err(|_| format!("failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{raw}' is not a valid instant"))
}
