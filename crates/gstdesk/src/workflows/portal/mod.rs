//! Import of GST portal return-status exports.
//!
//! Practitioners download a CSV from the portal listing each return with its
//! filing status. The importer resolves every row to a known client by GSTIN
//! and turns it into a [`GstReturn`]; rows that cannot be resolved are kept as
//! [`RejectedRow`]s so the caller can show them instead of silently dropping
//! them.

mod mapping;
mod normalizer;
mod parser;

use crate::workflows::deadlines::domain::{
    Client, ClientId, DueDate, GstReturn, ObligationId, ReturnStatus,
};
use crate::workflows::deadlines::memory::StoreSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use parser::PortalRecord;

#[derive(Debug, thiserror::Error)]
pub enum PortalImportError {
    #[error("failed to read portal export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid portal CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// A row the importer could not turn into a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PortalImport {
    pub returns: Vec<GstReturn>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
}

pub struct PortalReturnImporter;

impl PortalReturnImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        clients: &[Client],
    ) -> Result<PortalImport, PortalImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, clients)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        clients: &[Client],
    ) -> Result<PortalImport, PortalImportError> {
        let by_gstin: HashMap<String, &ClientId> = clients
            .iter()
            .filter_map(|client| {
                normalizer::normalize_gstin(&client.gstin).map(|gstin| (gstin, &client.id))
            })
            .collect();

        let mut import = PortalImport::default();
        for record in parser::parse_records(reader)? {
            let line = record.line;
            match to_return(record, &by_gstin) {
                Ok(gst_return) => import.returns.push(gst_return),
                Err(reason) => {
                    warn!(line, %reason, "rejected portal row");
                    import.rejected.push(RejectedRow { line, reason });
                }
            }
        }

        info!(
            accepted = import.returns.len(),
            rejected = import.rejected.len(),
            "portal export parsed"
        );
        Ok(import)
    }
}

fn to_return(
    record: PortalRecord,
    by_gstin: &HashMap<String, &ClientId>,
) -> Result<GstReturn, String> {
    let gstin = normalizer::normalize_gstin(&record.gstin)
        .ok_or_else(|| format!("malformed GSTIN '{}'", record.gstin))?;
    let client_id = by_gstin
        .get(&gstin)
        .map(|id| (*id).clone())
        .ok_or_else(|| format!("no client registered under GSTIN {gstin}"))?;
    let return_type = mapping::return_type(&record.return_type)
        .ok_or_else(|| format!("unsupported return type '{}'", record.return_type))?;
    let period = normalizer::normalize_period(&record.period)
        .ok_or_else(|| format!("unrecognised tax period '{}'", record.period))?;
    let status = mapping::return_status(&record.status)
        .ok_or_else(|| format!("unknown filing status '{}'", record.status))?;
    let due_date = record
        .due_date
        .map(DueDate)
        .ok_or_else(|| "due date is missing".to_string())?;
    due_date.parse().map_err(|error| error.to_string())?;

    let filed_at = match (status, record.filed_on) {
        (ReturnStatus::Filed, Some(raw)) => Some(filing_timestamp(&raw)?),
        _ => None,
    };

    Ok(GstReturn {
        id: ObligationId(format!(
            "portal-{}-{}-{}",
            gstin,
            normalizer::compact_code(return_type.label()),
            period
        )),
        client_id,
        return_type,
        period,
        due_date,
        status,
        filed_at,
        tax_liability: None,
    })
}

fn filing_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    let date = DueDate(raw.to_string())
        .parse()
        .map_err(|_| format!("unrecognised filing date '{raw}'"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised filing date '{raw}'"))
}

impl PortalImport {
    /// Apply imported returns to a snapshot.
    ///
    /// A return for the same client, type and period replaces the stored
    /// status, due date and filing time but keeps its id and tax liability.
    pub fn merge_into(&self, snapshot: &mut StoreSnapshot) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for imported in &self.returns {
            let existing = snapshot.returns.iter_mut().find(|stored| {
                stored.client_id == imported.client_id
                    && stored.return_type == imported.return_type
                    && stored.period == imported.period
            });

            match existing {
                Some(stored) => {
                    stored.status = imported.status;
                    stored.due_date = imported.due_date.clone();
                    stored.filed_at = imported.filed_at.or(stored.filed_at);
                    summary.updated += 1;
                }
                None => {
                    snapshot.returns.push(imported.clone());
                    summary.inserted += 1;
                }
            }
        }

        summary
    }
}
