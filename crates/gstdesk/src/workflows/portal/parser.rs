use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One data row of a portal return-status export, fields still raw.
#[derive(Debug)]
pub(crate) struct PortalRecord {
    /// 1-based line in the source file, counting the header.
    pub(crate) line: u64,
    pub(crate) gstin: String,
    pub(crate) return_type: String,
    pub(crate) period: String,
    pub(crate) due_date: Option<String>,
    pub(crate) status: String,
    pub(crate) filed_on: Option<String>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<PortalRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<PortalRow>().enumerate() {
        let row = record?;
        records.push(PortalRecord {
            line: index as u64 + 2,
            gstin: row.gstin,
            return_type: row.return_type,
            period: row.period,
            due_date: row.due_date,
            status: row.status,
            filed_on: row.filed_on,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct PortalRow {
    #[serde(rename = "GSTIN", alias = "gstin")]
    gstin: String,
    #[serde(rename = "Return Type", alias = "return_type")]
    return_type: String,
    #[serde(rename = "Tax Period", alias = "Return Period", alias = "period")]
    period: String,
    #[serde(
        rename = "Due Date",
        alias = "due_date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    due_date: Option<String>,
    #[serde(rename = "Status", alias = "status")]
    status: String,
    #[serde(
        rename = "Date of Filing",
        alias = "filed_on",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    filed_on: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
