use super::normalizer::{compact_code, normalize_label};
use crate::workflows::deadlines::domain::{ReturnStatus, ReturnType};
use std::collections::HashMap;
use std::sync::OnceLock;

static STATUS_MAP: OnceLock<HashMap<String, ReturnStatus>> = OnceLock::new();

pub(crate) fn return_status(raw: &str) -> Option<ReturnStatus> {
    status_map().get(&normalize_label(raw)).copied()
}

pub(crate) fn return_type(raw: &str) -> Option<ReturnType> {
    match compact_code(raw).as_str() {
        "GSTR1" => Some(ReturnType::Gstr1),
        "GSTR3B" => Some(ReturnType::Gstr3b),
        "GSTR4" => Some(ReturnType::Gstr4),
        "GSTR9" => Some(ReturnType::Gstr9),
        "GSTR9C" => Some(ReturnType::Gstr9c),
        "CMP08" => Some(ReturnType::Cmp08),
        _ => None,
    }
}

fn status_map() -> &'static HashMap<String, ReturnStatus> {
    STATUS_MAP.get_or_init(|| {
        const LABEL_TO_STATUS: &[(&str, ReturnStatus)] = &[
            // Filed on the portal
            ("Filed", ReturnStatus::Filed),
            ("Filed - Valid", ReturnStatus::Filed),
            ("Filed Late", ReturnStatus::Filed),
            // Started but not yet filed
            ("Submitted", ReturnStatus::Pending),
            ("Submitted but not filed", ReturnStatus::Pending),
            ("Pending", ReturnStatus::Pending),
            ("Not Filed", ReturnStatus::Pending),
            ("Overdue", ReturnStatus::Pending),
            // Nothing submitted yet
            ("To be filed", ReturnStatus::Draft),
            ("Draft", ReturnStatus::Draft),
            ("Saved", ReturnStatus::Draft),
            ("Draft saved", ReturnStatus::Draft),
            ("Not started", ReturnStatus::Draft),
        ];

        let mut map = HashMap::with_capacity(LABEL_TO_STATUS.len());
        for (label, status) in LABEL_TO_STATUS {
            map.insert(normalize_label(label), *status);
        }
        map
    })
}
