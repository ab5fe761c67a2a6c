use chrono::NaiveDate;

/// Lower-cases, strips BOM/zero-width characters, and folds `-`, `_` and
/// whitespace runs into single spaces.
pub(crate) fn normalize_label(value: &str) -> String {
    let cleaned = value
        .replace(['\u{feff}', '\u{200b}'], "")
        .replace(['-', '_', '\u{2013}'], " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

/// Upper-cased alphanumerics only, so `gstr-3b`, `GSTR 3B` and `GSTR3B` agree.
pub(crate) fn compact_code(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub(crate) fn normalize_gstin(value: &str) -> Option<String> {
    let gstin = compact_code(value);
    (gstin.len() == 15).then_some(gstin)
}

/// Tax periods appear as `10-2024`, `102024`, `10/2024`, `Oct 2024` or
/// `October 2024`; all become `MM-YYYY`. Annual returns keep their
/// financial year as `YYYY-YY`.
pub(crate) fn normalize_period(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if let Some(financial_year) = financial_year(trimmed) {
        return Some(financial_year);
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    let (month, year) = if digits.len() == trimmed.replace(['-', '/', ' '], "").len() {
        match digits.len() {
            6 => (digits[..2].parse::<u32>().ok()?, digits[2..].parse::<i32>().ok()?),
            5 => (digits[..1].parse::<u32>().ok()?, digits[1..].parse::<i32>().ok()?),
            _ => return None,
        }
    } else {
        let first = NaiveDate::parse_from_str(&format!("1 {trimmed}"), "%d %B %Y")
            .or_else(|_| NaiveDate::parse_from_str(&format!("1 {trimmed}"), "%d %b %Y"))
            .ok()?;
        return Some(first.format("%m-%Y").to_string());
    };

    NaiveDate::from_ymd_opt(year, month, 1).map(|first| first.format("%m-%Y").to_string())
}

fn financial_year(value: &str) -> Option<String> {
    let (start, end) = value.split_once(['-', '/'])?;
    if start.len() != 4 || end.len() != 2 {
        return None;
    }
    let start: i32 = start.parse().ok()?;
    let end: i32 = end.parse().ok()?;
    ((start + 1) % 100 == end).then(|| format!("{start}-{end:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_ignore_case_and_separators() {
        assert_eq!(normalize_label("\u{feff}Submitted_But-Not  Filed"), "submitted but not filed");
        assert_eq!(normalize_label("  FILED "), "filed");
    }

    #[test]
    fn gstin_must_have_fifteen_characters() {
        assert_eq!(
            normalize_gstin(" 27aapfu0939f1zv "),
            Some("27AAPFU0939F1ZV".to_string())
        );
        assert_eq!(normalize_gstin("27AAPFU0939"), None);
    }

    #[test]
    fn periods_normalize_to_month_and_year() {
        assert_eq!(normalize_period("10-2024").as_deref(), Some("10-2024"));
        assert_eq!(normalize_period("102024").as_deref(), Some("10-2024"));
        assert_eq!(normalize_period("3/2024").as_deref(), Some("03-2024"));
        assert_eq!(normalize_period("October 2024").as_deref(), Some("10-2024"));
        assert_eq!(normalize_period("Mar 2025").as_deref(), Some("03-2025"));
        assert_eq!(normalize_period("13-2024"), None);
        assert_eq!(normalize_period("Q3"), None);
        assert_eq!(normalize_period("2023-24").as_deref(), Some("2023-24"));
        assert_eq!(normalize_period("2099/00").as_deref(), Some("2099-00"));
    }
}
