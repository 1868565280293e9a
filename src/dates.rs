use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Parse the date shapes seen in APCD submissions: `YYYYMMDD` integers
/// (possibly stringified with a trailing `.0`), ISO and US textual dates,
/// date-times, and bare 4-digit submission years (taken as Jan 1).
/// Returns `None` for anything unparseable; field-level failures never
/// abort a row.
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s = s.strip_suffix(".0").unwrap_or(s);

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok();
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Year-only generalization, e.g. `20200315` → `"2020"`.
pub fn to_year(raw: Option<&str>) -> Option<String> {
    parse_flexible(raw?).map(|d| d.year().to_string())
}

/// Year-quarter generalization, e.g. `20200315` → `"2020Q1"`.
pub fn to_year_quarter(raw: Option<&str>) -> Option<String> {
    let date = parse_flexible(raw?)?;
    let quarter = date.month0() / 3 + 1;
    Some(format!("{}Q{}", date.year(), quarter))
}
