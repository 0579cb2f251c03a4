use crate::error::{ReportError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC3339 timestamp.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    Err(ReportError::InvalidDate(format!(
        "'{input}' is neither YYYY-MM-DD nor RFC3339"
    )))
}

/// Resolve the `-d` argument: one date means that whole day, two
/// space-separated dates give an explicit `[start, end)` window.
pub fn parse_report_window(input: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let mut parts = input.split_whitespace();
    let start = match parts.next() {
        Some(s) => parse_date(s)?,
        None => return Err(ReportError::InvalidDate("empty date".to_string())),
    };
    let end = match parts.next() {
        Some(e) => parse_date(e)?,
        None => start + Duration::days(1),
    };
    if parts.next().is_some() {
        return Err(ReportError::InvalidDate(format!(
            "expected at most two dates, got '{input}'"
        )));
    }
    if end <= start {
        return Err(ReportError::InvalidDate(format!(
            "Invalid range: start ({start}) is not before end ({end})"
        )));
    }
    Ok((start, end))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn expand_tabs(line: &str, tabsize: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut col = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = tabsize - (col % tabsize);
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}
