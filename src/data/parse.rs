//! Field parsers for the fixed textual encodings in the raw tables
//!
//! Parsers never fail. Malformed or missing text ("--", "---", empty)
//! becomes 0 for counts, percentages and times, and `None` for physical
//! attributes and dates.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn fraction_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)\s+of\s+(\d+)$").ok())
        .as_ref()
}

fn height_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"^(\d+)\s*'\s*(\d+)\s*"?$"#).ok())
        .as_ref()
}

fn clock_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+):(\d{1,2})$").ok())
        .as_ref()
}

/// Present, non-placeholder text
fn present(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    match value {
        "" | "--" | "---" => None,
        v => Some(v),
    }
}

/// "17 of 26" -> (17, 26)
pub fn fraction(value: Option<&str>) -> (f64, f64) {
    present(value)
        .and_then(|v| {
            let caps = fraction_pattern()?.captures(v)?;
            let landed = caps[1].parse::<f64>().ok()?;
            let attempted = caps[2].parse::<f64>().ok()?;
            Some((landed, attempted))
        })
        .unwrap_or((0.0, 0.0))
}

/// "65%" -> 0.65
pub fn percentage(value: Option<&str>) -> f64 {
    present(value)
        .and_then(|v| v.trim_end_matches('%').trim().parse::<f64>().ok())
        .map(|pct| pct / 100.0)
        .unwrap_or(0.0)
}

/// "4:13" -> 253 seconds
pub fn clock_seconds(value: Option<&str>) -> u32 {
    present(value)
        .and_then(|v| {
            let caps = clock_pattern()?.captures(v)?;
            let minutes = caps[1].parse::<u32>().ok()?;
            let seconds = caps[2].parse::<u32>().ok()?;
            minutes.checked_mul(60)?.checked_add(seconds)
        })
        .unwrap_or(0)
}

/// Plain integer count such as knockdowns
pub fn count(value: Option<&str>) -> f64 {
    present(value)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Ending round number; missing stays missing
pub fn round_number(value: Option<&str>) -> Option<u8> {
    present(value).and_then(|v| v.parse::<u8>().ok())
}

/// Ending time in seconds; missing stays missing
pub fn ending_time(value: Option<&str>) -> Option<u32> {
    present(value).map(|v| clock_seconds(Some(v)))
}

/// `5' 9"` -> 69 inches
pub fn height_inches(value: Option<&str>) -> Option<f64> {
    let caps = height_pattern()?.captures(present(value)?)?;
    let feet = caps[1].parse::<f64>().ok()?;
    let inches = caps[2].parse::<f64>().ok()?;
    Some(feet * 12.0 + inches)
}

/// "125 lbs." -> 125
pub fn weight_lbs(value: Option<&str>) -> Option<f64> {
    present(value)?
        .trim_end_matches('.')
        .trim_end_matches("lbs")
        .trim()
        .parse::<f64>()
        .ok()
}

/// `68"` -> 68
pub fn reach_inches(value: Option<&str>) -> Option<f64> {
    present(value)?.trim_end_matches('"').trim().parse::<f64>().ok()
}

/// Date of birth, "Jul 13, 1978"
pub fn birth_date(value: Option<&str>) -> Option<NaiveDate> {
    let v = present(value)?;
    NaiveDate::parse_from_str(v, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(v, "%B %d, %Y"))
        .or_else(|_| NaiveDate::parse_from_str(v, "%Y-%m-%d"))
        .ok()
}

/// Event date, "November 23, 2024"
pub fn event_date(value: Option<&str>) -> Option<NaiveDate> {
    let v = present(value)?;
    NaiveDate::parse_from_str(v, "%B %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(v, "%b %d, %Y"))
        .or_else(|_| NaiveDate::parse_from_str(v, "%Y-%m-%d"))
        .ok()
}

/// Optional text with placeholders removed
pub fn text(value: Option<&str>) -> Option<String> {
    present(value).map(str::to_string)
}

/// Split "A vs. B" into the two trimmed competitor names
pub fn split_bout(bout: &str) -> Option<(String, String)> {
    let (a, b) = bout.split_once(" vs. ")?;
    let a = crate::normalize_name(a);
    let b = crate::normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a, b))
}
