//! Raw source tables as read from CSV
//!
//! Every field is kept as optional text; numeric decoding happens in
//! [`crate::data::parse`] so malformed values collapse to sentinels
//! instead of rejecting whole rows.

use crate::Result;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

pub const EVENTS_FILE: &str = "ufc_event_details.csv";
pub const RESULTS_FILE: &str = "ufc_fight_results.csv";
pub const STATS_FILE: &str = "ufc_fight_stats.csv";
pub const ATTRIBUTES_FILE: &str = "ufc_fighter_tott.csv";

/// Event metadata row
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "EVENT")]
    pub event: String,
    #[serde(rename = "DATE")]
    pub date: Option<String>,
    #[serde(rename = "LOCATION")]
    pub location: Option<String>,
}

/// Fight result row, one per bout
#[derive(Debug, Clone, Deserialize)]
pub struct RawResult {
    #[serde(rename = "EVENT")]
    pub event: String,
    #[serde(rename = "BOUT")]
    pub bout: String,
    #[serde(rename = "OUTCOME")]
    pub outcome: Option<String>,
    #[serde(rename = "WEIGHTCLASS")]
    pub weight_class: Option<String>,
    #[serde(rename = "METHOD")]
    pub method: Option<String>,
    #[serde(rename = "ROUND")]
    pub round: Option<String>,
    #[serde(rename = "TIME")]
    pub time: Option<String>,
    #[serde(rename = "TIME FORMAT")]
    pub time_format: Option<String>,
    #[serde(rename = "REFEREE")]
    pub referee: Option<String>,
}

/// Per-round statistics row for one competitor
#[derive(Debug, Clone, Deserialize)]
pub struct RawRoundStats {
    #[serde(rename = "EVENT")]
    pub event: String,
    #[serde(rename = "BOUT")]
    pub bout: String,
    #[serde(rename = "FIGHTER")]
    pub fighter: String,
    #[serde(rename = "KD")]
    pub knockdowns: Option<String>,
    #[serde(rename = "SIG.STR.")]
    pub sig_strikes: Option<String>,
    #[serde(rename = "SIG.STR. %")]
    pub sig_strikes_pct: Option<String>,
    #[serde(rename = "TOTAL STR.")]
    pub total_strikes: Option<String>,
    #[serde(rename = "TD")]
    pub takedowns: Option<String>,
    #[serde(rename = "TD %")]
    pub takedown_pct: Option<String>,
    #[serde(rename = "SUB.ATT")]
    pub submission_attempts: Option<String>,
    #[serde(rename = "REV.")]
    pub reversals: Option<String>,
    #[serde(rename = "CTRL")]
    pub control: Option<String>,
    #[serde(rename = "HEAD")]
    pub head: Option<String>,
    #[serde(rename = "BODY")]
    pub body: Option<String>,
    #[serde(rename = "LEG")]
    pub leg: Option<String>,
    #[serde(rename = "DISTANCE")]
    pub distance: Option<String>,
    #[serde(rename = "CLINCH")]
    pub clinch: Option<String>,
    #[serde(rename = "GROUND")]
    pub ground: Option<String>,
}

/// Tale-of-the-tape row for one competitor
#[derive(Debug, Clone, Deserialize)]
pub struct RawAttributes {
    #[serde(rename = "FIGHTER")]
    pub fighter: String,
    #[serde(rename = "HEIGHT")]
    pub height: Option<String>,
    #[serde(rename = "WEIGHT")]
    pub weight: Option<String>,
    #[serde(rename = "REACH")]
    pub reach: Option<String>,
    #[serde(rename = "STANCE")]
    pub stance: Option<String>,
    #[serde(rename = "DOB")]
    pub dob: Option<String>,
}

/// The four source tables together
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub events: Vec<RawEvent>,
    pub results: Vec<RawResult>,
    pub stats: Vec<RawRoundStats>,
    pub attributes: Vec<RawAttributes>,
}

impl RawTables {
    /// Load all four tables from a directory using the standard file names
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(RawTables {
            events: load_table(dir.join(EVENTS_FILE))?,
            results: load_table(dir.join(RESULTS_FILE))?,
            stats: load_table(dir.join(STATS_FILE))?,
            attributes: load_table(dir.join(ATTRIBUTES_FILE))?,
        })
    }
}

/// Read a CSV table, skipping blank and malformed rows
pub fn load_table<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;
    read_table(reader, &path.display().to_string())
}

/// Read a CSV table from any reader
pub fn read_table_from<T, R>(source: R, label: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: std::io::Read,
{
    let reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(source);
    read_table(reader, label)
}

fn read_table<T, R>(mut reader: csv::Reader<R>, label: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: std::io::Read,
{
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let raw: StringRecord = result?;
        if raw.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let cleaned: StringRecord = raw.iter().map(str::trim).collect();
        match cleaned.deserialize::<T>(Some(&headers)) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                warn!(
                    "{}: skipping malformed row at line {}: {}",
                    label,
                    raw.position().map(|p| p.line()).unwrap_or(0),
                    e
                );
            }
        }
    }

    debug!("{}: {} rows read, {} skipped", label, rows.len(), skipped);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_results_with_blank_fields() {
        let text = "EVENT,BOUT,OUTCOME,WEIGHTCLASS,METHOD,ROUND,TIME,TIME FORMAT,REFEREE,DETAILS,URL\n\
                    UFC 1 ,Royce Gracie vs. Gerard Gordeau,W/L,Open Weight Bout,Submission,1,1:44,No Time Limit,,x,y\n\
                    ,,,,,,,,,,\n";
        let rows: Vec<RawResult> = read_table_from(text.as_bytes(), "results").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event, "UFC 1");
        assert_eq!(rows[0].referee, None);
        assert_eq!(rows[0].time.as_deref(), Some("1:44"));
    }

    #[test]
    fn test_read_attributes() {
        let text = "FIGHTER,HEIGHT,WEIGHT,REACH,STANCE,DOB,URL\n\
                    Jon Jones,\"6' 4\"\"\",205 lbs.,\"84\"\"\",Orthodox,\"Jul 19, 1987\",u\n";
        let rows: Vec<RawAttributes> = read_table_from(text.as_bytes(), "tott").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].height.as_deref(), Some("6' 4\""));
        assert_eq!(rows[0].dob.as_deref(), Some("Jul 19, 1987"));
    }
}
