//! Record normalization: raw tables in, one `FightRecord` per bout out
//!
//! Joins results with event metadata, per-round statistics and competitor
//! attributes, then imputes missing physical attributes from weight-class
//! statistics with a global fallback.

use crate::data::parse;
use crate::data::raw::{RawAttributes, RawRoundStats, RawTables};
use crate::{
    identity_key, normalize_name, CompetitorAttributes, FightError, FightRecord, FightStats,
    Outcome, Result, Slot,
};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A competitor's attribute record keyed by display name
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorProfile {
    pub name: String,
    pub attributes: CompetitorAttributes,
}

/// Output of normalization
#[derive(Debug, Clone, Default)]
pub struct NormalizedHistory {
    pub records: Vec<FightRecord>,
    pub profiles: Vec<CompetitorProfile>,
}

/// Running per-fight statistics for one competitor
#[derive(Debug, Default)]
struct StatsAccumulator {
    totals: FightStats,
    sig_pct_sum: f64,
    td_pct_sum: f64,
    rounds: usize,
}

impl StatsAccumulator {
    fn add(&mut self, row: &RawRoundStats) {
        let t = &mut self.totals;
        let (sig_landed, sig_attempted) = parse::fraction(row.sig_strikes.as_deref());
        let (total_landed, total_attempted) = parse::fraction(row.total_strikes.as_deref());
        let (td_landed, td_attempted) = parse::fraction(row.takedowns.as_deref());

        t.knockdowns += parse::count(row.knockdowns.as_deref());
        t.sig_strikes_landed += sig_landed;
        t.sig_strikes_attempted += sig_attempted;
        t.total_strikes_landed += total_landed;
        t.total_strikes_attempted += total_attempted;
        t.takedowns_landed += td_landed;
        t.takedowns_attempted += td_attempted;
        t.submission_attempts += parse::count(row.submission_attempts.as_deref());
        t.reversals += parse::count(row.reversals.as_deref());
        t.control_time_sec += parse::clock_seconds(row.control.as_deref()) as f64;
        t.head_landed += parse::fraction(row.head.as_deref()).0;
        t.body_landed += parse::fraction(row.body.as_deref()).0;
        t.leg_landed += parse::fraction(row.leg.as_deref()).0;
        t.distance_landed += parse::fraction(row.distance.as_deref()).0;
        t.clinch_landed += parse::fraction(row.clinch.as_deref()).0;
        t.ground_landed += parse::fraction(row.ground.as_deref()).0;

        self.sig_pct_sum += parse::percentage(row.sig_strikes_pct.as_deref());
        self.td_pct_sum += parse::percentage(row.takedown_pct.as_deref());
        self.rounds += 1;
    }

    fn finish(&self) -> FightStats {
        let mut stats = self.totals.clone();
        if self.rounds > 0 {
            stats.sig_strikes_pct = self.sig_pct_sum / self.rounds as f64;
            stats.takedown_pct = self.td_pct_sum / self.rounds as f64;
        }
        stats
    }
}

/// Joins and cleans the raw tables
pub struct RecordNormalizer {
    require_attributes: bool,
}

impl RecordNormalizer {
    pub fn new(require_attributes: bool) -> Self {
        RecordNormalizer { require_attributes }
    }

    /// Parse the attribute table, keeping the first row per identity
    pub fn profiles(rows: &[RawAttributes]) -> Vec<CompetitorProfile> {
        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(rows.len());

        for row in rows {
            let name = normalize_name(&row.fighter);
            if name.is_empty() {
                continue;
            }
            if !seen.insert(identity_key(&name)) {
                warn!("Duplicate attribute record for '{}', keeping the first", name);
                continue;
            }
            profiles.push(CompetitorProfile {
                name,
                attributes: CompetitorAttributes {
                    height: parse::height_inches(row.height.as_deref()),
                    weight: parse::weight_lbs(row.weight.as_deref()),
                    reach: parse::reach_inches(row.reach.as_deref()),
                    stance: parse::text(row.stance.as_deref()),
                    date_of_birth: parse::birth_date(row.dob.as_deref()),
                },
            });
        }

        profiles
    }

    /// Produce one normalized record per bout
    pub fn normalize(&self, tables: &RawTables) -> Result<NormalizedHistory> {
        let events: HashMap<String, (Option<NaiveDate>, Option<String>)> = tables
            .events
            .iter()
            .map(|e| {
                (
                    normalize_name(&e.event),
                    (
                        parse::event_date(e.date.as_deref()),
                        parse::text(e.location.as_deref()),
                    ),
                )
            })
            .collect();

        let profiles = Self::profiles(&tables.attributes);
        let attributes: HashMap<String, &CompetitorAttributes> = profiles
            .iter()
            .map(|p| (identity_key(&p.name), &p.attributes))
            .collect();

        let mut stats: HashMap<(String, String, String), StatsAccumulator> = HashMap::new();
        for row in &tables.stats {
            let key = (
                normalize_name(&row.event),
                normalize_name(&row.bout),
                identity_key(&row.fighter),
            );
            stats.entry(key).or_default().add(row);
        }

        let mut records = Vec::with_capacity(tables.results.len());
        let mut matched: Vec<[bool; 2]> = Vec::with_capacity(tables.results.len());
        let mut unmatched = HashSet::new();
        let mut skipped = 0usize;

        for row in &tables.results {
            let event = normalize_name(&row.event);
            let bout = normalize_name(&row.bout);

            let Some((date, location)) = events
                .get(&event)
                .and_then(|(date, location)| date.map(|d| (d, location.clone())))
            else {
                warn!("Skipping '{}' at '{}': event date unknown", bout, event);
                skipped += 1;
                continue;
            };

            let Some((fighter_a, fighter_b)) = parse::split_bout(&bout) else {
                warn!("Skipping bout '{}' at '{}': no competitor separator", bout, event);
                skipped += 1;
                continue;
            };

            let lookup_stats = |name: &str| {
                stats
                    .get(&(event.clone(), bout.clone(), identity_key(name)))
                    .map(StatsAccumulator::finish)
            };
            let stats_a = lookup_stats(&fighter_a);
            let stats_b = lookup_stats(&fighter_b);

            let attrs_a = attributes.get(&identity_key(&fighter_a)).copied();
            let attrs_b = attributes.get(&identity_key(&fighter_b)).copied();
            for (name, attrs) in [(&fighter_a, attrs_a), (&fighter_b, attrs_b)] {
                if attrs.is_none() {
                    unmatched.insert(name.clone());
                }
            }
            matched.push([attrs_a.is_some(), attrs_b.is_some()]);

            records.push(FightRecord {
                event: event.clone(),
                date,
                location,
                fighter_a,
                fighter_b,
                outcome: Outcome::from_code(row.outcome.as_deref().unwrap_or("")),
                method: parse::text(row.method.as_deref()),
                ending_round: parse::round_number(row.round.as_deref()),
                ending_time_sec: parse::ending_time(row.time.as_deref()),
                time_format: parse::text(row.time_format.as_deref()),
                weight_class: parse::text(row.weight_class.as_deref()),
                referee: parse::text(row.referee.as_deref()),
                stats_a,
                stats_b,
                attributes_a: attrs_a.cloned().unwrap_or_default(),
                attributes_b: attrs_b.cloned().unwrap_or_default(),
            });
        }

        if !unmatched.is_empty() {
            let mut names: Vec<String> = unmatched.into_iter().collect();
            names.sort();
            if self.require_attributes {
                return Err(FightError::UnmatchedCompetitors(names));
            }
            warn!(
                "{} competitor(s) without attribute records; their attributes stay missing",
                names.len()
            );
        }

        impute_attributes(&mut records, &matched);

        let before = records.len();
        let records = dedupe(records)?;
        if records.len() < before {
            debug!("Removed {} duplicate fight rows", before - records.len());
        }

        info!(
            "Normalized {} fights ({} skipped) with {} competitor profiles",
            records.len(),
            skipped,
            profiles.len()
        );

        Ok(NormalizedHistory { records, profiles })
    }
}

/// Class-conditional and global fill values for the physical attributes
#[derive(Debug, Default)]
struct AttributeFill {
    height: Option<f64>,
    weight: Option<f64>,
    reach: Option<f64>,
    stance: Option<String>,
}

#[derive(Debug, Default)]
struct AttributePool {
    height: Vec<f64>,
    weight: Vec<f64>,
    reach: Vec<f64>,
    stances: Vec<String>,
}

impl AttributePool {
    fn add(&mut self, attrs: &CompetitorAttributes) {
        self.height.extend(attrs.height);
        self.weight.extend(attrs.weight);
        self.reach.extend(attrs.reach);
        self.stances.extend(attrs.stance.iter().cloned());
    }

    fn fill(&self) -> AttributeFill {
        AttributeFill {
            height: mean(&self.height),
            weight: mean(&self.weight),
            reach: mean(&self.reach),
            stance: mode(&self.stances),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Most frequent value, ties broken by the smallest value
fn mode(values: &[String]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    let best = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, count)| *count == best)
        .map(|(value, _)| value.to_string())
}

/// Fill missing height, weight, reach and stance for matched competitors.
///
/// Values of both slots are pooled per weight class. Date of birth is never imputed.
fn impute_attributes(records: &mut [FightRecord], matched: &[[bool; 2]]) {
    let mut global = AttributePool::default();
    let mut by_class: HashMap<String, AttributePool> = HashMap::new();

    for record in records.iter() {
        for slot in Slot::BOTH {
            let attrs = record.attributes(slot);
            global.add(attrs);
            if let Some(class) = &record.weight_class {
                by_class.entry(class.clone()).or_default().add(attrs);
            }
        }
    }

    let global = global.fill();
    let by_class: HashMap<String, AttributeFill> = by_class
        .into_iter()
        .map(|(class, pool)| (class, pool.fill()))
        .collect();

    let mut filled = 0usize;
    for (record, matched) in records.iter_mut().zip(matched) {
        let class_fill = record
            .weight_class
            .as_ref()
            .and_then(|class| by_class.get(class));

        for (slot, is_matched) in Slot::BOTH.into_iter().zip(matched) {
            if !is_matched {
                continue;
            }
            let attrs = record.attributes_mut(slot);
            let pick = |class: Option<f64>, global: Option<f64>| class.or(global);

            if attrs.height.is_none() {
                attrs.height = pick(class_fill.and_then(|f| f.height), global.height);
                filled += 1;
            }
            if attrs.weight.is_none() {
                attrs.weight = pick(class_fill.and_then(|f| f.weight), global.weight);
                filled += 1;
            }
            if attrs.reach.is_none() {
                attrs.reach = pick(class_fill.and_then(|f| f.reach), global.reach);
                filled += 1;
            }
            if attrs.stance.is_none() {
                attrs.stance = class_fill
                    .and_then(|f| f.stance.clone())
                    .or_else(|| global.stance.clone());
                filled += 1;
            }
        }
    }

    debug!("Imputed {} missing attribute values", filled);
}

/// Drop rows equal in every field, keeping the first occurrence
fn dedupe(records: Vec<FightRecord>) -> Result<Vec<FightRecord>> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(serde_json::to_string(&record)?) {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::{RawEvent, RawResult};

    fn make_event(name: &str, date: &str) -> RawEvent {
        RawEvent {
            event: name.to_string(),
            date: Some(date.to_string()),
            location: Some("Las Vegas, Nevada, USA".to_string()),
        }
    }

    fn make_result(event: &str, bout: &str, outcome: &str, class: &str) -> RawResult {
        RawResult {
            event: event.to_string(),
            bout: bout.to_string(),
            outcome: Some(outcome.to_string()),
            weight_class: Some(class.to_string()),
            method: Some("KO/TKO".to_string()),
            round: Some("2".to_string()),
            time: Some("3:10".to_string()),
            time_format: Some("3 Rnd (5-5-5)".to_string()),
            referee: Some("Herb Dean".to_string()),
        }
    }

    fn make_round(event: &str, bout: &str, fighter: &str, sig: &str, pct: &str) -> RawRoundStats {
        RawRoundStats {
            event: event.to_string(),
            bout: bout.to_string(),
            fighter: fighter.to_string(),
            knockdowns: Some("1".to_string()),
            sig_strikes: Some(sig.to_string()),
            sig_strikes_pct: Some(pct.to_string()),
            total_strikes: Some("20 of 30".to_string()),
            takedowns: Some("1 of 2".to_string()),
            takedown_pct: Some("50%".to_string()),
            submission_attempts: Some("0".to_string()),
            reversals: Some("0".to_string()),
            control: Some("1:30".to_string()),
            head: Some("5 of 9".to_string()),
            body: Some("2 of 3".to_string()),
            leg: Some("1 of 1".to_string()),
            distance: Some("6 of 10".to_string()),
            clinch: Some("1 of 2".to_string()),
            ground: Some("1 of 1".to_string()),
        }
    }

    fn make_attrs(name: &str, height: &str, reach: &str, stance: &str) -> RawAttributes {
        RawAttributes {
            fighter: name.to_string(),
            height: Some(height.to_string()),
            weight: Some("155 lbs.".to_string()),
            reach: Some(reach.to_string()),
            stance: Some(stance.to_string()),
            dob: Some("Jan 01, 1990".to_string()),
        }
    }

    fn make_tables() -> RawTables {
        RawTables {
            events: vec![make_event("UFC 300", "April 13, 2024")],
            results: vec![
                make_result("UFC 300", "Ann Alpha vs. Bea Beta", "W/L", "Lightweight Bout"),
                make_result("UFC 300", "Cy Gamma vs. Dee Delta", "L/W", "Lightweight Bout"),
            ],
            stats: vec![
                make_round("UFC 300", "Ann Alpha vs. Bea Beta", "Ann Alpha", "8 of 10", "80%"),
                make_round("UFC 300", "Ann Alpha vs. Bea Beta", "Ann Alpha", "2 of 10", "20%"),
            ],
            attributes: vec![
                make_attrs("Ann Alpha", "5' 10\"", "70\"", "Orthodox"),
                make_attrs("Bea Beta", "6' 0\"", "--", "Southpaw"),
                make_attrs("Cy Gamma", "--", "74\"", "Orthodox"),
                make_attrs("dee delta", "5' 8\"", "72\"", "--"),
            ],
        }
    }

    #[test]
    fn test_stats_sum_counts_and_average_percentages() {
        let history = RecordNormalizer::new(true).normalize(&make_tables()).unwrap();
        let record = &history.records[0];
        let stats = record.stats_a.as_ref().unwrap();

        assert_eq!(stats.sig_strikes_landed, 10.0);
        assert_eq!(stats.sig_strikes_attempted, 20.0);
        assert!((stats.sig_strikes_pct - 0.5).abs() < 1e-12);
        assert_eq!(stats.knockdowns, 2.0);
        assert_eq!(stats.control_time_sec, 180.0);
        assert!(record.stats_b.is_none());
    }

    #[test]
    fn test_imputes_from_weight_class() {
        let history = RecordNormalizer::new(true).normalize(&make_tables()).unwrap();

        // Bea has no reach: class mean of 70, 74, 72
        assert_eq!(history.records[0].attributes_b.reach, Some(72.0));
        // Cy has no height: class mean of 70, 72, 68
        assert_eq!(history.records[1].attributes_a.height, Some(70.0));
        // Dee has no stance: Orthodox is the class mode
        assert_eq!(
            history.records[1].attributes_b.stance.as_deref(),
            Some("Orthodox")
        );
    }

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let history = RecordNormalizer::new(true).normalize(&make_tables()).unwrap();
        assert_eq!(history.records[1].fighter_b, "Dee Delta");
        assert_eq!(history.records[1].attributes_b.height, Some(68.0));
    }

    #[test]
    fn test_unmatched_competitor_fails_fast() {
        let mut tables = make_tables();
        tables.results.push(make_result(
            "UFC 300",
            "Ann Alpha vs. Nobody Known",
            "W/L",
            "Lightweight Bout",
        ));

        let err = RecordNormalizer::new(true).normalize(&tables).unwrap_err();
        match err {
            FightError::UnmatchedCompetitors(names) => assert_eq!(names, vec!["Nobody Known"]),
            other => panic!("unexpected error: {other}"),
        }

        let history = RecordNormalizer::new(false).normalize(&tables).unwrap();
        let record = history.records.last().unwrap();
        assert_eq!(record.attributes_b.height, None);
    }

    #[test]
    fn test_skips_rows_without_date_or_separator() {
        let mut tables = make_tables();
        tables
            .results
            .push(make_result("UFC 999", "Ann Alpha vs. Bea Beta", "W/L", "Lightweight Bout"));
        tables
            .results
            .push(make_result("UFC 300", "Ann Alpha and Bea Beta", "W/L", "Lightweight Bout"));

        let history = RecordNormalizer::new(true).normalize(&tables).unwrap();
        assert_eq!(history.records.len(), 2);
    }

    #[test]
    fn test_duplicate_rows_removed() {
        let mut tables = make_tables();
        let dup = tables.results[0].clone();
        tables.results.push(dup);

        let history = RecordNormalizer::new(true).normalize(&tables).unwrap();
        assert_eq!(history.records.len(), 2);
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let values = vec!["Southpaw".to_string(), "Orthodox".to_string()];
        assert_eq!(mode(&values).as_deref(), Some("Orthodox"));
        assert_eq!(mode(&[]), None);
    }
}
