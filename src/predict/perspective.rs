//! A competitor's latest known state in slot-independent form

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::features::columns::ColumnKey;
use crate::features::matrix::FeatureMatrix;
use crate::{FightError, FightRecord, Result, Slot};

/// Competitor columns from one matrix row, keyed by base name
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalVector {
    pub competitor: String,
    pub fight_date: NaiveDate,
    /// Matrix row the values were taken from
    pub row: usize,
    /// Slot the competitor occupied in that row
    pub source_slot: Slot,
    pub stance: Option<String>,
    features: BTreeMap<String, f64>,
}

impl CanonicalVector {
    pub fn get(&self, base: &str) -> Option<f64> {
        self.features.get(base).copied()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, f64)> {
        self.features.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The vector's columns as seen from `slot`
    pub fn in_slot(&self, slot: Slot) -> impl Iterator<Item = (ColumnKey, f64)> + '_ {
        self.features
            .iter()
            .map(move |(base, value)| (ColumnKey::competitor(slot, base), *value))
    }
}

/// Extract `name`'s state entering their chronologically latest fight.
///
/// Same-date fights resolve to the one listed last in `records`.
pub fn canonical_vector(
    name: &str,
    records: &[FightRecord],
    matrix: &FeatureMatrix,
) -> Result<CanonicalVector> {
    let latest = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.involves(name))
        .max_by_key(|(i, r)| (r.date, *i))
        .map(|(_, r)| r)
        .ok_or_else(|| FightError::UnknownCompetitor(name.to_string()))?;

    let row = matrix
        .find_row(latest.date, name)
        .ok_or_else(|| FightError::UnknownCompetitor(name.to_string()))?;
    let meta = matrix.row(row);
    let slot = if meta.fighter_a == name { Slot::A } else { Slot::B };

    let features = matrix
        .keys()
        .iter()
        .filter(|key| key.slot() == Some(slot))
        .filter_map(|key| {
            matrix
                .value(row, key)
                .map(|value| (key.base().to_string(), value))
        })
        .collect();

    Ok(CanonicalVector {
        competitor: name.to_string(),
        fight_date: meta.date,
        row,
        source_slot: slot,
        stance: meta.stance(slot).map(str::to_string),
        features,
    })
}
