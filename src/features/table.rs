//! The chronologically ordered fight table that stages derive columns on

use crate::features::columns::ColumnKey;
use crate::features::vocabulary::CategoryVocabulary;
use crate::{CompetitorAttributes, FightError, FightRecord, FightStats, Result, Slot};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Column storage; NaN or `None` marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Categorical(Vec<Option<String>>),
}

/// Fight records sorted by date with derived columns alongside.
///
/// Rows never move after construction. Per-competitor groups are tracked
/// separately for each slot: a name's slot-A appearances and slot-B
/// appearances form two independent series.
#[derive(Debug, Clone)]
pub struct FightTable {
    records: Vec<FightRecord>,
    order: Vec<ColumnKey>,
    columns: HashMap<ColumnKey, Column>,
    groups: [Vec<Vec<usize>>; 2],
    vocabulary: Option<CategoryVocabulary>,
}

fn slot_index(slot: Slot) -> usize {
    match slot {
        Slot::A => 0,
        Slot::B => 1,
    }
}

impl FightTable {
    /// Build from records in input order.
    ///
    /// Rows are stable-sorted by date so same-day fights keep input order.
    pub fn from_records(mut records: Vec<FightRecord>) -> Self {
        records.sort_by_key(|r| r.date);

        let groups = Slot::BOTH.map(|slot| {
            let mut index: HashMap<&str, usize> = HashMap::new();
            let mut groups: Vec<Vec<usize>> = Vec::new();
            for (row, record) in records.iter().enumerate() {
                let name = record.competitor(slot);
                let group = *index.entry(name).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[group].push(row);
            }
            groups
        });

        let mut table = FightTable {
            records,
            order: Vec::new(),
            columns: HashMap::new(),
            groups,
            vocabulary: None,
        };
        table.seed_columns();
        table
    }

    fn seed_columns(&mut self) {
        let n = self.records.len();

        for slot in Slot::BOTH {
            let mut stats: Vec<Vec<f64>> = vec![Vec::with_capacity(n); FightStats::FIELDS.len()];
            for record in &self.records {
                match record.stats(slot) {
                    Some(s) => {
                        for (column, value) in stats.iter_mut().zip(s.values()) {
                            column.push(value);
                        }
                    }
                    None => {
                        for column in stats.iter_mut() {
                            column.push(f64::NAN);
                        }
                    }
                }
            }
            for (field, values) in FightStats::FIELDS.iter().zip(stats) {
                self.set_numeric(ColumnKey::competitor(slot, field), values);
            }

            let height = self.attribute_values(slot, |a| a.height);
            let weight = self.attribute_values(slot, |a| a.weight);
            let reach = self.attribute_values(slot, |a| a.reach);
            let stance: Vec<Option<String>> = self
                .records
                .iter()
                .map(|r| r.attributes(slot).stance.clone())
                .collect();

            self.set_numeric(ColumnKey::competitor(slot, "height"), height);
            self.set_numeric(ColumnKey::competitor(slot, "weight"), weight);
            self.set_numeric(ColumnKey::competitor(slot, "reach"), reach);
            self.set_categorical(ColumnKey::competitor(slot, "stance"), stance);
        }

        let ending_round = self
            .records
            .iter()
            .map(|r| r.ending_round.map_or(f64::NAN, f64::from))
            .collect();
        let ending_time = self
            .records
            .iter()
            .map(|r| r.ending_time_sec.map_or(f64::NAN, f64::from))
            .collect();
        let referee = self.records.iter().map(|r| r.referee.clone()).collect();
        let weight_class = self.records.iter().map(|r| r.weight_class.clone()).collect();

        self.set_numeric(ColumnKey::shared("ending_round"), ending_round);
        self.set_numeric(ColumnKey::shared("ending_time_sec"), ending_time);
        self.set_categorical(ColumnKey::shared("referee"), referee);
        self.set_categorical(ColumnKey::shared("weight_class"), weight_class);
    }

    fn attribute_values<F>(&self, slot: Slot, field: F) -> Vec<f64>
    where
        F: Fn(&CompetitorAttributes) -> Option<f64>,
    {
        self.records
            .iter()
            .map(|r| field(r.attributes(slot)).unwrap_or(f64::NAN))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in table order
    pub fn records(&self) -> &[FightRecord] {
        &self.records
    }

    pub fn date(&self, row: usize) -> NaiveDate {
        self.records[row].date
    }

    /// Column keys in insertion order
    pub fn keys(&self) -> &[ColumnKey] {
        &self.order
    }

    pub fn has(&self, key: &ColumnKey) -> bool {
        self.columns.contains_key(key)
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&Column> {
        self.columns.get(key)
    }

    pub fn numeric(&self, key: &ColumnKey) -> Result<&[f64]> {
        match self.columns.get(key) {
            Some(Column::Numeric(values)) => Ok(values),
            _ => Err(FightError::UnknownColumn(key.name())),
        }
    }

    pub fn categorical(&self, key: &ColumnKey) -> Result<&[Option<String>]> {
        match self.columns.get(key) {
            Some(Column::Categorical(values)) => Ok(values),
            _ => Err(FightError::UnknownColumn(key.name())),
        }
    }

    /// Insert or replace a numeric column, keeping its original position
    pub fn set_numeric(&mut self, key: ColumnKey, values: Vec<f64>) {
        self.set(key, Column::Numeric(values));
    }

    pub fn set_categorical(&mut self, key: ColumnKey, values: Vec<Option<String>>) {
        self.set(key, Column::Categorical(values));
    }

    fn set(&mut self, key: ColumnKey, column: Column) {
        if self.columns.insert(key.clone(), column).is_none() {
            self.order.push(key);
        }
    }

    pub fn remove(&mut self, key: &ColumnKey) -> Option<Column> {
        let removed = self.columns.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    /// Row indices of each competitor series for one slot, chronological
    pub fn groups(&self, slot: Slot) -> &[Vec<usize>] {
        &self.groups[slot_index(slot)]
    }

    /// Apply a series operation to every competitor group of one slot.
    ///
    /// `values` is indexed by table row; the operation sees one group's
    /// values in chronological order and must return as many values.
    pub fn per_group<F>(&self, slot: Slot, values: &[f64], op: F) -> Vec<f64>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let mut out = vec![f64::NAN; values.len()];
        for group in self.groups(slot) {
            let series: Vec<f64> = group.iter().map(|&row| values[row]).collect();
            for (&row, value) in group.iter().zip(op(&series)) {
                out[row] = value;
            }
        }
        out
    }

    /// Same as [`FightTable::per_group`] reading a named column
    pub fn per_group_of<F>(&self, key: &ColumnKey, op: F) -> Result<Vec<f64>>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let slot = key
            .slot()
            .ok_or_else(|| FightError::UnknownColumn(key.name()))?;
        let values = self.numeric(key)?;
        Ok(self.per_group(slot, values, op))
    }

    pub fn vocabulary(&self) -> Option<&CategoryVocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn set_vocabulary(&mut self, vocabulary: CategoryVocabulary) {
        self.vocabulary = Some(vocabulary);
    }
}
