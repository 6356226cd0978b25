//! The finished historical feature matrix
//!
//! Immutable once built. Columns are numeric and stored column-major in
//! table order; the target label is kept apart from the feature columns.

use crate::features::columns::ColumnKey;
use crate::features::stages::encoding::TARGET;
use crate::features::table::FightTable;
use crate::features::vocabulary::CategoryVocabulary;
use crate::model::LabelledRows;
use crate::{Result, Slot};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

/// Bout identity carried alongside each matrix row
#[derive(Debug, Clone, PartialEq)]
pub struct RowMeta {
    pub date: NaiveDate,
    pub event: String,
    pub fighter_a: String,
    pub fighter_b: String,
    pub stance_a: Option<String>,
    pub stance_b: Option<String>,
}

impl RowMeta {
    pub fn competitor(&self, slot: Slot) -> &str {
        match slot {
            Slot::A => &self.fighter_a,
            Slot::B => &self.fighter_b,
        }
    }

    pub fn stance(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::A => self.stance_a.as_deref(),
            Slot::B => self.stance_b.as_deref(),
        }
    }
}

/// Labelled row indices partitioned by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    keys: Vec<ColumnKey>,
    names: Vec<String>,
    index: HashMap<ColumnKey, usize>,
    columns: Vec<Vec<f64>>,
    rows: Vec<RowMeta>,
    targets: Vec<Option<f64>>,
    vocabulary: CategoryVocabulary,
}

impl FeatureMatrix {
    /// Take every numeric column except the target; categorical columns
    /// that survive encoding only feed the row metadata
    pub fn from_table(table: &FightTable) -> Result<Self> {
        let target = table.numeric(&ColumnKey::shared(TARGET))?;
        let targets = target
            .iter()
            .map(|t| if t.is_nan() { None } else { Some(*t) })
            .collect();

        let stance = |slot: Slot| -> Vec<Option<String>> {
            table
                .categorical(&ColumnKey::competitor(slot, "stance"))
                .map(|values| values.to_vec())
                .unwrap_or_else(|_| vec![None; table.len()])
        };
        let stance_a = stance(Slot::A);
        let stance_b = stance(Slot::B);

        let rows = table
            .records()
            .iter()
            .zip(stance_a.into_iter().zip(stance_b))
            .map(|(r, (stance_a, stance_b))| RowMeta {
                date: r.date,
                event: r.event.clone(),
                fighter_a: r.fighter_a.clone(),
                fighter_b: r.fighter_b.clone(),
                stance_a,
                stance_b,
            })
            .collect();

        let target_key = ColumnKey::shared(TARGET);
        let mut keys = Vec::new();
        let mut columns = Vec::new();
        for key in table.keys() {
            if *key == target_key {
                continue;
            }
            if let Ok(values) = table.numeric(key) {
                keys.push(key.clone());
                columns.push(values.to_vec());
            }
        }

        let names = keys.iter().map(ColumnKey::name).collect();
        let index = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), i))
            .collect();

        Ok(FeatureMatrix {
            keys,
            names,
            index,
            columns,
            rows,
            targets,
            vocabulary: table.vocabulary().cloned().unwrap_or_default(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> &[ColumnKey] {
        &self.keys
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column_index(&self, key: &ColumnKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn value(&self, row: usize, key: &ColumnKey) -> Option<f64> {
        self.column_index(key).map(|col| self.columns[col][row])
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.column_index(key).map(|col| self.columns[col].as_slice())
    }

    /// All feature values of one row, in column order
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|column| column[row]).collect()
    }

    pub fn row(&self, row: usize) -> &RowMeta {
        &self.rows[row]
    }

    pub fn rows(&self) -> &[RowMeta] {
        &self.rows
    }

    pub fn target(&self, row: usize) -> Option<f64> {
        self.targets[row]
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    /// Last row on `date` in which `name` competed
    pub fn find_row(&self, date: NaiveDate, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .rposition(|r| r.date == date && (r.fighter_a == name || r.fighter_b == name))
    }

    /// Rows with a defined label; draws and no contests are excluded
    pub fn labelled_rows(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&row| self.targets[row].is_some())
            .collect()
    }

    /// Train before `validation_start`, validate until `test_start`, test after
    pub fn split_by_date(&self, validation_start: NaiveDate, test_start: NaiveDate) -> TemporalSplit {
        let mut split = TemporalSplit::default();
        for row in self.labelled_rows() {
            let date = self.rows[row].date;
            if date < validation_start {
                split.train.push(row);
            } else if date < test_start {
                split.validation.push(row);
            } else {
                split.test.push(row);
            }
        }
        split
    }

    /// Feature rows and labels for the given labelled rows
    pub fn dataset(&self, rows: &[usize]) -> LabelledRows {
        let mut features = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        for &row in rows {
            if let Some(label) = self.targets[row] {
                features.push(self.row_values(row));
                labels.push(label);
            }
        }
        LabelledRows {
            feature_names: self.names.clone(),
            rows: features,
            labels,
        }
    }

    /// Export with bout identity, features and target
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![
            "date".to_string(),
            "event".to_string(),
            "fighter_a".to_string(),
            "fighter_b".to_string(),
        ];
        header.extend(self.names.iter().cloned());
        header.push(TARGET.to_string());
        writer.write_record(&header)?;

        for (row, meta) in self.rows.iter().enumerate() {
            let mut record = vec![
                meta.date.to_string(),
                meta.event.clone(),
                meta.fighter_a.clone(),
                meta.fighter_b.clone(),
            ];
            record.extend(self.columns.iter().map(|column| format_value(column[row])));
            record.push(self.targets[row].map_or_else(String::new, format_value));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pipeline::FeaturePipeline;
    use crate::features::stages::fixtures::make_fight;
    use crate::Outcome;

    fn make_matrix() -> FeatureMatrix {
        let records = vec![
            make_fight(0, "X", "Y", Outcome::SlotA),
            make_fight(400, "Y", "Z", Outcome::Draw),
            make_fight(800, "Z", "X", Outcome::SlotB),
            make_fight(1200, "X", "Y", Outcome::SlotB),
        ];
        FeaturePipeline::standard().run(records, None).unwrap()
    }

    #[test]
    fn test_labels_and_split() {
        let matrix = make_matrix();
        assert_eq!(matrix.labelled_rows(), vec![0, 2, 3]);

        let validation = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let test = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let split = matrix.split_by_date(validation, test);
        assert_eq!(split.train, vec![0]);
        assert_eq!(split.validation, vec![2]);
        assert_eq!(split.test, vec![3]);

        let data = matrix.dataset(&split.validation);
        assert_eq!(data.labels, vec![0.0]);
        assert_eq!(data.rows[0].len(), matrix.column_names().len());
    }

    #[test]
    fn test_find_row_and_metadata() {
        let matrix = make_matrix();
        let date = NaiveDate::from_ymd_opt(2022, 3, 11).unwrap();
        assert_eq!(matrix.row(2).date, date);
        assert_eq!(matrix.find_row(date, "X"), Some(2));
        assert_eq!(matrix.find_row(date, "Y"), None);
        assert_eq!(matrix.row(2).stance(Slot::B), Some("Southpaw"));
        assert!(matrix.column_index(&ColumnKey::shared(TARGET)).is_none());
    }

    #[test]
    fn test_write_csv() {
        let matrix = make_matrix();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        matrix.write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), matrix.column_names().len() + 5);
        assert_eq!(&headers[0], "date");
        assert_eq!(reader.records().count(), 4);
    }
}
