//! Builds one model-ready row for a live matchup
//!
//! Competitor A's canonical vector fills slot A, competitor B's fills slot B,
//! bout context comes from A's latest matrix row, and every matchup column
//! is re-evaluated with the rules the batch stages used.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::features::columns::ColumnKey;
use crate::features::matrix::FeatureMatrix;
use crate::features::rules::MatchupRule;
use crate::features::vocabulary::{stance_matchup, CategoryFamily, CategoryVocabulary};
use crate::predict::perspective::CanonicalVector;
use crate::Slot;

/// Value used for expected columns the assembly did not produce
pub const MISSING_COLUMN_DEFAULT: f64 = 0.0;

/// A single inference row in the model's column order
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRow {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
    /// Expected columns that were filled with the default
    pub defaulted: Vec<String>,
}

impl InferenceRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

pub struct InferenceAssembler<'a> {
    rules: &'a [MatchupRule],
    vocabulary: &'a CategoryVocabulary,
}

impl<'a> InferenceAssembler<'a> {
    pub fn new(rules: &'a [MatchupRule], vocabulary: &'a CategoryVocabulary) -> Self {
        InferenceAssembler { rules, vocabulary }
    }

    /// Assemble the row for `a` (slot A) against `b` (slot B)
    pub fn assemble(
        &self,
        a: &CanonicalVector,
        b: &CanonicalVector,
        matrix: &FeatureMatrix,
        expected: &[String],
    ) -> InferenceRow {
        let mut values: HashMap<ColumnKey, f64> = HashMap::new();
        values.extend(a.in_slot(Slot::A));
        values.extend(b.in_slot(Slot::B));

        // Bout context: shared columns that are not derived from the pairing
        let derived: HashSet<ColumnKey> = self
            .rules
            .iter()
            .map(MatchupRule::output_key)
            .chain(
                self.vocabulary
                    .column_names(CategoryFamily::StanceMatchup)
                    .iter()
                    .map(|name| ColumnKey::shared(name)),
            )
            .collect();
        for key in matrix.keys() {
            if key.slot().is_none() && !derived.contains(key) {
                if let Some(value) = matrix.value(a.row, key) {
                    values.insert(key.clone(), value);
                }
            }
        }

        for rule in self.rules {
            let value = rule.evaluate(|key| values.get(key).copied().unwrap_or(f64::NAN));
            values.insert(rule.output_key(), value);
        }

        let matchup = stance_matchup(a.stance.as_deref(), b.stance.as_deref());
        for (name, value) in self
            .vocabulary
            .encode(CategoryFamily::StanceMatchup, Some(matchup.as_str()))
        {
            values.insert(ColumnKey::shared(&name), value);
        }

        let mut row = InferenceRow {
            columns: expected.to_vec(),
            values: Vec::with_capacity(expected.len()),
            defaulted: Vec::new(),
        };
        for name in expected {
            match values.get(&ColumnKey::parse(name)) {
                Some(value) => row.values.push(*value),
                None => {
                    row.values.push(MISSING_COLUMN_DEFAULT);
                    row.defaulted.push(name.clone());
                }
            }
        }

        if !row.defaulted.is_empty() {
            warn!(
                "{} expected column(s) not produced for {} vs {}, defaulted to {}: {}",
                row.defaulted.len(),
                a.competitor,
                b.competitor,
                MISSING_COLUMN_DEFAULT,
                row.defaulted.join(", ")
            );
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pipeline::FeaturePipeline;
    use crate::features::stages::fixtures::{make_attributes, make_fight};
    use crate::predict::perspective::canonical_vector;
    use crate::{FightRecord, Outcome};

    fn make_history() -> Vec<FightRecord> {
        let mut records = vec![
            make_fight(0, "A", "C", Outcome::SlotA),
            make_fight(40, "D", "B", Outcome::SlotA),
            make_fight(80, "C", "A", Outcome::SlotA),
            make_fight(120, "B", "D", Outcome::SlotB),
            make_fight(160, "A", "B", Outcome::SlotB),
        ];
        records[1].referee = Some("Marc Goddard".to_string());
        records[3].attributes_a = make_attributes(75.0, "Southpaw");
        records[4].attributes_b = make_attributes(75.0, "Southpaw");
        records[4].time_format = Some("5 Rnd (5-5-5-5-5)".to_string());
        records
    }

    fn assert_same_value(left: f64, right: f64, column: &str) {
        assert!(
            left == right || (left.is_nan() && right.is_nan()),
            "{column}: {left} vs {right}"
        );
    }

    #[test]
    fn test_matches_matrix_row_for_same_bout() {
        let records = make_history();
        let pipeline = FeaturePipeline::standard();
        let matrix = pipeline.run(records.clone(), None).unwrap();
        let rules = pipeline.matchup_rules();

        // both competitors' latest fight is the final bout, A in slot A
        let a = canonical_vector("A", &records, &matrix).unwrap();
        let b = canonical_vector("B", &records, &matrix).unwrap();
        assert_eq!((a.row, b.row), (4, 4));

        let assembler = InferenceAssembler::new(&rules, matrix.vocabulary());
        let row = assembler.assemble(&a, &b, &matrix, matrix.column_names());

        assert!(row.defaulted.is_empty());
        assert_eq!(row.columns, matrix.column_names());
        for (i, column) in row.columns.iter().enumerate() {
            assert_same_value(row.values[i], matrix.row_values(4)[i], column);
        }
    }

    #[test]
    fn test_reversed_pairing_recomputes_matchup_columns() {
        let records = make_history();
        let pipeline = FeaturePipeline::standard();
        let matrix = pipeline.run(records.clone(), None).unwrap();
        let rules = pipeline.matchup_rules();
        let assembler = InferenceAssembler::new(&rules, matrix.vocabulary());

        let a = canonical_vector("A", &records, &matrix).unwrap();
        let b = canonical_vector("B", &records, &matrix).unwrap();
        let forward = assembler.assemble(&a, &b, &matrix, matrix.column_names());
        let reverse = assembler.assemble(&b, &a, &matrix, matrix.column_names());

        assert_eq!(forward.get("height_diff"), Some(70.0 - 75.0));
        assert_eq!(reverse.get("height_diff"), Some(75.0 - 70.0));
        assert_eq!(reverse.get("fighter_a_height"), Some(75.0));
        // Southpaw_vs_Orthodox never occurred, so every stance column is zero
        assert_eq!(forward.get("stance_matchup_Southpaw_vs_Southpaw"), Some(0.0));
        assert_eq!(reverse.get("stance_matchup_Southpaw_vs_Southpaw"), Some(0.0));
        // bout context comes from the first competitor's latest row
        assert_eq!(forward.get("is_title_fight"), Some(1.0));
    }

    #[test]
    fn test_missing_columns_default_in_expected_order() {
        let records = make_history();
        let pipeline = FeaturePipeline::standard();
        let matrix = pipeline.run(records.clone(), None).unwrap();
        let rules = pipeline.matchup_rules();
        let assembler = InferenceAssembler::new(&rules, matrix.vocabulary());

        let a = canonical_vector("C", &records, &matrix).unwrap();
        let b = canonical_vector("D", &records, &matrix).unwrap();
        let expected = vec![
            "referee_Unseen Referee".to_string(),
            "fighter_b_total_fights".to_string(),
            "momentum_diff".to_string(),
        ];
        let row = assembler.assemble(&a, &b, &matrix, &expected);

        assert_eq!(row.columns, expected);
        assert_eq!(row.values[0], MISSING_COLUMN_DEFAULT);
        assert_eq!(row.defaulted, vec!["referee_Unseen Referee".to_string()]);
        assert_eq!(row.values[1], b.get("total_fights").unwrap());
    }
}
