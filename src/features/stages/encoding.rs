//! Target label, column pruning and one-hot encoding

use super::historical::WIN_INDICATORS;
use super::FeatureStage;
use crate::features::columns::ColumnKey;
use crate::features::table::FightTable;
use crate::features::vocabulary::{CategoryFamily, CategoryVocabulary};
use crate::{FightStats, Outcome, Result};

/// Label column: 1 when slot A won, 0 when slot B won, missing otherwise
pub const TARGET: &str = "target";

pub struct EncodingStage;

impl FeatureStage for EncodingStage {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        CategoryFamily::ALL
            .iter()
            .map(|family| ColumnKey::shared(family.column()))
            .collect()
    }

    fn provides(&self) -> Vec<ColumnKey> {
        vec![ColumnKey::shared(TARGET)]
    }

    /// Same-fight facts that would leak the result, plus the encoded sources
    fn removes(&self) -> Vec<ColumnKey> {
        let mut bases: Vec<&str> = FightStats::FIELDS.to_vec();
        bases.push("won");
        bases.push("won_shifted");
        bases.push("win_finish_shifted");
        bases.extend(WIN_INDICATORS);
        let mut keys = ColumnKey::per_slot(&bases);
        keys.push(ColumnKey::shared("ending_round"));
        keys.push(ColumnKey::shared("ending_time_sec"));
        keys.extend(
            CategoryFamily::ALL
                .iter()
                .map(|family| ColumnKey::shared(family.column())),
        );
        keys
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        let target = table
            .records()
            .iter()
            .map(|r| match r.outcome {
                Outcome::SlotA => 1.0,
                Outcome::SlotB => 0.0,
                Outcome::Draw | Outcome::NoContest => f64::NAN,
            })
            .collect();
        table.set_numeric(ColumnKey::shared(TARGET), target);

        let vocabulary = match table.vocabulary() {
            Some(vocabulary) => vocabulary.clone(),
            None => CategoryVocabulary::from_table(table),
        };

        for family in CategoryFamily::ALL {
            let source = ColumnKey::shared(family.column());
            let values = table.categorical(&source)?.to_vec();
            let names = vocabulary.column_names(family);
            let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(values.len()); names.len()];
            for value in &values {
                for (column, (_, hot)) in columns
                    .iter_mut()
                    .zip(vocabulary.encode(family, value.as_deref()))
                {
                    column.push(hot);
                }
            }
            for (name, column) in names.iter().zip(columns) {
                table.set_numeric(ColumnKey::shared(name), column);
            }
        }

        for key in self.removes() {
            table.remove(&key);
        }
        table.set_vocabulary(vocabulary);
        Ok(())
    }
}
