//! Matchup rules: shared columns computed from both competitors' columns
//!
//! The same rule list is evaluated over table rows when building the
//! training matrix and over two canonical vectors when serving, so a live
//! row is built by identical logic.

use crate::features::columns::ColumnKey;
use crate::features::table::FightTable;
use crate::Result;

/// Denominator offset for competitor ratios
pub const RATIO_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOp {
    /// a − b of a competitor column
    Difference(String),
    /// a / (b + 1e-6)
    Ratio(String),
    /// a / (b + 1), for counts that are often zero
    SmoothedRatio(String),
    /// 1 when either competitor's flag is set
    AnyFlag(String),
    /// 1 when both competitors' flags are set
    AllFlags(String),
    /// Product of two earlier matchup columns
    Product(String, String),
    /// An earlier matchup column times a − b of a competitor column
    ScaledDifference { matchup: String, base: String },
}

/// One derived matchup column
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupRule {
    pub output: String,
    pub op: RuleOp,
}

impl MatchupRule {
    pub fn new(output: &str, op: RuleOp) -> Self {
        MatchupRule {
            output: output.to_string(),
            op,
        }
    }

    pub fn difference(output: &str, base: &str) -> Self {
        Self::new(output, RuleOp::Difference(base.to_string()))
    }

    pub fn ratio(output: &str, base: &str) -> Self {
        Self::new(output, RuleOp::Ratio(base.to_string()))
    }

    pub fn product(output: &str, left: &str, right: &str) -> Self {
        Self::new(output, RuleOp::Product(left.to_string(), right.to_string()))
    }

    pub fn output_key(&self) -> ColumnKey {
        ColumnKey::shared(&self.output)
    }

    /// Columns the rule reads
    pub fn inputs(&self) -> Vec<ColumnKey> {
        match &self.op {
            RuleOp::Difference(base)
            | RuleOp::Ratio(base)
            | RuleOp::SmoothedRatio(base)
            | RuleOp::AnyFlag(base)
            | RuleOp::AllFlags(base) => ColumnKey::both(base).to_vec(),
            RuleOp::Product(left, right) => vec![ColumnKey::shared(left), ColumnKey::shared(right)],
            RuleOp::ScaledDifference { matchup, base } => {
                let mut keys = vec![ColumnKey::shared(matchup)];
                keys.extend(ColumnKey::both(base));
                keys
            }
        }
    }

    /// Evaluate with `lookup` resolving both competitor columns and earlier
    /// matchup columns; absent values should resolve to NaN
    pub fn evaluate<F>(&self, lookup: F) -> f64
    where
        F: Fn(&ColumnKey) -> f64,
    {
        let pair = |base: &str| {
            let [a, b] = ColumnKey::both(base);
            (lookup(&a), lookup(&b))
        };
        let flag = |v: f64| v == 1.0;

        match &self.op {
            RuleOp::Difference(base) => {
                let (a, b) = pair(base);
                a - b
            }
            RuleOp::Ratio(base) => {
                let (a, b) = pair(base);
                a / (b + RATIO_EPSILON)
            }
            RuleOp::SmoothedRatio(base) => {
                let (a, b) = pair(base);
                a / (b + 1.0)
            }
            RuleOp::AnyFlag(base) => {
                let (a, b) = pair(base);
                if flag(a) || flag(b) {
                    1.0
                } else {
                    0.0
                }
            }
            RuleOp::AllFlags(base) => {
                let (a, b) = pair(base);
                if flag(a) && flag(b) {
                    1.0
                } else {
                    0.0
                }
            }
            RuleOp::Product(left, right) => {
                lookup(&ColumnKey::shared(left)) * lookup(&ColumnKey::shared(right))
            }
            RuleOp::ScaledDifference { matchup, base } => {
                let (a, b) = pair(base);
                lookup(&ColumnKey::shared(matchup)) * (a - b)
            }
        }
    }
}

/// Evaluate rules in order over every table row, adding one shared column each
pub fn apply_rules(table: &mut FightTable, rules: &[MatchupRule]) -> Result<()> {
    for rule in rules {
        let inputs = rule
            .inputs()
            .into_iter()
            .map(|key| {
                let values = table.numeric(&key)?.to_vec();
                Ok((key, values))
            })
            .collect::<Result<Vec<(ColumnKey, Vec<f64>)>>>()?;

        let values = (0..table.len())
            .map(|row| {
                rule.evaluate(|key| {
                    inputs
                        .iter()
                        .find(|(k, _)| k == key)
                        .map_or(f64::NAN, |(_, values)| values[row])
                })
            })
            .collect();

        table.set_numeric(rule.output_key(), values);
    }
    Ok(())
}
