//! Variability of recent performance

use super::{fill_with, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::rules::MatchupRule;
use crate::features::series::{rolling_std, shift};
use crate::features::table::FightTable;
use crate::{Result, Slot};

const WINDOW: usize = 5;
const MIN_PERIODS: usize = 2;

struct Spread {
    output: &'static str,
    source: &'static str,
    /// Whether the source is a per-fight value that still needs shifting
    per_fight: bool,
    default: f64,
    rule: &'static str,
}

const SPREADS: [Spread; 5] = [
    Spread {
        output: "win_rate_std",
        source: "won_shifted",
        per_fight: false,
        default: 0.5,
        rule: "win_rate_consistency_diff",
    },
    Spread {
        output: "strike_output_std",
        source: "sig_strikes_landed",
        per_fight: true,
        default: 50.0,
        rule: "strike_output_consistency_diff",
    },
    Spread {
        output: "finish_consistency",
        source: "win_finish_shifted",
        per_fight: false,
        default: 0.5,
        rule: "finish_consistency_diff",
    },
    Spread {
        output: "control_time_std",
        source: "control_time_sec",
        per_fight: true,
        default: 30.0,
        rule: "control_time_consistency_diff",
    },
    Spread {
        output: "takedown_std",
        source: "takedowns_attempted",
        per_fight: true,
        default: 2.0,
        rule: "takedown_consistency_diff",
    },
];

pub struct ConsistencyStage;

impl FeatureStage for ConsistencyStage {
    fn name(&self) -> &'static str {
        "consistency"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        let sources: Vec<&str> = SPREADS.iter().map(|s| s.source).collect();
        ColumnKey::per_slot(&sources)
    }

    fn provides(&self) -> Vec<ColumnKey> {
        let outputs: Vec<&str> = SPREADS.iter().map(|s| s.output).collect();
        ColumnKey::per_slot(&outputs)
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        SPREADS
            .iter()
            .map(|s| MatchupRule::difference(s.rule, s.output))
            .collect()
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        for slot in Slot::BOTH {
            for spread in &SPREADS {
                let key = ColumnKey::competitor(slot, spread.source);
                let values = if spread.per_fight {
                    table.per_group_of(&key, |s| rolling_std(&shift(s), WINDOW, MIN_PERIODS))?
                } else {
                    table.per_group_of(&key, |s| rolling_std(s, WINDOW, MIN_PERIODS))?
                };
                table.set_numeric(
                    ColumnKey::competitor(slot, spread.output),
                    fill_with(values, spread.default),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stages::fixtures::make_fight;
    use crate::features::stages::{BasicStage, HistoricalStage};
    use crate::Outcome;

    #[test]
    fn test_spread_needs_two_prior_fights() {
        let records = (0..4)
            .map(|i| make_fight(i * 10, "X", &format!("Opp{i}"), Outcome::SlotA))
            .collect();
        let mut table = FightTable::from_records(records);
        BasicStage.apply(&mut table).unwrap();
        HistoricalStage.apply(&mut table).unwrap();
        ConsistencyStage.apply(&mut table).unwrap();

        let strikes = table
            .numeric(&ColumnKey::competitor(Slot::A, "strike_output_std"))
            .unwrap();
        // prior strikes 10 and 20 at row 2; 10, 20, 30 at row 3
        assert_eq!(strikes[0], 50.0);
        assert_eq!(strikes[1], 50.0);
        assert!((strikes[2] - 50f64.sqrt()).abs() < 1e-9);
        assert!((strikes[3] - 10.0).abs() < 1e-9);

        // all wins: no spread once two results exist
        let wins = table
            .numeric(&ColumnKey::competitor(Slot::A, "win_rate_std"))
            .unwrap();
        assert_eq!(wins, &[0.5, 0.5, 0.0, 0.0]);

        let takedowns = table
            .numeric(&ColumnKey::competitor(Slot::B, "takedown_std"))
            .unwrap();
        assert!(takedowns.iter().all(|v| *v == 2.0));
    }
}
