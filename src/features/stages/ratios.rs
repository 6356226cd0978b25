//! Competitor ratios
//!
//! Pure matchup rules: each output is slot A's value over slot B's.

use super::FeatureStage;
use crate::features::columns::ColumnKey;
use crate::features::rules::MatchupRule;
use crate::features::table::FightTable;
use crate::Result;

/// (ratio column, competitor column)
pub const RATIOS: [(&str, &str); 23] = [
    ("win_rate_ratio", "win_rate_last_5"),
    ("finish_rate_ratio", "finish_rate_last_5"),
    ("ko_rate_ratio", "ko_rate_last_5"),
    ("sub_rate_ratio", "sub_rate_last_5"),
    ("decision_rate_ratio", "decision_rate_last_5"),
    ("early_finish_rate_ratio", "early_finish_rate_last_5"),
    ("avg_sig_strikes_ratio", "avg_sig_strikes_last_3"),
    ("avg_control_time_ratio", "avg_control_time_last_3"),
    ("total_fights_ratio", "total_fights"),
    ("days_in_career_ratio", "days_in_career"),
    ("avg_finish_round_ratio", "avg_finish_round_last_5"),
    ("avg_finish_time_ratio", "avg_finish_time_last_5"),
    ("avg_takedowns_ratio", "avg_takedowns_landed_last_3"),
    ("avg_knockdowns_ratio", "avg_knockdowns_last_3"),
    ("avg_head_strikes_ratio", "avg_head_landed_last_3"),
    ("avg_body_strikes_ratio", "avg_body_landed_last_3"),
    ("avg_leg_strikes_ratio", "avg_leg_landed_last_3"),
    ("avg_distance_strikes_ratio", "avg_distance_landed_last_3"),
    ("avg_clinch_strikes_ratio", "avg_clinch_landed_last_3"),
    ("avg_ground_strikes_ratio", "avg_ground_landed_last_3"),
    ("avg_sub_att_ratio", "avg_submission_attempts_last_3"),
    ("avg_rev_ratio", "avg_reversals_last_3"),
    ("avg_total_strikes_ratio", "avg_total_strikes_landed_last_3"),
];

pub struct RatiosStage;

impl FeatureStage for RatiosStage {
    fn name(&self) -> &'static str {
        "ratios"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        let bases: Vec<&str> = RATIOS.iter().map(|(_, base)| *base).collect();
        ColumnKey::per_slot(&bases)
    }

    fn provides(&self) -> Vec<ColumnKey> {
        Vec::new()
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        RATIOS
            .iter()
            .map(|(output, base)| MatchupRule::ratio(output, base))
            .collect()
    }

    fn apply(&self, _table: &mut FightTable) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::rules::apply_rules;
    use crate::features::stages::fixtures::make_fight;
    use crate::features::stages::{BasicStage, HistoricalStage};
    use crate::Outcome;

    #[test]
    fn test_ratio_columns_follow_rule_order() {
        let mut table = FightTable::from_records(vec![
            make_fight(0, "X", "Y", Outcome::SlotA),
            make_fight(30, "X", "Y", Outcome::SlotA),
        ]);
        BasicStage.apply(&mut table).unwrap();
        HistoricalStage.apply(&mut table).unwrap();
        apply_rules(&mut table, &RatiosStage.matchup_rules()).unwrap();

        let names: Vec<String> = table
            .keys()
            .iter()
            .rev()
            .take(RATIOS.len())
            .map(|k| k.name())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("avg_total_strikes_ratio"));
        assert_eq!(names.last().map(String::as_str), Some("win_rate_ratio"));

        // both competitors are on their second bout
        let fights = table.numeric(&ColumnKey::shared("total_fights_ratio")).unwrap();
        assert!((fights[1] - 1.0).abs() < 1e-5);
        // X averaged 10 significant strikes before, Y averaged 5
        let strikes = table
            .numeric(&ColumnKey::shared("avg_sig_strikes_ratio"))
            .unwrap();
        assert!((strikes[1] - 2.0).abs() < 1e-5);
    }
}
