//! Physical indices and cross-feature interactions

use super::{fill_with_median, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::rules::{MatchupRule, RuleOp};
use crate::features::table::FightTable;
use crate::{Result, Slot};

pub struct InteractionStage;

impl InteractionStage {
    /// A physical attribute with gaps filled by the slot's median
    fn filled(table: &FightTable, slot: Slot, base: &str) -> Result<Vec<f64>> {
        let values = table.numeric(&ColumnKey::competitor(slot, base))?.to_vec();
        Ok(fill_with_median(values, 0.0))
    }
}

impl FeatureStage for InteractionStage {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        let mut keys = ColumnKey::per_slot(&["height", "weight", "reach", "age", "total_fights"]);
        keys.extend(
            [
                "reach_diff",
                "age_diff",
                "avg_sig_strikes_ratio",
                "win_rate_ratio",
                "momentum_diff",
                "finish_rate_ratio",
            ]
            .map(ColumnKey::shared),
        );
        keys
    }

    fn provides(&self) -> Vec<ColumnKey> {
        ColumnKey::per_slot(&[
            "height_filled",
            "weight_filled",
            "reach_filled",
            "size_index",
            "power_index",
        ])
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        vec![
            MatchupRule::product(
                "reach_advantage_x_striking",
                "reach_diff",
                "avg_sig_strikes_ratio",
            ),
            MatchupRule::new(
                "age_x_experience_diff",
                RuleOp::ScaledDifference {
                    matchup: "age_diff".into(),
                    base: "total_fights".into(),
                },
            ),
            MatchupRule::difference("size_advantage_diff", "size_index"),
            MatchupRule::difference("power_advantage_diff", "power_index"),
            MatchupRule::product("reach_x_win_rate", "reach_diff", "win_rate_ratio"),
            MatchupRule::product("age_x_momentum", "age_diff", "momentum_diff"),
            MatchupRule::product(
                "size_x_finish_rate",
                "size_advantage_diff",
                "finish_rate_ratio",
            ),
        ]
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        for slot in Slot::BOTH {
            let height = Self::filled(table, slot, "height")?;
            let weight = Self::filled(table, slot, "weight")?;
            let reach = Self::filled(table, slot, "reach")?;

            let size = height.iter().zip(&weight).map(|(h, w)| h * w).collect();
            let power = weight.iter().zip(&reach).map(|(w, r)| w * r).collect();

            table.set_numeric(ColumnKey::competitor(slot, "height_filled"), height);
            table.set_numeric(ColumnKey::competitor(slot, "weight_filled"), weight);
            table.set_numeric(ColumnKey::competitor(slot, "reach_filled"), reach);
            table.set_numeric(ColumnKey::competitor(slot, "size_index"), size);
            table.set_numeric(ColumnKey::competitor(slot, "power_index"), power);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stages::fixtures::make_fight;
    use crate::Outcome;

    #[test]
    fn test_indices_fill_missing_attributes() {
        let mut records = vec![
            make_fight(0, "X", "Y", Outcome::SlotA),
            make_fight(10, "Z", "W", Outcome::SlotA),
            make_fight(20, "V", "U", Outcome::SlotA),
        ];
        records[1].attributes_a.height = None;
        records[2].attributes_a.height = Some(74.0);
        let mut table = FightTable::from_records(records);
        InteractionStage.apply(&mut table).unwrap();

        let height = table
            .numeric(&ColumnKey::competitor(Slot::A, "height_filled"))
            .unwrap();
        assert_eq!(height, &[70.0, 72.0, 74.0]);

        let size = table
            .numeric(&ColumnKey::competitor(Slot::A, "size_index"))
            .unwrap();
        assert_eq!(size[1], 72.0 * 155.0);

        let power = table
            .numeric(&ColumnKey::competitor(Slot::B, "power_index"))
            .unwrap();
        assert_eq!(power[0], 155.0 * 73.0);
    }
}
