//! Career win rate, recent momentum and streaks

use super::historical::NEUTRAL_RATE;
use super::{fill_with, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::rules::MatchupRule;
use crate::features::series::{expanding_mean, streak};
use crate::features::table::FightTable;
use crate::{Result, Slot};

pub struct MomentumStage;

impl FeatureStage for MomentumStage {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        ColumnKey::per_slot(&["won_shifted", "win_rate_last_5"])
    }

    fn provides(&self) -> Vec<ColumnKey> {
        ColumnKey::per_slot(&["career_win_rate", "momentum", "win_streak", "loss_streak"])
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        vec![
            MatchupRule::difference("momentum_diff", "momentum"),
            MatchupRule::difference("win_streak_diff", "win_streak"),
            MatchupRule::difference("loss_streak_diff", "loss_streak"),
        ]
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        for slot in Slot::BOTH {
            let won_key = ColumnKey::competitor(slot, "won_shifted");
            let career = fill_with(table.per_group_of(&won_key, expanding_mean)?, NEUTRAL_RATE);

            let recent = table.numeric(&ColumnKey::competitor(slot, "win_rate_last_5"))?;
            let momentum = recent.iter().zip(&career).map(|(r, c)| r - c).collect();
            let momentum = fill_with(momentum, 0.0);

            let win_streak = table.per_group_of(&won_key, |s| streak(s, 1.0))?;
            let loss_streak = table.per_group_of(&won_key, |s| streak(s, 0.0))?;

            table.set_numeric(ColumnKey::competitor(slot, "career_win_rate"), career);
            table.set_numeric(ColumnKey::competitor(slot, "momentum"), momentum);
            table.set_numeric(ColumnKey::competitor(slot, "win_streak"), win_streak);
            table.set_numeric(ColumnKey::competitor(slot, "loss_streak"), loss_streak);
        }
        Ok(())
    }
}
