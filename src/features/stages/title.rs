//! Title-fight lineage

use super::{day_numbers, fill_with_median, flag, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::rules::{MatchupRule, RuleOp};
use crate::features::series::{cumulative_sum, forward_fill, shift};
use crate::features::table::FightTable;
use crate::{Result, Slot};

const DEFAULT_DAYS_SINCE_TITLE: f64 = 365.0;

pub struct TitleStage;

impl FeatureStage for TitleStage {
    fn name(&self) -> &'static str {
        "title"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        let mut keys = vec![ColumnKey::shared("is_title_fight")];
        keys.extend(ColumnKey::per_slot(&["won_shifted"]));
        keys
    }

    fn provides(&self) -> Vec<ColumnKey> {
        ColumnKey::per_slot(&[
            "num_title_fights",
            "days_since_last_title_fight",
            "is_current_champion",
        ])
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        vec![
            MatchupRule::difference("title_fights_diff", "num_title_fights"),
            MatchupRule::new(
                "title_fights_ratio",
                RuleOp::SmoothedRatio("num_title_fights".into()),
            ),
            MatchupRule::difference(
                "days_since_last_title_fight_diff",
                "days_since_last_title_fight",
            ),
            MatchupRule::difference("champion_diff", "is_current_champion"),
            MatchupRule::new("both_champions", RuleOp::AllFlags("is_current_champion".into())),
        ]
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        let title = table.numeric(&ColumnKey::shared("is_title_fight"))?.to_vec();
        let days = day_numbers(table);
        let title_days: Vec<f64> = title
            .iter()
            .zip(&days)
            .map(|(t, d)| if *t == 1.0 { *d } else { f64::NAN })
            .collect();

        for slot in Slot::BOTH {
            let num_titles = table.per_group(slot, &title, |s| cumulative_sum(&shift(s)));

            // Day of the most recent earlier title fight
            let last_title = table.per_group(slot, &title_days, |s| forward_fill(&shift(s)));
            let days_since: Vec<f64> = days
                .iter()
                .zip(&last_title)
                .map(|(d, last)| d - last)
                .collect();
            let days_since = fill_with_median(days_since, DEFAULT_DAYS_SINCE_TITLE);

            let last_was_title = table.per_group(slot, &title, shift);
            let won_shifted = table.numeric(&ColumnKey::competitor(slot, "won_shifted"))?;
            let champion = last_was_title
                .iter()
                .zip(won_shifted)
                .map(|(t, w)| flag(*t == 1.0 && *w == 1.0))
                .collect();

            table.set_numeric(ColumnKey::competitor(slot, "num_title_fights"), num_titles);
            table.set_numeric(
                ColumnKey::competitor(slot, "days_since_last_title_fight"),
                days_since,
            );
            table.set_numeric(ColumnKey::competitor(slot, "is_current_champion"), champion);
        }

        Ok(())
    }
}
