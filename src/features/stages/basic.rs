//! Calendar, age, physical differences, activity and experience

use super::{day_numbers, fill_with_median, flag, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::rules::{MatchupRule, RuleOp};
use crate::features::series;
use crate::features::table::FightTable;
use crate::features::vocabulary::stance_matchup;
use crate::{Result, Slot};
use chrono::Datelike;

/// Days assumed since a previous fight when no gap is observed at all
const DEFAULT_LAYOFF_DAYS: f64 = 180.0;

pub struct BasicStage;

impl FeatureStage for BasicStage {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        ColumnKey::per_slot(&["height", "weight", "reach", "stance"])
    }

    fn provides(&self) -> Vec<ColumnKey> {
        let mut keys = vec![
            ColumnKey::shared("month"),
            ColumnKey::shared("is_title_fight"),
            ColumnKey::shared("stance_matchup"),
        ];
        keys.extend(ColumnKey::per_slot(&[
            "age",
            "age_unknown",
            "days_since_last_fight",
            "total_fights",
            "days_in_career",
        ]));
        keys
    }

    fn matchup_rules(&self) -> Vec<MatchupRule> {
        vec![
            MatchupRule::difference("height_diff", "height"),
            MatchupRule::difference("weight_diff", "weight"),
            MatchupRule::difference("reach_diff", "reach"),
            MatchupRule::difference("age_diff", "age"),
            MatchupRule::new("age_diff_unknown", RuleOp::AnyFlag("age_unknown".into())),
        ]
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        let month = table
            .records()
            .iter()
            .map(|r| r.date.month() as f64)
            .collect();
        let title = table
            .records()
            .iter()
            .map(|r| flag(r.is_title_fight()))
            .collect();

        let stance_a = table.categorical(&ColumnKey::competitor(Slot::A, "stance"))?;
        let stance_b = table.categorical(&ColumnKey::competitor(Slot::B, "stance"))?;
        let matchups = stance_a
            .iter()
            .zip(stance_b)
            .map(|(a, b)| Some(stance_matchup(a.as_deref(), b.as_deref())))
            .collect();

        table.set_numeric(ColumnKey::shared("month"), month);
        table.set_numeric(ColumnKey::shared("is_title_fight"), title);
        table.set_categorical(ColumnKey::shared("stance_matchup"), matchups);

        let days = day_numbers(table);
        for slot in Slot::BOTH {
            let age: Vec<f64> = table
                .records()
                .iter()
                .map(|r| {
                    r.attributes(slot)
                        .date_of_birth
                        .map_or(f64::NAN, |dob| (r.date - dob).num_days() as f64 / 365.25)
                })
                .collect();
            let age_unknown = age.iter().map(|a| flag(a.is_nan())).collect();

            let layoff = table.per_group(slot, &days, series::diff);
            let layoff = fill_with_median(layoff, DEFAULT_LAYOFF_DAYS);

            let total_fights = table.per_group(slot, &days, |s| {
                (1..=s.len()).map(|n| n as f64).collect()
            });
            let days_in_career = table.per_group(slot, &days, |s| {
                s.iter().map(|d| d - s[0]).collect()
            });

            table.set_numeric(ColumnKey::competitor(slot, "age"), age);
            table.set_numeric(ColumnKey::competitor(slot, "age_unknown"), age_unknown);
            table.set_numeric(ColumnKey::competitor(slot, "days_since_last_fight"), layoff);
            table.set_numeric(ColumnKey::competitor(slot, "total_fights"), total_fights);
            table.set_numeric(ColumnKey::competitor(slot, "days_in_career"), days_in_career);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stages::fixtures::make_fight;
    use crate::Outcome;

    fn make_table() -> FightTable {
        let mut records = vec![
            make_fight(0, "X", "Y", Outcome::SlotA),
            make_fight(100, "X", "Z", Outcome::SlotB),
            make_fight(130, "W", "X", Outcome::SlotA),
            make_fight(160, "X", "Y", Outcome::SlotA),
        ];
        records[1].time_format = Some("5 Rnd (5-5-5-5-5)".to_string());
        records[2].attributes_b.date_of_birth = None;
        let mut table = FightTable::from_records(records);
        BasicStage.apply(&mut table).unwrap();
        table
    }

    fn column(table: &FightTable, slot: Slot, base: &str) -> Vec<f64> {
        table
            .numeric(&ColumnKey::competitor(slot, base))
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_experience_counts_slot_series() {
        let table = make_table();
        // X as slot A at rows 0, 1, 3; row 2 is X's only slot-B appearance
        assert_eq!(column(&table, Slot::A, "total_fights"), vec![1.0, 2.0, 1.0, 3.0]);
        assert_eq!(column(&table, Slot::A, "days_in_career"), vec![0.0, 100.0, 0.0, 160.0]);
    }

    #[test]
    fn test_layoff_fills_first_fight_with_median() {
        let table = make_table();
        // observed gaps for slot A: 100 and 60, median 80
        assert_eq!(
            column(&table, Slot::A, "days_since_last_fight"),
            vec![80.0, 100.0, 80.0, 60.0]
        );
        // no slot-B competitor repeats except Y at rows 0 and 3
        assert_eq!(
            column(&table, Slot::B, "days_since_last_fight"),
            vec![160.0, 160.0, 160.0, 160.0]
        );
    }

    #[test]
    fn test_age_and_title_flags() {
        let table = make_table();
        let age_b = column(&table, Slot::B, "age");
        assert!(age_b[2].is_nan());
        assert_eq!(column(&table, Slot::B, "age_unknown"), vec![0.0, 0.0, 1.0, 0.0]);
        assert!((age_b[0] - 30.0).abs() < 0.01);

        let title = table.numeric(&ColumnKey::shared("is_title_fight")).unwrap();
        assert_eq!(title, &[0.0, 1.0, 0.0, 0.0]);

        let matchups = table
            .categorical(&ColumnKey::shared("stance_matchup"))
            .unwrap();
        assert_eq!(matchups[0].as_deref(), Some("Orthodox_vs_Southpaw"));
    }
}
