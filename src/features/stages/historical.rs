//! Past form: win rates, finish profile and recent fight statistics
//!
//! Every aggregate here is computed on a series shifted one fight later,
//! so a fight's own outcome and statistics never feed its own features.

use super::{fill_with, fill_with_mean, flag, FeatureStage};
use crate::features::columns::ColumnKey;
use crate::features::series::{rolling_mean, shift};
use crate::features::table::FightTable;
use crate::{Result, Slot};

/// Neutral value for rate columns without history
pub const NEUTRAL_RATE: f64 = 0.5;
const DEFAULT_FINISH_ROUND: f64 = 2.5;
const DEFAULT_FINISH_TIME_SEC: f64 = 180.0;

const FORM_WINDOW: usize = 5;
const STATS_WINDOW: usize = 3;

/// (per-fight statistic, rolling average column)
pub const STAT_AVERAGES: [(&str, &str); 13] = [
    ("sig_strikes_landed", "avg_sig_strikes_last_3"),
    ("control_time_sec", "avg_control_time_last_3"),
    ("total_strikes_landed", "avg_total_strikes_landed_last_3"),
    ("ground_landed", "avg_ground_landed_last_3"),
    ("knockdowns", "avg_knockdowns_last_3"),
    ("head_landed", "avg_head_landed_last_3"),
    ("body_landed", "avg_body_landed_last_3"),
    ("leg_landed", "avg_leg_landed_last_3"),
    ("distance_landed", "avg_distance_landed_last_3"),
    ("clinch_landed", "avg_clinch_landed_last_3"),
    ("takedowns_landed", "avg_takedowns_landed_last_3"),
    ("submission_attempts", "avg_submission_attempts_last_3"),
    ("reversals", "avg_reversals_last_3"),
];

/// Per-fight win indicators that only exist for the fight itself
pub const WIN_INDICATORS: [&str; 7] = [
    "win_finish",
    "win_ko",
    "win_sub",
    "win_decision",
    "win_early",
    "win_round",
    "win_time_sec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishMethod {
    Knockout,
    Submission,
    Decision,
}

impl FinishMethod {
    /// Categorize free-text method, e.g. "KO/TKO" or "Decision - Split"
    pub fn categorize(method: Option<&str>) -> Option<Self> {
        let method = method?.trim().to_lowercase();
        if method.is_empty() || method == "--" {
            None
        } else if method.contains("ko") {
            Some(FinishMethod::Knockout)
        } else if method.contains("sub") {
            Some(FinishMethod::Submission)
        } else if method.contains("decision") {
            Some(FinishMethod::Decision)
        } else {
            None
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, FinishMethod::Knockout | FinishMethod::Submission)
    }
}

pub struct HistoricalStage;

impl HistoricalStage {
    fn shifted_rolling(table: &FightTable, slot: Slot, values: &[f64], window: usize) -> Vec<f64> {
        table.per_group(slot, values, |s| rolling_mean(&shift(s), window, 1))
    }
}

impl FeatureStage for HistoricalStage {
    fn name(&self) -> &'static str {
        "historical"
    }

    fn requires(&self) -> Vec<ColumnKey> {
        let stats: Vec<&str> = STAT_AVERAGES.iter().map(|(stat, _)| *stat).collect();
        let mut keys = ColumnKey::per_slot(&stats);
        keys.push(ColumnKey::shared("ending_round"));
        keys.push(ColumnKey::shared("ending_time_sec"));
        keys
    }

    fn provides(&self) -> Vec<ColumnKey> {
        let mut bases = vec![
            "won",
            "won_shifted",
            "win_rate_last_5",
            "win_finish_shifted",
            "finish_rate_last_5",
            "ko_rate_last_5",
            "sub_rate_last_5",
            "decision_rate_last_5",
            "early_finish_rate_last_5",
            "avg_finish_round_last_5",
            "avg_finish_time_last_5",
        ];
        bases.extend(WIN_INDICATORS);
        bases.extend(STAT_AVERAGES.iter().map(|(_, avg)| *avg));
        ColumnKey::per_slot(&bases)
    }

    fn apply(&self, table: &mut FightTable) -> Result<()> {
        let ending_round = table.numeric(&ColumnKey::shared("ending_round"))?.to_vec();
        let ending_time = table.numeric(&ColumnKey::shared("ending_time_sec"))?.to_vec();
        let methods: Vec<Option<FinishMethod>> = table
            .records()
            .iter()
            .map(|r| FinishMethod::categorize(r.method.as_deref()))
            .collect();

        for slot in Slot::BOTH {
            let outcome: Vec<Option<bool>> =
                table.records().iter().map(|r| r.did_win(slot)).collect();

            // Draws and no contests stay missing so form windows skip them
            let won: Vec<f64> = outcome.iter().map(|o| o.map_or(f64::NAN, flag)).collect();
            let won_shifted = table.per_group(slot, &won, shift);
            let win_rate = table.per_group(slot, &won_shifted, |s| rolling_mean(s, FORM_WINDOW, 1));
            let win_rate = fill_with(win_rate, NEUTRAL_RATE);

            // Win method only for wins with a recognised method
            let win_method: Vec<Option<FinishMethod>> = outcome
                .iter()
                .zip(&methods)
                .map(|(o, m)| if *o == Some(true) { *m } else { None })
                .collect();
            let method_flag = |test: fn(&FinishMethod) -> bool| -> Vec<f64> {
                win_method
                    .iter()
                    .map(|m| m.as_ref().map_or(f64::NAN, |m| flag(test(m))))
                    .collect()
            };
            let win_finish = method_flag(FinishMethod::is_finish);
            let win_ko = method_flag(|m| *m == FinishMethod::Knockout);
            let win_sub = method_flag(|m| *m == FinishMethod::Submission);
            let win_decision = method_flag(|m| *m == FinishMethod::Decision);

            let win_round: Vec<f64> = outcome
                .iter()
                .zip(&ending_round)
                .map(|(o, r)| if *o == Some(true) { *r } else { f64::NAN })
                .collect();
            let win_early: Vec<f64> = win_round
                .iter()
                .map(|r| if r.is_nan() { f64::NAN } else { flag(*r <= 2.0) })
                .collect();
            let win_time: Vec<f64> = outcome
                .iter()
                .zip(&ending_time)
                .map(|(o, t)| if *o == Some(true) { *t } else { f64::NAN })
                .collect();

            let rate = |values: &[f64]| {
                fill_with(
                    Self::shifted_rolling(table, slot, values, FORM_WINDOW),
                    NEUTRAL_RATE,
                )
            };
            let finish_rate = rate(&win_finish);
            let ko_rate = rate(&win_ko);
            let sub_rate = rate(&win_sub);
            let decision_rate = rate(&win_decision);
            let early_rate = rate(&win_early);
            let finish_round = fill_with_mean(
                Self::shifted_rolling(table, slot, &win_round, FORM_WINDOW),
                DEFAULT_FINISH_ROUND,
            );
            let finish_time = fill_with_mean(
                Self::shifted_rolling(table, slot, &win_time, FORM_WINDOW),
                DEFAULT_FINISH_TIME_SEC,
            );
            let win_finish_shifted = table.per_group(slot, &win_finish, shift);

            let mut averages = Vec::with_capacity(STAT_AVERAGES.len());
            for (stat, avg) in STAT_AVERAGES {
                let values = table.numeric(&ColumnKey::competitor(slot, stat))?;
                let rolled = Self::shifted_rolling(table, slot, values, STATS_WINDOW);
                averages.push((avg, fill_with_mean(rolled, 0.0)));
            }

            let outputs = [
                ("won", won),
                ("won_shifted", won_shifted),
                ("win_rate_last_5", win_rate),
                ("win_finish", win_finish),
                ("win_ko", win_ko),
                ("win_sub", win_sub),
                ("win_decision", win_decision),
                ("win_early", win_early),
                ("win_round", win_round),
                ("win_time_sec", win_time),
                ("win_finish_shifted", win_finish_shifted),
                ("finish_rate_last_5", finish_rate),
                ("ko_rate_last_5", ko_rate),
                ("sub_rate_last_5", sub_rate),
                ("decision_rate_last_5", decision_rate),
                ("early_finish_rate_last_5", early_rate),
                ("avg_finish_round_last_5", finish_round),
                ("avg_finish_time_last_5", finish_time),
            ];
            for (base, values) in outputs.into_iter().chain(averages) {
                table.set_numeric(ColumnKey::competitor(slot, base), values);
            }
        }

        Ok(())
    }
}
