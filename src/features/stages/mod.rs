//! Feature derivation stages
//!
//! Each stage declares the columns it reads, adds and removes, plus the
//! matchup rules it contributes. The pipeline checks those declarations
//! as it runs, so ordering mistakes fail loudly instead of reading junk.

pub mod basic;
pub mod consistency;
pub mod encoding;
pub mod historical;
pub mod interaction;
pub mod momentum;
pub mod ratios;
pub mod title;

pub use basic::BasicStage;
pub use consistency::ConsistencyStage;
pub use encoding::EncodingStage;
pub use historical::HistoricalStage;
pub use interaction::InteractionStage;
pub use momentum::MomentumStage;
pub use ratios::RatiosStage;
pub use title::TitleStage;

use crate::features::columns::ColumnKey;
use crate::features::rules::MatchupRule;
use crate::features::series;
use crate::features::table::FightTable;
use crate::Result;
use chrono::Datelike;

/// One derivation pass over the fight table
pub trait FeatureStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Columns that must exist before the stage runs
    fn requires(&self) -> Vec<ColumnKey>;

    /// Columns the stage adds
    fn provides(&self) -> Vec<ColumnKey>;

    /// Columns the stage deletes
    fn removes(&self) -> Vec<ColumnKey> {
        Vec::new()
    }

    /// Matchup columns evaluated after `apply`, in order
    fn matchup_rules(&self) -> Vec<MatchupRule> {
        Vec::new()
    }

    fn apply(&self, table: &mut FightTable) -> Result<()>;
}

/// The eight stages in dependency order
pub fn standard_stages() -> Vec<Box<dyn FeatureStage>> {
    vec![
        Box::new(BasicStage),
        Box::new(HistoricalStage),
        Box::new(TitleStage),
        Box::new(RatiosStage),
        Box::new(MomentumStage),
        Box::new(InteractionStage),
        Box::new(ConsistencyStage),
        Box::new(EncodingStage),
    ]
}

pub(crate) fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Fight dates as day numbers, for date arithmetic on series
pub(crate) fn day_numbers(table: &FightTable) -> Vec<f64> {
    table
        .records()
        .iter()
        .map(|r| r.date.num_days_from_ce() as f64)
        .collect()
}

/// Fill missing values with the column mean, or `fallback` if nothing is observed
pub(crate) fn fill_with_mean(mut values: Vec<f64>, fallback: f64) -> Vec<f64> {
    let fill = series::mean(&values).unwrap_or(fallback);
    series::fill_missing(&mut values, fill);
    values
}

/// Fill missing values with the column median, or `fallback` if nothing is observed
pub(crate) fn fill_with_median(mut values: Vec<f64>, fallback: f64) -> Vec<f64> {
    let fill = series::median(&values).unwrap_or(fallback);
    series::fill_missing(&mut values, fill);
    values
}

pub(crate) fn fill_with(mut values: Vec<f64>, fill: f64) -> Vec<f64> {
    series::fill_missing(&mut values, fill);
    values
}
