//! Fight outcome prediction from historical bout records
//!
//! Turns historical fight records into a leakage-free feature matrix and
//! rebuilds the same features for a live matchup between two competitors.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the two competitor positions in a bout record.
///
/// The position is historical bookkeeping, not a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::A, Slot::B];

    /// Column-name prefix used for this slot's features
    pub fn prefix(&self) -> &'static str {
        match self {
            Slot::A => "fighter_a_",
            Slot::B => "fighter_b_",
        }
    }

    /// The opposing slot
    pub fn other(&self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::A => write!(f, "A"),
            Slot::B => write!(f, "B"),
        }
    }
}

/// Result of a bout from the record's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    SlotA,
    SlotB,
    Draw,
    NoContest,
}

impl Outcome {
    /// Parse the source outcome code ("W/L", "L/W", "D/D", "NC/NC")
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "W/L" => Outcome::SlotA,
            "L/W" => Outcome::SlotB,
            "D/D" => Outcome::Draw,
            _ => Outcome::NoContest,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Outcome::SlotA => "W/L",
            Outcome::SlotB => "L/W",
            Outcome::Draw => "D/D",
            Outcome::NoContest => "NC/NC",
        }
    }

    /// The winning slot, or None for draws and no contests
    pub fn winner(&self) -> Option<Slot> {
        match self {
            Outcome::SlotA => Some(Slot::A),
            Outcome::SlotB => Some(Slot::B),
            Outcome::Draw | Outcome::NoContest => None,
        }
    }
}

/// Physical and biographical attributes of a competitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAttributes {
    /// Height in inches
    pub height: Option<f64>,
    /// Weight in pounds
    pub weight: Option<f64>,
    /// Reach in inches
    pub reach: Option<f64>,
    pub stance: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Statistics for one competitor in one fight, aggregated over rounds
///
/// Count fields are summed across rounds, percentage fields are averaged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FightStats {
    pub knockdowns: f64,
    pub sig_strikes_landed: f64,
    pub sig_strikes_attempted: f64,
    pub sig_strikes_pct: f64,
    pub total_strikes_landed: f64,
    pub total_strikes_attempted: f64,
    pub takedowns_landed: f64,
    pub takedowns_attempted: f64,
    pub takedown_pct: f64,
    pub submission_attempts: f64,
    pub reversals: f64,
    pub control_time_sec: f64,
    pub head_landed: f64,
    pub body_landed: f64,
    pub leg_landed: f64,
    pub distance_landed: f64,
    pub clinch_landed: f64,
    pub ground_landed: f64,
}

impl FightStats {
    /// Field names in the order returned by [`FightStats::values`]
    pub const FIELDS: [&'static str; 18] = [
        "knockdowns",
        "sig_strikes_landed",
        "sig_strikes_attempted",
        "sig_strikes_pct",
        "total_strikes_landed",
        "total_strikes_attempted",
        "takedowns_landed",
        "takedowns_attempted",
        "takedown_pct",
        "submission_attempts",
        "reversals",
        "control_time_sec",
        "head_landed",
        "body_landed",
        "leg_landed",
        "distance_landed",
        "clinch_landed",
        "ground_landed",
    ];

    pub fn values(&self) -> [f64; 18] {
        [
            self.knockdowns,
            self.sig_strikes_landed,
            self.sig_strikes_attempted,
            self.sig_strikes_pct,
            self.total_strikes_landed,
            self.total_strikes_attempted,
            self.takedowns_landed,
            self.takedowns_attempted,
            self.takedown_pct,
            self.submission_attempts,
            self.reversals,
            self.control_time_sec,
            self.head_landed,
            self.body_landed,
            self.leg_landed,
            self.distance_landed,
            self.clinch_landed,
            self.ground_landed,
        ]
    }
}

/// A single normalized historical bout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightRecord {
    pub event: String,
    pub date: NaiveDate,
    pub location: Option<String>,
    pub fighter_a: String,
    pub fighter_b: String,
    pub outcome: Outcome,
    pub method: Option<String>,
    pub ending_round: Option<u8>,
    /// Elapsed time in the ending round, in seconds
    pub ending_time_sec: Option<u32>,
    /// Scheduled round format, e.g. "5 Rnd (5-5-5-5-5)"
    pub time_format: Option<String>,
    pub weight_class: Option<String>,
    pub referee: Option<String>,
    pub stats_a: Option<FightStats>,
    pub stats_b: Option<FightStats>,
    pub attributes_a: CompetitorAttributes,
    pub attributes_b: CompetitorAttributes,
}

impl FightRecord {
    /// Name of the competitor in the given slot
    pub fn competitor(&self, slot: Slot) -> &str {
        match slot {
            Slot::A => &self.fighter_a,
            Slot::B => &self.fighter_b,
        }
    }

    /// Slot the named competitor occupied, if they took part
    pub fn slot_of(&self, name: &str) -> Option<Slot> {
        if self.fighter_a == name {
            Some(Slot::A)
        } else if self.fighter_b == name {
            Some(Slot::B)
        } else {
            None
        }
    }

    pub fn involves(&self, name: &str) -> bool {
        self.slot_of(name).is_some()
    }

    pub fn stats(&self, slot: Slot) -> Option<&FightStats> {
        match slot {
            Slot::A => self.stats_a.as_ref(),
            Slot::B => self.stats_b.as_ref(),
        }
    }

    pub fn attributes(&self, slot: Slot) -> &CompetitorAttributes {
        match slot {
            Slot::A => &self.attributes_a,
            Slot::B => &self.attributes_b,
        }
    }

    pub fn attributes_mut(&mut self, slot: Slot) -> &mut CompetitorAttributes {
        match slot {
            Slot::A => &mut self.attributes_a,
            Slot::B => &mut self.attributes_b,
        }
    }

    /// Whether the given slot won; None for draws and no contests
    pub fn did_win(&self, slot: Slot) -> Option<bool> {
        self.outcome.winner().map(|winner| winner == slot)
    }

    /// Five-round bouts are title fights
    pub fn is_title_fight(&self) -> bool {
        self.time_format
            .as_deref()
            .map_or(false, |format| format.contains("5 Rnd"))
    }
}

/// Prediction for a single matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightPrediction {
    pub fighter_a: String,
    pub fighter_b: String,
    pub probability_a_wins: f64,
    pub probability_b_wins: f64,
    pub predicted_winner: String,
}

impl FightPrediction {
    /// Build from the model's probability that competitor A wins.
    ///
    /// Probabilities are rounded to 4 decimals and always sum to one.
    /// A is the predicted winner only when strictly above 0.5.
    pub fn from_probability(fighter_a: &str, fighter_b: &str, probability_a: f64) -> Self {
        let basis_points_a = (probability_a.clamp(0.0, 1.0) * 10_000.0).round() as i64;
        let basis_points_b = 10_000 - basis_points_a;

        let predicted_winner = if probability_a > 0.5 {
            fighter_a
        } else {
            fighter_b
        };

        FightPrediction {
            fighter_a: fighter_a.to_string(),
            fighter_b: fighter_b.to_string(),
            probability_a_wins: basis_points_a as f64 / 10_000.0,
            probability_b_wins: basis_points_b as f64 / 10_000.0,
            predicted_winner: predicted_winner.to_string(),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FightError {
    #[error("Competitor not found: {0}")]
    UnknownCompetitor(String),

    #[error("A competitor cannot be matched against themselves: {0}")]
    SelfMatchup(String),

    #[error("{} competitor(s) have no attribute record: {}", .0.len(), .0.join(", "))]
    UnmatchedCompetitors(Vec<String>),

    #[error("Stage '{stage}' requires column '{column}'")]
    MissingColumn { stage: &'static str, column: String },

    #[error("Unknown feature column: {0}")]
    UnknownColumn(String),

    #[error("No fight history available")]
    EmptyHistory,

    #[error("Model not trained - run `bout train` first")]
    NoModel,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FightError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    /// Directory holding the raw CSV tables
    pub raw_dir: String,
    /// Artifact stem; weights land at `<stem>.mpk`, metadata at `<stem>.json`
    pub model_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Reject bouts naming a competitor without an attribute record
    pub require_attributes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Loss weight for slot-A wins relative to slot-B wins
    pub positive_class_weight: f64,
    pub early_stopping_patience: usize,
    pub validation_start: NaiveDate,
    pub test_start: NaiveDate,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/bout.db".to_string(),
                raw_dir: "data/raw".to_string(),
                model_path: "model/bout_model".to_string(),
            },
            features: FeatureConfig {
                require_attributes: true,
            },
            training: TrainingConfig {
                epochs: 400,
                learning_rate: 0.05,
                positive_class_weight: 0.6,
                early_stopping_patience: 40,
                validation_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
                test_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FightError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FightError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FightError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Canonical form of a competitor name: trimmed, inner whitespace collapsed
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key under which two spellings name the same competitor: normalized, case-folded
pub fn identity_key(name: &str) -> String {
    normalize_name(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes() {
        assert_eq!(Outcome::from_code("W/L"), Outcome::SlotA);
        assert_eq!(Outcome::from_code(" L/W "), Outcome::SlotB);
        assert_eq!(Outcome::from_code("D/D"), Outcome::Draw);
        assert_eq!(Outcome::from_code("NC/NC"), Outcome::NoContest);
        assert_eq!(Outcome::SlotB.winner(), Some(Slot::B));
        assert_eq!(Outcome::Draw.winner(), None);
    }

    #[test]
    fn test_prediction_rounding_sums_to_one() {
        for p in [0.0, 0.12345, 0.5, 0.50004, 0.66666, 0.99999, 1.0] {
            let pred = FightPrediction::from_probability("X", "Y", p);
            assert!((pred.probability_a_wins + pred.probability_b_wins - 1.0).abs() < 1e-12);
        }

        let pred = FightPrediction::from_probability("X", "Y", 0.12345);
        assert_eq!(pred.probability_a_wins, 0.1235);
        assert_eq!(pred.probability_b_wins, 0.8765);
    }

    #[test]
    fn test_exact_tie_goes_to_b() {
        let pred = FightPrediction::from_probability("X", "Y", 0.5);
        assert_eq!(pred.predicted_winner, "Y");

        let pred = FightPrediction::from_probability("X", "Y", 0.5001);
        assert_eq!(pred.predicted_winner, "X");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Jon   Jones "), "Jon Jones");
        assert_eq!(normalize_name("Israel Adesanya"), "Israel Adesanya");
        assert_eq!(identity_key(" jon  JONES"), identity_key("Jon Jones"));
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.training.validation_start, config.training.validation_start);
        assert!(parsed.features.require_attributes);
    }
}
