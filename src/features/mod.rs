//! Temporal feature engineering
//!
//! Converts the normalized fight history into a leakage-free feature matrix.
//! Every aggregate attached to a fight summarizes each competitor's fights
//! strictly before it.

pub mod columns;
pub mod matrix;
pub mod pipeline;
pub mod rules;
pub mod series;
pub mod stages;
pub mod table;
pub mod vocabulary;

pub use columns::ColumnKey;
pub use matrix::{FeatureMatrix, RowMeta, TemporalSplit};
pub use pipeline::FeaturePipeline;
pub use rules::{MatchupRule, RuleOp};
pub use table::FightTable;
pub use vocabulary::{CategoryFamily, CategoryVocabulary};
