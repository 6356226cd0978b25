//! Win classifiers
//!
//! The predictor only depends on the [`WinClassifier`] contract; the
//! default implementation is a logistic model on burn.

pub mod logistic;

pub use logistic::{FeatureScaling, LogisticClassifier, LogisticConfig, ModelMetadata};

use crate::features::vocabulary::CategoryVocabulary;
use crate::training::metrics::TrainingHistory;
use crate::Result;

/// Feature rows with binary labels (1 = slot A won)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledRows {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl LabelledRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A trained or trainable slot-A win classifier
pub trait WinClassifier: Send + Sync {
    fn fit(
        &mut self,
        train: &LabelledRows,
        validation: Option<&LabelledRows>,
    ) -> Result<TrainingHistory>;

    /// Probability that slot A wins, one per row
    fn predict_probability(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Expected input columns, order-sensitive
    fn feature_names(&self) -> &[String];

    /// Category vocabulary the classifier was fit against
    fn vocabulary(&self) -> Option<&CategoryVocabulary> {
        None
    }
}
