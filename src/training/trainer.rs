//! Temporal-split training and evaluation

use std::fmt;

use log::info;

use crate::features::matrix::FeatureMatrix;
use crate::model::{LabelledRows, WinClassifier};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{FightError, Result, TrainingConfig};

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub feature_count: usize,
    pub history: TrainingHistory,
    pub train: Metrics,
    pub validation: Option<Metrics>,
    pub test: Option<Metrics>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Features: {} | Epochs: {}",
            self.feature_count,
            self.history.epochs()
        )?;
        writeln!(f, "  Train:      {}", self.train)?;
        if let Some(validation) = &self.validation {
            writeln!(f, "  Validation: {}", validation)?;
        }
        if let Some(test) = &self.test {
            writeln!(f, "  Test:       {}", test)?;
        }
        Ok(())
    }
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer { config }
    }

    /// Fit on fights before `validation_start`, validate up to `test_start`,
    /// then score the held-out test fights
    pub fn train(&self, matrix: &FeatureMatrix, model: &mut dyn WinClassifier) -> Result<TrainingReport> {
        let split = matrix.split_by_date(self.config.validation_start, self.config.test_start);
        info!(
            "Temporal split: {} train, {} validation, {} test",
            split.train.len(),
            split.validation.len(),
            split.test.len()
        );
        if split.train.is_empty() {
            return Err(FightError::Model(format!(
                "no labelled fights before {}",
                self.config.validation_start
            )));
        }

        let train = matrix.dataset(&split.train);
        let validation = matrix.dataset(&split.validation);
        let test = matrix.dataset(&split.test);

        let history = model.fit(&train, Some(&validation))?;
        Ok(TrainingReport {
            feature_count: train.feature_names.len(),
            history,
            train: evaluate(model, &train)?.unwrap_or_default(),
            validation: evaluate(model, &validation)?,
            test: evaluate(model, &test)?,
        })
    }

    /// Fit on every labelled fight, without holding anything out
    pub fn train_final(&self, matrix: &FeatureMatrix, model: &mut dyn WinClassifier) -> Result<TrainingReport> {
        let rows = matrix.labelled_rows();
        if rows.is_empty() {
            return Err(FightError::Model("no labelled fights".to_string()));
        }
        info!("Final training on {} fights", rows.len());

        let all = matrix.dataset(&rows);
        let history = model.fit(&all, None)?;
        Ok(TrainingReport {
            feature_count: all.feature_names.len(),
            history,
            train: evaluate(model, &all)?.unwrap_or_default(),
            validation: None,
            test: None,
        })
    }
}

fn evaluate(model: &dyn WinClassifier, data: &LabelledRows) -> Result<Option<Metrics>> {
    if data.is_empty() {
        return Ok(None);
    }
    let probabilities = model.predict_probability(&data.rows)?;
    Ok(Some(Metrics::from_predictions(&probabilities, &data.labels)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pipeline::FeaturePipeline;
    use crate::features::stages::fixtures::make_fight;
    use crate::{Config, Outcome};
    use chrono::NaiveDate;

    /// Always predicts the same probability; records what it was fit on
    struct ConstantClassifier {
        probability: f64,
        feature_names: Vec<String>,
        fitted_rows: usize,
        validated_rows: Option<usize>,
    }

    impl WinClassifier for ConstantClassifier {
        fn fit(&mut self, train: &LabelledRows, validation: Option<&LabelledRows>) -> Result<TrainingHistory> {
            self.feature_names = train.feature_names.clone();
            self.fitted_rows = train.len();
            self.validated_rows = validation.map(LabelledRows::len);
            Ok(TrainingHistory::new())
        }

        fn predict_probability(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
            Ok(vec![self.probability; rows.len()])
        }

        fn feature_names(&self) -> &[String] {
            &self.feature_names
        }
    }

    fn make_classifier() -> ConstantClassifier {
        ConstantClassifier {
            probability: 0.7,
            feature_names: Vec::new(),
            fitted_rows: 0,
            validated_rows: None,
        }
    }

    fn make_matrix() -> FeatureMatrix {
        // one fight every 200 days from 2020-01-01, slot A wins twice as often
        let records = (0..12)
            .map(|i| {
                let outcome = if i % 3 == 2 { Outcome::SlotB } else { Outcome::SlotA };
                make_fight(i * 200, &format!("A{}", i % 4), &format!("B{}", i % 3), outcome)
            })
            .collect();
        FeaturePipeline::standard().run(records, None).unwrap()
    }

    fn make_config() -> TrainingConfig {
        let mut config = Config::default().training;
        config.validation_start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        config.test_start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        config
    }

    #[test]
    fn test_temporal_split_training() {
        let matrix = make_matrix();
        let mut model = make_classifier();
        let report = Trainer::new(make_config()).train(&matrix, &mut model).unwrap();

        // days 0..1000 fall before 2023, 1200..1800 before 2025
        assert_eq!(model.fitted_rows, 6);
        assert_eq!(model.validated_rows, Some(4));
        assert_eq!(report.test.as_ref().map(|m| m.total_predictions), Some(2));
        assert_eq!(report.feature_count, matrix.column_names().len());
        assert_eq!(report.train.accuracy(), 4.0 / 6.0);
        assert!(report.to_string().contains("Validation"));
    }

    #[test]
    fn test_final_training_uses_every_labelled_fight() {
        let matrix = make_matrix();
        let mut model = make_classifier();
        let report = Trainer::new(make_config()).train_final(&matrix, &mut model).unwrap();
        assert_eq!(model.fitted_rows, 12);
        assert_eq!(model.validated_rows, None);
        assert!(report.validation.is_none());
    }

    #[test]
    fn test_no_training_rows() {
        let matrix = make_matrix();
        let mut config = make_config();
        config.validation_start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let result = Trainer::new(config).train(&matrix, &mut make_classifier());
        assert!(matches!(result, Err(FightError::Model(_))));
    }
}
