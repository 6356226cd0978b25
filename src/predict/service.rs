//! Prediction service: competitor lookup and matchup prediction

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::model::{LogisticClassifier, LogisticConfig, WinClassifier};
use crate::predict::assembler::{InferenceAssembler, InferenceRow};
use crate::predict::cache::{CachedHistory, FeatureCache, HistorySource, SqliteHistory};
use crate::predict::perspective::canonical_vector;
use crate::{identity_key, normalize_name, Config, FightError, FightPrediction, Result};

pub struct Predictor {
    cache: FeatureCache,
    model: Box<dyn WinClassifier>,
}

impl Predictor {
    /// One-hot categories follow the model's vocabulary when it carries one
    pub fn new(source: Box<dyn HistorySource>, model: Box<dyn WinClassifier>) -> Self {
        let cache = FeatureCache::new(source, model.vocabulary().cloned());
        Predictor { cache, model }
    }

    /// Load the trained model and read history from the configured database
    pub fn open(config: &Config) -> Result<Self> {
        let model = LogisticClassifier::load(
            Path::new(&config.data.model_path),
            LogisticConfig::from(&config.training),
        )?;
        let source = SqliteHistory::new(&config.data.database_path);
        Ok(Predictor::new(Box::new(source), Box::new(model)))
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Every competitor in the history, sorted and distinct
    pub fn list_known_competitors(&self) -> Result<Vec<String>> {
        Ok(self.cache.get()?.competitors.clone())
    }

    /// Names match ignoring case and extra whitespace
    pub fn competitor_exists(&self, name: &str) -> Result<bool> {
        Ok(self.cache.get()?.resolve(name).is_some())
    }

    /// Both competitors' stored names, checked for a self matchup first
    fn resolve_pair(
        &self,
        fighter_a: &str,
        fighter_b: &str,
    ) -> Result<(Arc<CachedHistory>, String, String)> {
        if identity_key(fighter_a) == identity_key(fighter_b) {
            return Err(FightError::SelfMatchup(normalize_name(fighter_a)));
        }

        let history = self.cache.get()?;
        let resolve = |name: &str| {
            history
                .resolve(name)
                .map(str::to_string)
                .ok_or_else(|| FightError::UnknownCompetitor(normalize_name(name)))
        };
        let fighter_a = resolve(fighter_a)?;
        let fighter_b = resolve(fighter_b)?;
        Ok((history, fighter_a, fighter_b))
    }

    /// Model input row for `fighter_a` against `fighter_b`
    pub fn assemble(&self, fighter_a: &str, fighter_b: &str) -> Result<InferenceRow> {
        let (history, fighter_a, fighter_b) = self.resolve_pair(fighter_a, fighter_b)?;
        self.assemble_resolved(&history, &fighter_a, &fighter_b)
    }

    fn assemble_resolved(
        &self,
        history: &CachedHistory,
        fighter_a: &str,
        fighter_b: &str,
    ) -> Result<InferenceRow> {
        let expected = self.model.feature_names();
        if expected.is_empty() {
            return Err(FightError::NoModel);
        }

        let a = canonical_vector(fighter_a, &history.records, &history.matrix)?;
        let b = canonical_vector(fighter_b, &history.records, &history.matrix)?;
        debug!(
            "{} state from {} (slot {}), {} state from {} (slot {})",
            a.competitor, a.fight_date, a.source_slot, b.competitor, b.fight_date, b.source_slot
        );

        let assembler = InferenceAssembler::new(&history.rules, history.matrix.vocabulary());
        Ok(assembler.assemble(&a, &b, &history.matrix, expected))
    }

    pub fn predict(&self, fighter_a: &str, fighter_b: &str) -> Result<FightPrediction> {
        let (history, fighter_a, fighter_b) = self.resolve_pair(fighter_a, fighter_b)?;
        let row = self.assemble_resolved(&history, &fighter_a, &fighter_b)?;
        let probabilities = self.model.predict_probability(&[row.values])?;
        let probability_a = probabilities
            .first()
            .copied()
            .ok_or_else(|| FightError::Model("classifier returned no probability".to_string()))?;

        Ok(FightPrediction::from_probability(&fighter_a, &fighter_b, probability_a))
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &FightPrediction) -> String {
    let winner_prob = if pred.predicted_winner == pred.fighter_a {
        pred.probability_a_wins
    } else {
        pred.probability_b_wins
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  {:<30} {:>6.1}%
│  {:<30} {:>6.1}%
│  Predicted winner:  {} ({:.1}%)
└─────────────────────────────────────────────────┘
"#,
        pred.fighter_a,
        pred.fighter_b,
        pred.fighter_a,
        pred.probability_a_wins * 100.0,
        pred.fighter_b,
        pred.probability_b_wins * 100.0,
        pred.predicted_winner,
        winner_prob * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stages::fixtures::make_fight;
    use crate::model::LabelledRows;
    use crate::predict::cache::{CachedHistory, InMemoryHistory};
    use crate::training::TrainingHistory;
    use crate::{FightRecord, Outcome};

    /// Logistic of a fixed weighting of the row, no training
    struct FixedClassifier {
        feature_names: Vec<String>,
    }

    impl WinClassifier for FixedClassifier {
        fn fit(&mut self, _: &LabelledRows, _: Option<&LabelledRows>) -> Result<TrainingHistory> {
            Ok(TrainingHistory::new())
        }

        fn predict_probability(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
            Ok(rows
                .iter()
                .map(|row| {
                    let score: f64 = row.iter().filter(|v| v.is_finite()).sum::<f64>() * 1e-3;
                    1.0 / (1.0 + (-score).exp())
                })
                .collect())
        }

        fn feature_names(&self) -> &[String] {
            &self.feature_names
        }
    }

    /// "A" wins on days 0 and 200 and loses on day 100; "B" loses on day 0
    fn make_history() -> Vec<FightRecord> {
        vec![
            make_fight(0, "A", "B", Outcome::SlotA),
            make_fight(100, "A", "C", Outcome::SlotB),
            make_fight(200, "A", "D", Outcome::SlotA),
        ]
    }

    fn make_predictor(records: Vec<FightRecord>) -> Predictor {
        let feature_names = CachedHistory::build(records.clone(), None)
            .unwrap()
            .matrix
            .column_names()
            .to_vec();
        Predictor::new(
            Box::new(InMemoryHistory::new(records)),
            Box::new(FixedClassifier { feature_names }),
        )
    }

    #[test]
    fn test_end_to_end_prediction() {
        let predictor = make_predictor(make_history());
        let prediction = predictor.predict("A", "B").unwrap();

        assert_eq!(prediction.fighter_a, "A");
        assert_eq!(prediction.fighter_b, "B");
        let total = prediction.probability_a_wins + prediction.probability_b_wins;
        assert!((total - 1.0).abs() < 1e-9);

        // A enters the latest fight 1-1; the day-200 win is not counted
        let row = predictor.assemble("A", "B").unwrap();
        assert_eq!(row.get("fighter_a_win_rate_last_5"), Some(0.5));
        // B's only fight is also their first
        assert_eq!(row.get("fighter_b_win_rate_last_5"), Some(0.5));
        assert!(row.defaulted.is_empty());
    }

    #[test]
    fn test_repeated_predictions_are_identical() {
        let predictor = make_predictor(make_history());
        let first = predictor.assemble("A", "B").unwrap();
        let second = predictor.assemble("A", "B").unwrap();
        let bits = |row: &InferenceRow| row.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));

        assert_eq!(
            predictor.predict("A", "B").unwrap(),
            predictor.predict("A", "B").unwrap()
        );
        assert_eq!(predictor.cache().build_count(), 1);
    }

    #[test]
    fn test_self_matchup_rejected() {
        let predictor = make_predictor(make_history());
        let result = predictor.predict("A", "  A ");
        assert!(matches!(result, Err(FightError::SelfMatchup(name)) if name == "A"));
    }

    #[test]
    fn test_unknown_competitor() {
        let predictor = make_predictor(make_history());
        let result = predictor.predict("A", "Zed");
        assert!(matches!(result, Err(FightError::UnknownCompetitor(name)) if name == "Zed"));
    }

    #[test]
    fn test_competitor_lookup() {
        let predictor = make_predictor(make_history());
        assert_eq!(
            predictor.list_known_competitors().unwrap(),
            vec!["A", "B", "C", "D"]
        );
        assert!(predictor.competitor_exists(" C ").unwrap());
        assert!(!predictor.competitor_exists("E").unwrap());
    }

    #[test]
    fn test_names_match_ignoring_case() {
        let predictor = make_predictor(make_history());
        assert!(predictor.competitor_exists("c").unwrap());

        let prediction = predictor.predict(" a ", "b").unwrap();
        assert_eq!(prediction.fighter_a, "A");
        assert_eq!(prediction.fighter_b, "B");
        assert_eq!(prediction, predictor.predict("A", "B").unwrap());

        let result = predictor.predict("A", "a");
        assert!(matches!(result, Err(FightError::SelfMatchup(_))));
    }

    #[test]
    fn test_untrained_model() {
        let records = make_history();
        let predictor = Predictor::new(
            Box::new(InMemoryHistory::new(records)),
            Box::new(FixedClassifier { feature_names: Vec::new() }),
        );
        assert!(matches!(predictor.predict("A", "B"), Err(FightError::NoModel)));
    }

    #[test]
    fn test_format_prediction() {
        let prediction = FightPrediction::from_probability("A", "B", 0.25);
        let text = format_prediction(&prediction);
        assert!(text.contains("A vs B"));
        assert!(text.contains("Predicted winner:  B (75.0%)"));
    }
}
