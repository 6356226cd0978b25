//! Evaluation metrics and training history

use std::fmt;

const PROBABILITY_EPS: f64 = 1e-7;

/// Classification quality over one set of predictions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// Mean binary cross-entropy
    pub log_loss: f64,
    pub correct: usize,
    pub total_predictions: usize,
    /// Undefined when only one class is present
    pub roc_auc: Option<f64>,
}

impl Metrics {
    pub fn from_predictions(probabilities: &[f64], labels: &[f64]) -> Self {
        let correct = probabilities
            .iter()
            .zip(labels)
            .filter(|(p, y)| (**p > 0.5) == (**y >= 0.5))
            .count();
        Metrics {
            log_loss: log_loss(probabilities, labels),
            correct,
            total_predictions: labels.len(),
            roc_auc: roc_auc(probabilities, labels),
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | Acc: {:.2}% ({}/{})",
            self.log_loss,
            self.accuracy() * 100.0,
            self.correct,
            self.total_predictions
        )?;
        if let Some(auc) = self.roc_auc {
            write!(f, " | AUC: {:.4}", auc)?;
        }
        Ok(())
    }
}

/// Mean binary cross-entropy with clamped probabilities
pub fn log_loss(probabilities: &[f64], labels: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(p, y)| {
            let p = p.clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / labels.len() as f64
}

/// Area under the ROC curve from ranks, ties sharing their average rank
pub fn roc_auc(probabilities: &[f64], labels: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|y| **y >= 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && probabilities[order[end + 1]] == probabilities[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            ranks[i] = rank;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y >= 0.5)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch; returns true when validation improved
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: Option<&Metrics>) -> bool {
        self.train_losses.push(train.log_loss);
        self.train_accuracies.push(train.accuracy());

        let Some(val) = val else {
            return false;
        };
        self.val_losses.push(val.log_loss);
        self.val_accuracies.push(val.accuracy());

        if val.log_loss < self.best_val_loss {
            self.best_val_loss = val.log_loss;
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }

    /// Check if we should early stop
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.val_losses.len() < patience {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_metrics(log_loss: f64) -> Metrics {
        Metrics {
            log_loss,
            correct: 1,
            total_predictions: 2,
            roc_auc: None,
        }
    }

    #[test]
    fn test_accuracy_and_log_loss() {
        let metrics = Metrics::from_predictions(&[0.9, 0.2, 0.6, 0.5], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(metrics.correct, 2);
        assert_eq!(metrics.accuracy(), 0.5);

        let perfect = log_loss(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(perfect < 1e-6);
        let coin = log_loss(&[0.5], &[1.0]);
        assert!((coin - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc() {
        assert_eq!(roc_auc(&[0.1, 0.4, 0.35, 0.8], &[0.0, 0.0, 1.0, 1.0]), Some(0.75));
        assert_eq!(roc_auc(&[0.2, 0.9], &[0.0, 1.0]), Some(1.0));
        // ties count half
        assert_eq!(roc_auc(&[0.5, 0.5], &[0.0, 1.0]), Some(0.5));
        assert_eq!(roc_auc(&[0.3, 0.7], &[1.0, 1.0]), None);
    }

    #[test]
    fn test_early_stopping() {
        let mut history = TrainingHistory::new();
        let train = make_metrics(1.0);
        for (epoch, loss) in [0.9, 0.8, 0.85, 0.86, 0.87].iter().enumerate() {
            history.record_epoch(epoch, &train, Some(&make_metrics(*loss)));
        }
        assert_eq!(history.best_epoch, 1);
        assert!(!history.should_early_stop(4));
        assert!(history.should_early_stop(3));
    }

    #[test]
    fn test_no_validation_never_stops() {
        let mut history = TrainingHistory::new();
        for epoch in 0..10 {
            assert!(!history.record_epoch(epoch, &make_metrics(0.5), None));
        }
        assert_eq!(history.epochs(), 10);
        assert!(!history.should_early_stop(2));
    }
}
