//! Logistic win classifier on burn
//!
//! A single linear layer with a sigmoid output over z-scored features.
//! Trained full-batch with SGD on the autodiff NdArray backend; inference
//! runs on the plain NdArray backend.

use std::fs::File;
use std::path::Path;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig};
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::features::vocabulary::CategoryVocabulary;
use crate::model::{LabelledRows, WinClassifier};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{FightError, Result, TrainingConfig};

type InferenceBackend = NdArray<f32>;
type TrainingBackend = Autodiff<InferenceBackend>;

/// Floor for feature standard deviations
const MIN_STD: f32 = 0.001;

/// Z-score scaling fitted on training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureScaling {
    /// Per-column mean and std over finite values
    pub fn fit(rows: &[Vec<f64>], width: usize) -> Self {
        let mut mean = Vec::with_capacity(width);
        let mut std = Vec::with_capacity(width);
        for col in 0..width {
            let observed: Vec<f64> = rows
                .iter()
                .map(|row| row[col])
                .filter(|v| v.is_finite())
                .collect();
            if observed.is_empty() {
                mean.push(0.0);
                std.push(1.0);
                continue;
            }
            let n = observed.len() as f64;
            let m = observed.iter().sum::<f64>() / n;
            let var = observed.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            mean.push(m as f32);
            std.push((var.sqrt() as f32).max(MIN_STD));
        }
        FeatureScaling { mean, std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Row-major values with missing entries at the column mean, so they
    /// scale to zero
    fn fill(&self, rows: &[Vec<f64>]) -> Vec<f32> {
        rows.iter()
            .flat_map(|row| {
                row.iter().zip(&self.mean).map(|(v, m)| {
                    if v.is_finite() {
                        *v as f32
                    } else {
                        *m
                    }
                })
            })
            .collect()
    }

    /// Normalize a feature tensor using z-score: (x - mean) / std
    pub fn normalize<B: Backend>(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = features.device();
        let mean = Tensor::<B, 1>::from_floats(self.mean.as_slice(), &device).unsqueeze_dim(0);
        let std = Tensor::<B, 1>::from_floats(self.std.as_slice(), &device).unsqueeze_dim(0);
        (features - mean) / std
    }

    fn tensor<B: Backend>(&self, rows: &[Vec<f64>], device: &B::Device) -> Tensor<B, 2> {
        let flat = self.fill(rows);
        let x = Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), self.dim()]);
        self.normalize(x)
    }
}

/// Everything needed next to the weights to serve predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_names: Vec<String>,
    pub scaling: FeatureScaling,
    pub vocabulary: Option<CategoryVocabulary>,
}

#[derive(Debug, Clone)]
pub struct LogisticConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Loss weight for rows where slot A won
    pub positive_class_weight: f64,
    pub early_stopping_patience: usize,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        LogisticConfig {
            epochs: 400,
            learning_rate: 0.05,
            positive_class_weight: 0.6,
            early_stopping_patience: 40,
        }
    }
}

impl From<&TrainingConfig> for LogisticConfig {
    fn from(config: &TrainingConfig) -> Self {
        LogisticConfig {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            positive_class_weight: config.positive_class_weight,
            early_stopping_patience: config.early_stopping_patience,
        }
    }
}

pub struct LogisticClassifier {
    config: LogisticConfig,
    device: NdArrayDevice,
    // burn modules are Send but not Sync
    model: Mutex<Option<Linear<InferenceBackend>>>,
    feature_names: Vec<String>,
    scaling: Option<FeatureScaling>,
    vocabulary: Option<CategoryVocabulary>,
}

impl LogisticClassifier {
    pub fn new(config: LogisticConfig) -> Self {
        LogisticClassifier {
            config,
            device: NdArrayDevice::default(),
            model: Mutex::new(None),
            feature_names: Vec::new(),
            scaling: None,
            vocabulary: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.lock().is_some()
    }

    /// Attach the vocabulary the training matrix was encoded with
    pub fn set_vocabulary(&mut self, vocabulary: CategoryVocabulary) {
        self.vocabulary = Some(vocabulary);
    }

    pub fn metadata(&self) -> Option<ModelMetadata> {
        self.scaling.as_ref().map(|scaling| ModelMetadata {
            feature_names: self.feature_names.clone(),
            scaling: scaling.clone(),
            vocabulary: self.vocabulary.clone(),
        })
    }

    /// Save weights to `<stem>.mpk` and metadata to `<stem>.json`
    pub fn save(&self, stem: &Path) -> Result<()> {
        let metadata = self.metadata().ok_or(FightError::NoModel)?;
        let model = self.model.lock().clone().ok_or(FightError::NoModel)?;

        if let Some(parent) = stem.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(stem.with_extension("json"))?;
        serde_json::to_writer_pretty(file, &metadata)?;

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(model.into_record(), stem.with_extension("mpk"))
            .map_err(|e| FightError::Io(std::io::Error::other(e.to_string())))?;

        info!("Saved model to {}", stem.display());
        Ok(())
    }

    /// Load a model saved with [`LogisticClassifier::save`]
    pub fn load(stem: &Path, config: LogisticConfig) -> Result<Self> {
        let metadata_path = stem.with_extension("json");
        if !metadata_path.exists() {
            return Err(FightError::NoModel);
        }
        let metadata: ModelMetadata = serde_json::from_reader(File::open(metadata_path)?)?;
        if metadata.scaling.dim() != metadata.feature_names.len() {
            return Err(FightError::Model(format!(
                "metadata lists {} features but scales {}",
                metadata.feature_names.len(),
                metadata.scaling.dim()
            )));
        }

        let device = NdArrayDevice::default();
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(stem.with_extension("mpk"), &device)
            .map_err(|e| FightError::Io(std::io::Error::other(e.to_string())))?;
        let model: Linear<InferenceBackend> =
            LinearConfig::new(metadata.feature_names.len(), 1).init(&device);
        let model = model.load_record(record);

        debug!(
            "Loaded model with {} features from {}",
            metadata.feature_names.len(),
            stem.display()
        );

        Ok(LogisticClassifier {
            config,
            device,
            model: Mutex::new(Some(model)),
            feature_names: metadata.feature_names,
            scaling: Some(metadata.scaling),
            vocabulary: metadata.vocabulary,
        })
    }

    fn check_width(&self, rows: &[Vec<f64>], width: usize) -> Result<()> {
        match rows.iter().find(|row| row.len() != width) {
            Some(row) => Err(FightError::Model(format!(
                "expected {} features per row, got {}",
                width,
                row.len()
            ))),
            None => Ok(()),
        }
    }
}

impl WinClassifier for LogisticClassifier {
    fn fit(
        &mut self,
        train: &LabelledRows,
        validation: Option<&LabelledRows>,
    ) -> Result<TrainingHistory> {
        if train.is_empty() {
            return Err(FightError::Model("no training rows".to_string()));
        }
        let width = train.feature_names.len();
        self.check_width(&train.rows, width)?;
        let validation = validation.filter(|v| !v.is_empty());
        if let Some(v) = validation {
            self.check_width(&v.rows, width)?;
        }

        let device = self.device.clone();
        let scaling = FeatureScaling::fit(&train.rows, width);

        let x_train = scaling.tensor::<TrainingBackend>(&train.rows, &device);
        let y_train = column_tensor::<TrainingBackend>(&train.labels, &device);
        let weights: Vec<f64> = train
            .labels
            .iter()
            .map(|y| {
                if *y >= 0.5 {
                    self.config.positive_class_weight
                } else {
                    1.0
                }
            })
            .collect();
        let w_train = column_tensor::<TrainingBackend>(&weights, &device);
        let x_val = validation.map(|v| scaling.tensor::<InferenceBackend>(&v.rows, &device));

        let mut model: Linear<TrainingBackend> = LinearConfig::new(width, 1).init(&device);
        let mut optimizer = SgdConfig::new().init();
        let mut history = TrainingHistory::new();
        let mut best: Option<Linear<InferenceBackend>> = None;
        let epochs = self.config.epochs;

        info!(
            "Training logistic model: {} rows, {} features, {} epochs",
            train.len(),
            width,
            epochs
        );

        for epoch in 0..epochs {
            let probs = sigmoid(model.forward(x_train.clone()));
            let loss = weighted_binary_cross_entropy(probs.clone(), y_train.clone(), w_train.clone());
            let loss_value: f32 = loss.clone().into_scalar().elem();
            let train_probs = tensor_values(probs)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.config.learning_rate, model, grads);

            let train_metrics = Metrics::from_predictions(&train_probs, &train.labels);
            let val_metrics = match (&x_val, validation) {
                (Some(x), Some(v)) => {
                    let probs = tensor_values(sigmoid(model.valid().forward(x.clone())))?;
                    Some(Metrics::from_predictions(&probs, &v.labels))
                }
                _ => None,
            };

            if history.record_epoch(epoch, &train_metrics, val_metrics.as_ref()) {
                best = Some(model.valid());
            }

            if epoch % 50 == 0 || epoch + 1 == epochs {
                match &val_metrics {
                    Some(val) => info!(
                        "Epoch {}/{}: loss={:.4}, train_acc={:.1}%, val_loss={:.4}, val_acc={:.1}%",
                        epoch + 1,
                        epochs,
                        loss_value,
                        train_metrics.accuracy() * 100.0,
                        val.log_loss,
                        val.accuracy() * 100.0
                    ),
                    None => info!(
                        "Epoch {}/{}: loss={:.4}, train_acc={:.1}%",
                        epoch + 1,
                        epochs,
                        loss_value,
                        train_metrics.accuracy() * 100.0
                    ),
                }
            }

            if history.should_early_stop(self.config.early_stopping_patience) {
                info!(
                    "Early stopping at epoch {} (best epoch {}, val_loss={:.4})",
                    epoch + 1,
                    history.best_epoch + 1,
                    history.best_val_loss
                );
                break;
            }
        }

        *self.model.get_mut() = Some(best.unwrap_or_else(|| model.valid()));
        self.feature_names = train.feature_names.clone();
        self.scaling = Some(scaling);
        Ok(history)
    }

    fn predict_probability(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let scaling = self.scaling.as_ref().ok_or(FightError::NoModel)?;
        let guard = self.model.lock();
        let model = guard.as_ref().ok_or(FightError::NoModel)?;
        self.check_width(rows, scaling.dim())?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let x = scaling.tensor::<InferenceBackend>(rows, &self.device);
        tensor_values(sigmoid(model.forward(x)))
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn vocabulary(&self) -> Option<&CategoryVocabulary> {
        self.vocabulary.as_ref()
    }
}

fn column_tensor<B: Backend>(values: &[f64], device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = values.iter().map(|v| *v as f32).collect();
    Tensor::<B, 1>::from_floats(values.as_slice(), device).unsqueeze_dim(1)
}

fn tensor_values<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f64>> {
    let data = tensor.into_data();
    let values: &[f32] = data
        .as_slice()
        .map_err(|e| FightError::Model(format!("{:?}", e)))?;
    Ok(values.iter().map(|v| *v as f64).collect())
}

/// Class-weighted binary cross-entropy on probabilities
fn weighted_binary_cross_entropy<B: Backend>(
    probs: Tensor<B, 2>,
    targets: Tensor<B, 2>,
    weights: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    (loss * weights).mean()
}
