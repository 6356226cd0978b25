//! Model training
//!
//! Temporal train/validation/test splitting and evaluation metrics.

pub mod metrics;
pub mod trainer;

pub use metrics::{Metrics, TrainingHistory};
pub use trainer::{Trainer, TrainingReport};
