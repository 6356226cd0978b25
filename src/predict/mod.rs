//! Prediction and inference
//!
//! Canonical competitor vectors, inference-row assembly and the cached
//! prediction service.

pub mod assembler;
pub mod cache;
pub mod perspective;
pub mod service;

pub use assembler::{InferenceAssembler, InferenceRow};
pub use cache::{CachedHistory, FeatureCache, HistorySource, InMemoryHistory, SqliteHistory};
pub use perspective::{canonical_vector, CanonicalVector};
pub use service::{format_prediction, Predictor};
