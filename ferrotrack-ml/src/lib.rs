//! # ferrotrack-ml
//!
//! The Iris training job and everything it needs:
//! - **data**: the bundled Iris table and seeded (stratified) splitting
//! - **preprocessing** / **linear**: standard scaling, multinomial logistic
//!   regression fitted with L-BFGS
//! - **pipeline**: scaler + classifier chain built from configuration
//! - **metrics** / **artifacts**: accuracy, confusion matrix, evaluation files
//! - **model_store**: logging fitted pipelines into a run and reloading them
//! - **training**: the job that records a full run in the tracking store

pub mod artifacts;
pub mod config;
pub mod data;
pub mod error;
pub mod linear;
pub mod metrics;
pub mod model_store;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub use config::{ArtifactConfig, MlConfig, ModelConfig, SplitConfig};
pub use data::{Dataset, Split, SplitOptions, load_iris, prepare_data, train_test_split};
pub use error::{MlError, MlResult};
pub use linear::{Classifier, FitSummary, LogisticRegression, Solver};
pub use metrics::{ConfusionMatrix, accuracy_score, confusion_matrix};
pub use pipeline::{Pipeline, build_model};
pub use preprocessing::{StandardScaler, Transformer};
pub use training::{TrainingJob, TrainingReport};
