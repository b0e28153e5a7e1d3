//! # ferrotrack-core
//!
//! Foundation shared by the ferrotrack crates:
//! - **tracking**: file-based experiment store (experiments, runs, params,
//!   metrics, tags, artifacts) and the run handle used by training jobs
//! - **config**: figment-layered configuration loading
//! - **persistence**: atomic writes and YAML/JSON load helpers

pub mod config;
pub mod error;
pub mod persistence;
pub mod tracking;

pub use config::TrackingConfig;
pub use error::{TrackingError, TrackingResult};
pub use tracking::{ActiveRun, Experiment, FileStore, Metric, Run, RunInfo, RunStatus, Tracker};
