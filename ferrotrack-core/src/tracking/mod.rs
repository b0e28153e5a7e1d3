//! Experiment tracking: file store, URIs, run handles.

pub mod client;
pub mod entities;
pub mod names;
pub mod store;
pub mod uri;

pub use client::{ActiveRun, Tracker};
pub use entities::{Experiment, LifecycleStage, Metric, Run, RunInfo, RunStatus};
pub use store::{DEFAULT_EXPERIMENT_ID, DEFAULT_EXPERIMENT_NAME, FileStore, validate_key};
pub use uri::TrackingUri;
