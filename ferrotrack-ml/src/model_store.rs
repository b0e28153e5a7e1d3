//! Logging fitted pipelines into a run and loading them back.
//!
//! A logged model is a directory under the run's artifacts holding an
//! `MLmodel` descriptor (YAML) and the serialised pipeline (`model.json`).

use crate::error::{MlError, MlResult};
use crate::pipeline::Pipeline;
use chrono::Utc;
use ferrotrack_core::ActiveRun;
use ferrotrack_core::persistence::{load_json, load_yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MLMODEL_FILE: &str = "MLmodel";
pub const MODEL_DATA_FILE: &str = "model.json";
pub const FLAVOR_NAME: &str = "ferrotrack";
pub const DEFAULT_ARTIFACT_PATH: &str = "model";
/// Run tag listing every model logged to the run, as a JSON array.
pub const MODEL_HISTORY_TAG: &str = "mlflow.log-model.history";

/// The `MLmodel` descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub artifact_path: String,
    /// Flavor name to flavor config. Unknown flavors are kept as raw YAML.
    pub flavors: BTreeMap<String, serde_yaml::Value>,
    pub model_uuid: String,
    pub run_id: String,
    pub utc_time_created: String,
}

/// The `ferrotrack` flavor section of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FerrotrackFlavor {
    pub model_data: String,
    pub steps: Vec<String>,
    pub ferrotrack_version: String,
}

impl ModelDescriptor {
    pub fn flavor(&self) -> MlResult<FerrotrackFlavor> {
        let raw = self.flavors.get(FLAVOR_NAME).ok_or_else(|| {
            MlError::model(format!(
                "model {} has no '{FLAVOR_NAME}' flavor",
                self.model_uuid
            ))
        })?;
        Ok(serde_yaml::from_value(raw.clone())?)
    }
}

/// Where a model was logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedModel {
    pub descriptor: ModelDescriptor,
    pub model_dir: PathBuf,
}

/// Write `pipeline` under `artifacts/<artifact_path>/` of `run` and append it
/// to the run's model history tag.
pub fn log_model(
    run: &ActiveRun<'_>,
    pipeline: &Pipeline,
    artifact_path: &str,
) -> MlResult<LoggedModel> {
    if !pipeline.is_fitted() {
        return Err(MlError::model("cannot log an unfitted pipeline"));
    }
    let artifact_path = artifact_path.trim_matches('/');
    if artifact_path.is_empty() {
        return Err(MlError::invalid_input("model artifact path must not be empty"));
    }

    let flavor = FerrotrackFlavor {
        model_data: MODEL_DATA_FILE.to_string(),
        steps: pipeline.step_names().iter().map(|s| s.to_string()).collect(),
        ferrotrack_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mut flavors = BTreeMap::new();
    flavors.insert(FLAVOR_NAME.to_string(), serde_yaml::to_value(&flavor)?);
    let descriptor = ModelDescriptor {
        artifact_path: artifact_path.to_string(),
        flavors,
        model_uuid: Uuid::new_v4().simple().to_string(),
        run_id: run.id().to_string(),
        utc_time_created: Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
    };

    let model_json = serde_json::to_vec_pretty(pipeline)?;
    run.write_artifact(&format!("{artifact_path}/{MODEL_DATA_FILE}"), &model_json)?;
    let descriptor_yaml = serde_yaml::to_string(&descriptor)?;
    let mlmodel_path =
        run.write_artifact(&format!("{artifact_path}/{MLMODEL_FILE}"), descriptor_yaml.as_bytes())?;

    let mut history: Vec<ModelDescriptor> = match run.get_tag(MODEL_HISTORY_TAG)? {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Vec::new(),
    };
    history.push(descriptor.clone());
    run.set_tag(MODEL_HISTORY_TAG, &serde_json::to_string(&history)?)?;

    let model_dir = mlmodel_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    tracing::info!(
        run_id = run.id(),
        model_uuid = %descriptor.model_uuid,
        artifact_path,
        "Logged model"
    );
    Ok(LoggedModel {
        descriptor,
        model_dir,
    })
}

/// Load the pipeline stored in `model_dir` (a directory containing `MLmodel`).
pub fn load_model(model_dir: &Path) -> MlResult<Pipeline> {
    let descriptor = read_descriptor(model_dir)?;
    let flavor = descriptor.flavor()?;
    let data_path = model_dir.join(&flavor.model_data);
    let pipeline: Pipeline = load_json(&data_path)?.ok_or_else(|| {
        MlError::model(format!("model data missing at {}", data_path.display()))
    })?;
    if !pipeline.is_fitted() {
        return Err(MlError::model(format!(
            "model {} holds an unfitted pipeline",
            descriptor.model_uuid
        )));
    }
    tracing::debug!(model_uuid = %descriptor.model_uuid, "Loaded model");
    Ok(pipeline)
}

/// Parse `model_dir/MLmodel`.
pub fn read_descriptor(model_dir: &Path) -> MlResult<ModelDescriptor> {
    let path = model_dir.join(MLMODEL_FILE);
    load_yaml(&path)?
        .ok_or_else(|| MlError::model(format!("no {MLMODEL_FILE} in {}", model_dir.display())))
}
