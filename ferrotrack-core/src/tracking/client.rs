//! Tracking client: experiment selection and the active-run handle.

use crate::error::{TrackingError, TrackingResult};
use crate::tracking::entities::{Experiment, Metric, RunInfo, RunStatus};
use crate::tracking::names::generate_run_name;
use crate::tracking::store::{FileStore, now_millis};
use crate::tracking::uri::TrackingUri;
use std::path::{Path, PathBuf};

pub const TAG_RUN_NAME: &str = "mlflow.runName";
pub const TAG_USER: &str = "mlflow.user";
pub const TAG_SOURCE_NAME: &str = "mlflow.source.name";
pub const TAG_SOURCE_TYPE: &str = "mlflow.source.type";

/// Entry point for recording runs into a store.
#[derive(Debug, Clone)]
pub struct Tracker {
    store: FileStore,
}

impl Tracker {
    /// Open the store named by `uri`, resolving relative paths against `base`.
    pub fn open(uri: &str, base: &Path) -> TrackingResult<Self> {
        let root = TrackingUri::parse(uri)?.resolve(base);
        Ok(Self::from_store(FileStore::open(root)?))
    }

    pub fn from_store(store: FileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Return the experiment called `name`, creating it if needed.
    pub fn set_experiment(&self, name: &str) -> TrackingResult<Experiment> {
        match self.store.get_experiment_by_name(name)? {
            Some(exp) if exp.is_active() => Ok(exp),
            Some(exp) => Err(TrackingError::ExperimentNotActive(exp.experiment_id)),
            None => self.store.create_experiment(name),
        }
    }

    /// Start a run under `experiment`. The returned handle ends the run.
    pub fn start_run(
        &self,
        experiment: &Experiment,
        run_name: Option<&str>,
    ) -> TrackingResult<ActiveRun<'_>> {
        let run_name = match run_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => generate_run_name(&mut rand::thread_rng()),
        };
        let user = current_user();
        let source = source_name();
        let tags = vec![
            (TAG_RUN_NAME.to_string(), run_name.clone()),
            (TAG_USER.to_string(), user.clone()),
            (TAG_SOURCE_NAME.to_string(), source.clone()),
            (TAG_SOURCE_TYPE.to_string(), "LOCAL".to_string()),
        ];
        let info = self.store.create_run(
            &experiment.experiment_id,
            &run_name,
            &user,
            &source,
            &tags,
        )?;
        Ok(ActiveRun {
            store: &self.store,
            info,
            ended: false,
        })
    }
}

/// A run in progress.
///
/// Finish it with [`ActiveRun::finish`] or [`ActiveRun::fail`]. A handle
/// dropped without either is recorded as `FAILED`.
#[derive(Debug)]
pub struct ActiveRun<'a> {
    store: &'a FileStore,
    info: RunInfo,
    ended: bool,
}

impl ActiveRun<'_> {
    pub fn id(&self) -> &str {
        &self.info.run_id
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn experiment_id(&self) -> &str {
        &self.info.experiment_id
    }

    pub fn log_param(&self, key: &str, value: &str) -> TrackingResult<()> {
        self.store.log_param(self.id(), key, value)
    }

    pub fn log_params<'k, I>(&self, params: I) -> TrackingResult<()>
    where
        I: IntoIterator<Item = (&'k str, String)>,
    {
        for (key, value) in params {
            self.log_param(key, &value)?;
        }
        Ok(())
    }

    /// Log a metric at step 0 with the current timestamp.
    pub fn log_metric(&self, key: &str, value: f64) -> TrackingResult<()> {
        self.log_metric_at(key, value, 0)
    }

    pub fn log_metric_at(&self, key: &str, value: f64, step: i64) -> TrackingResult<()> {
        self.store
            .log_metric(self.id(), &Metric::new(key, value, now_millis(), step))
    }

    pub fn set_tag(&self, key: &str, value: &str) -> TrackingResult<()> {
        self.store.set_tag(self.id(), key, value)
    }

    pub fn get_tag(&self, key: &str) -> TrackingResult<Option<String>> {
        Ok(self.store.get_tags(self.id())?.remove(key))
    }

    pub fn log_artifact(&self, local_path: &Path, artifact_path: Option<&str>) -> TrackingResult<PathBuf> {
        self.store.log_artifact(self.id(), local_path, artifact_path)
    }

    pub fn write_artifact(&self, rel_path: &str, data: &[u8]) -> TrackingResult<PathBuf> {
        self.store.write_artifact(self.id(), rel_path, data)
    }

    /// Mark the run `FINISHED`.
    pub fn finish(mut self) -> TrackingResult<RunInfo> {
        self.end(RunStatus::Finished)
    }

    /// Mark the run `FAILED`.
    pub fn fail(mut self) -> TrackingResult<RunInfo> {
        self.end(RunStatus::Failed)
    }

    fn end(&mut self, status: RunStatus) -> TrackingResult<RunInfo> {
        self.ended = true;
        let info = self.store.update_run_status(&self.info.run_id, status)?;
        tracing::info!(run_id = %info.run_id, status = %status, "Ended run");
        self.info = info.clone();
        Ok(info)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        tracing::warn!(run_id = %self.info.run_id, "Run dropped without being ended; marking FAILED");
        if let Err(e) = self.end(RunStatus::Failed) {
            tracing::warn!(run_id = %self.info.run_id, error = %e, "Failed to end dropped run");
        }
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn source_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "ferrotrack".to_string())
}
