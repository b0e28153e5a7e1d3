//! File-backed tracking store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<experiment_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/{params,metrics,tags}/<key>
//! <root>/<experiment_id>/<run_id>/artifacts/...
//! ```

use crate::error::{TrackingError, TrackingResult};
use crate::persistence::{atomic_write, atomic_write_yaml, load_yaml};
use crate::tracking::entities::{Experiment, LifecycleStage, Metric, Run, RunInfo, RunStatus};
use crate::tracking::uri::path_to_uri;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPERIMENT_ID: &str = "0";
pub const DEFAULT_EXPERIMENT_NAME: &str = "Default";

const META_FILE: &str = "meta.yaml";
const PARAMS_DIR: &str = "params";
const METRICS_DIR: &str = "metrics";
const TAGS_DIR: &str = "tags";
const ARTIFACTS_DIR: &str = "artifacts";

/// Longest accepted param, metric or tag key.
pub const MAX_KEY_LEN: usize = 250;

/// Tracking store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (or initialise) a store, creating the `Default` experiment if missing.
    pub fn open(root: impl Into<PathBuf>) -> TrackingResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        let store = Self { root };

        let default_meta = store.experiment_dir(DEFAULT_EXPERIMENT_ID).join(META_FILE);
        if !default_meta.exists() {
            store.write_experiment(DEFAULT_EXPERIMENT_ID, DEFAULT_EXPERIMENT_NAME)?;
        }
        tracing::debug!(root = %store.root.display(), "Opened tracking store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.root.join(experiment_id)
    }

    // ---- experiments -------------------------------------------------------

    /// All experiments, ordered by numeric id.
    pub fn list_experiments(&self) -> TrackingResult<Vec<Experiment>> {
        let mut experiments = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.file_type()?.is_dir() || name.parse::<u64>().is_err() {
                continue;
            }
            if let Some(exp) = load_yaml::<Experiment>(&entry.path().join(META_FILE))? {
                experiments.push(exp);
            }
        }
        experiments.sort_by_key(|e| e.experiment_id.parse::<u64>().unwrap_or(u64::MAX));
        Ok(experiments)
    }

    pub fn get_experiment(&self, experiment_id: &str) -> TrackingResult<Experiment> {
        if experiment_id.parse::<u64>().is_err() {
            return Err(TrackingError::ExperimentNotFound(experiment_id.to_string()));
        }
        load_yaml(&self.experiment_dir(experiment_id).join(META_FILE))?
            .ok_or_else(|| TrackingError::ExperimentNotFound(experiment_id.to_string()))
    }

    /// Look up an experiment by name, whatever its lifecycle stage.
    pub fn get_experiment_by_name(&self, name: &str) -> TrackingResult<Option<Experiment>> {
        Ok(self
            .list_experiments()?
            .into_iter()
            .find(|e| e.name == name))
    }

    /// Create a new experiment with the next free numeric id.
    pub fn create_experiment(&self, name: &str) -> TrackingResult<Experiment> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackingError::invalid_key("experiment name must not be empty"));
        }
        if self.get_experiment_by_name(name)?.is_some() {
            return Err(TrackingError::ExperimentExists(name.to_string()));
        }

        let next_id = self
            .list_experiments()?
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1);

        let experiment = self.write_experiment(&next_id.to_string(), name)?;
        tracing::info!(
            experiment_id = %experiment.experiment_id,
            name = %experiment.name,
            "Created experiment"
        );
        Ok(experiment)
    }

    /// Soft-delete an experiment. Its runs stay on disk but reject writes.
    pub fn delete_experiment(&self, experiment_id: &str) -> TrackingResult<Experiment> {
        let mut experiment = self.get_experiment(experiment_id)?;
        experiment.lifecycle_stage = LifecycleStage::Deleted;
        experiment.last_update_time = now_millis();
        atomic_write_yaml(
            &self.experiment_dir(experiment_id).join(META_FILE),
            &experiment,
        )?;
        Ok(experiment)
    }

    fn write_experiment(&self, experiment_id: &str, name: &str) -> TrackingResult<Experiment> {
        let dir = self.experiment_dir(experiment_id);
        fs::create_dir_all(&dir)?;
        let now = now_millis();
        let experiment = Experiment {
            experiment_id: experiment_id.to_string(),
            name: name.to_string(),
            artifact_location: path_to_uri(&dir),
            lifecycle_stage: LifecycleStage::Active,
            creation_time: now,
            last_update_time: now,
        };
        atomic_write_yaml(&dir.join(META_FILE), &experiment)?;
        Ok(experiment)
    }

    // ---- runs --------------------------------------------------------------

    /// Create a run in `RUNNING` state and apply the initial tags.
    pub fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        user_id: &str,
        source_name: &str,
        tags: &[(String, String)],
    ) -> TrackingResult<RunInfo> {
        let experiment = self.get_experiment(experiment_id)?;
        if !experiment.is_active() {
            return Err(TrackingError::ExperimentNotActive(experiment_id.to_string()));
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let run_dir = self.experiment_dir(experiment_id).join(&run_id);
        for sub in [PARAMS_DIR, METRICS_DIR, TAGS_DIR, ARTIFACTS_DIR] {
            fs::create_dir_all(run_dir.join(sub))?;
        }

        let info = RunInfo {
            run_id: run_id.clone(),
            run_uuid: run_id.clone(),
            run_name: run_name.to_string(),
            experiment_id: experiment_id.to_string(),
            user_id: user_id.to_string(),
            status: RunStatus::Running,
            start_time: now_millis(),
            end_time: None,
            artifact_uri: path_to_uri(&run_dir.join(ARTIFACTS_DIR)),
            lifecycle_stage: LifecycleStage::Active,
            source_name: source_name.to_string(),
        };
        atomic_write_yaml(&run_dir.join(META_FILE), &info)?;

        for (key, value) in tags {
            self.set_tag(&run_id, key, value)?;
        }

        tracing::info!(run_id = %run_id, run_name = %run_name, experiment_id, "Started run");
        Ok(info)
    }

    fn find_run_dir(&self, run_id: &str) -> TrackingResult<PathBuf> {
        if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TrackingError::RunNotFound(run_id.to_string()));
        }
        for experiment in self.list_experiments()? {
            let candidate = self
                .experiment_dir(&experiment.experiment_id)
                .join(run_id);
            if candidate.join(META_FILE).exists() {
                return Ok(candidate);
            }
        }
        Err(TrackingError::RunNotFound(run_id.to_string()))
    }

    pub fn get_run_info(&self, run_id: &str) -> TrackingResult<RunInfo> {
        let dir = self.find_run_dir(run_id)?;
        load_yaml(&dir.join(META_FILE))?
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))
    }

    /// Full run view: metadata, params, latest metrics and tags.
    pub fn get_run(&self, run_id: &str) -> TrackingResult<Run> {
        Ok(Run {
            info: self.get_run_info(run_id)?,
            params: self.get_params(run_id)?,
            metrics: self.latest_metrics(run_id)?,
            tags: self.get_tags(run_id)?,
        })
    }

    /// Runs of an experiment, newest first.
    pub fn list_runs(&self, experiment_id: &str) -> TrackingResult<Vec<RunInfo>> {
        self.get_experiment(experiment_id)?;
        let dir = self.experiment_dir(experiment_id);
        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(info) = load_yaml::<RunInfo>(&entry.path().join(META_FILE))? {
                runs.push(info);
            }
        }
        runs.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    /// Move a run to a new status. Terminal statuses stamp `end_time`.
    pub fn update_run_status(&self, run_id: &str, status: RunStatus) -> TrackingResult<RunInfo> {
        let dir = self.find_run_dir(run_id)?;
        let mut info: RunInfo = load_yaml(&dir.join(META_FILE))?
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        info.status = status;
        if status.is_terminal() {
            info.end_time = Some(now_millis());
        }
        atomic_write_yaml(&dir.join(META_FILE), &info)?;
        tracing::debug!(run_id, status = %status, "Updated run status");
        Ok(info)
    }

    /// Soft-delete a run. Further writes fail with `RunNotActive`.
    pub fn delete_run(&self, run_id: &str) -> TrackingResult<RunInfo> {
        let dir = self.find_run_dir(run_id)?;
        let mut info: RunInfo = load_yaml(&dir.join(META_FILE))?
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        info.lifecycle_stage = LifecycleStage::Deleted;
        atomic_write_yaml(&dir.join(META_FILE), &info)?;
        Ok(info)
    }

    /// Resolve the directory of a run that may still be written to.
    fn writable_run_dir(&self, run_id: &str) -> TrackingResult<PathBuf> {
        let info = self.get_run_info(run_id)?;
        if !info.is_active() {
            return Err(TrackingError::RunNotActive(run_id.to_string()));
        }
        let experiment = self.get_experiment(&info.experiment_id)?;
        if !experiment.is_active() {
            return Err(TrackingError::ExperimentNotActive(info.experiment_id));
        }
        Ok(self.experiment_dir(&info.experiment_id).join(run_id))
    }

    // ---- params, metrics, tags ---------------------------------------------

    /// Log a param. Params are immutable: re-logging the same value is a
    /// no-op, a different value is a conflict.
    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let path = self.writable_run_dir(run_id)?.join(PARAMS_DIR).join(key);
        if path.exists() {
            let old = fs::read_to_string(&path)?;
            if old == value {
                return Ok(());
            }
            return Err(TrackingError::ParamConflict {
                key: key.to_string(),
                old,
                new: value.to_string(),
            });
        }
        atomic_write(&path, value.as_bytes())?;
        tracing::debug!(run_id, key, value, "Logged param");
        Ok(())
    }

    /// Append a metric observation.
    pub fn log_metric(&self, run_id: &str, metric: &Metric) -> TrackingResult<()> {
        validate_key(&metric.key)?;
        if metric.value.is_nan() {
            return Err(TrackingError::InvalidMetric(format!(
                "metric '{}' is NaN",
                metric.key
            )));
        }
        let path = self
            .writable_run_dir(run_id)?
            .join(METRICS_DIR)
            .join(&metric.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(metric.to_line().as_bytes())?;
        tracing::debug!(run_id, key = %metric.key, value = metric.value, step = metric.step, "Logged metric");
        Ok(())
    }

    /// Set (or overwrite) a tag.
    pub fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        validate_key(key)?;
        let path = self.writable_run_dir(run_id)?.join(TAGS_DIR).join(key);
        atomic_write(&path, value.as_bytes())?;
        Ok(())
    }

    pub fn get_params(&self, run_id: &str) -> TrackingResult<BTreeMap<String, String>> {
        read_kv_dir(&self.find_run_dir(run_id)?.join(PARAMS_DIR))
    }

    pub fn get_tags(&self, run_id: &str) -> TrackingResult<BTreeMap<String, String>> {
        read_kv_dir(&self.find_run_dir(run_id)?.join(TAGS_DIR))
    }

    /// Every observation of one metric, in logging order.
    pub fn get_metric_history(&self, run_id: &str, key: &str) -> TrackingResult<Vec<Metric>> {
        validate_key(key)?;
        let path = self.find_run_dir(run_id)?.join(METRICS_DIR).join(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        parse_metric_file(key, &path)
    }

    /// Latest value per metric: highest step, then latest timestamp, then largest value.
    pub fn latest_metrics(&self, run_id: &str) -> TrackingResult<BTreeMap<String, Metric>> {
        let dir = self.find_run_dir(run_id)?.join(METRICS_DIR);
        let mut latest = BTreeMap::new();
        for key in list_files(&dir)? {
            let history = parse_metric_file(&key, &dir.join(&key))?;
            let best = history.into_iter().max_by(|a, b| {
                (a.step, a.timestamp)
                    .cmp(&(b.step, b.timestamp))
                    .then_with(|| a.value.total_cmp(&b.value))
            });
            if let Some(metric) = best {
                latest.insert(key, metric);
            }
        }
        Ok(latest)
    }

    // ---- artifacts ---------------------------------------------------------

    /// Root directory of a run's artifacts.
    pub fn artifact_root(&self, run_id: &str) -> TrackingResult<PathBuf> {
        Ok(self.find_run_dir(run_id)?.join(ARTIFACTS_DIR))
    }

    /// Copy a local file into the run's artifacts, optionally under a sub-path.
    pub fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> TrackingResult<PathBuf> {
        let file_name = local_path.file_name().ok_or_else(|| {
            TrackingError::invalid_key(format!("{} has no file name", local_path.display()))
        })?;
        if is_temp_name(&file_name.to_string_lossy()) {
            return Err(TrackingError::invalid_key(format!(
                "artifact name {} uses the reserved '{TEMP_SUFFIX}' suffix",
                local_path.display()
            )));
        }
        let mut dest = self.writable_run_dir(run_id)?.join(ARTIFACTS_DIR);
        if let Some(sub) = artifact_path {
            validate_relative_path(sub)?;
            dest = dest.join(sub);
        }
        fs::create_dir_all(&dest)?;
        let dest = dest.join(file_name);
        fs::copy(local_path, &dest)?;
        tracing::debug!(run_id, artifact = %dest.display(), "Logged artifact");
        Ok(dest)
    }

    /// Write bytes directly as an artifact at `rel_path`.
    pub fn write_artifact(&self, run_id: &str, rel_path: &str, data: &[u8]) -> TrackingResult<PathBuf> {
        validate_relative_path(rel_path)?;
        let dest = self.writable_run_dir(run_id)?.join(ARTIFACTS_DIR).join(rel_path);
        atomic_write(&dest, data)?;
        Ok(dest)
    }

    /// Artifact files of a run (recursively), as `/`-separated relative paths.
    pub fn list_artifacts(&self, run_id: &str) -> TrackingResult<Vec<String>> {
        list_files(&self.artifact_root(run_id)?)
    }
}

/// Validate a param, metric or tag key.
///
/// Keys may contain alphanumerics, `_`, `-`, `.`, space and `/`; `/` nests
/// the key into sub-directories, so empty, `.` and `..` segments are rejected.
/// A final segment ending in `.tmp` would collide with in-flight atomic
/// writes and be skipped by listings, so it is rejected too.
pub fn validate_key(key: &str) -> TrackingResult<()> {
    if key.is_empty() {
        return Err(TrackingError::invalid_key("key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(TrackingError::invalid_key(format!(
            "key exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '/')))
    {
        return Err(TrackingError::invalid_key(format!(
            "'{key}' contains invalid character '{bad}'"
        )));
    }
    validate_relative_path(key)
}

fn validate_relative_path(path: &str) -> TrackingResult<()> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(TrackingError::invalid_key(format!("'{path}' is absolute")));
    }
    if path
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(TrackingError::invalid_key(format!(
            "'{path}' has an empty, '.' or '..' segment"
        )));
    }
    if path.rsplit(['/', '\\']).next().is_some_and(is_temp_name) {
        return Err(TrackingError::invalid_key(format!(
            "'{path}' uses the reserved '{TEMP_SUFFIX}' suffix"
        )));
    }
    Ok(())
}

/// Suffix of the sibling files written by [`atomic_write`].
const TEMP_SUFFIX: &str = ".tmp";

fn is_temp_name(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX)
}

fn parse_metric_file(key: &str, path: &Path) -> TrackingResult<Vec<Metric>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            Metric::parse_line(key, line)
                .ok_or_else(|| TrackingError::corrupt(format!("metric '{key}': '{line}'")))
        })
        .collect()
}

/// Read every file under `dir` as `relative/key -> contents`.
fn read_kv_dir(dir: &Path) -> TrackingResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for key in list_files(dir)? {
        let value = fs::read_to_string(dir.join(&key))?;
        out.insert(key, value);
    }
    Ok(out)
}

/// Recursively list files under `dir`, skipping in-flight `.tmp` files.
fn list_files(dir: &Path) -> TrackingResult<Vec<String>> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                walk(base, &path, out)?;
            } else if !is_temp_name(&entry.file_name().to_string_lossy()) {
                if let Ok(rel) = path.strip_prefix(base) {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    out.push(key);
                }
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    if dir.exists() {
        walk(dir, dir, &mut out)?;
    }
    out.sort();
    Ok(out)
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("mlruns")).unwrap();
        (dir, store)
    }

    fn run(store: &FileStore) -> RunInfo {
        store
            .create_run(DEFAULT_EXPERIMENT_ID, "test-run", "tester", "unit", &[])
            .unwrap()
    }

    #[test]
    fn test_open_creates_default_experiment() {
        let (_dir, store) = store();
        let experiments = store.list_experiments().unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].experiment_id, "0");
        assert_eq!(experiments[0].name, "Default");
        assert!(experiments[0].artifact_location.starts_with("file://"));
    }

    #[test]
    fn test_reopen_keeps_experiments() {
        let (dir, store) = store();
        store.create_experiment("demo").unwrap();
        let reopened = FileStore::open(dir.path().join("mlruns")).unwrap();
        assert_eq!(reopened.list_experiments().unwrap().len(), 2);
    }

    #[test]
    fn test_experiment_ids_increment() {
        let (_dir, store) = store();
        let a = store.create_experiment("a").unwrap();
        let b = store.create_experiment("b").unwrap();
        assert_eq!(a.experiment_id, "1");
        assert_eq!(b.experiment_id, "2");
        assert!(matches!(
            store.create_experiment("a"),
            Err(TrackingError::ExperimentExists(_))
        ));
        assert_eq!(
            store.get_experiment_by_name("b").unwrap().unwrap().experiment_id,
            "2"
        );
    }

    #[test]
    fn test_run_lifecycle() {
        let (_dir, store) = store();
        let info = run(&store);
        assert_eq!(info.run_id.len(), 32);
        assert_eq!(info.status, RunStatus::Running);
        assert!(info.end_time.is_none());

        let done = store.update_run_status(&info.run_id, RunStatus::Finished).unwrap();
        assert_eq!(done.status, RunStatus::Finished);
        assert!(done.end_time.is_some());
        assert_eq!(store.get_run_info(&info.run_id).unwrap(), done);
    }

    #[test]
    fn test_run_meta_fields() {
        let (_dir, store) = store();
        let info = run(&store);
        let meta = fs::read_to_string(
            store
                .experiment_dir(DEFAULT_EXPERIMENT_ID)
                .join(&info.run_id)
                .join(META_FILE),
        )
        .unwrap();
        let doc: serde_yaml::Mapping = serde_yaml::from_str(&meta).unwrap();
        let mut keys: Vec<_> = doc.keys().filter_map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "artifact_uri",
                "end_time",
                "experiment_id",
                "lifecycle_stage",
                "run_id",
                "run_name",
                "run_uuid",
                "source_name",
                "start_time",
                "status",
                "user_id",
            ]
        );
    }

    #[test]
    fn test_param_immutability() {
        let (_dir, store) = store();
        let info = run(&store);
        store.log_param(&info.run_id, "model_C", "1.0").unwrap();
        store.log_param(&info.run_id, "model_C", "1.0").unwrap();
        let err = store.log_param(&info.run_id, "model_C", "2.0").unwrap_err();
        assert!(matches!(err, TrackingError::ParamConflict { .. }));
        assert_eq!(
            store.get_params(&info.run_id).unwrap().get("model_C").map(String::as_str),
            Some("1.0")
        );
    }

    #[test]
    fn test_metric_history_appends() {
        let (_dir, store) = store();
        let info = run(&store);
        store
            .log_metric(&info.run_id, &Metric::new("loss", 0.9, 10, 0))
            .unwrap();
        store
            .log_metric(&info.run_id, &Metric::new("loss", 0.4, 20, 1))
            .unwrap();
        let history = store.get_metric_history(&info.run_id, "loss").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].value, 0.4);

        let latest = store.latest_metrics(&info.run_id).unwrap();
        assert_eq!(latest["loss"].step, 1);
    }

    #[test]
    fn test_nan_metric_rejected() {
        let (_dir, store) = store();
        let info = run(&store);
        let err = store
            .log_metric(&info.run_id, &Metric::new("loss", f64::NAN, 0, 0))
            .unwrap_err();
        assert!(matches!(err, TrackingError::InvalidMetric(_)));
    }

    #[test]
    fn test_nested_keys_and_tags() {
        let (_dir, store) = store();
        let info = run(&store);
        store.set_tag(&info.run_id, "mlflow.runName", "first").unwrap();
        store.set_tag(&info.run_id, "mlflow.runName", "second").unwrap();
        store.log_param(&info.run_id, "optim/lr", "0.1").unwrap();

        let tags = store.get_tags(&info.run_id).unwrap();
        assert_eq!(tags["mlflow.runName"], "second");
        let params = store.get_params(&info.run_id).unwrap();
        assert_eq!(params["optim/lr"], "0.1");
    }

    #[test]
    fn test_invalid_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("semi;colon").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
        assert!(validate_key("model_max_iter").is_ok());
        assert!(validate_key("mlflow.log-model.history").is_ok());
    }

    #[test]
    fn test_temp_suffix_keys_rejected() {
        let (dir, store) = store();
        let info = run(&store);

        assert!(matches!(
            store.log_param(&info.run_id, "weights.tmp", "7"),
            Err(TrackingError::InvalidKey(_))
        ));
        assert!(matches!(
            store.set_tag(&info.run_id, "notes/draft.tmp", "x"),
            Err(TrackingError::InvalidKey(_))
        ));
        assert!(matches!(
            store.log_metric(&info.run_id, &Metric::new("loss.tmp", 0.5, 0, 0)),
            Err(TrackingError::InvalidKey(_))
        ));
        assert!(matches!(
            store.write_artifact(&info.run_id, "model/model.json.tmp", b"{}"),
            Err(TrackingError::InvalidKey(_))
        ));
        let local = dir.path().join("scratch.tmp");
        fs::write(&local, "x").unwrap();
        assert!(matches!(
            store.log_artifact(&info.run_id, &local, None),
            Err(TrackingError::InvalidKey(_))
        ));

        // Nothing was written that listings would silently drop.
        let run = store.get_run(&info.run_id).unwrap();
        assert!(run.params.is_empty());
        assert!(store.list_artifacts(&info.run_id).unwrap().is_empty());

        // `.tmp` inside a name or a directory segment is still fine.
        assert!(validate_key("tmp.weights").is_ok());
        assert!(validate_key("build.tmp/seed").is_ok());
    }

    #[test]
    fn test_artifacts() {
        let (dir, store) = store();
        let info = run(&store);
        let local = dir.path().join("metrics.txt");
        fs::write(&local, "accuracy: 1.0000\n").unwrap();

        store.log_artifact(&info.run_id, &local, None).unwrap();
        store.log_artifact(&info.run_id, &local, Some("eval")).unwrap();
        store
            .write_artifact(&info.run_id, "model/MLmodel", b"artifact_path: model\n")
            .unwrap();

        assert_eq!(
            store.list_artifacts(&info.run_id).unwrap(),
            vec!["eval/metrics.txt", "metrics.txt", "model/MLmodel"]
        );
        assert!(store.write_artifact(&info.run_id, "../x", b"").is_err());
    }

    #[test]
    fn test_deleted_experiment_rejects_runs_and_writes() {
        let (_dir, store) = store();
        let exp = store.create_experiment("gone").unwrap();
        let info = store
            .create_run(&exp.experiment_id, "r", "u", "s", &[])
            .unwrap();
        store.delete_experiment(&exp.experiment_id).unwrap();

        assert!(matches!(
            store.create_run(&exp.experiment_id, "r2", "u", "s", &[]),
            Err(TrackingError::ExperimentNotActive(_))
        ));
        assert!(matches!(
            store.set_tag(&info.run_id, "k", "v"),
            Err(TrackingError::ExperimentNotActive(_))
        ));
    }

    #[test]
    fn test_deleted_run_rejects_writes() {
        let (_dir, store) = store();
        let info = run(&store);
        store.delete_run(&info.run_id).unwrap();
        assert!(matches!(
            store.log_param(&info.run_id, "k", "v"),
            Err(TrackingError::RunNotActive(_))
        ));
    }

    #[test]
    fn test_unknown_run() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get_run("deadbeef"),
            Err(TrackingError::RunNotFound(_))
        ));
        assert!(matches!(
            store.get_run("../0"),
            Err(TrackingError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_list_runs_newest_first() {
        let (_dir, store) = store();
        let first = run(&store);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = run(&store);
        let runs = store.list_runs(DEFAULT_EXPERIMENT_ID).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, second.run_id);
        assert_eq!(runs[1].run_id, first.run_id);
    }
}
