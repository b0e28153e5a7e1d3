//! Layered configuration.
//!
//! Uses `figment` for layering: defaults -> workspace `ferrotrack.toml` ->
//! explicit config file -> environment (`FERROTRACK_` prefix, `__` as the
//! section separator). Downstream crates bring their own config struct and
//! extract it from [`layered`].

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the workspace-level configuration file.
pub const CONFIG_FILE: &str = "ferrotrack.toml";

/// Prefix for environment overrides (`FERROTRACK_TRACKING__URI`, ...).
pub const ENV_PREFIX: &str = "FERROTRACK_";

/// Where and under which experiment runs are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Tracking store location. `file:` URIs and bare paths are accepted;
    /// relative paths resolve against the workspace.
    #[serde(default = "default_tracking_uri")]
    pub uri: String,
    /// Experiment the run is recorded under (created on first use).
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    /// Explicit run name. A random `adjective-noun-NNN` name is generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: default_tracking_uri(),
            experiment_name: default_experiment_name(),
            run_name: None,
        }
    }
}

fn default_tracking_uri() -> String {
    "file:./mlruns".to_string()
}

fn default_experiment_name() -> String {
    "jenkins-mlflow-demo".to_string()
}

/// Build the layered figment for a config type.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `FERROTRACK_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`<workspace>/ferrotrack.toml`)
/// 4. Built-in defaults
pub fn layered<T: Serialize>(
    defaults: &T,
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(defaults));

    if let Some(ws) = workspace {
        let ws_config = ws.join(CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    }

    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load a config type from the layered sources.
///
/// An explicitly named config file must exist; `Toml::file` silently skips
/// missing files.
pub fn load_config<T>(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<T, Box<figment::Error>>
where
    T: Default + Serialize + for<'de> Deserialize<'de>,
{
    if let Some(file) = config_file {
        if !file.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                file.display()
            ))));
        }
    }
    layered(&T::default(), workspace, config_file)
        .extract()
        .map_err(Box::new)
}

/// Check whether a workspace-level config file exists.
pub fn config_exists(workspace: &Path) -> bool {
    workspace.join(CONFIG_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(default)]
        tracking: TrackingConfig,
    }

    #[test]
    fn test_defaults() {
        let config = TrackingConfig::default();
        assert_eq!(config.uri, "file:./mlruns");
        assert_eq!(config.experiment_name, "jenkins-mlflow-demo");
        assert!(config.run_name.is_none());
    }

    #[test]
    fn test_workspace_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [tracking]
                experiment_name = "from-file"
                run_name = "nightly"
                "#,
            )?;
            jail.set_env("FERROTRACK_TRACKING__EXPERIMENT_NAME", "from-env");

            let config: Wrapper = load_config(Some(jail.directory()), None).map_err(|e| *e)?;
            assert_eq!(config.tracking.experiment_name, "from-env");
            assert_eq!(config.tracking.run_name.as_deref(), Some("nightly"));
            assert_eq!(config.tracking.uri, "file:./mlruns");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("absent.toml");
            let result: Result<Wrapper, _> = load_config(None, Some(&missing));
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn test_config_exists() {
        Jail::expect_with(|jail| {
            assert!(!config_exists(jail.directory()));
            jail.create_file(CONFIG_FILE, "")?;
            assert!(config_exists(jail.directory()));
            Ok(())
        });
    }
}
