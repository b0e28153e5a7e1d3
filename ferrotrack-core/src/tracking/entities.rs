//! Experiment, run and metric records as persisted in the file store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether an experiment or run is live or soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Active,
    Deleted,
}

/// Run status. Persisted as its integer code so `meta.yaml` stays
/// readable by other tooling that speaks the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RunStatus {
    Running,
    Scheduled,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Running => 1,
            Self::Scheduled => 2,
            Self::Finished => 3,
            Self::Failed => 4,
            Self::Killed => 5,
        }
    }

    /// Terminal statuses carry an end time.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

impl From<RunStatus> for u8 {
    fn from(status: RunStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for RunStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Running),
            2 => Ok(Self::Scheduled),
            3 => Ok(Self::Finished),
            4 => Ok(Self::Failed),
            5 => Ok(Self::Killed),
            other => Err(format!("unknown run status code {other}")),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        };
        f.write_str(name)
    }
}

/// Experiment metadata (`<root>/<experiment_id>/meta.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub artifact_location: String,
    pub lifecycle_stage: LifecycleStage,
    pub creation_time: i64,
    pub last_update_time: i64,
}

impl Experiment {
    pub fn is_active(&self) -> bool {
        self.lifecycle_stage == LifecycleStage::Active
    }
}

/// Run metadata (`<root>/<experiment_id>/<run_id>/meta.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    /// Legacy alias of `run_id`, kept for readers of the older layout.
    pub run_uuid: String,
    pub run_name: String,
    pub experiment_id: String,
    pub user_id: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub artifact_uri: String,
    pub lifecycle_stage: LifecycleStage,
    pub source_name: String,
}

impl RunInfo {
    pub fn is_active(&self) -> bool {
        self.lifecycle_stage == LifecycleStage::Active
    }
}

/// A single metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}

impl Metric {
    pub fn new(key: impl Into<String>, value: f64, timestamp: i64, step: i64) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp,
            step,
        }
    }

    /// One line of a metric file: `<timestamp> <value> <step>`.
    pub fn to_line(&self) -> String {
        format!("{} {:?} {}\n", self.timestamp, self.value, self.step)
    }

    pub fn parse_line(key: &str, line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let timestamp = parts.next()?.parse().ok()?;
        let value = parts.next()?.parse().ok()?;
        // Older files may omit the step column.
        let step = match parts.next() {
            Some(raw) => raw.parse().ok()?,
            None => 0,
        };
        Some(Self::new(key, value, timestamp, step))
    }
}

/// A run together with its params, latest metrics and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, Metric>,
    pub tags: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(RunStatus::Running.code(), 1);
        assert_eq!(RunStatus::Scheduled.code(), 2);
        assert_eq!(RunStatus::Finished.code(), 3);
        assert_eq!(RunStatus::Failed.code(), 4);
        assert_eq!(RunStatus::Killed.code(), 5);
        assert!(RunStatus::try_from(9).is_err());
    }

    #[test]
    fn test_status_serializes_as_integer() {
        let yaml = serde_yaml::to_string(&RunStatus::Finished).unwrap();
        assert_eq!(yaml.trim(), "3");
        let back: RunStatus = serde_yaml::from_str("4").unwrap();
        assert_eq!(back, RunStatus::Failed);
    }

    #[test]
    fn test_metric_line_format() {
        let metric = Metric::new("accuracy", 1.0, 1_700_000_000_000, 0);
        assert_eq!(metric.to_line(), "1700000000000 1.0 0\n");

        let parsed = Metric::parse_line("accuracy", "1700000000000 0.9666666666666667 0").unwrap();
        assert_eq!(parsed.value, 0.9666666666666667);
        assert_eq!(parsed.step, 0);
    }

    #[test]
    fn test_metric_line_without_step() {
        let parsed = Metric::parse_line("loss", "12 0.5").unwrap();
        assert_eq!(parsed.step, 0);
        assert!(Metric::parse_line("loss", "garbage").is_none());
    }
}
