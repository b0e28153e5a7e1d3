//! Shared persistence utilities: atomic file writes, YAML/JSON load and save.
//!
//! Store metadata is rewritten in place on every status change, so all
//! metadata writes go through a `.tmp` sibling and a rename.

use std::io;
use std::path::Path;

/// Atomically write JSON data to a file.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write YAML data to a file.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(io::Error::other)?;
    atomic_write(path, yaml.as_bytes())
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames it over the target path.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load and deserialize YAML from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_yaml::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

// `with_extension` would clobber names like `model.json` -> `model.tmp`,
// colliding with a sibling `model.yaml`. Append instead.
fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct RunStub {
        name: String,
        status: u8,
    }

    #[test]
    fn test_atomic_write_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.yaml");

        let data = RunStub {
            name: "bold-cat-101".into(),
            status: 3,
        };

        atomic_write_yaml(&path, &data).unwrap();
        let loaded: Option<RunStub> = load_yaml(&path).unwrap();
        assert_eq!(loaded, Some(data));
        assert!(!dir.path().join("meta.yaml.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0").join("abc").join("meta.yaml");
        atomic_write(&path, b"status: 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "status: 1\n");
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<RunStub> = load_json(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_invalid_yaml_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.yaml");
        std::fs::write(&path, "name: [unterminated").unwrap();
        let err = load_yaml::<RunStub>(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
