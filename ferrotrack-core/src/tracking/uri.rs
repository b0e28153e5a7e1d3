//! Tracking URI parsing. Only local file stores are supported.

use crate::error::{TrackingError, TrackingResult};
use std::path::{Path, PathBuf};

/// A parsed `file:` tracking location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUri {
    path: PathBuf,
}

impl TrackingUri {
    /// Accepts `file:<path>`, `file://<absolute path>` or a bare path.
    pub fn parse(uri: &str) -> TrackingResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(TrackingError::UnsupportedUri("empty tracking URI".into()));
        }

        if let Some(rest) = uri.strip_prefix("file://") {
            if !rest.starts_with('/') {
                return Err(TrackingError::UnsupportedUri(format!(
                    "{uri} (file:// URIs need an absolute path)"
                )));
            }
            return Ok(Self {
                path: PathBuf::from(rest),
            });
        }

        if let Some(rest) = uri.strip_prefix("file:") {
            if rest.trim().is_empty() {
                return Err(TrackingError::UnsupportedUri(format!(
                    "{uri} (file: URI has no path)"
                )));
            }
            return Ok(Self {
                path: PathBuf::from(rest),
            });
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(TrackingError::UnsupportedUri(format!(
                "{uri} (scheme '{scheme}' is not a local file store)"
            )));
        }

        Ok(Self {
            path: PathBuf::from(uri),
        })
    }

    /// The path as written in the URI.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a relative store path against `base` (the workspace).
    pub fn resolve(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }
}

/// Render an absolute path as a `file://` URI.
pub fn path_to_uri(path: &Path) -> String {
    let display = path.display().to_string().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{display}")
    } else {
        format!("file:///{display}")
    }
}
