// ─── Version Marker ───
// Persisted record of the last fully installed package version.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_MARKER_FILE: &str = "pack_version.txt";

/// Where the installed version is recorded under the install root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// A text file whose trimmed content is the version string.
    File { name: String },
    /// A directory named after the version inside `parent`; its existence is
    /// the marker.
    VersionDirectory { parent: String },
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        MarkerPolicy::File {
            name: DEFAULT_MARKER_FILE.into(),
        }
    }
}

/// Version marker bound to one install root.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    root: PathBuf,
    policy: MarkerPolicy,
}

impl VersionMarker {
    pub fn new(root: impl Into<PathBuf>, policy: MarkerPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Whether `version` is recorded as installed. Never mutates the tree.
    pub fn is_current(&self, version: &str) -> LauncherResult<bool> {
        match &self.policy {
            MarkerPolicy::File { .. } => {
                Ok(self.read_installed()?.as_deref() == Some(version))
            }
            MarkerPolicy::VersionDirectory { .. } => Ok(self.version_dir(version).is_dir()),
        }
    }

    /// Installed version for the file policy; `None` when no marker exists.
    /// The directory policy cannot name a version without a candidate and
    /// always returns `None`.
    pub fn read_installed(&self) -> LauncherResult<Option<String>> {
        let MarkerPolicy::File { name } = &self.policy else {
            return Ok(None);
        };

        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw.trim().to_string())),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LauncherError::Io { path, source }),
        }
    }

    /// Record `version` as installed. Call only after extraction succeeded.
    pub fn write(&self, version: &str) -> LauncherResult<()> {
        let path = match &self.policy {
            MarkerPolicy::File { name } => {
                let path = self.root.join(name);
                std::fs::write(&path, version).map_err(|source| LauncherError::Io {
                    path: path.clone(),
                    source,
                })?;
                path
            }
            MarkerPolicy::VersionDirectory { .. } => {
                let path = self.version_dir(version);
                std::fs::create_dir_all(&path).map_err(|source| LauncherError::Io {
                    path: path.clone(),
                    source,
                })?;
                path
            }
        };

        debug!("Version marker {:?} set to {}", path, version);
        Ok(())
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        match &self.policy {
            MarkerPolicy::VersionDirectory { parent } => self.root.join(parent).join(version),
            MarkerPolicy::File { .. } => self.root.join(version),
        }
    }
}
