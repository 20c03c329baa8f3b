// ─── Dependency Manifest ───
// One layer's version JSON: libraries, argument templates and entry point.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

use super::rules::{self, Platform, Rule};

/// A parsed version JSON for either the base or the overlay layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyManifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13), space separated.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentTemplate>,
    #[serde(default)]
    pub jvm: Vec<ArgumentTemplate>,
}

/// One entry of an argument list. Structured entries carry their own rules
/// and are kept only so that parsing never fails on them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgumentTemplate {
    Literal(String),
    Conditional(serde_json::Value),
}

impl From<&str> for ArgumentTemplate {
    fn from(value: &str) -> Self {
        ArgumentTemplate::Literal(value.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibraryArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryArtifact {
    #[serde(default)]
    pub path: Option<String>,
}

impl LibraryEntry {
    pub fn is_allowed_for(&self, platform: Platform) -> bool {
        rules::evaluate(self.rules.as_deref(), platform)
    }

    /// Location relative to the libraries directory: the explicit artifact
    /// path when present, otherwise the layout derived from `name`.
    pub fn relative_path(&self) -> Option<PathBuf> {
        let explicit = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty());

        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        let name = self.name.as_deref()?;
        match MavenArtifact::parse(name) {
            Ok(artifact) => Some(artifact.local_path()),
            Err(err) => {
                debug!("Library without usable path: {}", err);
                None
            }
        }
    }
}

impl DependencyManifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(LauncherError::MissingManifest {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(LauncherError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| LauncherError::UnparsableManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Conventional location: `<root>/versions/<id>/<id>.json`.
    pub fn path_for(install_root: &Path, id: &str) -> PathBuf {
        install_root
            .join("versions")
            .join(id)
            .join(format!("{}.json", id))
    }

    pub fn jvm_templates(&self) -> &[ArgumentTemplate] {
        self.arguments
            .as_ref()
            .map(|args| args.jvm.as_slice())
            .unwrap_or_default()
    }

    /// Application-side templates, falling back to the legacy single string.
    pub fn game_templates(&self) -> Vec<ArgumentTemplate> {
        match &self.arguments {
            Some(args) => args.game.clone(),
            None => self
                .minecraft_arguments
                .as_deref()
                .map(|s| s.split_whitespace().map(ArgumentTemplate::from).collect())
                .unwrap_or_default(),
        }
    }

    /// Whether `base_id` can serve as this manifest's parent layer. A
    /// manifest without `inheritsFrom` accepts any base.
    pub fn is_compatible_parent(&self, base_id: &str) -> bool {
        self.inherits_from
            .as_deref()
            .map_or(true, |parent| parent == base_id)
    }

    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index.as_ref().map(|info| info.id.as_str())
    }
}
