// ─── Runtime Lookup ───
// Bundled JDK inside the install root, external `java` as fallback.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BUNDLED_JDK: &str = "jdk-21.0.8";
pub const DEFAULT_EXTERNAL_RUNTIME: &str = "java";

/// Where to look for the Java runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Binary location relative to the install root.
    pub bundled_relative: PathBuf,
    /// Name handed to the OS when the bundled binary is missing.
    pub external_name: String,
    /// Explicit binary chosen by the user. Wins over everything else when it
    /// exists.
    pub override_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bundled_relative: PathBuf::from("runtime")
                .join(DEFAULT_BUNDLED_JDK)
                .join("bin")
                .join(java_exe()),
            external_name: DEFAULT_EXTERNAL_RUNTIME.to_string(),
            override_path: None,
        }
    }
}

/// Outcome of runtime lookup. `External` is a name, not a verified path: it
/// may still fail at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSelection {
    Override(PathBuf),
    Bundled(PathBuf),
    External(String),
}

impl RuntimeSelection {
    pub fn program(&self) -> PathBuf {
        match self {
            RuntimeSelection::Override(path) | RuntimeSelection::Bundled(path) => path.clone(),
            RuntimeSelection::External(name) => PathBuf::from(name),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RuntimeSelection::External(_))
    }
}

impl fmt::Display for RuntimeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeSelection::Override(path) => write!(f, "override {}", path.display()),
            RuntimeSelection::Bundled(path) => write!(f, "bundled {}", path.display()),
            RuntimeSelection::External(name) => write!(f, "external `{}`", name),
        }
    }
}

/// Pick the runtime binary for `install_root`. Never fails: a missing bundled
/// runtime degrades to the external name with a warning.
pub fn resolve_runtime(install_root: &Path, config: &RuntimeConfig) -> RuntimeSelection {
    if let Some(path) = &config.override_path {
        if path.is_file() {
            return RuntimeSelection::Override(path.clone());
        }
        warn!("Configured java_path {:?} does not exist, ignoring it", path);
    }

    let bundled = install_root.join(&config.bundled_relative);
    if bundled.is_file() {
        debug!("Using bundled runtime {:?}", bundled);
        return RuntimeSelection::Bundled(bundled);
    }

    // macOS JDK archives nest the tree under Contents/Home.
    if let Some(mac) = mac_bundle_layout(&bundled) {
        if mac.is_file() {
            debug!("Using bundled runtime (macOS layout) {:?}", mac);
            return RuntimeSelection::Bundled(mac);
        }
    }

    warn!(
        "Bundled runtime not found at {:?}, falling back to `{}` from PATH",
        bundled, config.external_name
    );
    RuntimeSelection::External(config.external_name.clone())
}

fn mac_bundle_layout(bundled: &Path) -> Option<PathBuf> {
    let bin_dir = bundled.parent()?;
    let jdk_root = bin_dir.parent()?;
    let exe = bundled.file_name()?;
    Some(
        jdk_root
            .join("Contents")
            .join("Home")
            .join("bin")
            .join(exe),
    )
}

pub fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        let temp =
            std::env::temp_dir().join(format!("runtime-test-{}-{}", label, std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        std::fs::create_dir_all(&temp).unwrap();
        temp
    }

    #[test]
    fn missing_bundled_runtime_falls_back_to_external_name() {
        let root = temp_root("fallback");
        let selection = resolve_runtime(&root, &RuntimeConfig::default());

        assert_eq!(selection, RuntimeSelection::External("java".into()));
        assert!(selection.is_fallback());
        assert_eq!(selection.program(), PathBuf::from("java"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn bundled_runtime_is_preferred() {
        let root = temp_root("bundled");
        let config = RuntimeConfig::default();
        let binary = root.join(&config.bundled_relative);
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, b"").unwrap();

        assert_eq!(
            resolve_runtime(&root, &config),
            RuntimeSelection::Bundled(binary)
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn mac_layout_is_detected() {
        let root = temp_root("mac");
        let config = RuntimeConfig::default();
        let binary = root
            .join("runtime")
            .join(DEFAULT_BUNDLED_JDK)
            .join("Contents/Home/bin")
            .join(java_exe());
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, b"").unwrap();

        assert_eq!(
            resolve_runtime(&root, &config),
            RuntimeSelection::Bundled(binary)
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn existing_override_wins_and_missing_one_is_ignored() {
        let root = temp_root("override");
        let custom = root.join("custom-java");
        std::fs::write(&custom, b"").unwrap();

        let config = RuntimeConfig {
            override_path: Some(custom.clone()),
            ..RuntimeConfig::default()
        };
        assert_eq!(
            resolve_runtime(&root, &config),
            RuntimeSelection::Override(custom)
        );

        let config = RuntimeConfig {
            override_path: Some(root.join("nope")),
            ..RuntimeConfig::default()
        };
        assert!(resolve_runtime(&root, &config).is_fallback());

        let _ = std::fs::remove_dir_all(&root);
    }
}
