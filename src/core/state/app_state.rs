use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::auth::LaunchAccountProfile;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{LaunchProfile, LaunchResolver, PlaceholderContext};
use crate::core::package::{PackageProfile, PackageSynchronizer};

const INSTALL_DIR_NAME: &str = ".GermFlogLauncher";
const SETTINGS_FILE: &str = "launcher_settings.json";

pub const DEFAULT_MEMORY_MB: u32 = 4096;
pub const MIN_MEMORY_MB: u32 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub username: String,
    pub memory_max_mb: u32,
    pub java_path: Option<PathBuf>,
    /// Additional `${token}` values passed to the argument templates.
    pub extra_placeholders: BTreeMap<String, String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            username: crate::core::auth::DEFAULT_PLAYER_NAME.into(),
            memory_max_mb: DEFAULT_MEMORY_MB,
            java_path: None,
            extra_placeholders: BTreeMap::new(),
        }
    }
}

impl LauncherSettings {
    pub fn validate(&self) -> LauncherResult<()> {
        if self.memory_max_mb < MIN_MEMORY_MB {
            return Err(LauncherError::Settings(format!(
                "memory_max_mb must be at least {} (got {})",
                MIN_MEMORY_MB, self.memory_max_mb
            )));
        }
        if self.username.chars().any(char::is_whitespace) {
            return Err(LauncherError::Settings(format!(
                "username must not contain whitespace: {:?}",
                self.username
            )));
        }
        Ok(())
    }
}

/// Everything one launcher run needs, built once and passed explicitly.
#[derive(Debug, Clone)]
pub struct AppState {
    pub install_root: PathBuf,
    pub settings: LauncherSettings,
    pub package: PackageProfile,
    pub launch: LaunchProfile,
}

impl AppState {
    pub fn new(install_root: impl Into<PathBuf>, settings: LauncherSettings) -> Self {
        Self {
            install_root: install_root.into(),
            settings,
            package: PackageProfile::default(),
            launch: LaunchProfile::default(),
        }
    }

    /// State for `install_root` with settings read from disk.
    pub fn load(install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        let settings = load_settings(&install_root);
        Self::new(install_root, settings)
    }

    pub fn settings_path(&self) -> PathBuf {
        settings_path(&self.install_root)
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        save_settings(&self.install_root, &self.settings)
    }

    pub fn synchronizer(&self) -> PackageSynchronizer {
        PackageSynchronizer::new(&self.install_root, self.package.clone())
    }

    /// Resolver for this root; a configured `java_path` overrides the runtime.
    pub fn launch_resolver(&self) -> LaunchResolver {
        let mut profile = self.launch.clone();
        if let Some(path) = &self.settings.java_path {
            profile.runtime.override_path = Some(path.clone());
        }
        LaunchResolver::new(&self.install_root, profile)
    }

    pub fn account(&self) -> LaunchAccountProfile {
        LaunchAccountProfile::offline(&self.settings.username)
    }

    /// Account tokens plus the user's extra placeholders, which win on
    /// conflicts.
    pub fn placeholder_context(&self) -> PlaceholderContext {
        let mut context: PlaceholderContext = self.account().placeholders().into_iter().collect();
        context.extend(
            self.settings
                .extra_placeholders
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        context
    }

    /// Configured heap size bounded by the host's physical memory.
    pub fn effective_memory_mb(&self) -> u32 {
        clamp_memory_mb(self.settings.memory_max_mb, total_memory_mb())
    }
}

/// `<data dir>/.GermFlogLauncher`, or the working directory when the platform
/// has no data dir.
pub fn default_install_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(INSTALL_DIR_NAME)
}

pub fn settings_path(install_root: &Path) -> PathBuf {
    install_root.join(SETTINGS_FILE)
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings(install_root: &Path) -> LauncherSettings {
    let path = settings_path(install_root);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!("No settings at {:?} ({}), using defaults", path, err);
            return LauncherSettings::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("Ignoring corrupt settings file {:?}: {}", path, err);
            LauncherSettings::default()
        }
    }
}

pub fn save_settings(install_root: &Path, settings: &LauncherSettings) -> LauncherResult<()> {
    std::fs::create_dir_all(install_root).map_err(|e| LauncherError::io(install_root, e))?;
    let path = settings_path(install_root);
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
}

/// Clamp `requested` into `[MIN_MEMORY_MB, total_mb]`. An unknown total only
/// applies the floor.
pub fn clamp_memory_mb(requested: u32, total_mb: Option<u64>) -> u32 {
    let mut value = requested.max(MIN_MEMORY_MB);

    if let Some(total) = total_mb.filter(|t| *t >= u64::from(MIN_MEMORY_MB)) {
        let ceiling = u32::try_from(total).unwrap_or(u32::MAX);
        value = value.min(ceiling);
    }

    if value != requested {
        warn!(
            "Requested heap of {} MB is out of range, using {} MB",
            requested, value
        );
    }
    value
}

fn total_memory_mb() -> Option<u64> {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    match system.total_memory() {
        0 => None,
        bytes => Some(bytes / (1024 * 1024)),
    }
}
