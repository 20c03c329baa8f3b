// ─── Package Synchronizer ───
// Keeps the install root in step with the bundled package archive:
// CHECKING → UP_TO_DATE, or CHECKING → NEEDS_UPDATE → PURGING → EXTRACTING
// → MARKING → DONE. Any failing step ends in FAILED.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::extract::{extract_archive, ExtractStats};
use super::marker::{MarkerPolicy, VersionMarker};
use super::protected::{ProtectedPaths, DEFAULT_PROTECTED_NAMES};

pub const DEFAULT_PACKAGE_VERSION: &str = "1.1.1";
pub const DEFAULT_ARCHIVE_NAME: &str = "minecraft_package.zip";

/// What the synchronizer installs and how it treats the existing tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageProfile {
    /// Opaque version token, compared for equality only.
    pub version: String,
    pub archive_name: String,
    pub marker: MarkerPolicy,
    /// Subtrees removed before extraction because they break across versions.
    pub purge_dirs: Vec<String>,
    pub protected_names: Vec<String>,
}

impl Default for PackageProfile {
    fn default() -> Self {
        Self {
            version: DEFAULT_PACKAGE_VERSION.into(),
            archive_name: DEFAULT_ARCHIVE_NAME.into(),
            marker: MarkerPolicy::default(),
            purge_dirs: vec!["mods".into()],
            protected_names: DEFAULT_PROTECTED_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Checking,
    UpToDate,
    NeedsUpdate,
    Purging,
    Extracting,
    Marking,
    Done,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Checking => "checking",
            SyncPhase::UpToDate => "up to date",
            SyncPhase::NeedsUpdate => "needs update",
            SyncPhase::Purging => "purging",
            SyncPhase::Extracting => "extracting",
            SyncPhase::Marking => "marking",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives phase transitions and throttled progress fractions in `0.0..=1.0`.
///
/// Calls arrive on the synchronizer's worker thread. Implementations that feed
/// a single-threaded consumer must hand the values over to it, as
/// [`ChannelObserver`] does.
pub trait SyncObserver: Send + Sync {
    fn on_phase(&self, _phase: SyncPhase) {}

    fn on_progress(&self, fraction: f64);
}

/// Observer that discards everything.
pub struct NoopObserver;

impl SyncObserver for NoopObserver {
    fn on_progress(&self, _fraction: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Phase(SyncPhase),
    Progress(f64),
}

/// Forwards events into an unbounded channel drained by the consumer on its
/// own execution context.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SyncObserver for ChannelObserver {
    fn on_phase(&self, phase: SyncPhase) {
        let _ = self.tx.send(SyncEvent::Phase(phase));
    }

    fn on_progress(&self, fraction: f64) {
        let _ = self.tx.send(SyncEvent::Progress(fraction));
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    UpToDate {
        version: String,
    },
    Installed {
        version: String,
        archive: PathBuf,
        files_written: usize,
        protected_skipped: usize,
        completed_at: DateTime<Utc>,
    },
}

impl SyncOutcome {
    pub fn version(&self) -> &str {
        match self {
            SyncOutcome::UpToDate { version } | SyncOutcome::Installed { version, .. } => version,
        }
    }
}

/// Owns write access to one install root.
///
/// Overlapping runs against the same root are not guarded; callers must
/// serialize them.
#[derive(Debug, Clone)]
pub struct PackageSynchronizer {
    install_root: PathBuf,
    profile: PackageProfile,
    archive_dirs: Vec<PathBuf>,
}

impl PackageSynchronizer {
    pub fn new(install_root: impl Into<PathBuf>, profile: PackageProfile) -> Self {
        Self {
            install_root: install_root.into(),
            profile,
            archive_dirs: default_archive_dirs(),
        }
    }

    /// Replace the directories searched for the archive, in priority order.
    pub fn with_archive_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.archive_dirs = dirs;
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn profile(&self) -> &PackageProfile {
        &self.profile
    }

    fn marker(&self) -> VersionMarker {
        VersionMarker::new(&self.install_root, self.profile.marker.clone())
    }

    /// First existing `<dir>/<archive_name>` among the configured directories.
    pub fn locate_archive(&self) -> LauncherResult<PathBuf> {
        let searched: Vec<PathBuf> = self
            .archive_dirs
            .iter()
            .map(|dir| dir.join(&self.profile.archive_name))
            .collect();

        match searched.iter().find(|candidate| candidate.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(LauncherError::MissingArchive { searched }),
        }
    }

    /// Run the whole state machine on the calling thread.
    pub fn ensure_installed(&self, observer: &dyn SyncObserver) -> LauncherResult<SyncOutcome> {
        let mut phase = SyncPhase::Checking;
        let result = self.run(observer, &mut phase);

        if let Err(err) = &result {
            error!("Package sync failed while {}: {}", phase, err);
            observer.on_phase(SyncPhase::Failed);
        }

        result
    }

    fn run(&self, observer: &dyn SyncObserver, phase: &mut SyncPhase) -> LauncherResult<SyncOutcome> {
        let version = self.profile.version.clone();
        let mut enter = |next: SyncPhase| {
            *phase = next;
            observer.on_phase(next);
        };

        enter(SyncPhase::Checking);
        let marker = self.marker();
        if marker.is_current(&version)? {
            info!("Package is up to date ({}). Skipping extraction.", version);
            enter(SyncPhase::UpToDate);
            observer.on_progress(1.0);
            return Ok(SyncOutcome::UpToDate { version });
        }

        enter(SyncPhase::NeedsUpdate);
        info!(
            "Package version {} required (installed: {:?}). Updating files...",
            version,
            marker.read_installed().ok().flatten()
        );

        // Resolve the source before touching the tree so a missing archive
        // leaves everything as it was.
        let archive = self.locate_archive()?;
        debug!("Using package archive {:?}", archive);

        enter(SyncPhase::Purging);
        for dir in &self.profile.purge_dirs {
            purge_subtree(&self.install_root, dir)?;
        }

        enter(SyncPhase::Extracting);
        let policy = ProtectedPaths::new(self.profile.protected_names.iter().cloned());
        let stats: ExtractStats = extract_archive(&archive, &self.install_root, &policy, &mut |f| {
            observer.on_progress(f)
        })?;

        enter(SyncPhase::Marking);
        marker.write(&version)?;

        enter(SyncPhase::Done);
        info!(
            "Update to package version {} complete ({} files, {} protected kept)",
            version, stats.files_written, stats.protected_skipped
        );

        Ok(SyncOutcome::Installed {
            version,
            archive,
            files_written: stats.files_written,
            protected_skipped: stats.protected_skipped,
            completed_at: Utc::now(),
        })
    }

    /// Run the state machine on the blocking pool.
    pub async fn ensure_installed_async(
        &self,
        observer: Arc<dyn SyncObserver>,
    ) -> LauncherResult<SyncOutcome> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.ensure_installed(observer.as_ref())).await?
    }

    /// Start a run in the background. `on_complete` is invoked exactly once
    /// with the final result.
    pub fn spawn_ensure_installed<F>(
        &self,
        observer: Arc<dyn SyncObserver>,
        on_complete: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(LauncherResult<SyncOutcome>) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let result = this.ensure_installed_async(observer).await;
            on_complete(result);
        })
    }
}

/// Beside the running executable first, then the working directory.
pub fn default_archive_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }
    dirs
}

fn purge_subtree(root: &Path, relative: &str) -> LauncherResult<()> {
    let rel = Path::new(relative);
    if rel.as_os_str().is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        warn!("Ignoring unsafe purge target {:?}", relative);
        return Ok(());
    }

    let target = root.join(rel);
    match std::fs::remove_dir_all(&target) {
        Ok(()) => {
            info!("Removed stale {:?}", target);
            Ok(())
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LauncherError::io(target, source)),
    }
}
