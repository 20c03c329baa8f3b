use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::LauncherResult;
use crate::core::launch::{self, ProcessSpawner};
use crate::core::package::{ChannelObserver, SyncEvent, SyncOutcome, SyncPhase};
use crate::core::state::{AppState, LauncherSettings};

#[derive(Debug, Serialize)]
pub struct LaunchReport {
    pub session_id: Uuid,
    pub runtime: String,
    pub main_class: String,
    pub memory_mb: u32,
    pub command_line: String,
    /// `None` for dry runs.
    pub pid: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LauncherSettingsPayload {
    pub install_root: String,
    pub settings_file: String,
    pub settings: LauncherSettings,
    pub effective_memory_mb: u32,
    pub package_version: String,
}

impl LauncherSettingsPayload {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            install_root: state.install_root.to_string_lossy().to_string(),
            settings_file: state.settings_path().to_string_lossy().to_string(),
            settings: state.settings.clone(),
            effective_memory_mb: state.effective_memory_mb(),
            package_version: state.package.version.clone(),
        }
    }
}

/// Partial settings change; `None` fields are left alone.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdate {
    pub username: Option<String>,
    pub memory_max_mb: Option<u32>,
    pub java_path: Option<PathBuf>,
    pub clear_java_path: bool,
    pub placeholders: Vec<(String, String)>,
}

/// Bring the install root to the required package version, printing
/// progress on stderr while the work runs on the blocking pool.
pub async fn sync_package(state: &AppState) -> LauncherResult<SyncOutcome> {
    let (observer, mut events) = ChannelObserver::new();
    let synchronizer = state.synchronizer();
    let run = synchronizer.ensure_installed_async(Arc::new(observer));

    // The channel closes once the observer is dropped at the end of the run.
    let drain = async move {
        let mut progress = ProgressLine::default();
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::Phase(phase) => {
                    progress.finish();
                    info!("Sync phase: {}", phase);
                    if phase == SyncPhase::Failed {
                        warn!("Package sync reported failure");
                    }
                }
                SyncEvent::Progress(fraction) => progress.draw(fraction),
            }
        }
        progress.finish();
    };

    let (result, ()) = tokio::join!(run, drain);
    let outcome = result.inspect_err(|err| {
        if err.is_partial_install() {
            warn!(
                "Install root {:?} may be half-written; run sync again once the archive is fixed",
                state.install_root
            );
        }
    })?;

    match &outcome {
        SyncOutcome::UpToDate { version } => println!("Package {} already installed", version),
        SyncOutcome::Installed {
            version,
            files_written,
            protected_skipped,
            ..
        } => println!(
            "Installed package {} ({} files written, {} protected files kept)",
            version, files_written, protected_skipped
        ),
    }
    Ok(outcome)
}

/// Resolve the launch command and, unless `dry_run`, start the game.
pub async fn launch_game<S>(
    state: &AppState,
    dry_run: bool,
    spawner: S,
) -> LauncherResult<LaunchReport>
where
    S: ProcessSpawner + Send + 'static,
{
    let resolver = state.launch_resolver();
    let context = state.placeholder_context();
    let memory_mb = state.effective_memory_mb();

    let report = tokio::task::spawn_blocking(move || -> LauncherResult<LaunchReport> {
        if dry_run {
            let command = resolver.resolve(memory_mb, &context)?;
            return Ok(report_for(&command, memory_mb, None));
        }

        let (command, pid) = launch::launch(&resolver, memory_mb, &context, &spawner)?;
        Ok(report_for(&command, memory_mb, Some(pid)))
    })
    .await??;

    if dry_run {
        println!("{}", report.command_line);
    } else if let Some(pid) = report.pid {
        println!(
            "Started {} (pid {}, session {})",
            report.main_class, pid, report.session_id
        );
    }
    Ok(report)
}

/// Sync, then launch. A failed sync never reaches the launch step.
pub async fn play<S>(state: &AppState, dry_run: bool, spawner: S) -> LauncherResult<LaunchReport>
where
    S: ProcessSpawner + Send + 'static,
{
    sync_package(state).await?;
    launch_game(state, dry_run, spawner).await
}

pub fn get_launcher_settings(state: &AppState) -> LauncherSettingsPayload {
    LauncherSettingsPayload::from_state(state)
}

/// Apply `update`, validate, and persist. Nothing is written when validation
/// fails.
pub fn update_launcher_settings(
    state: &mut AppState,
    update: SettingsUpdate,
) -> LauncherResult<LauncherSettingsPayload> {
    let mut settings = state.settings.clone();

    if let Some(username) = update.username {
        settings.username = username.trim().to_string();
    }
    if let Some(memory) = update.memory_max_mb {
        settings.memory_max_mb = memory;
    }
    if update.clear_java_path {
        settings.java_path = None;
    }
    if let Some(path) = update.java_path {
        settings.java_path = Some(path);
    }
    for (token, value) in update.placeholders {
        settings.extra_placeholders.insert(token, value);
    }

    settings.validate()?;
    state.settings = settings;
    state.save_settings()?;
    info!("Settings saved to {:?}", state.settings_path());

    Ok(LauncherSettingsPayload::from_state(state))
}

fn report_for(command: &launch::LaunchCommand, memory_mb: u32, pid: Option<u32>) -> LaunchReport {
    LaunchReport {
        session_id: command.session_id(),
        runtime: command.runtime().to_string(),
        main_class: command.main_class().to_string(),
        memory_mb,
        command_line: command.format_for_logs(),
        pid,
    }
}

// Single-line progress bar on stderr.
#[derive(Default)]
struct ProgressLine {
    active: bool,
}

impl ProgressLine {
    const WIDTH: usize = 30;

    fn draw(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let filled = (fraction * Self::WIDTH as f64).round() as usize;
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r[{}{}] {:>3.0}%",
            "#".repeat(filled),
            " ".repeat(Self::WIDTH - filled),
            fraction * 100.0
        );
        let _ = stderr.flush();
        self.active = true;
    }

    fn finish(&mut self) {
        if self.active {
            eprintln!();
            self.active = false;
        }
    }
}
