// ─── Launch Task ───
// Turns the base + overlay manifests into one process invocation and starts it.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{resolve_runtime, RuntimeConfig, RuntimeSelection};
use crate::core::version::{DependencyManifest, Platform};

use super::arguments::{expand, PlaceholderContext};
use super::classpath::{build_classpath, get_classpath_separator, safe_path_str};

pub const DEFAULT_BASE_ID: &str = "1.20.1";
pub const DEFAULT_OVERLAY_ID: &str = "1.20.1-forge-47.4.10";

const LAUNCHER_NAME: &str = "packlaunch";

/// Which manifests to merge and which runtime to run them with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchProfile {
    pub base_id: String,
    pub overlay_id: String,
    pub runtime: RuntimeConfig,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self {
            base_id: DEFAULT_BASE_ID.into(),
            overlay_id: DEFAULT_OVERLAY_ID.into(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Both layers, parsed, with the files they came from.
#[derive(Debug, Clone)]
pub struct ManifestPair {
    pub base: DependencyManifest,
    pub base_path: PathBuf,
    pub overlay: DependencyManifest,
    pub overlay_path: PathBuf,
}

/// A fully resolved invocation. Built once, never edited.
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    session_id: Uuid,
    runtime: RuntimeSelection,
    jvm_args: Vec<String>,
    main_class: String,
    game_args: Vec<String>,
    working_dir: PathBuf,
}

impl LaunchCommand {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn runtime(&self) -> &RuntimeSelection {
        &self.runtime
    }

    pub fn program(&self) -> PathBuf {
        self.runtime.program()
    }

    pub fn jvm_args(&self) -> &[String] {
        &self.jvm_args
    }

    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    pub fn game_args(&self) -> &[String] {
        &self.game_args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Full argument vector after the program: JVM side, entry point, game side.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.jvm_args.len() + 1 + self.game_args.len());
        args.extend(self.jvm_args.iter().cloned());
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }

    /// Process builder with the install root as working directory and the
    /// parent's standard streams.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(self.program());
        cmd.args(self.args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Copy/paste form for logs and `--dry-run`.
    pub fn format_for_logs(&self) -> String {
        let program = shell_escape(&self.program().to_string_lossy());
        let args = self
            .args()
            .iter()
            .map(|arg| shell_escape(arg))
            .collect::<Vec<_>>()
            .join(" ");

        if args.is_empty() {
            program
        } else {
            format!("{} {}", program, args)
        }
    }
}

/// Seam between command resolution and the OS. Returns the child pid.
pub trait ProcessSpawner {
    fn spawn(&self, command: &LaunchCommand) -> LauncherResult<u32>;
}

/// Starts the child and returns at once; the child is not awaited.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, command: &LaunchCommand) -> LauncherResult<u32> {
        let child = command
            .to_command()
            .spawn()
            .map_err(|source| LauncherError::Spawn {
                program: command.program().to_string_lossy().into_owned(),
                source,
            })?;
        Ok(child.id())
    }
}

/// Builds launch commands for one install root.
#[derive(Debug, Clone)]
pub struct LaunchResolver {
    install_root: PathBuf,
    profile: LaunchProfile,
    platform: Platform,
}

impl LaunchResolver {
    pub fn new(install_root: impl Into<PathBuf>, profile: LaunchProfile) -> Self {
        Self {
            install_root: install_root.into(),
            profile,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn profile(&self) -> &LaunchProfile {
        &self.profile
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.install_root.join("libraries")
    }

    /// Base first, so a tree missing everything reports the base manifest.
    pub fn load_manifests(&self) -> LauncherResult<ManifestPair> {
        let base_path = DependencyManifest::path_for(&self.install_root, &self.profile.base_id);
        let base = DependencyManifest::load(&base_path)?;

        let overlay_path =
            DependencyManifest::path_for(&self.install_root, &self.profile.overlay_id);
        let overlay = DependencyManifest::load(&overlay_path)?;

        if !overlay.is_compatible_parent(&self.profile.base_id) {
            warn!(
                "Overlay {:?} inherits from {:?}, not the configured base {}",
                overlay_path, overlay.inherits_from, self.profile.base_id
            );
        }

        debug!(
            "Loaded manifests {:?} ({} libraries) and {:?} ({} libraries)",
            base_path,
            base.libraries.len(),
            overlay_path,
            overlay.libraries.len()
        );

        Ok(ManifestPair {
            base,
            base_path,
            overlay,
            overlay_path,
        })
    }

    /// Assemble the invocation from already loaded manifests.
    ///
    /// Values in `context` win over the defaults derived here from the install
    /// layout and the manifests.
    pub fn build_command(
        &self,
        manifests: &ManifestPair,
        memory_mb: u32,
        context: &PlaceholderContext,
    ) -> LauncherResult<LaunchCommand> {
        let main_class = manifests
            .overlay
            .main_class
            .as_deref()
            .map(str::trim)
            .filter(|class| !class.is_empty())
            .ok_or_else(|| LauncherError::MissingEntryPoint {
                path: manifests.overlay_path.clone(),
            })?
            .to_string();

        let runtime = resolve_runtime(&self.install_root, &self.profile.runtime);
        let libraries_dir = self.libraries_dir();
        let classpath = build_classpath(
            &manifests.overlay,
            &manifests.base,
            &libraries_dir,
            self.platform,
        );
        let classpath = classpath.to_classpath_string();

        let mut context = context.clone();
        self.fill_layout_defaults(&mut context, manifests, &classpath);

        let mut jvm_args = Vec::new();
        jvm_args.push(format!("-Xmx{}M", memory_mb));
        jvm_args.push(format!(
            "-Djava.library.path={}",
            safe_path_str(&libraries_dir)
        ));
        jvm_args.extend(strip_classpath_flags(expand(
            manifests.overlay.jvm_templates(),
            &context,
        )));
        jvm_args.push("-cp".into());
        jvm_args.push(classpath);

        let mut game_args = expand(&manifests.base.game_templates(), &context);
        game_args.extend(expand(&manifests.overlay.game_templates(), &context));

        Ok(LaunchCommand {
            session_id: Uuid::new_v4(),
            runtime,
            jvm_args,
            main_class,
            game_args,
            working_dir: self.install_root.clone(),
        })
    }

    /// Load both manifests and build the command.
    pub fn resolve(
        &self,
        memory_mb: u32,
        context: &PlaceholderContext,
    ) -> LauncherResult<LaunchCommand> {
        let manifests = self.load_manifests()?;
        self.build_command(&manifests, memory_mb, context)
    }

    fn fill_layout_defaults(
        &self,
        context: &mut PlaceholderContext,
        manifests: &ManifestPair,
        classpath: &str,
    ) {
        let root = safe_path_str(&self.install_root);
        let libraries = safe_path_str(&self.libraries_dir());

        context.insert_if_absent("library_directory", libraries.clone());
        context.insert_if_absent("natives_directory", libraries);
        context.insert_if_absent("classpath_separator", get_classpath_separator());
        context.insert_if_absent("classpath", classpath);
        context.insert_if_absent("version_name", self.profile.overlay_id.clone());
        context.insert_if_absent("game_directory", root);
        context.insert_if_absent(
            "assets_root",
            safe_path_str(&self.install_root.join("assets")),
        );
        if let Some(index) = manifests.base.asset_index_id() {
            context.insert_if_absent("assets_index_name", index);
        }
        context.insert_if_absent("version_type", "release");
        context.insert_if_absent("launcher_name", LAUNCHER_NAME);
        context.insert_if_absent("launcher_version", env!("CARGO_PKG_VERSION"));
    }
}

/// Resolve and start the game. Nothing is spawned when resolution fails.
pub fn launch(
    resolver: &LaunchResolver,
    memory_mb: u32,
    context: &PlaceholderContext,
    spawner: &dyn ProcessSpawner,
) -> LauncherResult<(LaunchCommand, u32)> {
    let command = resolver.resolve(memory_mb, context)?;

    info!(
        "[{}] Launching {} with {}",
        command.session_id(),
        command.main_class(),
        command.runtime()
    );
    debug!(
        "[{}] Command (copy/paste): {}",
        command.session_id(),
        command.format_for_logs()
    );

    let pid = spawner.spawn(&command)?;
    info!("[{}] Game process started (pid {})", command.session_id(), pid);
    Ok((command, pid))
}

// The classpath is always injected explicitly, so template-provided switches
// are dropped together with their value.
fn strip_classpath_flags(args: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if matches!(arg.as_str(), "-cp" | "-classpath" | "--class-path") {
            iter.next();
            continue;
        }
        kept.push(arg);
    }
    kept
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSpawner {
        calls: Cell<usize>,
    }

    impl CountingSpawner {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }
    }

    impl ProcessSpawner for CountingSpawner {
        fn spawn(&self, _command: &LaunchCommand) -> LauncherResult<u32> {
            self.calls.set(self.calls.get() + 1);
            Ok(4242)
        }
    }

    fn temp_root(label: &str) -> PathBuf {
        let temp =
            std::env::temp_dir().join(format!("launch-test-{}-{}", label, std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        std::fs::create_dir_all(&temp).unwrap();
        temp
    }

    fn write_manifest(root: &Path, id: &str, body: serde_json::Value) {
        let path = DependencyManifest::path_for(root, id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_vec(&body).unwrap()).unwrap();
    }

    fn write_pair(root: &Path) {
        write_manifest(
            root,
            DEFAULT_BASE_ID,
            serde_json::json!({
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "5"},
                "libraries": [{"name": "com.mojang:brigadier:1.1.8"}],
                "arguments": {
                    "game": ["--user", "${auth_player_name}", "--assetIndex", "${assets_index_name}"],
                    "jvm": ["-Dbase.only=true"]
                }
            }),
        );
        write_manifest(
            root,
            DEFAULT_OVERLAY_ID,
            serde_json::json!({
                "id": "1.20.1-forge-47.4.10",
                "inheritsFrom": "1.20.1",
                "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
                "libraries": [{"name": "net.minecraftforge:fmlloader:1.20.1-47.4.10"}],
                "arguments": {
                    "game": ["--launchTarget", "forgeclient", "--version", "${version_name}"],
                    "jvm": [
                        "-DlibraryDirectory=${library_directory}",
                        "-cp", "${classpath}",
                        "-DignoreList=${unknown_token}"
                    ]
                }
            }),
        );
    }

    fn steve() -> PlaceholderContext {
        PlaceholderContext::new().with("auth_player_name", "Steve")
    }

    #[test]
    fn builds_ordered_command_from_both_layers() {
        let root = temp_root("ordered");
        write_pair(&root);

        let resolver = LaunchResolver::new(&root, LaunchProfile::default());
        let command = resolver.resolve(2048, &steve()).unwrap();
        let libraries = safe_path_str(&root.join("libraries"));

        assert_eq!(command.main_class(), "cpw.mods.bootstraplauncher.BootstrapLauncher");
        assert_eq!(command.working_dir(), root.as_path());

        let jvm = command.jvm_args();
        assert_eq!(jvm[0], "-Xmx2048M");
        assert_eq!(jvm[1], format!("-Djava.library.path={}", libraries));
        assert_eq!(jvm[2], format!("-DlibraryDirectory={}", libraries));
        assert_eq!(jvm[3], "-DignoreList=${unknown_token}");
        assert_eq!(jvm[4], "-cp");
        assert_eq!(jvm.len(), 6);
        assert!(!jvm.iter().any(|a| a == "-Dbase.only=true"));

        let cp = &jvm[5];
        let forge = cp.find("fmlloader").unwrap();
        let brigadier = cp.find("brigadier").unwrap();
        assert!(forge < brigadier);

        assert_eq!(
            command.game_args(),
            &[
                "--user",
                "Steve",
                "--assetIndex",
                "5",
                "--launchTarget",
                "forgeclient",
                "--version",
                "1.20.1-forge-47.4.10",
            ]
        );

        let args = command.args();
        assert_eq!(args[6], "cpw.mods.bootstraplauncher.BootstrapLauncher");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn caller_context_overrides_layout_defaults() {
        let root = temp_root("override");
        write_pair(&root);

        let resolver = LaunchResolver::new(&root, LaunchProfile::default());
        let context = steve().with("version_name", "custom-pack");
        let command = resolver.resolve(1024, &context).unwrap();

        assert_eq!(command.game_args().last().map(String::as_str), Some("custom-pack"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_manifests_spawn_nothing() {
        let root = temp_root("missing");
        let resolver = LaunchResolver::new(&root, LaunchProfile::default());
        let spawner = CountingSpawner::new();

        let result = launch(&resolver, 1024, &steve(), &spawner);

        assert!(matches!(
            result,
            Err(LauncherError::MissingManifest { ref path })
                if *path == DependencyManifest::path_for(&root, DEFAULT_BASE_ID)
        ));
        assert_eq!(spawner.calls.get(), 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn overlay_without_main_class_is_rejected() {
        let root = temp_root("no-main");
        write_pair(&root);
        write_manifest(
            &root,
            DEFAULT_OVERLAY_ID,
            serde_json::json!({"id": "1.20.1-forge-47.4.10"}),
        );

        let resolver = LaunchResolver::new(&root, LaunchProfile::default());
        let spawner = CountingSpawner::new();
        let result = launch(&resolver, 1024, &steve(), &spawner);

        assert!(matches!(result, Err(LauncherError::MissingEntryPoint { .. })));
        assert_eq!(spawner.calls.get(), 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn successful_launch_spawns_once_with_external_runtime_fallback() {
        let root = temp_root("spawn");
        write_pair(&root);

        let resolver = LaunchResolver::new(&root, LaunchProfile::default());
        let spawner = CountingSpawner::new();
        let (command, pid) = launch(&resolver, 1024, &steve(), &spawner).unwrap();

        assert_eq!(pid, 4242);
        assert_eq!(spawner.calls.get(), 1);
        assert_eq!(command.runtime(), &RuntimeSelection::External("java".into()));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn classpath_flags_are_removed_with_their_value() {
        let args = vec![
            "-Da=1".to_string(),
            "-classpath".to_string(),
            "x.jar".to_string(),
            "-Db=2".to_string(),
        ];
        assert_eq!(strip_classpath_flags(args), vec!["-Da=1", "-Db=2"]);
    }

    #[test]
    fn log_form_quotes_only_when_needed() {
        assert_eq!(shell_escape("-Xmx2048M"), "-Xmx2048M");
        assert_eq!(shell_escape("C:/Program Files/java"), "\"C:/Program Files/java\"");
        assert_eq!(shell_escape(""), "\"\"");
    }
}
