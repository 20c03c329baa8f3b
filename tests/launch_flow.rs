use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;

use packlaunch_lib::core::launch::{
    launch, LaunchCommand, LaunchProfile, LaunchResolver, PlaceholderContext, ProcessSpawner,
};
use packlaunch_lib::core::package::{
    NoopObserver, PackageProfile, PackageSynchronizer, SyncOutcome,
};
use packlaunch_lib::core::version::Platform;
use packlaunch_lib::{LauncherError, LauncherResult};
use zip::write::SimpleFileOptions;

#[derive(Default)]
struct RecordingSpawner {
    spawned: RefCell<Vec<Vec<String>>>,
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, command: &LaunchCommand) -> LauncherResult<u32> {
        self.spawned.borrow_mut().push(command.args());
        Ok(1)
    }
}

struct Workspace {
    temp: PathBuf,
}

impl Workspace {
    fn new(label: &str) -> Self {
        let temp =
            std::env::temp_dir().join(format!("launch-flow-{}-{}", label, std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        std::fs::create_dir_all(temp.join("dist")).unwrap();
        Self { temp }
    }

    fn root(&self) -> PathBuf {
        self.temp.join("install")
    }

    fn dist(&self) -> PathBuf {
        self.temp.join("dist")
    }

    fn synchronizer(&self, version: &str) -> PackageSynchronizer {
        let profile = PackageProfile {
            version: version.into(),
            ..PackageProfile::default()
        };
        PackageSynchronizer::new(self.root(), profile).with_archive_dirs(vec![self.dist()])
    }

    fn write_archive(&self, files: &[(&str, Vec<u8>)]) {
        let path = self.dist().join(PackageProfile::default().archive_name);
        let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.temp);
    }
}

fn package_files(options: &str) -> Vec<(&'static str, Vec<u8>)> {
    let base = serde_json::json!({
        "id": "1.20.1",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": {"id": "5"},
        "libraries": [
            {"name": "org.ow2.asm:asm:9.7"},
            {"name": "com.mojang:brigadier:1.1.8"}
        ],
        "arguments": {"game": ["--user", "${auth_player_name}"]}
    });
    let overlay = serde_json::json!({
        "id": "1.20.1-forge-47.4.10",
        "inheritsFrom": "1.20.1",
        "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
        "libraries": [
            {"name": "org.ow2.asm:asm:9.7"},
            {"name": "net.minecraftforge:fmlloader:1.20.1-47.4.10"}
        ],
        "arguments": {
            "game": ["--launchTarget", "forgeclient"],
            "jvm": ["-DlibraryDirectory=${library_directory}"]
        }
    });

    vec![
        (
            "versions/1.20.1/1.20.1.json",
            serde_json::to_vec(&base).unwrap(),
        ),
        (
            "versions/1.20.1-forge-47.4.10/1.20.1-forge-47.4.10.json",
            serde_json::to_vec(&overlay).unwrap(),
        ),
        ("mods/pack-core.jar", b"jar".to_vec()),
        ("options.txt", options.as_bytes().to_vec()),
    ]
}

fn steve() -> PlaceholderContext {
    PlaceholderContext::new().with("auth_player_name", "Steve")
}

#[test]
fn sync_then_launch_resolves_player_name_and_merged_classpath() {
    let ws = Workspace::new("full");
    ws.write_archive(&package_files("fov:70"));

    let outcome = ws.synchronizer("1.1.1").ensure_installed(&NoopObserver).unwrap();
    assert!(matches!(outcome, SyncOutcome::Installed { .. }));

    let resolver =
        LaunchResolver::new(ws.root(), LaunchProfile::default()).with_platform(Platform::Linux);
    let spawner = RecordingSpawner::default();
    let (command, _) = launch(&resolver, 3072, &steve(), &spawner).unwrap();

    let spawned = spawner.spawned.borrow();
    assert_eq!(spawned.len(), 1);
    let args = &spawned[0];

    let user = args.iter().position(|a| a == "--user").unwrap();
    assert_eq!(args[user + 1], "Steve");
    assert!(user < args.iter().position(|a| a == "--launchTarget").unwrap());
    assert_eq!(args[0], "-Xmx3072M");
    assert_eq!(command.working_dir(), ws.root().as_path());

    let cp_flag = args.iter().position(|a| a == "-cp").unwrap();
    let classpath = &args[cp_flag + 1];
    assert_eq!(classpath.matches("asm-9.7.jar").count(), 1);
    let asm = classpath.find("asm-9.7.jar").unwrap();
    let fml = classpath.find("fmlloader").unwrap();
    let brigadier = classpath.find("brigadier").unwrap();
    assert!(asm < fml && fml < brigadier);
}

#[test]
fn update_keeps_protected_files_and_reinstalls_once() {
    let ws = Workspace::new("update");
    ws.write_archive(&package_files("fov:70"));
    ws.synchronizer("1.1.0").ensure_installed(&NoopObserver).unwrap();

    // The player changes a setting, then a new package ships a different copy.
    std::fs::write(ws.root().join("options.txt"), "fov:110").unwrap();
    ws.write_archive(&package_files("fov:30"));

    let sync = ws.synchronizer("1.1.1");
    assert!(matches!(
        sync.ensure_installed(&NoopObserver).unwrap(),
        SyncOutcome::Installed { protected_skipped: 1, .. }
    ));
    assert!(matches!(
        sync.ensure_installed(&NoopObserver).unwrap(),
        SyncOutcome::UpToDate { .. }
    ));
    assert_eq!(
        std::fs::read_to_string(ws.root().join("options.txt")).unwrap(),
        "fov:110"
    );
}

#[test]
fn launch_without_manifests_fails_before_spawning() {
    let ws = Workspace::new("empty");
    std::fs::create_dir_all(ws.root()).unwrap();

    let resolver = LaunchResolver::new(ws.root(), LaunchProfile::default());
    let spawner = RecordingSpawner::default();
    let err = launch(&resolver, 2048, &steve(), &spawner).unwrap_err();

    match err {
        LauncherError::MissingManifest { path } => {
            assert!(path.starts_with(ws.root().join("versions")));
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
        }
        other => panic!("expected MissingManifest, got {other:?}"),
    }
    assert!(spawner.spawned.borrow().is_empty());
}

#[test]
fn missing_archive_leaves_existing_tree_alone() {
    let ws = Workspace::new("no-archive");
    let mods = ws.root().join("mods");
    std::fs::create_dir_all(&mods).unwrap();
    std::fs::write(mods.join("keep.jar"), b"x").unwrap();

    let err = ws.synchronizer("1.1.1").ensure_installed(&NoopObserver).unwrap_err();

    assert!(matches!(err, LauncherError::MissingArchive { .. }));
    assert!(mods.join("keep.jar").exists());
    assert!(!ws.root().join("pack_version.txt").exists());
}
