//! packlaunch CLI
//!
//! Keeps a modded install in sync with its bundled package and starts it.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use packlaunch_lib::commands::{self, SettingsUpdate};
use packlaunch_lib::core::launch::SystemSpawner;
use packlaunch_lib::core::state::default_install_root;
use packlaunch_lib::{AppState, LauncherResult};

#[derive(Parser)]
#[command(name = "packlaunch")]
#[command(about = "Install the bundled modpack and launch it", long_about = None, version)]
struct Cli {
    /// Install root (defaults to <data dir>/.GermFlogLauncher)
    #[arg(long, env = "PACKLAUNCH_ROOT", global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the bundled package if the installed version is outdated
    Sync,

    /// Start the game from the already installed tree
    Launch {
        /// Print the resolved command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Sync, then launch
    Play {
        /// Print the resolved command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change launcher settings
    Settings {
        /// Player name used offline
        #[arg(long)]
        username: Option<String>,

        /// Maximum heap in megabytes
        #[arg(long)]
        memory: Option<u32>,

        /// Java binary to use instead of the bundled runtime
        #[arg(long, conflicts_with = "clear_java_path")]
        java_path: Option<PathBuf>,

        /// Forget a previously configured Java binary
        #[arg(long)]
        clear_java_path: bool,

        /// Extra launch placeholder, as TOKEN=VALUE (repeatable)
        #[arg(long = "set", value_parser = parse_placeholder)]
        placeholders: Vec<(String, String)>,
    },
}

fn parse_placeholder(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((token, value)) if !token.trim().is_empty() => {
            Ok((token.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected TOKEN=VALUE, got {:?}", raw)),
    }
}

#[tokio::main]
async fn main() {
    packlaunch_lib::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> LauncherResult<()> {
    let root = cli.root.unwrap_or_else(default_install_root);
    tracing::info!("packlaunch starting (install root {:?})", root);
    let mut state = AppState::load(root);

    match cli.command {
        Command::Sync => {
            commands::sync_package(&state).await?;
        }
        Command::Launch { dry_run } => {
            commands::launch_game(&state, dry_run, SystemSpawner).await?;
        }
        Command::Play { dry_run } => {
            commands::play(&state, dry_run, SystemSpawner).await?;
        }
        Command::Settings {
            username,
            memory,
            java_path,
            clear_java_path,
            placeholders,
        } => {
            let changed = username.is_some()
                || memory.is_some()
                || java_path.is_some()
                || clear_java_path
                || !placeholders.is_empty();

            let payload = if changed {
                commands::update_launcher_settings(
                    &mut state,
                    SettingsUpdate {
                        username,
                        memory_max_mb: memory,
                        java_path,
                        clear_java_path,
                        placeholders,
                    },
                )?
            } else {
                commands::get_launcher_settings(&state)
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}
