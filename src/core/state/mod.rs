pub mod app_state;

pub use app_state::{
    clamp_memory_mb, default_install_root, load_settings, save_settings, AppState,
    LauncherSettings,
};
