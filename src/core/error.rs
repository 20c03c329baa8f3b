use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher backend.
/// Every module returns `Result<T, LauncherError>`.
///
/// A missing bundled runtime and a library entry without any usable path have
/// no variant: both are tolerated and only logged.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Package sync ────────────────────────────────────
    #[error("package archive not found (searched {searched:?})")]
    MissingArchive { searched: Vec<PathBuf> },

    #[error("extraction failed at {path:?}: {source}")]
    Extraction {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Archive ─────────────────────────────────────────
    #[error("archive {path:?} could not be read: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    // ── Manifests ───────────────────────────────────────
    #[error("manifest not found: {path:?}")]
    MissingManifest { path: PathBuf },

    #[error("manifest {path:?} could not be parsed: {source}")]
    UnparsableManifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("manifest {path:?} declares no mainClass")]
    MissingEntryPoint { path: PathBuf },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Process ─────────────────────────────────────────
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Tasks ───────────────────────────────────────────
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    // ── Settings ────────────────────────────────────────
    #[error("invalid setting: {0}")]
    Settings(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure leaves the install tree possibly half-written.
    pub fn is_partial_install(&self) -> bool {
        matches!(self, LauncherError::Extraction { .. } | LauncherError::Archive { .. })
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
