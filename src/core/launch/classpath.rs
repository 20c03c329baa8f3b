// ─── Classpath Builder ───
// Merges the overlay and base library lists into one ordered classpath.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::version::{DependencyManifest, Platform};

/// Ordered, duplicate-free list of library paths. The first insertion of a
/// path fixes its position; later insertions are silent no-ops.
#[derive(Debug, Clone, Default)]
pub struct ClasspathSet {
    entries: Vec<PathBuf>,
    seen: HashSet<String>,
}

impl ClasspathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the path was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if !self.seen.insert(dedup_key(&path)) {
            return false;
        }
        self.entries.push(path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(&dedup_key(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Render as a single `-cp` value using the platform separator.
    pub fn to_classpath_string(&self) -> String {
        self.entries
            .iter()
            .map(|p| safe_path_str(p))
            .collect::<Vec<_>>()
            .join(get_classpath_separator())
    }
}

// Windows paths compare case-insensitively.
fn dedup_key(path: &Path) -> String {
    let text = path.to_string_lossy();
    if cfg!(target_os = "windows") {
        text.to_lowercase()
    } else {
        text.into_owned()
    }
}

/// Build the launch classpath: overlay libraries first, then base libraries.
///
/// Entries denied by their rules on `platform` are skipped; entries without
/// an artifact path or a usable coordinate are dropped.
pub fn build_classpath(
    overlay: &DependencyManifest,
    base: &DependencyManifest,
    libraries_root: &Path,
    platform: Platform,
) -> ClasspathSet {
    let mut classpath = ClasspathSet::new();

    for (layer, manifest) in [("overlay", overlay), ("base", base)] {
        for lib in &manifest.libraries {
            let label = lib.name.as_deref().unwrap_or("<unnamed>");

            if !lib.is_allowed_for(platform) {
                debug!("Skipping library (OS rule): {}", label);
                continue;
            }

            let Some(relative) = lib.relative_path() else {
                debug!("Dropping {} library without a resolvable path: {}", layer, label);
                continue;
            };

            let path = libraries_root.join(relative);
            if !path.exists() {
                debug!("Library not found on disk (kept): {:?}", path);
            }
            if !classpath.insert(path) {
                debug!("Library already on classpath from an earlier layer: {}", label);
            }
        }
    }

    debug!("Classpath resolved with {} entries", classpath.len());
    classpath
}

/// Platform-specific Java classpath separator.
pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Path as a launch argument, without the Windows extended-length prefix.
pub fn safe_path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java classpath handling fails on `\\?\C:\...` paths.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
