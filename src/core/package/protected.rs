// ─── Protected Paths ───
// User-owned files living inside the install tree that an update must never
// overwrite once they exist locally.

use std::collections::BTreeSet;
use std::path::Path;

/// Options, OptiFine options and the multiplayer server list.
pub const DEFAULT_PROTECTED_NAMES: [&str; 3] = ["options.txt", "servers.dat", "optionsof.txt"];

/// Basename-driven predicate: a path is protected when its final component
/// matches one of the configured names, regardless of the directory it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedPaths {
    names: BTreeSet<String>,
}

impl Default for ProtectedPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_NAMES)
    }
}

impl ProtectedPaths {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_protected(&self, relative_path: &Path) -> bool {
        relative_path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.names.contains(name))
    }

    /// Whether an existing file at `destination` must be left untouched.
    /// A protected name that does not exist yet is still written.
    pub fn should_preserve(&self, destination: &Path) -> bool {
        self.is_protected(destination) && destination.exists()
    }
}
