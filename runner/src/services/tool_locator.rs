//! PATH-based tool lookup

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::traits::ToolLocator;

/// Resolves tools against a `PATH`-style search list
pub struct PathToolLocator {
    search_path: Option<OsString>,
}

impl PathToolLocator {
    /// Search the process `PATH` at lookup time
    pub fn new() -> Self {
        Self { search_path: None }
    }

    /// Search an explicit `PATH`-style list instead of the environment
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Full path of `tool`, if any
    pub fn locate(&self, tool: &str) -> Option<PathBuf> {
        let candidate = Path::new(tool);
        if candidate.components().count() > 1 {
            return is_executable(candidate).then(|| candidate.to_path_buf());
        }

        let search_path = match &self.search_path {
            Some(path) => path.clone(),
            None => std::env::var_os("PATH")?,
        };

        std::env::split_paths(&search_path)
            .map(|dir| dir.join(tool))
            .find(|path| is_executable(path))
    }
}

impl Default for PathToolLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolLocator for PathToolLocator {
    fn is_installed(&self, tool: &str) -> bool {
        self.locate(tool).is_some()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
