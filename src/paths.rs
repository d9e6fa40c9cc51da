//! Application data paths resolved with the `dirs` crate.
//!
//! Layout under the platform data directory:
//!
//!   settings.json      singleton settings record
//!   lectern.sqlite3    reading progress + lifetime stats

use std::path::{Path, PathBuf};

/// Holds every resolved on-disk location the engine touches.
#[derive(Debug, Clone)]
pub struct ReaderPaths {
    pub data_dir: PathBuf,
    /// Full path to `settings.json`.
    pub settings_file: PathBuf,
    /// Full path to the SQLite database.
    pub db_file: PathBuf,
}

impl ReaderPaths {
    const APP_NAME: &'static str = "lectern";

    /// Resolves the standard per-platform data directory.
    ///
    /// Falls back to the current directory if the platform cannot provide
    /// one (rare in practice).
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::in_dir(&data_dir)
    }

    /// Places everything under an explicit directory. Used by tests and by
    /// embedders that manage their own storage location.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            settings_file: dir.join("settings.json"),
            db_file: dir.join("lectern.sqlite3"),
        }
    }
}

impl Default for ReaderPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = ReaderPaths::new();
        assert!(paths.data_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.json"));
        assert!(paths
            .db_file
            .file_name()
            .is_some_and(|n| n == "lectern.sqlite3"));
    }

    #[test]
    fn in_dir_keeps_everything_under_the_given_root() {
        let paths = ReaderPaths::in_dir(Path::new("/tmp/lectern-test"));
        assert!(paths.settings_file.starts_with("/tmp/lectern-test"));
        assert!(paths.db_file.starts_with("/tmp/lectern-test"));
    }
}
