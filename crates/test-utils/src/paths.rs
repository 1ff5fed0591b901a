//! Path utilities for test data and temporary output.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Directory holding the bundled run configurations.
pub fn config_dir() -> PathBuf {
    workspace_root().join("services/pentad-means/config")
}

/// Creates a temporary directory for test output.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Writes `contents` to `dir/name` and returns the path.
pub fn write_test_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create test file directory");
    }
    std::fs::write(&path, contents).expect("Failed to write test file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_is_valid() {
        let root = workspace_root();
        assert!(
            root.join("Cargo.toml").exists(),
            "Workspace root should contain Cargo.toml: {:?}",
            root
        );
    }

    #[test]
    fn test_config_dir_has_catalog() {
        assert!(config_dir().join("catalog.yaml").exists());
    }

    #[test]
    fn test_write_test_file() {
        let dir = temp_test_dir();
        let path = write_test_file(dir.path(), "nested/grid.csv", "pentad\n");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "pentad\n");
    }
}
