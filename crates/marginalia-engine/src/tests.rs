//! Shared fixtures for unit tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary article library directory.
pub fn create_test_library_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

/// Create a file inside the test library, building parent directories
/// for nested names like `folder/file.md`.
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dirs");
    }
    fs::write(&path, content).expect("failed to write test file");
    path
}
