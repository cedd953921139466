use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid library directory: {0}")]
    InvalidLibraryDir(String),
}

/// Read an article file and return its markdown content
pub fn read_file(relative_path: &RelativePath, library_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(library_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write article content back to its file
pub fn write_file(
    relative_path: &RelativePath,
    library_root: &Path,
    content: &str,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(library_root);

    // Create parent directories if they don't exist
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Scan for markdown article files in the library directory
pub fn scan_article_files(library_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !library_root.exists() {
        return Err(IoError::InvalidLibraryDir(
            "library directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(library_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "md"
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_library_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidLibraryDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

/// Title for an imported article: its first level-1 heading, falling
/// back to the file stem.
pub fn article_title(content: &str, path: &Path) -> String {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# ").map(|title| title.trim().to_string()))
        .filter(|title| !title.is_empty())
        .or_else(|| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_library_dir};

    #[test]
    fn test_scan_and_load_files() {
        // Given a library with markdown files
        let library_dir = create_test_library_dir();
        create_test_file(&library_dir, "essay1.md", "# Essay One\n\nBody.");
        create_test_file(&library_dir, "essay2.md", "# Essay Two\n\nBody.");

        // When scanning for files
        let files = scan_article_files(library_dir.path()).unwrap();

        // Then we find the expected files
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.file_name().unwrap() == "essay1.md"));
        assert!(files.iter().any(|f| f.file_name().unwrap() == "essay2.md"));
    }

    #[test]
    fn test_handle_invalid_library_directory() {
        let nonexistent_path = PathBuf::from("/this/path/does/not/exist");

        let result = scan_article_files(&nonexistent_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("library directory"));
    }

    #[test]
    fn test_scan_nested_directories() {
        // Given a library with nested structure
        let library_dir = create_test_library_dir();
        create_test_file(&library_dir, "root.md", "# Root file");
        create_test_file(&library_dir, "archive/nested.md", "# Nested file");

        // When scanning for files
        let files = scan_article_files(library_dir.path()).unwrap();

        // Then we find both root and nested files
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.file_name().unwrap() == "root.md"));
        assert!(files.iter().any(|f| f.file_name().unwrap() == "nested.md"));
    }

    #[test]
    fn test_ignore_non_markdown_files() {
        // Given a library with mixed file types
        let library_dir = create_test_library_dir();
        create_test_file(&library_dir, "document.md", "# Markdown");
        create_test_file(&library_dir, "image.png", "fake image data");
        create_test_file(&library_dir, "config.json", "{}");

        // When scanning for files
        let files = scan_article_files(library_dir.path()).unwrap();

        // Then we only find markdown files
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "document.md");
    }

    #[test]
    fn test_validate_library_dir_exists() {
        let library_dir = create_test_library_dir();
        let result = validate_library_dir(library_dir.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_library_dir_not_exists() {
        let result = validate_library_dir(Path::new("/nonexistent/path"));
        assert!(result.is_err());
        assert!(matches!(result, Err(IoError::InvalidLibraryDir(_))));
    }

    #[test]
    fn test_read_file_success() {
        let library_dir = create_test_library_dir();
        create_test_file(&library_dir, "test.md", "# Test Content\n\nParagraph");

        let relative_path = RelativePath::new("test.md");
        let content = read_file(relative_path, library_dir.path()).unwrap();
        assert_eq!(content, "# Test Content\n\nParagraph");
    }

    #[test]
    fn test_read_file_not_found() {
        let library_dir = create_test_library_dir();
        let relative_path = RelativePath::new("nonexistent.md");
        let result = read_file(relative_path, library_dir.path());
        assert!(result.is_err());
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_write_file_round_trip() {
        let library_dir = create_test_library_dir();
        let relative_path = RelativePath::new("edited.md");
        let content = "# Edited\n\nRewritten paragraph.";

        write_file(relative_path, library_dir.path(), content).unwrap();

        let written_content = read_file(relative_path, library_dir.path()).unwrap();
        assert_eq!(written_content, content);
    }

    #[test]
    fn test_write_file_creates_parent_directories() {
        let library_dir = create_test_library_dir();
        let relative_path = RelativePath::new("folder/subfolder/new_file.md");
        let content = "# New File in Nested Folder";

        write_file(relative_path, library_dir.path(), content).unwrap();

        let written_content = read_file(relative_path, library_dir.path()).unwrap();
        assert_eq!(written_content, content);
        let parent_dir = library_dir.path().join("folder").join("subfolder");
        assert!(parent_dir.is_dir());
    }

    #[test]
    fn test_write_file_overwrites_existing() {
        let library_dir = create_test_library_dir();
        create_test_file(&library_dir, "existing.md", "# Original Content");

        let relative_path = RelativePath::new("existing.md");
        let new_content = "# Updated Content\n\nThis is new";
        write_file(relative_path, library_dir.path(), new_content).unwrap();

        let written_content = read_file(relative_path, library_dir.path()).unwrap();
        assert_eq!(written_content, new_content);
    }

    // ============ article_title tests ============

    #[test]
    fn test_article_title_prefers_first_heading() {
        let title = article_title("# The Real Title\n\nBody.", Path::new("slug.md"));
        assert_eq!(title, "The Real Title");
    }

    #[test]
    fn test_article_title_falls_back_to_file_stem() {
        let title = article_title("No heading here.", Path::new("notes/causal-trees.md"));
        assert_eq!(title, "causal-trees");
    }

    #[test]
    fn test_article_title_skips_deeper_headings() {
        let title = article_title("## Section\n\n# Actual Title", Path::new("x.md"));
        assert_eq!(title, "Actual Title");
    }
}
