//! Source tree enumeration

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Every source document under `root`, sorted by path
///
/// Unreadable entries below the root are logged and skipped; an unreadable
/// root is a run-level fault.
pub fn enumerate_sources(
    root: &Path,
    config: &SchedulerConfig,
) -> Result<Vec<PathBuf>, SchedulerError> {
    if !root.is_dir() {
        return Err(SchedulerError::SourceRoot {
            path: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SchedulerError::SourceRoot {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let accepted = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| config.accepts_extension(ext));
        if accepted {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recursive_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/20200101/x")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b/20200101/x/index.html"), "").unwrap();
        fs::write(root.join("a/index.HTML"), "").unwrap();
        fs::write(root.join("a/notes.txt"), "").unwrap();

        let paths = enumerate_sources(root, &SchedulerConfig::default()).unwrap();
        assert_eq!(
            paths,
            vec![root.join("a/index.HTML"), root.join("b/20200101/x/index.html")]
        );
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = enumerate_sources(&dir.path().join("missing"), &SchedulerConfig::default());
        assert!(matches!(result, Err(SchedulerError::SourceRoot { .. })));
    }

    #[test]
    fn test_empty_tree() {
        let dir = TempDir::new().unwrap();
        assert!(enumerate_sources(dir.path(), &SchedulerConfig::default())
            .unwrap()
            .is_empty());
    }
}
