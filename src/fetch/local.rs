//! Copying local files and directories into the working directory.

use std::path::Path;

use tracing::warn;
use walkdir::WalkDir;

use crate::core::SkippedEntry;
use crate::core::types::IGNORED_DIRS;
use crate::error::Result;
use crate::fetch::guard;
use crate::utils::fs::slash_path;

#[derive(Debug, Default)]
pub struct CopyOutcome {
    pub files: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
}

/// Copy a file (under its sanitized name) or a directory tree (preserving
/// relative structure) into `dest`.
///
/// A single oversized file is fatal. Inside a tree, oversized files,
/// symbolic links and unreadable entries are skipped and recorded.
pub fn copy_into(source: &Path, dest: &Path, max_bytes: u64) -> Result<CopyOutcome> {
    std::fs::create_dir_all(dest)?;

    if source.is_file() {
        let size = std::fs::metadata(source)?.len();
        guard::check_size(size, max_bytes, &source.display().to_string())?;
        let name = guard::sanitize_filename(&source.file_name().unwrap_or_default().to_string_lossy());
        std::fs::copy(source, dest.join(&name))?;
        return Ok(CopyOutcome {
            files: vec![name],
            skipped: Vec::new(),
        });
    }

    let dest_canonical = dest.canonicalize().ok();
    let mut outcome = CopyOutcome::default();

    let walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let ignored = entry.file_type().is_dir()
                && IGNORED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref());
            // never copy the working directory into itself
            let is_dest = dest_canonical
                .as_ref()
                .is_some_and(|d| entry.path().canonicalize().is_ok_and(|p| &p == d));
            !ignored && !is_dest
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                warn!(path = %path, error = %err, "skipping unreadable entry");
                outcome.skipped.push(SkippedEntry::new(path, err.to_string()));
                continue;
            }
        };

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let shown = slash_path(relative);

        if entry.file_type().is_symlink() {
            outcome
                .skipped
                .push(SkippedEntry::new(shown, "symbolic link not followed"));
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        match copy_entry(entry.path(), relative, dest, max_bytes) {
            Ok(written) => outcome.files.push(written),
            Err(err) => {
                warn!(path = %shown, error = %err, "skipping file");
                outcome.skipped.push(SkippedEntry::new(shown, err.to_string()));
            }
        }
    }

    outcome.files.sort();
    Ok(outcome)
}

fn copy_entry(path: &Path, relative: &Path, dest: &Path, max_bytes: u64) -> Result<String> {
    let size = std::fs::metadata(path)?.len();
    guard::check_size(size, max_bytes, &slash_path(relative))?;

    let safe = guard::safe_relative_path(relative).ok_or_else(|| {
        crate::error::DojoError::security("unsafe relative path", slash_path(relative))
    })?;
    let target = dest.join(&safe);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(path, &target)?;
    Ok(slash_path(&safe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DojoError;
    use tempfile::TempDir;

    #[test]
    fn copies_single_file_under_sanitized_name() {
        let src = TempDir::new().unwrap();
        let file = src.path().join("deploy service.md");
        std::fs::write(&file, "# Deploy Service\n").unwrap();

        let dest = TempDir::new().unwrap();
        let outcome = copy_into(&file, dest.path(), 1024).unwrap();
        assert_eq!(outcome.files, vec!["deploy_service.md"]);
        assert!(dest.path().join("deploy_service.md").is_file());
    }

    #[test]
    fn oversized_single_file_is_fatal() {
        let src = TempDir::new().unwrap();
        let file = src.path().join("big.md");
        std::fs::write(&file, "x".repeat(100)).unwrap();

        let dest = TempDir::new().unwrap();
        let err = copy_into(&file, dest.path(), 10).unwrap_err();
        assert!(matches!(err, DojoError::SecurityViolation { .. }));
    }

    #[test]
    fn copies_tree_and_skips_oversized_and_vcs() {
        let src = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join("scripts")).unwrap();
        std::fs::create_dir_all(src.path().join(".git")).unwrap();
        std::fs::write(src.path().join("README.md"), "# Tool").unwrap();
        std::fs::write(src.path().join("scripts/run.sh"), "echo").unwrap();
        std::fs::write(src.path().join("scripts/blob.bin"), "x".repeat(100)).unwrap();
        std::fs::write(src.path().join(".git/HEAD"), "ref").unwrap();

        let dest = TempDir::new().unwrap();
        let outcome = copy_into(src.path(), dest.path(), 50).unwrap();

        assert_eq!(outcome.files, vec!["README.md", "scripts/run.sh"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, "scripts/blob.bin");
        assert!(outcome.skipped[0].reason.contains("size limit"));
        assert!(!dest.path().join("scripts/blob.bin").exists());
        assert!(!dest.path().join(".git").exists());
    }

    #[test]
    fn destination_inside_source_is_not_recopied() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("AGENT.md"), "# A").unwrap();
        let dest = src.path().join("work");

        let outcome = copy_into(src.path(), &dest, 1024).unwrap();
        assert_eq!(outcome.files, vec!["AGENT.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("AGENT.md"), "# A").unwrap();
        std::os::unix::fs::symlink("/etc/passwd", src.path().join("passwd")).unwrap();

        let dest = TempDir::new().unwrap();
        let outcome = copy_into(src.path(), dest.path(), 1 << 20).unwrap();
        assert_eq!(outcome.files, vec!["AGENT.md"]);
        assert_eq!(outcome.skipped[0].reason, "symbolic link not followed");
        assert!(!dest.path().join("passwd").exists());
    }
}
