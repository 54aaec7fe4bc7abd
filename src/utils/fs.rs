//! Filesystem utilities.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Read a file as text, replacing invalid UTF-8. `None` if it doesn't exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if path.is_file() {
        Ok(Some(read_lossy(path)?))
    } else {
        Ok(None)
    }
}

/// Read a file as text, replacing invalid UTF-8 sequences.
pub fn read_lossy(path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `a/b/c` form of a relative path regardless of platform separator.
#[must_use]
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// SHA-256 over the relative path and content of every listed file.
pub fn content_digest(root: &Path, files: &[String]) -> Result<String> {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.as_bytes());
        hasher.update([0]);
        hasher.update(std::fs::read(root.join(file))?);
        hasher.update([0]);
    }
    Ok(hex::encode(hasher.finalize()))
}
