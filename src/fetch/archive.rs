//! In-process extraction of zip, tar.gz and tar.bz2 archives.
//!
//! Entries are written under the destination only. The size cap applies to
//! the cumulative extracted bytes and the deadline is checked between
//! entries. A fatal error removes everything extracted so far.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::core::SkippedEntry;
use crate::error::{DojoError, Result};
use crate::fetch::guard;
use crate::utils::fs::slash_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarBz2,
}

impl ArchiveFormat {
    /// Pick the extractor from the name's suffix (query strings ignored).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_bytes: u64,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub struct Extracted {
    pub files: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
}

struct Extraction<'a> {
    dest: &'a Path,
    limits: ExtractLimits,
    total: u64,
    written: Vec<PathBuf>,
    out: Extracted,
}

impl<'a> Extraction<'a> {
    const fn new(dest: &'a Path, limits: ExtractLimits) -> Self {
        Self {
            dest,
            limits,
            total: 0,
            written: Vec::new(),
            out: Extracted {
                files: Vec::new(),
                skipped: Vec::new(),
            },
        }
    }

    fn check_deadline(&self) -> Result<()> {
        if Instant::now() > self.limits.deadline {
            return Err(DojoError::Timeout("archive extraction deadline exceeded".to_string()));
        }
        Ok(())
    }

    fn skip(&mut self, path: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(entry = %path, reason = %reason, "skipping archive entry");
        self.out.skipped.push(SkippedEntry::new(path, reason));
    }

    /// Write one entry. `Err` is fatal for the whole archive; per-entry
    /// problems are recorded and return `Ok`.
    fn write_entry(&mut self, raw_path: &Path, reader: &mut dyn Read) -> Result<()> {
        let display = raw_path.to_string_lossy().into_owned();
        let Some(relative) = guard::safe_relative_path(raw_path) else {
            self.skip(&display, "path escapes the destination");
            return Ok(());
        };

        let target = self.dest.join(&relative);
        if let Some(parent) = target.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                self.skip(&display, err.to_string());
                return Ok(());
            }
        }
        let mut file = match File::create(&target) {
            Ok(file) => file,
            Err(err) => {
                self.skip(&display, err.to_string());
                return Ok(());
            }
        };

        let remaining = self.limits.max_bytes.saturating_sub(self.total);
        let copied = match std::io::copy(&mut reader.take(remaining + 1), &mut file)
            .and_then(|copied| file.flush().map(|()| copied))
        {
            Ok(copied) => copied,
            Err(err) => {
                drop(file);
                let _ = std::fs::remove_file(&target);
                self.skip(&display, err.to_string());
                return Ok(());
            }
        };
        self.written.push(target);

        self.total += copied;
        guard::check_size(self.total, self.limits.max_bytes, "extracted archive")?;
        self.out.files.push(slash_path(&relative));
        Ok(())
    }

    fn discard(&self) {
        for path in &self.written {
            let _ = std::fs::remove_file(path);
        }
    }

    fn finish(mut self) -> Extracted {
        self.out.files.sort();
        self.out.files.dedup();
        self.out
    }
}

/// Extract `archive` into `dest`.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    dest: &Path,
    limits: ExtractLimits,
) -> Result<Extracted> {
    std::fs::create_dir_all(dest)?;
    let mut extraction = Extraction::new(dest, limits);

    let result = match format {
        ArchiveFormat::Zip => extract_zip(archive, &mut extraction),
        ArchiveFormat::TarGz => {
            let reader = GzDecoder::new(File::open(archive)?);
            extract_tar(reader, &mut extraction)
        }
        ArchiveFormat::TarBz2 => {
            let reader = BzDecoder::new(File::open(archive)?);
            extract_tar(reader, &mut extraction)
        }
    };

    match result {
        Ok(()) => {
            debug!(files = extraction.out.files.len(), bytes = extraction.total, "archive extracted");
            Ok(extraction.finish())
        }
        Err(err) => {
            extraction.discard();
            Err(err)
        }
    }
}

fn extract_zip(archive: &Path, extraction: &mut Extraction<'_>) -> Result<()> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)
        .map_err(|err| DojoError::Transfer(format!("open zip archive: {err}")))?;

    for index in 0..zip.len() {
        extraction.check_deadline()?;
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                extraction.skip(&format!("#{index}"), err.to_string());
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            let name = entry.name().to_string();
            extraction.skip(&name, "path escapes the destination");
            continue;
        };
        extraction.write_entry(&path, &mut entry)?;
    }
    Ok(())
}

fn extract_tar<R: Read>(reader: R, extraction: &mut Extraction<'_>) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar
        .entries()
        .map_err(|err| DojoError::Transfer(format!("read tar archive: {err}")))?;

    for entry in entries {
        extraction.check_deadline()?;
        // a broken header means the rest of the stream is unreadable
        let mut entry =
            entry.map_err(|err| DojoError::Transfer(format!("read tar entry: {err}")))?;

        let path = match entry.path() {
            Ok(path) => path.into_owned(),
            Err(err) => {
                extraction.skip("<unreadable name>", err.to_string());
                continue;
            }
        };
        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            continue;
        }
        if !entry_type.is_file() {
            extraction.skip(&path.to_string_lossy(), "links and special files are not extracted");
            continue;
        }
        extraction.write_entry(&path, &mut entry)?;
    }
    Ok(())
}
