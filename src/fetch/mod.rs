//! Retrieval of untrusted source references into a working directory.
//!
//! [`Fetcher::fetch`] is the only entry point. It runs the reference checks
//! in [`guard`] before any network or filesystem access and then dispatches
//! on the reference's [`OriginKind`].

pub mod archive;
pub mod git;
pub mod github;
pub mod guard;
pub mod http;
pub mod local;
pub mod source;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::core::{FetchedBundle, OriginKind, ResourceKind, SkippedEntry};
use crate::error::{DojoError, Result};
use crate::utils::fs::content_digest;

pub use source::{RepoLocation, SourceReference};

use archive::{ArchiveFormat, ExtractLimits};
use github::GitHubFetcher;
use http::HttpClient;

/// Files and provenance produced by one retrieval strategy.
#[derive(Debug, Default)]
struct Retrieved {
    files: Vec<String>,
    skipped: Vec<SkippedEntry>,
    metadata: BTreeMap<String, String>,
}

impl Retrieved {
    fn meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

pub struct Fetcher {
    config: FetchConfig,
}

impl Fetcher {
    #[must_use]
    pub const fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Materialize `reference` under `output_dir` and write its descriptor.
    pub fn fetch(
        &self,
        reference: &SourceReference,
        kind: ResourceKind,
        output_dir: &Path,
    ) -> Result<FetchedBundle> {
        let raw = reference.as_str();
        guard::check_reference(raw)?;

        let origin = reference.kind();
        if origin == OriginKind::Unsupported {
            return Err(DojoError::UnsupportedSource(raw.to_string()));
        }
        let url = if origin.is_network() {
            Some(guard::check_url(raw, &self.config)?)
        } else {
            None
        };

        let local_path = if origin == OriginKind::LocalFilesystem {
            Some(guard::resolve_local(raw, &self.config.denied_local_roots)?)
        } else {
            None
        };

        info!(source = raw, origin = %origin, kind = %kind, "fetching");
        std::fs::create_dir_all(output_dir)?;

        let mut retrieved = match (origin, url, local_path) {
            (OriginKind::LocalFilesystem, _, Some(path)) => self.fetch_local(&path, output_dir)?,
            (OriginKind::HostedRepo | OriginKind::GenericGit, Some(url), _) => {
                self.fetch_git(&url, output_dir)?
            }
            (OriginKind::HostedRepoPath, Some(url), _) => self.fetch_repo_path(&url, output_dir)?,
            (OriginKind::PasteSnippet, Some(url), _) => self.fetch_gist(&url, output_dir)?,
            (OriginKind::DirectDownload, Some(url), _) => self.fetch_download(&url, output_dir)?,
            (OriginKind::CompressedArchive, Some(url), _) => self.fetch_archive(&url, output_dir)?,
            _ => return Err(DojoError::UnsupportedSource(raw.to_string())),
        };

        for entry in &retrieved.skipped {
            warn!(path = %entry.path, reason = %entry.reason, "entry skipped");
        }
        retrieved.files.sort();
        retrieved.files.dedup();
        retrieved.meta("fetched_at", chrono::Utc::now().to_rfc3339());
        retrieved.meta("content_sha256", content_digest(output_dir, &retrieved.files)?);

        let bundle = FetchedBundle {
            origin_kind: origin,
            source: raw.to_string(),
            resource_kind: kind,
            files: retrieved.files,
            metadata: retrieved.metadata,
            skipped: retrieved.skipped,
            root: output_dir.to_path_buf(),
        };
        bundle.write_descriptor()?;
        info!(
            files = bundle.files.len(),
            skipped = bundle.skipped.len(),
            "fetch complete"
        );
        Ok(bundle)
    }

    fn fetch_local(&self, path: &Path, output_dir: &Path) -> Result<Retrieved> {
        let copied = local::copy_into(path, output_dir, self.config.max_transfer_bytes)?;
        let mut out = Retrieved {
            files: copied.files,
            skipped: copied.skipped,
            ..Retrieved::default()
        };
        out.meta("resolved_path", path.display().to_string());
        Ok(out)
    }

    fn fetch_git(&self, url: &reqwest::Url, output_dir: &Path) -> Result<Retrieved> {
        // clone beside the output so `.git` never lands in the bundle
        let scratch = tempfile::Builder::new().prefix("dojo-clone-").tempdir()?;
        let checkout = scratch.path().join("repo");
        git::shallow_clone(
            url.as_str(),
            &checkout,
            self.config.max_transfer_bytes,
            self.config.timeout(),
        )?;

        let copied = local::copy_into(&checkout, output_dir, self.config.max_transfer_bytes)?;
        let mut out = Retrieved {
            files: copied.files,
            skipped: copied.skipped,
            ..Retrieved::default()
        };
        if let Some(location) = RepoLocation::from_url(url) {
            out.meta("owner", location.owner);
            out.meta("repo", location.repo);
        }
        let commit = git2::Repository::open(&checkout)
            .ok()
            .and_then(|repo| repo.head().ok().and_then(|head| head.target()));
        if let Some(oid) = commit {
            out.meta("commit", oid.to_string());
        }
        Ok(out)
    }

    fn fetch_repo_path(&self, url: &reqwest::Url, output_dir: &Path) -> Result<Retrieved> {
        let location = RepoLocation::from_url(url)
            .ok_or_else(|| DojoError::UnsupportedSource(url.to_string()))?;
        let http = HttpClient::new(&self.config)?;
        let fetched = GitHubFetcher::new(&http, &self.config).fetch_path(&location, output_dir)?;

        let mut out = Retrieved {
            files: fetched.files,
            skipped: fetched.skipped,
            ..Retrieved::default()
        };
        out.meta("owner", location.owner);
        out.meta("repo", location.repo);
        if let Some(git_ref) = location.git_ref {
            out.meta("ref", git_ref);
        }
        out.meta("path", location.path);
        Ok(out)
    }

    fn fetch_gist(&self, url: &reqwest::Url, output_dir: &Path) -> Result<Retrieved> {
        let id = source::gist_id(url).ok_or_else(|| DojoError::UnsupportedSource(url.to_string()))?;
        let http = HttpClient::new(&self.config)?;
        let fetched = GitHubFetcher::new(&http, &self.config).fetch_gist(&id, output_dir)?;

        let mut out = Retrieved {
            files: fetched.files,
            skipped: fetched.skipped,
            ..Retrieved::default()
        };
        out.meta("gist_id", id);
        if let Some(description) = fetched.description {
            out.meta("description", description);
        }
        Ok(out)
    }

    fn fetch_download(&self, url: &reqwest::Url, output_dir: &Path) -> Result<Retrieved> {
        let name = download_name(url);
        let http = HttpClient::new(&self.config)?;
        let bytes = http.download_to(url.as_str(), &output_dir.join(&name))?;

        let mut out = Retrieved {
            files: vec![name.clone()],
            ..Retrieved::default()
        };
        out.meta("filename", name);
        out.meta("bytes", bytes.to_string());
        Ok(out)
    }

    fn fetch_archive(&self, url: &reqwest::Url, output_dir: &Path) -> Result<Retrieved> {
        let format = ArchiveFormat::from_name(url.path())
            .ok_or_else(|| DojoError::UnsupportedSource(url.to_string()))?;
        let deadline = Instant::now() + self.config.timeout();

        // removed on drop, whichever way this function exits
        let download = tempfile::Builder::new().prefix("dojo-archive-").tempfile()?;
        let http = HttpClient::new(&self.config)?;
        let bytes = http.download_to(url.as_str(), download.path())?;

        let extracted = archive::extract(
            download.path(),
            format,
            output_dir,
            ExtractLimits {
                max_bytes: self.config.max_transfer_bytes,
                deadline,
            },
        )?;

        let mut out = Retrieved {
            files: extracted.files,
            skipped: extracted.skipped,
            ..Retrieved::default()
        };
        out.meta("archive_name", download_name(url));
        out.meta("archive_bytes", bytes.to_string());
        Ok(out)
    }
}

fn download_name(url: &reqwest::Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    guard::sanitize_filename(&decoded)
}
