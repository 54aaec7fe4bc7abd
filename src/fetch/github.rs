//! GitHub contents API and gist retrieval.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::core::SkippedEntry;
use crate::error::{DojoError, Result};
use crate::fetch::guard;
use crate::fetch::http::HttpClient;
use crate::fetch::source::RepoLocation;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

#[derive(Debug, Clone, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    download_url: Option<String>,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    description: Option<String>,
    files: std::collections::BTreeMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    filename: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    truncated: bool,
    content: Option<String>,
    raw_url: Option<String>,
}

/// What a GitHub retrieval produced.
#[derive(Debug, Default)]
pub struct GitHubFetch {
    pub files: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
    pub description: Option<String>,
}

pub struct GitHubFetcher<'a> {
    http: &'a HttpClient,
    config: &'a FetchConfig,
    api_base: String,
}

impl<'a> GitHubFetcher<'a> {
    pub fn new(http: &'a HttpClient, config: &'a FetchConfig) -> Self {
        Self {
            http,
            config,
            api_base: config.github_api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Download a repository path file-by-file, recursing into directories.
    /// Files are written relative to the requested path.
    pub fn fetch_path(&self, location: &RepoLocation, dest: &Path) -> Result<GitHubFetch> {
        let mut out = GitHubFetch::default();
        let base = location.path.trim_matches('/');
        self.fetch_contents(location, base, base, dest, &mut out)?;
        if out.files.is_empty() {
            return Err(DojoError::NotFound(format!(
                "no retrievable files at {}/{}/{}",
                location.owner, location.repo, base
            )));
        }
        out.files.sort();
        Ok(out)
    }

    fn contents_url(&self, location: &RepoLocation, path: &str) -> String {
        let encoded = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let mut url = format!(
            "{}/repos/{}/{}/contents/{encoded}",
            self.api_base,
            urlencoding::encode(&location.owner),
            urlencoding::encode(&location.repo)
        );
        if let Some(git_ref) = &location.git_ref {
            url.push_str("?ref=");
            url.push_str(&urlencoding::encode(git_ref));
        }
        url
    }

    fn fetch_contents(
        &self,
        location: &RepoLocation,
        base: &str,
        path: &str,
        dest: &Path,
        out: &mut GitHubFetch,
    ) -> Result<()> {
        let url = self.contents_url(location, path);
        debug!(url = %url, "listing contents");

        match self.http.get_json::<ContentsResponse>(&url)? {
            ContentsResponse::Single(item) => {
                // A single file lands at the bundle root under its own name.
                self.fetch_item(&item, &guard::sanitize_filename(&item.name), dest, out);
            }
            ContentsResponse::Listing(items) => {
                for item in items {
                    let relative = item
                        .path
                        .strip_prefix(base)
                        .unwrap_or(&item.path)
                        .trim_start_matches('/')
                        .to_string();
                    match item.kind.as_str() {
                        "file" => self.fetch_item(&item, &relative, dest, out),
                        "dir" => {
                            // one failed subdirectory does not sink the fetch
                            if let Err(err) = self.fetch_contents(location, base, &item.path, dest, out) {
                                warn!(path = %item.path, error = %err, "skipping directory");
                                out.skipped.push(SkippedEntry::new(&item.path, err.to_string()));
                            }
                        }
                        other => out.skipped.push(SkippedEntry::new(
                            &item.path,
                            format!("unsupported entry type '{other}'"),
                        )),
                    }
                }
            }
        }
        Ok(())
    }

    fn fetch_item(&self, item: &ContentItem, relative: &str, dest: &Path, out: &mut GitHubFetch) {
        match self.write_item(item, relative, dest) {
            Ok(written) => out.files.push(written),
            Err(err) => {
                warn!(path = %item.path, error = %err, "skipping file");
                out.skipped.push(SkippedEntry::new(&item.path, err.to_string()));
            }
        }
    }

    fn write_item(&self, item: &ContentItem, relative: &str, dest: &Path) -> Result<String> {
        guard::check_size(item.size, self.config.max_transfer_bytes, &item.path)?;

        let rel_path = guard::safe_relative_path(Path::new(relative))
            .ok_or_else(|| DojoError::security("unsafe path in listing", &item.path))?;
        let target = dest.join(&rel_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if let (Some(content), Some("base64")) = (&item.content, item.encoding.as_deref()) {
            let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(cleaned)
                .map_err(|err| DojoError::Transfer(format!("decode {}: {err}", item.path)))?;
            guard::check_size(bytes.len() as u64, self.config.max_transfer_bytes, &item.path)?;
            std::fs::write(&target, bytes)?;
        } else {
            let url = item
                .download_url
                .as_deref()
                .ok_or_else(|| DojoError::Transfer(format!("{} has no download URL", item.path)))?;
            guard::check_reference(url)?;
            guard::check_url(url, self.config)?;
            self.http.download_to(url, &target)?;
        }

        Ok(crate::utils::fs::slash_path(&rel_path))
    }

    /// Write every file of a gist into `dest`.
    pub fn fetch_gist(&self, id: &str, dest: &Path) -> Result<GitHubFetch> {
        let url = format!("{}/gists/{}", self.api_base, urlencoding::encode(id));
        let gist: Gist = self.http.get_json(&url)?;

        let mut out = GitHubFetch {
            description: gist.description.filter(|d| !d.trim().is_empty()),
            ..GitHubFetch::default()
        };

        for (key, file) in &gist.files {
            let name = guard::sanitize_filename(file.filename.as_deref().unwrap_or(key));
            match self.write_gist_file(file, &name, dest) {
                Ok(()) => out.files.push(name),
                Err(err) => {
                    warn!(file = %key, error = %err, "skipping gist file");
                    out.skipped.push(SkippedEntry::new(key, err.to_string()));
                }
            }
        }

        if out.files.is_empty() {
            return Err(DojoError::NotFound(format!("gist {id} has no retrievable files")));
        }
        out.files.sort();
        Ok(out)
    }

    fn write_gist_file(&self, file: &GistFile, name: &str, dest: &Path) -> Result<()> {
        guard::check_size(file.size, self.config.max_transfer_bytes, name)?;
        let target = dest.join(name);

        match (&file.content, file.truncated, file.raw_url.as_deref()) {
            (Some(content), false, _) => {
                guard::check_size(content.len() as u64, self.config.max_transfer_bytes, name)?;
                std::fs::write(target, content)?;
            }
            (_, _, Some(raw_url)) => {
                guard::check_reference(raw_url)?;
                guard::check_url(raw_url, self.config)?;
                self.http.download_to(raw_url, &target)?;
            }
            _ => return Err(DojoError::Transfer(format!("{name} has no content"))),
        }
        Ok(())
    }
}
