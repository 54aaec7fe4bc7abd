//! Lexical classification of source references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::OriginKind;

const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2"];
const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];
const GIST_HOST: &str = "gist.github.com";

/// An immutable source reference and the retrieval strategy its text implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    raw: String,
    kind: OriginKind,
}

impl SourceReference {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let kind = classify(&raw);
        Self { raw, kind }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn kind(&self) -> OriginKind {
        self.kind
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Pure function of the reference text; touches neither network nor disk.
#[must_use]
pub fn classify(raw: &str) -> OriginKind {
    if raw.is_empty() {
        return OriginKind::Unsupported;
    }
    if raw.starts_with('/') || raw.starts_with('~') || raw.starts_with("./") {
        return OriginKind::LocalFilesystem;
    }

    let Some((scheme, rest)) = raw.split_once("://") else {
        return OriginKind::Unsupported;
    };
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
    {
        return OriginKind::Unsupported;
    }

    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_lowercase();

    if ARCHIVE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return OriginKind::CompressedArchive;
    }
    if host == GIST_HOST {
        return OriginKind::PasteSnippet;
    }
    if GITHUB_HOSTS.contains(&host.as_str()) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [_, _] => return OriginKind::HostedRepo,
            [_, _, "tree" | "blob", _, ..] => return OriginKind::HostedRepoPath,
            _ => {}
        }
    }
    if path.ends_with(".git") {
        return OriginKind::GenericGit;
    }
    OriginKind::DirectDownload
}

/// Owner, repository, ref and path parsed from a GitHub URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub owner: String,
    pub repo: String,
    pub git_ref: Option<String>,
    pub path: String,
}

impl RepoLocation {
    /// Parse `https://github.com/<owner>/<repo>[/tree|blob/<ref>/<path>]`.
    #[must_use]
    pub fn from_url(url: &reqwest::Url) -> Option<Self> {
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [owner, repo] => Some(Self {
                owner: (*owner).to_string(),
                repo: repo.trim_end_matches(".git").to_string(),
                git_ref: None,
                path: String::new(),
            }),
            [owner, repo, "tree" | "blob", git_ref, rest @ ..] => Some(Self {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
                git_ref: Some((*git_ref).to_string()),
                path: rest.join("/"),
            }),
            _ => None,
        }
    }
}

/// Gist id from `https://gist.github.com/<user>/<id>` or `/<id>`.
#[must_use]
pub fn gist_id(url: &reqwest::Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|id| id.trim_end_matches(".git").to_string())
        .filter(|id| id.chars().all(|c| c.is_ascii_alphanumeric()))
}
