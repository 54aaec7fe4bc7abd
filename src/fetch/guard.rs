//! Trust boundary for untrusted source references.
//!
//! Every check here runs before the reference is used for a network or
//! filesystem call.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::config::FetchConfig;
use crate::error::{DojoError, Result};
use crate::utils::format::format_size;

/// Placeholder used when a sanitized file name comes out empty.
pub const DEFAULT_FILE_NAME: &str = "downloaded_file";

static TRAVERSAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[/\\])\.\.([/\\]|$)|%2e%2e").expect("valid regex")
});
static SHELL_META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;&|`$<>\r\n]").expect("valid regex"));

/// Reject path-traversal sequences and shell metacharacters.
pub fn check_reference(raw: &str) -> Result<()> {
    if TRAVERSAL_RE.is_match(raw) {
        return Err(DojoError::security("path traversal sequence", raw));
    }
    if SHELL_META_RE.is_match(raw) {
        return Err(DojoError::security("shell metacharacter", raw));
    }
    Ok(())
}

/// Parse a network reference and enforce the scheme and host rules.
pub fn check_url(raw: &str, config: &FetchConfig) -> Result<Url> {
    let url = Url::parse(raw).map_err(|err| DojoError::security(format!("unparseable URL: {err}"), raw))?;

    let scheme = url.scheme();
    if !config
        .allowed_schemes
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
    {
        return Err(DojoError::security(format!("scheme '{scheme}' not allowed"), raw));
    }

    let Some(host) = url.host_str() else {
        return Err(DojoError::security("URL has no host", raw));
    };
    if is_blocked_host(host, &config.blocked_hosts) {
        return Err(DojoError::security(
            format!("host '{host}' is loopback, private or blocked"),
            raw,
        ));
    }

    Ok(url)
}

/// Loopback, any-interface, private and link-local hosts, plus the
/// configured denylist.
#[must_use]
pub fn is_blocked_host(host: &str, blocked: &[String]) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_lowercase();

    if blocked.iter().any(|entry| {
        entry
            .trim_start_matches('[')
            .trim_end_matches(']')
            .eq_ignore_ascii_case(&host)
    }) {
        return true;
    }
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_internal_v4(ip),
        Ok(IpAddr::V6(ip)) => is_internal_v6(ip),
        Err(_) => false,
    }
}

const fn is_internal_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_unspecified()
        || ip.is_link_local()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && ip.octets()[1] & 0xc0 == 64)
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_internal_v4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || first & 0xfe00 == 0xfc00
        || first & 0xffc0 == 0xfe80
}

/// Fail when `bytes` exceeds the transfer cap.
pub fn check_size(bytes: u64, max: u64, what: &str) -> Result<()> {
    if bytes > max {
        return Err(DojoError::security(
            format!("exceeds size limit of {}", format_size(max)),
            format!("{what} ({})", format_size(bytes)),
        ));
    }
    Ok(())
}

/// Strip directory components and replace anything outside the
/// word/hyphen/dot class with `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

/// Relative path that stays inside its destination, with each component
/// sanitized. `None` for absolute paths or any `..` component.
#[must_use]
pub fn safe_relative_path(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(sanitize_filename(&part.to_string_lossy())),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Resolve a local reference to its canonical path and refuse system
/// directories, whatever the literal input looked like.
pub fn resolve_local(raw: &str, denied_roots: &[String]) -> Result<PathBuf> {
    let expanded = expand_home(raw)?;
    let canonical = expanded.canonicalize().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            DojoError::NotFound(raw.to_string())
        } else {
            DojoError::Io(err)
        }
    })?;

    if canonical.parent().is_none() {
        return Err(DojoError::security(
            "filesystem root cannot be imported",
            canonical.display().to_string(),
        ));
    }

    for root in denied_roots {
        let root = Path::new(root);
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        if canonical.starts_with(root) || canonical.starts_with(&canonical_root) {
            return Err(DojoError::security(
                format!("path is under denied directory {}", root.display()),
                canonical.display().to_string(),
            ));
        }
    }

    Ok(canonical)
}

fn expand_home(raw: &str) -> Result<PathBuf> {
    if raw == "~" || raw.starts_with("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DojoError::NotFound("home directory".to_string()))?;
        return Ok(home.join(raw.trim_start_matches('~').trim_start_matches('/')));
    }
    Ok(PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> FetchConfig {
        FetchConfig::default()
    }

    #[test]
    fn rejects_traversal_sequences() {
        for raw in [
            "../etc/passwd",
            "/tmp/../etc",
            "skills\\..\\secret",
            "https://example.com/a/../b",
            "https://example.com/%2E%2E/b",
            "/tmp/x/..",
        ] {
            let err = check_reference(raw).unwrap_err();
            assert!(matches!(err, DojoError::SecurityViolation { .. }), "{raw}");
        }
    }

    #[test]
    fn allows_dots_inside_names() {
        check_reference("/tmp/my..skill.md").unwrap();
        check_reference("https://example.com/v1.2/skill.md").unwrap();
    }

    #[test]
    fn rejects_shell_metacharacters() {
        for raw in ["/tmp/x; rm -rf ~", "https://e.com/$(id)", "a|b", "`whoami`", "x\ny"] {
            assert!(check_reference(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn url_scheme_must_be_http_family() {
        let err = check_url("ftp://files.example.com/a.md", &config()).unwrap_err();
        assert!(err.to_string().contains("scheme"));
        assert!(check_url("file:///etc/passwd", &config()).is_err());
        assert!(check_url("https://example.com/a.md", &config()).is_ok());
        assert!(check_url("HTTP://example.com/a.md", &config()).is_ok());
    }

    #[test]
    fn blocks_loopback_and_private_hosts() {
        for raw in [
            "http://localhost/x",
            "http://LOCALHOST:8080/x",
            "http://api.localhost/x",
            "http://127.0.0.1/x",
            "http://127.8.8.8/x",
            "http://0.0.0.0/x",
            "http://[::1]/x",
            "http://[::ffff:10.0.0.1]/x",
            "http://10.1.2.3/x",
            "http://172.16.0.1/x",
            "http://172.31.255.255/x",
            "http://192.168.1.1/x",
            "http://169.254.169.254/latest/meta-data",
            "http://[fd00::1]/x",
            "http://[fe80::1]/x",
        ] {
            let err = check_url(raw, &config()).unwrap_err();
            assert!(matches!(err, DojoError::SecurityViolation { .. }), "{raw}");
        }
    }

    #[test]
    fn public_addresses_pass() {
        assert!(check_url("http://172.32.0.1/x", &config()).is_ok());
        assert!(check_url("https://8.8.8.8/x", &config()).is_ok());
        assert!(check_url("https://raw.githubusercontent.com/a/b/main/x.md", &config()).is_ok());
    }

    #[test]
    fn configured_hosts_are_blocked() {
        let mut cfg = config();
        cfg.blocked_hosts.push("intranet.corp".into());
        assert!(check_url("https://intranet.corp/a", &cfg).is_err());
    }

    #[test]
    fn size_check_reports_both_sizes() {
        check_size(10, 10, "a.md").unwrap();
        let err = check_size(2048, 1024, "a.md").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("1.0 KB"));
        assert!(text.contains("2.0 KB"));
    }

    #[test]
    fn sanitize_strips_dirs_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("dir\\evil name!.md"), "evil_name_.md");
        assert_eq!(sanitize_filename("デプロイ.md"), "デプロイ.md");
        assert_eq!(sanitize_filename(""), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_filename("a/"), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_filename(".."), DEFAULT_FILE_NAME);
    }

    #[test]
    fn safe_relative_path_rejects_escape() {
        assert_eq!(
            safe_relative_path(Path::new("pkg/scripts/run me.sh")),
            Some(PathBuf::from("pkg/scripts/run_me.sh"))
        );
        assert_eq!(safe_relative_path(Path::new("./a.md")), Some(PathBuf::from("a.md")));
        assert_eq!(safe_relative_path(Path::new("../a.md")), None);
        assert_eq!(safe_relative_path(Path::new("/abs/a.md")), None);
        assert_eq!(safe_relative_path(Path::new("")), None);
    }

    #[test]
    fn resolve_local_canonicalizes() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.md"), "# A").unwrap();
        let raw = format!("{}/./a.md", temp.path().display());
        let resolved = resolve_local(&raw, &config().denied_local_roots).unwrap();
        assert_eq!(resolved, temp.path().canonicalize().unwrap().join("a.md"));
    }

    #[test]
    fn resolve_local_missing_is_not_found() {
        let err = resolve_local("/definitely/not/here.md", &[]).unwrap_err();
        assert!(matches!(err, DojoError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_local_follows_symlink_into_denied_root() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("innocent");
        std::os::unix::fs::symlink("/etc", &link).unwrap();

        let err = resolve_local(&link.display().to_string(), &config().denied_local_roots)
            .unwrap_err();
        assert!(matches!(err, DojoError::SecurityViolation { .. }));
    }

    #[test]
    fn resolve_local_rejects_filesystem_root() {
        assert!(resolve_local("/", &[]).is_err());
    }
}
