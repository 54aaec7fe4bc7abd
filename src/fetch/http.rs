//! Bounded HTTP client shared by every network origin kind.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;

use crate::config::FetchConfig;
use crate::error::{DojoError, Result};
use crate::fetch::guard;

const USER_AGENT: &str = "dojo-import";
const MAX_REDIRECTS: usize = 5;

pub struct HttpClient {
    client: Client,
    token: Option<String>,
    token_bases: Vec<String>,
    max_bytes: u64,
}

impl HttpClient {
    /// Build a client whose redirects are re-checked against the same host
    /// rules as the original reference.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let redirect_config = config.clone();
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match guard::check_url(attempt.url().as_str(), &redirect_config) {
                Ok(_) => attempt.follow(),
                Err(err) => attempt.error(err.to_string()),
            }
        });

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .redirect(policy)
            .build()
            .map_err(|err| DojoError::Transfer(format!("build HTTP client: {err}")))?;

        Ok(Self {
            client,
            token: config.github_token.clone(),
            token_bases: vec![
                config.github_api_base.trim_end_matches('/').to_lowercase(),
                "https://api.github.com".to_string(),
                "https://raw.githubusercontent.com".to_string(),
                "https://gist.githubusercontent.com".to_string(),
            ],
            max_bytes: config.max_transfer_bytes,
        })
    }

    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Only GitHub endpoints ever see the token.
    fn sends_token(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.token_bases
            .iter()
            .any(|base| lower == *base || lower.starts_with(&format!("{base}/")))
    }

    fn send(&self, url: &str, accept: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header("Accept", accept);
        }
        if let Some(token) = self.token.as_ref().filter(|_| self.sends_token(url)) {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|err| {
            if err.is_timeout() {
                DojoError::Timeout(format!("GET {url}: {err}"))
            } else {
                DojoError::Transfer(format!("GET {url}: {err}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DojoError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(DojoError::Transfer(format!("GET {url}: HTTP {status}")));
        }
        Ok(response)
    }

    /// GET a JSON document, bounded by the same size cap as downloads.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url, Some("application/vnd.github+json"))?;
        let bytes = self.read_capped(response, url)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| DojoError::Transfer(format!("parse response from {url}: {err}")))
    }

    /// Stream `url` into `dest`. The partial file is removed on any failure.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self.send(url, None)?;

        if let Some(declared) = response.content_length() {
            guard::check_size(declared, self.max_bytes, url)?;
        }

        let result = self.write_capped(response, url, dest);
        if result.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        result
    }

    fn write_capped(&self, response: Response, url: &str, dest: &Path) -> Result<u64> {
        let mut file = File::create(dest)?;
        let written = std::io::copy(&mut response.take(self.max_bytes + 1), &mut file)
            .map_err(|err| read_error(url, &err))?;
        file.flush()?;
        guard::check_size(written, self.max_bytes, url)?;
        Ok(written)
    }

    fn read_capped(&self, response: Response, url: &str) -> Result<Vec<u8>> {
        if let Some(declared) = response.content_length() {
            guard::check_size(declared, self.max_bytes, url)?;
        }
        let mut bytes = Vec::new();
        response
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| read_error(url, &err))?;
        guard::check_size(bytes.len() as u64, self.max_bytes, url)?;
        Ok(bytes)
    }
}

fn read_error(url: &str, err: &std::io::Error) -> DojoError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        DojoError::Timeout(format!("read {url}: {err}"))
    } else {
        DojoError::Transfer(format!("read {url}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn client_with_limit(max_bytes: u64) -> HttpClient {
        let config = FetchConfig {
            max_transfer_bytes: max_bytes,
            ..FetchConfig::default()
        };
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn downloads_body_to_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/skill.md");
            then.status(200).body("# Skill\n");
        });

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("skill.md");
        let written = client_with_limit(1024)
            .download_to(&server.url("/skill.md"), &dest)
            .unwrap();

        mock.assert();
        assert_eq!(written, 8);
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "# Skill\n");
    }

    #[test]
    fn oversized_body_is_rejected_and_removed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/big.bin");
            then.status(200).body("x".repeat(64));
        });

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("big.bin");
        let err = client_with_limit(16)
            .download_to(&server.url("/big.bin"), &dest)
            .unwrap_err();

        assert!(matches!(err, DojoError::SecurityViolation { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn missing_remote_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone.md");
            then.status(404);
        });

        let temp = TempDir::new().unwrap();
        let err = client_with_limit(1024)
            .download_to(&server.url("/gone.md"), &temp.path().join("gone.md"))
            .unwrap_err();
        assert!(matches!(err, DojoError::NotFound(_)));
    }

    #[test]
    fn server_error_is_transfer_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/boom");
            then.status(500);
        });

        let err = client_with_limit(1024)
            .get_json::<serde_json::Value>(&server.url("/boom"))
            .unwrap_err();
        assert!(matches!(err, DojoError::Transfer(_)));
    }

    #[test]
    fn token_only_sent_to_github_endpoints() {
        let server = MockServer::start();
        let config = FetchConfig {
            github_api_base: server.base_url(),
            github_token: Some("t0ken".into()),
            ..FetchConfig::default()
        };
        let client = HttpClient::new(&config).unwrap();

        assert!(client.sends_token(&server.url("/repos/a/b/contents")));
        assert!(client.sends_token("https://api.github.com/gists/1"));
        assert!(!client.sends_token("https://example.com/file.md"));
        assert!(!client.sends_token("https://api.github.com.evil.io/x"));

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/a/b")
                .header("Authorization", "Bearer t0ken");
            then.status(200).json_body(serde_json::json!({ "ok": true }));
        });
        let value: serde_json::Value = client.get_json(&server.url("/repos/a/b")).unwrap();
        mock.assert();
        assert_eq!(value["ok"], true);
    }
}
