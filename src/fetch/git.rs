//! Shallow clones for hosted and generic git repositories.

use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};

use git2::build::RepoBuilder;
use git2::{FetchOptions, RemoteCallbacks};
use tracing::info;

use crate::error::{DojoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    TooLarge,
    Deadline,
}

/// Clone `url` at depth 1 into `dest`, aborting once the transfer passes
/// `max_bytes` or runs past `timeout`.
pub fn shallow_clone(url: &str, dest: &Path, max_bytes: u64, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let abort = Cell::new(None);

    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|progress| {
        if progress.received_bytes() as u64 > max_bytes {
            abort.set(Some(Abort::TooLarge));
            return false;
        }
        if Instant::now() > deadline {
            abort.set(Some(Abort::Deadline));
            return false;
        }
        true
    });

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    // libgit2's local transport has no shallow support
    if !url.starts_with("file://") {
        fetch.depth(1);
    }

    info!(url, "cloning repository");
    let result = RepoBuilder::new().fetch_options(fetch).clone(url, dest);

    match (result, abort.get()) {
        (Ok(_), _) => Ok(()),
        (Err(_), Some(Abort::TooLarge)) => Err(DojoError::security(
            format!("repository exceeds size limit of {max_bytes} bytes"),
            url,
        )),
        (Err(_), Some(Abort::Deadline)) => Err(DojoError::Timeout(format!(
            "clone of {url} exceeded {}s",
            timeout.as_secs()
        ))),
        (Err(err), None) if err.code() == git2::ErrorCode::NotFound => {
            Err(DojoError::NotFound(url.to_string()))
        }
        (Err(err), None) => Err(DojoError::Git(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) {
        let repo = git2::Repository::init(dir).unwrap();
        std::fs::write(dir.join("AGENT.md"), "# Reviewer\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("AGENT.md")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
    }

    #[test]
    fn clones_local_repository() {
        let source = TempDir::new().unwrap();
        init_repo(source.path());

        let dest = TempDir::new().unwrap();
        let target = dest.path().join("clone");
        let url = format!("file://{}", source.path().display());
        shallow_clone(&url, &target, 10 * 1024 * 1024, Duration::from_secs(30)).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("AGENT.md")).unwrap(),
            "# Reviewer\n"
        );
    }

    #[test]
    fn missing_repository_fails() {
        let dest = TempDir::new().unwrap();
        let err = shallow_clone(
            "file:///definitely/not/a/repo",
            &dest.path().join("clone"),
            1024,
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, DojoError::NotFound(_) | DojoError::Git(_)));
    }
}
