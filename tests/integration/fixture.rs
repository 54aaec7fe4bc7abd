use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use dojo_import::config::{Config, FetchConfig};

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a file exists at the given path
#[macro_export]
macro_rules! assert_file_exists {
    ($path:expr) => {
        assert!(
            std::path::Path::new($path).exists(),
            "Expected file to exist: {:?}",
            $path
        );
    };
}

/// Assert that a file contains expected content
#[macro_export]
macro_rules! assert_file_contains {
    ($path:expr, $expected:expr) => {{
        let content = std::fs::read_to_string($path).expect(&format!("Failed to read {:?}", $path));
        assert!(
            content.contains($expected),
            "File {:?} does not contain '{}'\nActual content:\n{}",
            $path,
            $expected,
            &content[..std::cmp::min(content.len(), 500)]
        );
    }};
}

/// Assert command exit code
#[macro_export]
macro_rules! assert_exit_code {
    ($output:expr, $code:expr) => {
        assert_eq!(
            $output.exit_code, $code,
            "Expected exit code {} but got {}\nstdout: {}\nstderr: {}",
            $code, $output.exit_code, $output.stdout, $output.stderr
        );
    };
}

pub const DEPLOY_DOC: &str = "# Deploy Service\n\n- Purpose: Ship the service to production\n- Scope: Backend services\n\n## Workflow\n\nStep 1: build the image with `docker`\nStep 2: roll it out with kubectl\n";

pub const REVIEWER_DOC: &str = "# Security Reviewer\n\nA domain expert that reviews code for leaked credentials.\n";

/// Isolated home, source and catalog directories for one test.
pub struct TestFixture {
    /// Root temp directory
    pub temp_dir: TempDir,
    pub root: PathBuf,
    /// Where source bundles are laid out
    pub sources: PathBuf,
    /// Catalog root holding `skills/` and `agents/`
    pub catalog: PathBuf,
    pub config_path: PathBuf,
    test_name: String,
}

impl TestFixture {
    pub fn new(test_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let sources = root.join("sources");
        let catalog = root.join("catalog");
        let config_path = root.join("dojo.toml");

        std::fs::create_dir_all(&sources).expect("Failed to create sources dir");
        std::fs::create_dir_all(&catalog).expect("Failed to create catalog dir");
        // temp dirs may live under a denied root on some hosts
        std::fs::write(&config_path, "[fetch]\ndenied_local_roots = [\"/proc\"]\n")
            .expect("Failed to write config");

        println!("\n{}", "=".repeat(70));
        println!("[FIXTURE] Test: {test_name}");
        println!("[FIXTURE] Root: {root:?}");
        println!("{}", "=".repeat(70));

        Self {
            temp_dir,
            root,
            sources,
            catalog,
            config_path,
            test_name: test_name.to_string(),
        }
    }

    /// Lay out a source bundle under `sources/{name}` and return its path.
    pub fn source(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.sources.join(name);
        write_tree(&dir, files);
        dir
    }

    /// Library config matching what the CLI reads from `config_path`.
    pub fn config(&self) -> Config {
        Config {
            fetch: FetchConfig {
                denied_local_roots: vec!["/proc".to_string()],
                ..FetchConfig::default()
            },
            ..Config::default()
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Run the dojo CLI with the fixture's home and config
    pub fn run_dojo(&self, args: &[&str]) -> CommandOutput {
        self.run_dojo_with_timeout(args, Duration::from_secs(60))
    }

    pub fn run_dojo_with_timeout(&self, args: &[&str], timeout: Duration) -> CommandOutput {
        use std::io::Read;
        use std::process::Stdio;

        let start = std::time::Instant::now();
        println!("\n[CMD] dojo {} (timeout: {:?})", args.join(" "), timeout);

        let mut child = Command::new(env!("CARGO_BIN_EXE_dojo"))
            .arg("--config")
            .arg(&self.config_path)
            .args(args)
            .env("HOME", &self.root)
            .env("XDG_CONFIG_HOME", self.root.join(".config"))
            .env_remove("DOJO_CONFIG")
            .env_remove("RUST_LOG")
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn dojo command");

        let result = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {
                    if start.elapsed() > timeout {
                        let _ = child.kill();
                        break Err("Command timed out".to_string());
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => break Err(format!("Error waiting: {e}")),
            }
        };

        let (success, exit_code, stdout, stderr) = match result {
            Ok(status) => {
                let mut stdout_str = String::new();
                let mut stderr_str = String::new();
                if let Some(mut out) = child.stdout.take() {
                    let _ = out.read_to_string(&mut stdout_str);
                }
                if let Some(mut err) = child.stderr.take() {
                    let _ = err.read_to_string(&mut stderr_str);
                }
                (status.success(), status.code().unwrap_or(-1), stdout_str, stderr_str)
            }
            Err(msg) => (false, -1, String::new(), msg),
        };

        println!("[CMD] Exit code: {exit_code}");
        println!("[CMD] Timing: {:?}", start.elapsed());
        if !stdout.is_empty() {
            println!("[STDOUT]\n{stdout}");
        }
        if !stderr.is_empty() {
            println!("[STDERR]\n{stderr}");
        }

        CommandOutput {
            success,
            exit_code,
            stdout,
            stderr,
        }
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Done: {}", self.test_name);
    }
}

pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, body) in files {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().expect("file has a parent"))
            .expect("Failed to create parent dir");
        std::fs::write(&full, body).expect("Failed to write fixture file");
    }
}

/// Command output structure
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Parse stdout as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).expect("stdout should be valid JSON")
    }
}
