//! Dependency presence checks for an imported resource.
//!
//! Dependencies are gathered the same way the analyzer finds them, split by
//! ecosystem, then probed on the local machine. The report is advisory.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use which::which;

use crate::analyze::deps;
use crate::config::RequirementsConfig;
use crate::core::markdown::code_fences;
use crate::error::{DojoError, Result};
use crate::utils::fs::read_lossy;

const DOCUMENTS: &[&str] = &["SKILL.md", "AGENT.md", "README.md"];
const SCRIPT_DIRS: &[&str] = &["scripts", "bin", "tools", "verification"];
const POLL_INTERVAL: Duration = Duration::from_millis(25);

static BACKTICK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([\w-]+)`").expect("valid regex"));
static PIP_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Version:\s*(\S+)").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    pub cli_tools: BTreeSet<String>,
    pub python_packages: BTreeSet<String>,
    pub npm_packages: BTreeSet<String>,
}

impl DependencySet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cli_tools.is_empty() && self.python_packages.is_empty() && self.npm_packages.is_empty()
    }

    fn add_document(&mut self, content: &str) {
        if let Some(section) = deps::dependency_section(content) {
            for tool in deps::cli_tools(section) {
                self.cli_tools.insert(tool.to_string());
            }
            for caps in BACKTICK_NAME_RE.captures_iter(section) {
                let name = &caps[1];
                if !deps::KNOWN_CLI_TOOLS.contains(&name) {
                    self.python_packages.insert(name.to_string());
                }
            }
        }

        for fence in code_fences(content) {
            match fence.lang.split_whitespace().next().unwrap_or_default() {
                "bash" | "sh" | "shell" | "zsh" => self.add_shell(&fence.body),
                "python" | "py" => self.add_python(&fence.body),
                _ => {}
            }
        }
    }

    fn add_shell(&mut self, code: &str) {
        for tool in deps::cli_tools(code) {
            self.cli_tools.insert(tool.to_string());
        }
    }

    fn add_python(&mut self, code: &str) {
        self.python_packages.extend(deps::python_imports(code));
    }

    fn add_javascript(&mut self, code: &str) {
        self.npm_packages.extend(deps::js_imports(code));
    }
}

/// Collect dependencies from the resource's documents and script trees.
#[must_use]
pub fn collect_dependencies(root: &Path) -> DependencySet {
    let mut set = DependencySet::default();

    for doc in DOCUMENTS {
        let path = root.join(doc);
        if !path.is_file() {
            continue;
        }
        match read_lossy(&path) {
            Ok(content) => set.add_document(&content),
            Err(err) => warn!(file = %path.display(), error = %err, "skipping unreadable document"),
        }
    }

    for dir in SCRIPT_DIRS {
        let base = root.join(dir);
        if !base.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&base).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) if entry.file_type().is_file() => entry,
                Ok(_) => continue,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !matches!(ext.as_str(), "py" | "sh" | "js") {
                continue;
            }
            let content = match read_lossy(entry.path()) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %entry.path().display(), error = %err, "skipping unreadable script");
                    continue;
                }
            };
            match ext.as_str() {
                "py" => set.add_python(&content),
                "sh" => set.add_shell(&content),
                _ => set.add_javascript(&content),
            }
        }
    }

    set
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    pub installed: bool,
    /// False when the probe could not run at all (e.g. no package manager).
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DependencyStatus {
    #[must_use]
    pub fn installed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            installed: true,
            checked: true,
            path: None,
            version: None,
            note: None,
        }
    }

    #[must_use]
    pub fn missing(name: &str) -> Self {
        Self {
            installed: false,
            ..Self::installed(name)
        }
    }

    #[must_use]
    pub fn unchecked(name: &str, note: impl Into<String>) -> Self {
        Self {
            checked: false,
            note: Some(note.into()),
            ..Self::missing(name)
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// How presence is determined for each ecosystem.
pub trait Prober {
    fn cli_tool(&self, name: &str) -> DependencyStatus;
    fn python_package(&self, name: &str) -> DependencyStatus;
    fn npm_package(&self, name: &str) -> DependencyStatus;
}

/// Probes the real machine: `PATH` lookup, `pip show`, `npm list -g`.
#[derive(Debug, Clone)]
pub struct SystemProber {
    timeout: Duration,
    python: Option<PathBuf>,
    npm: Option<PathBuf>,
}

impl SystemProber {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            python: which("python3").or_else(|_| which("python")).ok(),
            npm: which("npm").ok(),
        }
    }
}

impl Prober for SystemProber {
    fn cli_tool(&self, name: &str) -> DependencyStatus {
        match which(name) {
            Ok(path) => DependencyStatus {
                path: Some(path),
                ..DependencyStatus::installed(name)
            },
            Err(_) => DependencyStatus::missing(name),
        }
    }

    fn python_package(&self, name: &str) -> DependencyStatus {
        let Some(python) = &self.python else {
            return DependencyStatus::unchecked(name, "python interpreter not found");
        };
        let mut command = Command::new(python);
        command.args(["-m", "pip", "show", name]);
        match run_with_timeout(command, self.timeout) {
            Ok(Some(probe)) if probe.success => DependencyStatus {
                version: PIP_VERSION_RE
                    .captures(&probe.stdout)
                    .map(|caps| caps[1].to_string()),
                ..DependencyStatus::installed(name)
            },
            Ok(Some(_)) => DependencyStatus::missing(name),
            Ok(None) => DependencyStatus::missing(name).with_note("probe timed out"),
            Err(err) => DependencyStatus::missing(name).with_note(err.to_string()),
        }
    }

    fn npm_package(&self, name: &str) -> DependencyStatus {
        let Some(npm) = &self.npm else {
            return DependencyStatus::unchecked(name, "npm not found");
        };
        let mut command = Command::new(npm);
        command.args(["list", "-g", name]);
        match run_with_timeout(command, self.timeout) {
            Ok(Some(probe)) if probe.success => DependencyStatus::installed(name),
            Ok(Some(_)) => DependencyStatus::missing(name),
            Ok(None) => DependencyStatus::missing(name).with_note("probe timed out"),
            Err(err) => DependencyStatus::missing(name).with_note(err.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct ProbeOutput {
    pub success: bool,
    pub stdout: String,
}

/// Run `command` and wait at most `timeout`. `Ok(None)` means the process was
/// killed at the deadline.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Option<ProbeOutput>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let deadline = Instant::now() + timeout;

    // drained on its own thread so a chatty probe never blocks on a full pipe
    let stdout_handle = child.stdout.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        })
    });

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            if let Err(err) = child.kill() {
                debug!(error = %err, "probe already exited");
            }
            let _ = child.wait();
            // a grandchild may still hold the pipe; leave the reader detached
            drop(stdout_handle);
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = match stdout_handle.map(std::thread::JoinHandle::join) {
        Some(Ok(read)) => String::from_utf8_lossy(&read?).into_owned(),
        Some(Err(_)) => {
            debug!("probe output reader panicked");
            String::new()
        }
        None => String::new(),
    };
    Ok(Some(ProbeOutput {
        success: status.success(),
        stdout,
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsReport {
    pub path: PathBuf,
    pub dependencies: DependencySet,
    pub cli_tools: Vec<DependencyStatus>,
    pub python_packages: Vec<DependencyStatus>,
    pub npm_packages: Vec<DependencyStatus>,
    /// Every checked dependency is installed. Unchecked ones do not count.
    pub all_satisfied: bool,
}

impl RequirementsReport {
    pub fn statuses(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.cli_tools
            .iter()
            .chain(&self.python_packages)
            .chain(&self.npm_packages)
    }

    #[must_use]
    pub fn missing(&self) -> Vec<&DependencyStatus> {
        self.statuses().filter(|s| s.checked && !s.installed).collect()
    }
}

pub struct RequirementsChecker {
    config: RequirementsConfig,
}

impl RequirementsChecker {
    #[must_use]
    pub const fn new(config: RequirementsConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, root: &Path) -> Result<RequirementsReport> {
        let prober = SystemProber::new(Duration::from_secs(self.config.probe_timeout_seconds));
        self.check_with(root, &prober)
    }

    pub fn check_with(&self, root: &Path, prober: &dyn Prober) -> Result<RequirementsReport> {
        if !root.is_dir() {
            return Err(DojoError::NotFound(root.display().to_string()));
        }

        let dependencies = collect_dependencies(root);
        let cli_tools: Vec<_> = dependencies.cli_tools.iter().map(|n| prober.cli_tool(n)).collect();
        let python_packages: Vec<_> = dependencies
            .python_packages
            .iter()
            .map(|n| prober.python_package(n))
            .collect();
        let npm_packages: Vec<_> = dependencies
            .npm_packages
            .iter()
            .map(|n| prober.npm_package(n))
            .collect();

        let mut report = RequirementsReport {
            path: root.to_path_buf(),
            dependencies,
            cli_tools,
            python_packages,
            npm_packages,
            all_satisfied: false,
        };
        report.all_satisfied = report.missing().is_empty();

        info!(
            path = %root.display(),
            dependencies = report.statuses().count(),
            missing = report.missing().len(),
            "requirements checked"
        );
        Ok(report)
    }
}

impl Default for RequirementsChecker {
    fn default() -> Self {
        Self::new(RequirementsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FakeProber {
        installed: Vec<&'static str>,
    }

    impl Prober for FakeProber {
        fn cli_tool(&self, name: &str) -> DependencyStatus {
            if self.installed.contains(&name) {
                DependencyStatus::installed(name)
            } else {
                DependencyStatus::missing(name)
            }
        }

        fn python_package(&self, name: &str) -> DependencyStatus {
            self.cli_tool(name)
        }

        fn npm_package(&self, name: &str) -> DependencyStatus {
            DependencyStatus::unchecked(name, "npm not found")
        }
    }

    fn resource(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, body) in files {
            let full = temp.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, body).unwrap();
        }
        temp
    }

    #[test]
    fn collects_from_documents_and_scripts() {
        let temp = resource(&[
            (
                "SKILL.md",
                "# X\n\n## Dependencies\n- gh\n- `requests`\n- `jq`\n\n## Usage\n\n```python\nimport yaml\n```\n",
            ),
            ("scripts/run.sh", "docker build .\n"),
            ("verification/check.py", "import os\nimport pytest\n"),
            ("tools/fmt.js", "const p = require('prettier');\nimport x from './x';\n"),
            ("bin/notes.txt", "kubectl"),
        ]);

        let set = collect_dependencies(temp.path());
        assert_eq!(
            set.cli_tools.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["docker", "gh", "jq"]
        );
        assert_eq!(
            set.python_packages.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["pytest", "requests", "yaml"]
        );
        assert_eq!(
            set.npm_packages.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["prettier"]
        );
    }

    #[test]
    fn report_marks_missing_and_ignores_unchecked() {
        let temp = resource(&[
            ("SKILL.md", "```bash\ngit status && jq .\n```\n"),
            ("scripts/a.js", "require('left-pad')"),
        ]);
        let prober = FakeProber {
            installed: vec!["git"],
        };
        let report = RequirementsChecker::default()
            .check_with(temp.path(), &prober)
            .unwrap();

        assert!(!report.all_satisfied);
        let missing: Vec<_> = report.missing().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(missing, vec!["jq"]);
        assert!(!report.npm_packages[0].checked);
    }

    #[test]
    fn no_dependencies_is_satisfied() {
        let temp = resource(&[("AGENT.md", "# Plain\n")]);
        let report = RequirementsChecker::default()
            .check_with(temp.path(), &FakeProber { installed: vec![] })
            .unwrap();
        assert!(report.dependencies.is_empty());
        assert!(report.all_satisfied);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = RequirementsChecker::default()
            .check_with(Path::new("/no/such/dir"), &FakeProber { installed: vec![] })
            .unwrap_err();
        assert!(matches!(err, DojoError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn slow_probe_times_out() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5"]);
        let started = Instant::now();
        let out = run_with_timeout(command, Duration::from_millis(100)).unwrap();
        assert!(out.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn fast_probe_captures_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'Version: 1.2.3'"]);
        let out = run_with_timeout(command, Duration::from_secs(5)).unwrap().unwrap();
        assert!(out.success);
        assert_eq!(&PIP_VERSION_RE.captures(&out.stdout).unwrap()[1], "1.2.3");
    }

    #[cfg(unix)]
    #[test]
    fn large_probe_output_does_not_stall() {
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 200000 /dev/zero | tr '\\0' a"]);
        let started = Instant::now();
        let out = run_with_timeout(command, Duration::from_secs(3)).unwrap().unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.len(), 200_000);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
