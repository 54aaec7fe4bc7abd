//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Fetch and security errors
//! - 3xx: Config errors
//! - 5xx: Network and transfer errors
//! - 6xx: Storage errors
//! - 7xx: Git errors
//! - 8xx: Input errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for machine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Fetch errors (1xx)
    /// E101: Blocked scheme, host, path or size
    SecurityViolation,
    /// E102: Source or primary document does not exist
    SourceNotFound,
    /// E103: Source reference matches no retrieval strategy
    SourceUnsupported,

    // Config errors (3xx)
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,

    // Network errors (5xx)
    /// E501: Download or extraction failed
    TransferFailed,
    /// E502: Network transfer or extraction exceeded its deadline
    NetworkTimeout,

    // Storage errors (6xx)
    /// E605: Serialization/deserialization failed
    SerializationError,

    // Git errors (7xx)
    /// E704: Clone or repository operation failed
    GitError,

    // Input errors (8xx)
    /// E801: Caller supplied an unusable argument or record
    InvalidInput,

    // Internal errors (9xx)
    /// E906: Filesystem operation failed
    IoError,
}

impl ErrorCode {
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::SecurityViolation => 101,
            Self::SourceNotFound => 102,
            Self::SourceUnsupported => 103,
            Self::ConfigInvalid => 302,
            Self::TransferFailed => 501,
            Self::NetworkTimeout => 502,
            Self::SerializationError => 605,
            Self::GitError => 704,
            Self::InvalidInput => 801,
            Self::IoError => 906,
        }
    }

    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::SecurityViolation => {
                "Use an http(s) URL on a public host, or a local path outside system directories"
            }
            Self::SourceNotFound => "Check the path or URL exists and is readable",
            Self::SourceUnsupported => {
                "Use a GitHub URL, a gist URL, a .git URL, an http(s) file or archive URL, or a local path"
            }
            Self::ConfigInvalid => "Check TOML syntax in the config file, or run without --config",
            Self::TransferFailed => {
                "Check network connectivity and that the remote file is reachable and under the size limit"
            }
            Self::NetworkTimeout => {
                "The remote server may be slow. Raise fetch.timeout_seconds in the config"
            }
            Self::SerializationError => "The input document may be corrupted. Check it is valid JSON",
            Self::GitError => "Check the repository URL and that it is publicly reachable",
            Self::InvalidInput => "Review the command arguments and input files",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SerializationError)
    }

    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "fetch",
            3 => "config",
            5 => "network",
            6 => "storage",
            7 => "git",
            8 => "input",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::SecurityViolation,
            Self::SourceNotFound,
            Self::SourceUnsupported,
            Self::ConfigInvalid,
            Self::TransferFailed,
            Self::NetworkTimeout,
            Self::SerializationError,
            Self::GitError,
            Self::InvalidInput,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
