//! Values that come with a list of soft issues.
//!
//! Stages that never fail still need to tell callers when they fell back to
//! defaults. They return [`Assessed<T>`] instead of logging and moving on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftIssueKind {
    /// No candidate primary document was found in the bundle.
    MissingPrimaryDocument,
    /// A document exists but could not be read.
    UnreadableDocument,
    /// A metadata field was not found and a default was used.
    FieldDefaulted,
    /// A catalog entry was skipped during comparison.
    UnprofiledEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftIssue {
    pub kind: SoftIssueKind,
    pub message: String,
}

impl SoftIssue {
    pub fn new(kind: SoftIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessed<T> {
    pub value: T,
    #[serde(default)]
    pub issues: Vec<SoftIssue>,
}

impl<T> Assessed<T> {
    pub const fn confident(value: T) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    pub const fn with_issues(value: T, issues: Vec<SoftIssue>) -> Self {
        Self { value, issues }
    }

    /// True when nothing was defaulted or skipped.
    #[must_use]
    pub fn is_confident(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn has_issue(&self, kind: SoftIssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
