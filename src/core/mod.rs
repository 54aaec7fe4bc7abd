//! Pipeline records and shared document conventions

pub mod markdown;
pub mod outcome;
pub mod types;

pub use outcome::{Assessed, SoftIssue, SoftIssueKind};
pub use types::{
    AnalysisRecord, AutonomyLevel, Characteristics, FetchedBundle, NamingDecision, OriginKind,
    ResourceKind, SkippedEntry, SubType,
};
