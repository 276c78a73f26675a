//! Outcome module - terminal result of processing one document

use crate::CanonicalKey;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a document was reported as a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateReason {
    /// Another task in this run claimed the same key first
    IdCollision,
    /// A record for the key was already on disk before this run wrote it
    TargetExists,
}

impl DuplicateReason {
    /// Reason tag used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::IdCollision => "id-collision",
            DuplicateReason::TargetExists => "target-exists",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a document was deliberately not materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The identifier does not have the expected source-URL shape
    NoMatch,
    /// Fewer than two fields were populated
    EmptyRecord,
    /// No identifier from metadata or the path
    MissingIdentifier,
}

impl SkipReason {
    /// Reason tag used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoMatch => "no-match",
            SkipReason::EmptyRecord => "empty-record",
            SkipReason::MissingIdentifier => "missing-identifier",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged result per task. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// The record was materialized
    Success {
        /// Source document
        path: PathBuf,
        /// Canonical key the record was stored under
        key: CanonicalKey,
        /// Written file (or the would-be target in dry-run mode)
        target: PathBuf,
    },
    /// The record was not written because its key was already taken
    Duplicate {
        /// Source document
        path: PathBuf,
        /// Contested canonical key
        key: CanonicalKey,
        /// Collision kind
        reason: DuplicateReason,
    },
    /// The document was not applicable
    Skipped {
        /// Source document
        path: PathBuf,
        /// Skip kind
        reason: SkipReason,
        /// Identifier the decision was made on, when one was found
        #[serde(skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },
    /// The task failed (I/O, evaluation timeout, panic)
    Error {
        /// Source document
        path: PathBuf,
        /// Human-readable failure
        message: String,
    },
}

impl Outcome {
    /// Source document the outcome belongs to
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Success { path, .. }
            | Outcome::Duplicate { path, .. }
            | Outcome::Skipped { path, .. }
            | Outcome::Error { path, .. } => path,
        }
    }

    /// Canonical key, when one was resolved
    pub fn key(&self) -> Option<&CanonicalKey> {
        match self {
            Outcome::Success { key, .. } | Outcome::Duplicate { key, .. } => Some(key),
            Outcome::Skipped { .. } | Outcome::Error { .. } => None,
        }
    }

    /// Short status tag
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Duplicate { .. } => "duplicate",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Error { .. } => "error",
        }
    }

    /// Human-readable reason tag, empty for successes
    pub fn reason(&self) -> String {
        match self {
            Outcome::Success { .. } => String::new(),
            Outcome::Duplicate { reason, .. } => reason.to_string(),
            Outcome::Skipped { reason, .. } => reason.to_string(),
            Outcome::Error { message, .. } => message.clone(),
        }
    }

    /// Key or identifier for follow-up, when known
    pub fn subject(&self) -> Option<String> {
        match self {
            Outcome::Success { key, .. } | Outcome::Duplicate { key, .. } => {
                Some(key.canonical_url())
            }
            Outcome::Skipped { identifier, .. } => identifier.clone(),
            Outcome::Error { .. } => None,
        }
    }

    /// Whether the record was materialized
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
