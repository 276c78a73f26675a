//! Error types for the Extractor

use morgue_domain::traits::EvaluationError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Linked-data block present but not the expected structure
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// No identifier from metadata or the document path
    #[error("No identifier in metadata or path")]
    MissingIdentifier,

    /// Fewer than two fields populated
    #[error("Record for '{id}' carries nothing beyond its identifier")]
    EmptyRecord {
        /// Identifier of the discarded record
        id: String,
    },

    /// Body script evaluation failed
    #[error("Evaluation failure: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::MalformedMetadata(e.to_string())
    }
}
