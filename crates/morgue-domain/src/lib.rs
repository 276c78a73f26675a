//! Morgue Domain Layer
//!
//! Core value objects and capability interfaces for the archive pipeline.
//! Everything here is pure: no file system access, no threads, no logging.
//!
//! ## Key Concepts
//!
//! - **SourceDocument**: one archived HTML page, read once by one worker
//! - **ExtractedRecord**: the normalized article record written to the store
//! - **CanonicalKey**: `(category, date, hash)` identity derived from the source URL
//! - **Outcome**: the terminal result of processing one document
//!
//! ## Architecture
//!
//! Infrastructure (HTML selection, script evaluation, storage) lives in other
//! crates and plugs in through the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod outcome;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use canonical::{CanonicalKey, Resolver, ResolverConfig};
pub use outcome::{DuplicateReason, Outcome, SkipReason};
pub use record::{ExtractedRecord, SourceDocument, TextValue};
