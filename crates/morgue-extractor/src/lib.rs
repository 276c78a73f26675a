//! Morgue Extractor
//!
//! Recovers a normalized [`ExtractedRecord`](morgue_domain::ExtractedRecord)
//! from an archived article page.
//!
//! # Overview
//!
//! A page carries its article in two unrelated encodings:
//!
//! - a JSON-LD block (`<script type="application/ld+json">`) with the
//!   identifier, headline, dates and keywords
//! - a client-state script (`<script id="fusion-metadata">`) that assigns
//!   nested object literals, among them the body's `content_elements`
//!
//! Both are read independently and merged into one record. Either may be
//! missing or broken; the record survives as long as it carries something
//! beyond its identifier.
//!
//! # Architecture
//!
//! ```text
//! HTML → ScriptBlockQuery ─┬─ ld+json ──────────────→ LinkedDataMetadata ─┐
//!                          └─ fusion-metadata ─┬─ LiteralEvaluator ─┐     ├→ ExtractedRecord
//!                                              └─ pattern scan ─────┴─ clean ┘
//! ```
//!
//! # Example Usage
//!
//! ```
//! use morgue_domain::SourceDocument;
//! use morgue_extractor::{ContentExtractor, ExtractorConfig};
//!
//! let html = r#"<html><head>
//! <script type="application/ld+json">
//! {"mainEntityOfPage":{"@id":"https://tw.appledaily.com/local/20200505/HASH/"},"headline":"H"}
//! </script>
//! </head></html>"#;
//!
//! let extractor = ContentExtractor::standard(ExtractorConfig::default());
//! let record = extractor
//!     .extract(&SourceDocument::new("local/index.html", html))
//!     .unwrap();
//! assert_eq!(record.id, "https://tw.appledaily.com/local/20200505/HASH/");
//! ```

#![warn(missing_docs)]

mod body;
mod config;
mod error;
mod extractor;
mod linked_data;
mod literal;
mod query;


pub use body::{clean_fragments, collect_content_elements, scan_content_elements};
pub use config::{BodyStrategy, ExtractorConfig};
pub use error::ExtractorError;
pub use extractor::ContentExtractor;
pub use linked_data::{parse_linked_data, LinkedDataMetadata};
pub use literal::LiteralEvaluator;
pub use query::ScriptBlockQuery;
