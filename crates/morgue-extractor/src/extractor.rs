//! Core ContentExtractor implementation

use crate::body::{clean_fragments, collect_content_elements, scan_content_elements};
use crate::config::{BodyStrategy, ExtractorConfig};
use crate::error::ExtractorError;
use crate::linked_data::{parse_linked_data, LinkedDataMetadata};
use crate::literal::LiteralEvaluator;
use crate::query::ScriptBlockQuery;
use morgue_domain::traits::{DocumentQuery, ElementSelector, EvaluationError, ScriptEvaluator};
use morgue_domain::{ExtractedRecord, SourceDocument};
use std::path::{Component, Path};
use tracing::{debug, warn};

/// Globals pre-bound for body script evaluation
const BODY_GLOBALS: [&str; 2] = ["window", "Fusion"];

/// Trailing path segment dropped from path-derived identifiers
const INDEX_FILE: &str = "index.html";

/// Turns one archived page into an [`ExtractedRecord`]
///
/// Stateless between calls; one instance is shared by all workers.
pub struct ContentExtractor<Q, E>
where
    Q: DocumentQuery,
    E: ScriptEvaluator,
{
    query: Q,
    evaluator: E,
    config: ExtractorConfig,
}

impl ContentExtractor<ScriptBlockQuery, LiteralEvaluator> {
    /// Extractor backed by the built-in query and literal evaluator
    pub fn standard(config: ExtractorConfig) -> Self {
        let evaluator = LiteralEvaluator::new(config.max_nesting_depth);
        Self::new(ScriptBlockQuery::new(), evaluator, config)
    }
}

impl<Q, E> ContentExtractor<Q, E>
where
    Q: DocumentQuery,
    E: ScriptEvaluator,
{
    /// Create an extractor from its capabilities
    pub fn new(query: Q, evaluator: E, config: ExtractorConfig) -> Self {
        Self {
            query,
            evaluator,
            config,
        }
    }

    /// Get the extractor configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a record from a document
    ///
    /// Metadata and body failures only empty their own contribution. The
    /// record is rejected when no identifier can be found, when it carries
    /// nothing beyond its identifier, or when body evaluation runs out of time.
    pub fn extract(&self, doc: &SourceDocument) -> Result<ExtractedRecord, ExtractorError> {
        let metadata = self.extract_metadata(doc);

        let id = match metadata.identifier() {
            Some(id) => id.to_string(),
            None => {
                let fallback = self
                    .path_identifier(doc.path())
                    .ok_or(ExtractorError::MissingIdentifier)?;
                debug!(
                    "No metadata identifier in {}, using path '{}'",
                    doc.path().display(),
                    fallback
                );
                fallback
            }
        };

        let raw_content = self.extract_body(doc)?;

        let record = ExtractedRecord {
            id,
            section: metadata.section,
            description: metadata.description,
            date_modified: metadata.date_modified,
            date_published: metadata.date_published,
            headline: metadata.headline,
            keywords: metadata.keywords,
            raw_content,
            author: metadata.author,
        };

        if !record.is_worth_persisting() {
            return Err(ExtractorError::EmptyRecord { id: record.id });
        }

        debug!(
            "Extracted '{}' from {} ({} fields, {} fragments)",
            record.id,
            doc.path().display(),
            record.populated_fields(),
            record.raw_content.len()
        );
        Ok(record)
    }

    /// Metadata from the linked-data blocks
    ///
    /// The first block carrying an identifier wins; otherwise the first block
    /// that parsed at all. Malformed blocks are logged and skipped.
    fn extract_metadata(&self, doc: &SourceDocument) -> LinkedDataMetadata {
        let selector = ElementSelector::tag("script").with_attribute("type", "application/ld+json");
        let mut fallback: Option<LinkedDataMetadata> = None;

        for block in self.query.select_all(doc.raw_text(), &selector) {
            match parse_linked_data(&block) {
                Ok(metadata) if metadata.identifier().is_some() => return metadata,
                Ok(metadata) => {
                    fallback.get_or_insert(metadata);
                }
                Err(e) => warn!("Skipping linked data in {}: {}", doc.path().display(), e),
            }
        }

        fallback.unwrap_or_default()
    }

    /// Cleaned body fragments from the client-state script
    fn extract_body(&self, doc: &SourceDocument) -> Result<Vec<String>, ExtractorError> {
        let selector =
            ElementSelector::tag("script").with_attribute("id", self.config.body_script_id.as_str());
        let Some(script) = self.query.select_first(doc.raw_text(), &selector) else {
            debug!("No body script in {}", doc.path().display());
            return Ok(Vec::new());
        };

        let fragments = match self.config.body_strategy {
            BodyStrategy::PatternScan => scan_content_elements(&script, &self.config.content_kinds),
            BodyStrategy::Evaluate => {
                match self.evaluator.evaluate(
                    &script,
                    &BODY_GLOBALS,
                    self.config.evaluation_timeout(),
                ) {
                    Ok(graph) => collect_content_elements(&graph, &self.config.content_kinds),
                    Err(e @ EvaluationError::Timeout(_)) => return Err(e.into()),
                    Err(e) => {
                        warn!(
                            "Body script evaluation failed for {}: {}",
                            doc.path().display(),
                            e
                        );
                        Vec::new()
                    }
                }
            }
        };

        Ok(clean_fragments(fragments, &self.config.sentinels))
    }

    /// Provisional identifier from the document path
    fn path_identifier(&self, path: &Path) -> Option<String> {
        let relative = self
            .config
            .path_prefix
            .as_deref()
            .and_then(|prefix| path.strip_prefix(prefix).ok())
            .unwrap_or(path);

        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if segments.last().is_some_and(|last| last == INDEX_FILE) {
            segments.pop();
        }

        let id = segments.join("/");
        let id = id.trim_matches('/');
        (!id.is_empty()).then(|| id.to_string())
    }
}
