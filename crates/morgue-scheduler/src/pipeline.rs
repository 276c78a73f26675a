//! Per-document pipeline: read, extract, resolve, claim, materialize

use morgue_domain::traits::{DocumentQuery, ScriptEvaluator};
use morgue_domain::{DuplicateReason, Outcome, Resolver, SkipReason, SourceDocument};
use morgue_extractor::{ContentExtractor, ExtractorError};
use morgue_store::{Claim, DedupIndex, JsonRecordStore, StoreError};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Everything one task needs, shared by all workers of a run
///
/// The [`DedupIndex`] lives here, so a pipeline is scoped to a single run.
pub struct Pipeline<Q, E>
where
    Q: DocumentQuery,
    E: ScriptEvaluator,
{
    extractor: ContentExtractor<Q, E>,
    resolver: Resolver,
    index: DedupIndex,
    store: JsonRecordStore,
    dry_run: bool,
}

impl<Q, E> Pipeline<Q, E>
where
    Q: DocumentQuery,
    E: ScriptEvaluator,
{
    /// Create a pipeline with an empty dedup index
    pub fn new(extractor: ContentExtractor<Q, E>, resolver: Resolver, store: JsonRecordStore) -> Self {
        Self {
            extractor,
            resolver,
            index: DedupIndex::new(),
            store,
            dry_run: false,
        }
    }

    /// Claim keys but skip writing
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Dedup index of this run
    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    /// Destination store
    pub fn store(&self) -> &JsonRecordStore {
        &self.store
    }

    /// Process the document at `path` into its terminal outcome
    pub fn process(&self, path: &Path) -> Outcome {
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                self.process_document(&SourceDocument::new(path, text))
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Outcome::Error {
                    path: path.to_path_buf(),
                    message: format!("read failed: {}", e),
                }
            }
        }
    }

    /// Process an already loaded document
    pub fn process_document(&self, doc: &SourceDocument) -> Outcome {
        let path = doc.path().to_path_buf();

        let record = match self.extractor.extract(doc) {
            Ok(record) => record,
            Err(ExtractorError::MissingIdentifier) => {
                return Outcome::Skipped {
                    path,
                    reason: SkipReason::MissingIdentifier,
                    identifier: None,
                }
            }
            Err(ExtractorError::EmptyRecord { id }) => {
                return Outcome::Skipped {
                    path,
                    reason: SkipReason::EmptyRecord,
                    identifier: Some(id),
                }
            }
            Err(e) => {
                warn!("Extraction failed for {}: {}", path.display(), e);
                return Outcome::Error {
                    path,
                    message: e.to_string(),
                };
            }
        };

        let Some(key) = self.resolver.resolve(&record.id) else {
            debug!("No canonical match for '{}' ({})", record.id, path.display());
            return Outcome::Skipped {
                path,
                reason: SkipReason::NoMatch,
                identifier: Some(record.id),
            };
        };

        match self.index.try_claim(&key, &self.store) {
            Claim::Claimed => {}
            Claim::AlreadyClaimed => {
                return Outcome::Duplicate {
                    path,
                    key,
                    reason: DuplicateReason::IdCollision,
                }
            }
            Claim::AlreadyPersisted => {
                return Outcome::Duplicate {
                    path,
                    key,
                    reason: DuplicateReason::TargetExists,
                }
            }
        }

        if self.dry_run {
            self.index.mark_placed(&key);
            let target = self.store.target_path(&key);
            return Outcome::Success { path, key, target };
        }

        match self.store.materialize(&key, &record) {
            Ok(target) => {
                self.index.mark_placed(&key);
                Outcome::Success { path, key, target }
            }
            Err(StoreError::AlreadyExists(_)) => {
                // written by someone outside this run since the claim
                self.index.release(&key);
                Outcome::Duplicate {
                    path,
                    key,
                    reason: DuplicateReason::TargetExists,
                }
            }
            Err(e) => {
                self.index.release(&key);
                warn!("Failed to write {} for {}: {}", key, path.display(), e);
                Outcome::Error {
                    path,
                    message: format!("write failed for {}: {}", key.canonical_url(), e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morgue_domain::traits::EvaluationError;
    use morgue_extractor::{ExtractorConfig, ScriptBlockQuery};
    use morgue_store::StoreConfig;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Evaluator that always runs out of time
    struct StallingEvaluator;

    impl ScriptEvaluator for StallingEvaluator {
        fn evaluate(&self, _: &str, _: &[&str], budget: Duration) -> Result<Value, EvaluationError> {
            Err(EvaluationError::Timeout(budget))
        }
    }

    fn page(id: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{{"mainEntityOfPage":{{"@id":"{}"}},"headline":"H"}}</script></head></html>"#,
            id
        )
    }

    fn pipeline(dest: &Path) -> Pipeline<morgue_extractor::ScriptBlockQuery, morgue_extractor::LiteralEvaluator> {
        Pipeline::new(
            ContentExtractor::standard(ExtractorConfig::default()),
            Resolver::default(),
            JsonRecordStore::new(dest, StoreConfig::default()).unwrap(),
        )
    }

    #[test]
    fn test_success_then_collision() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let html = page("https://tw.appledaily.com/local/20200505/HASH/");

        let first = pipeline.process_document(&SourceDocument::new("a.html", html.clone()));
        let second = pipeline.process_document(&SourceDocument::new("b.html", html));

        assert!(first.is_success());
        assert!(matches!(
            second,
            Outcome::Duplicate {
                reason: DuplicateReason::IdCollision,
                ..
            }
        ));
    }

    #[test]
    fn test_no_match_is_skipped() {
        let dir = TempDir::new().unwrap();
        let outcome = pipeline(dir.path()).process_document(&SourceDocument::new(
            "a.html",
            page("https://example.com/not/an/article"),
        ));
        assert_eq!(
            outcome,
            Outcome::Skipped {
                path: "a.html".into(),
                reason: SkipReason::NoMatch,
                identifier: Some("https://example.com/not/an/article".to_string()),
            }
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path()).with_dry_run(true);
        let outcome = pipeline.process_document(&SourceDocument::new(
            "a.html",
            page("https://tw.appledaily.com/local/20200505/HASH/"),
        ));

        let Outcome::Success { target, .. } = &outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert!(target.ends_with("local/20200505/HASH/index.json"));
        assert!(!target.exists());
    }

    #[test]
    fn test_evaluation_timeout_is_error() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            ContentExtractor::new(ScriptBlockQuery::new(), StallingEvaluator, ExtractorConfig::default()),
            Resolver::default(),
            JsonRecordStore::new(dir.path(), StoreConfig::default()).unwrap(),
        );
        let html = page("https://tw.appledaily.com/local/20200505/HASH/").replace(
            "</head>",
            r#"</head><body><script id="fusion-metadata">Fusion.globalContent={};</script></body>"#,
        );

        let outcome = pipeline.process_document(&SourceDocument::new("a.html", html));

        let Outcome::Error { message, .. } = &outcome else {
            panic!("expected error, got {:?}", outcome);
        };
        assert!(message.contains("exceeded"));
        assert!(pipeline.index().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_failure_names_key() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let pipeline = pipeline(&blocker);

        let outcome = pipeline.process_document(&SourceDocument::new(
            "a.html",
            page("https://tw.appledaily.com/local/20200505/HASH/"),
        ));

        let Outcome::Error { message, .. } = &outcome else {
            panic!("expected error, got {:?}", outcome);
        };
        assert!(message.starts_with("write failed for https://tw.appledaily.com/local/20200505/HASH/"));
        assert!(pipeline.index().is_empty(), "failed claim is released");
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let dir = TempDir::new().unwrap();
        let outcome = pipeline(dir.path()).process(&dir.path().join("missing.html"));
        assert_eq!(outcome.status(), "error");
    }
}
