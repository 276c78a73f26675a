//! The `morgue` run: wire the configured stages together and drive them.

use crate::config::Config;
use crate::error::Result;
use morgue_domain::Resolver;
use morgue_extractor::ContentExtractor;
use morgue_scheduler::{Pipeline, RunReport, Scheduler};
use morgue_store::JsonRecordStore;
use std::path::Path;
use tracing::debug;

/// Process every document under `source` into `dest`.
///
/// Per-document failures end up in the report; only configuration problems
/// and unusable roots are returned as errors.
pub async fn execute_run(source: &Path, dest: &Path, config: &Config) -> Result<RunReport> {
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let extractor = ContentExtractor::standard(config.extractor.clone());
    let resolver = Resolver::new(config.resolver.clone());
    let store = JsonRecordStore::new(dest, config.store.clone())?;

    let pipeline = Pipeline::new(extractor, resolver, store);
    let scheduler = Scheduler::new(pipeline, config.scheduler.clone())?;

    Ok(scheduler.run(source).await?)
}
