//! Bounded task scheduler

use crate::config::SchedulerConfig;
use crate::enumerate::enumerate_sources;
use crate::error::SchedulerError;
use crate::metrics::{RunMetrics, RunReport};
use crate::pipeline::Pipeline;
use morgue_domain::traits::{DocumentQuery, ScriptEvaluator};
use morgue_domain::Outcome;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{Id, JoinSet};
use tracing::{error, info};

/// Gauge of tasks currently executing, with its high-water mark
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Runs the pipeline over many documents with bounded concurrency
///
/// At most `N` tasks are dispatched at once; every completion dispatches the
/// next pending task. A failing or panicking task only affects its own
/// outcome.
///
/// # Examples
///
/// ```no_run
/// use morgue_domain::Resolver;
/// use morgue_extractor::{ContentExtractor, ExtractorConfig};
/// use morgue_scheduler::{Pipeline, Scheduler, SchedulerConfig};
/// use morgue_store::{JsonRecordStore, StoreConfig};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(
///         ContentExtractor::standard(ExtractorConfig::default()),
///         Resolver::default(),
///         JsonRecordStore::new("out", StoreConfig::default())?,
///     );
///     let scheduler = Scheduler::new(pipeline, SchedulerConfig::default())?;
///
///     let report = scheduler.run(Path::new("archive")).await?;
///     println!("{}", report.metrics.summary());
///     Ok(())
/// }
/// ```
pub struct Scheduler<Q, E>
where
    Q: DocumentQuery,
    E: ScriptEvaluator,
{
    pipeline: Arc<Pipeline<Q, E>>,
    config: SchedulerConfig,
}

impl<Q, E> Scheduler<Q, E>
where
    Q: DocumentQuery + Send + Sync + 'static,
    E: ScriptEvaluator + Send + Sync + 'static,
{
    /// Create a scheduler for one run
    pub fn new(pipeline: Pipeline<Q, E>, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;
        let dry_run = pipeline.is_dry_run() || config.dry_run;
        let pipeline = pipeline.with_dry_run(dry_run);
        Ok(Self {
            pipeline: Arc::new(pipeline),
            config,
        })
    }

    /// Get the scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Pipeline shared by the tasks
    pub fn pipeline(&self) -> &Pipeline<Q, E> {
        &self.pipeline
    }

    /// Enumerate `source_root` and process every document found
    pub async fn run(&self, source_root: &Path) -> Result<RunReport, SchedulerError> {
        let paths = enumerate_sources(source_root, &self.config)?;
        info!(
            "Found {} documents under {}",
            paths.len(),
            source_root.display()
        );
        self.run_paths(paths).await
    }

    /// Process the given documents
    pub async fn run_paths(&self, paths: Vec<PathBuf>) -> Result<RunReport, SchedulerError> {
        if !self.pipeline.is_dry_run() {
            self.pipeline.store().ensure_root()?;
        }

        let started = Instant::now();
        let total = paths.len();
        let limit = self.config.effective_concurrency(total);
        let gauge = Arc::new(InFlight::default());

        let mut metrics = RunMetrics::new();
        metrics.concurrency = limit;
        let mut outcomes = Vec::with_capacity(total);

        info!(
            "Starting run: {} tasks, concurrency {}{}",
            total,
            limit,
            if self.pipeline.is_dry_run() { " (dry run)" } else { "" }
        );

        let mut pending = paths.into_iter();
        let mut running: JoinSet<Outcome> = JoinSet::new();
        let mut dispatched: HashMap<Id, PathBuf> = HashMap::new();

        for path in pending.by_ref().take(limit) {
            self.dispatch(&mut running, &mut dispatched, path, &gauge);
        }

        while let Some(joined) = running.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, outcome)) => {
                    dispatched.remove(&id);
                    outcome
                }
                Err(e) => {
                    let path = dispatched.remove(&e.id()).unwrap_or_default();
                    error!("Task for {} did not complete: {}", path.display(), e);
                    Outcome::Error {
                        path,
                        message: format!("task aborted: {}", e),
                    }
                }
            };

            if let Some(path) = pending.next() {
                self.dispatch(&mut running, &mut dispatched, path, &gauge);
            }

            metrics.record(&outcome);
            info!(
                "({}/{}) {} {}",
                metrics.attempted,
                total,
                outcome.status(),
                outcome.path().display()
            );
            outcomes.push(outcome);
        }

        metrics.peak_in_flight = gauge.peak();
        metrics.elapsed = started.elapsed();
        info!("Run finished:\n{}", metrics.summary());

        Ok(RunReport { metrics, outcomes })
    }

    fn dispatch(
        &self,
        running: &mut JoinSet<Outcome>,
        dispatched: &mut HashMap<Id, PathBuf>,
        path: PathBuf,
        gauge: &Arc<InFlight>,
    ) {
        let pipeline = Arc::clone(&self.pipeline);
        let gauge = Arc::clone(gauge);
        let task_path = path.clone();

        let handle = running.spawn_blocking(move || {
            gauge.enter();
            let outcome = catch_unwind(AssertUnwindSafe(|| pipeline.process(&task_path)))
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    error!("Task for {} panicked: {}", task_path.display(), message);
                    Outcome::Error {
                        path: task_path.clone(),
                        message: format!("panicked: {}", message),
                    }
                });
            gauge.leave();
            outcome
        });
        dispatched.insert(handle.id(), path);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
