//! Morgue Scheduler
//!
//! Drives the extraction pipeline over a whole archive with bounded
//! concurrency and collects one [`Outcome`](morgue_domain::Outcome) per
//! document.
//!
//! # Overview
//!
//! Each task walks the same path:
//!
//! ```text
//! read → extract → resolve → claim → materialize → Outcome
//! ```
//!
//! - **Skipped**: no identifier, id-only record, or identifier outside the
//!   expected URL shape
//! - **Duplicate**: key already claimed in this run (`id-collision`) or
//!   already on disk (`target-exists`)
//! - **Error**: I/O failure, evaluation timeout or a panicking task
//!
//! Only an unusable source or destination root aborts a run.
//!
//! # Configuration
//!
//! ```toml
//! concurrency = 8
//! extensions = ["html"]
//! dry_run = false
//! ```

#![warn(missing_docs)]

mod config;
mod enumerate;
mod error;
mod metrics;
mod pipeline;
mod scheduler;

pub use config::SchedulerConfig;
pub use enumerate::enumerate_sources;
pub use error::SchedulerError;
pub use metrics::{RunMetrics, RunReport};
pub use pipeline::Pipeline;
pub use scheduler::Scheduler;
