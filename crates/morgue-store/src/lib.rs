//! Morgue Storage Layer
//!
//! Output side of the pipeline: the run-scoped [`DedupIndex`] that admits at
//! most one writer per canonical key, and the [`JsonRecordStore`] that writes
//! one pretty-printed JSON file per key.
//!
//! # Layout
//!
//! ```text
//! <root>/<category>/<date>/<hash>/index.json
//! ```
//!
//! Writes go to a temporary file in the target directory and are renamed
//! into place without replacing anything already there.
//!
//! # Examples
//!
//! ```no_run
//! use morgue_domain::{ExtractedRecord, Resolver};
//! use morgue_store::{Claim, DedupIndex, JsonRecordStore, StoreConfig};
//!
//! let store = JsonRecordStore::new("out", StoreConfig::default()).unwrap();
//! let index = DedupIndex::new();
//! let key = Resolver::default()
//!     .resolve("https://tw.appledaily.com/local/20200505/HASH/")
//!     .unwrap();
//!
//! if index.try_claim(&key, &store) == Claim::Claimed {
//!     let mut record = ExtractedRecord::with_id("provisional");
//!     record.headline = Some("H".into());
//!     store.materialize(&key, &record).unwrap();
//!     index.mark_placed(&key);
//! }
//! ```

#![warn(missing_docs)]

mod config;
mod dedup;
mod error;
mod materializer;

pub use config::StoreConfig;
pub use dedup::{Claim, ClaimState, DedupIndex, PersistenceProbe};
pub use error::StoreError;
pub use materializer::JsonRecordStore;
