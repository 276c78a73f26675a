//! Dedup Index: at most one writer per canonical key

use morgue_domain::CanonicalKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Answers whether a key already has a materialized record
pub trait PersistenceProbe {
    /// Whether the output for `key` already exists
    fn has_persisted(&self, key: &CanonicalKey) -> bool;
}

/// Result of trying to claim a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller is the single writer for this key
    Claimed,
    /// Another task in this run already holds or placed the key
    AlreadyClaimed,
    /// Output existed before this run touched the key
    AlreadyPersisted,
}

/// State of a key seen during this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// Claimed, write not finished
    Claimed,
    /// Written by this run
    Placed,
    /// Found on disk when first claimed
    Preexisting,
}

/// Run-scoped set of claimed canonical keys
///
/// Claim checks, including the storage probe, are serialized under one lock,
/// so for any key exactly one caller ever receives [`Claim::Claimed`] unless
/// that caller later [`release`](DedupIndex::release)s it.
#[derive(Debug, Default)]
pub struct DedupIndex {
    entries: Mutex<HashMap<CanonicalKey, ClaimState>>,
}

impl DedupIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the writer for `key`
    pub fn try_claim<P>(&self, key: &CanonicalKey, probe: &P) -> Claim
    where
        P: PersistenceProbe + ?Sized,
    {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(ClaimState::Preexisting) => Claim::AlreadyPersisted,
            Some(ClaimState::Claimed | ClaimState::Placed) => Claim::AlreadyClaimed,
            None if probe.has_persisted(key) => {
                debug!("Key {} already persisted", key);
                entries.insert(key.clone(), ClaimState::Preexisting);
                Claim::AlreadyPersisted
            }
            None => {
                entries.insert(key.clone(), ClaimState::Claimed);
                Claim::Claimed
            }
        }
    }

    /// Record that the claimed key was written
    pub fn mark_placed(&self, key: &CanonicalKey) {
        if let Some(state) = self.lock().get_mut(key) {
            if *state == ClaimState::Claimed {
                *state = ClaimState::Placed;
            }
        }
    }

    /// Give up a claim after a failed write so a later task may retry
    pub fn release(&self, key: &CanonicalKey) {
        let mut entries = self.lock();
        if entries.get(key) == Some(&ClaimState::Claimed) {
            entries.remove(key);
        }
    }

    /// Current state of a key
    pub fn state(&self, key: &CanonicalKey) -> Option<ClaimState> {
        self.lock().get(key).copied()
    }

    /// Number of keys seen
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no key has been seen
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CanonicalKey, ClaimState>> {
        // entries stay consistent across a panicking holder
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
