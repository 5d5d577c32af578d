// Live document -> ephemeral state map, shared between the observer,
// restorer, rename/delete handlers and the flush task.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use revisit_common::{DocumentId, EphemeralState};

pub type StateMap = HashMap<DocumentId, EphemeralState>;

/// The working copy.
///
/// Every access takes the lock for a single short critical section and the
/// lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct PositionMap {
    entries: Mutex<StateMap>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: StateMap) -> Self {
        Self { entries: Mutex::new(entries) }
    }

    // Entries are plain values replaced wholesale, so a poisoned lock still
    // guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, StateMap> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, doc: &DocumentId) -> Option<EphemeralState> {
        self.lock().get(doc).copied()
    }

    pub fn contains(&self, doc: &DocumentId) -> bool {
        self.lock().contains_key(doc)
    }

    pub fn insert(&self, doc: DocumentId, state: EphemeralState) -> Option<EphemeralState> {
        self.lock().insert(doc, state)
    }

    pub fn remove(&self, doc: &DocumentId) -> Option<EphemeralState> {
        self.lock().remove(doc)
    }

    /// Move the entry at `from` to `to`, replacing whatever `to` held.
    /// Returns false (and leaves the map untouched) when `from` has no entry.
    pub fn rename(&self, from: &DocumentId, to: DocumentId) -> bool {
        let mut entries = self.lock();
        match entries.remove(from) {
            Some(state) => {
                entries.insert(to, state);
                true
            }
            None => false,
        }
    }

    /// Keep only entries for which `keep` returns true. Returns the removed ids.
    pub fn retain(&self, mut keep: impl FnMut(&DocumentId) -> bool) -> Vec<DocumentId> {
        let mut removed = Vec::new();
        self.lock().retain(|doc, _| {
            let kept = keep(doc);
            if !kept {
                removed.push(doc.clone());
            }
            kept
        });
        removed.sort();
        removed
    }

    /// Run `f` with exclusive access, for read-compare-write sequences.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut StateMap) -> R) -> R {
        f(&mut self.lock())
    }

    /// Consistent copy of the whole map at this instant.
    pub fn snapshot(&self) -> StateMap {
        self.lock().clone()
    }

    pub fn replace(&self, entries: StateMap) {
        *self.lock() = entries;
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
