// Persistence of the position map: one JSON object keyed by document id.
//
// The store keeps a copy of what was last written (the last-flushed
// snapshot). A flush whose captured map equals that snapshot is a no-op, so
// the periodic timer costs nothing while nobody is editing.

pub mod working_copy;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use revisit_common::{DocumentId, EphemeralState};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fs::{LocalFs, StateFs};

pub use working_copy::{PositionMap, StateMap};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{}` is not a valid position map: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode position map: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last write; storage was not touched.
    Unchanged,
    /// The map was written.
    Written { entries: usize },
}

/// Owns the on-disk position map and its last-flushed snapshot.
#[derive(Debug)]
pub struct StateStore<F: StateFs = LocalFs> {
    fs: F,
    path: PathBuf,
    last_flushed: Mutex<StateMap>,
}

impl StateStore<LocalFs> {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::new(LocalFs, path)
    }
}

impl<F: StateFs> StateStore<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self { fs, path: path.into(), last_flushed: Mutex::new(StateMap::new()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot_guard(&self) -> MutexGuard<'_, StateMap> {
        self.last_flushed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the persisted map, or an empty one when no file exists yet.
    /// On success the result also becomes the last-flushed snapshot.
    pub fn try_load(&self) -> Result<StateMap, StoreError> {
        let mut snapshot = self.snapshot_guard();
        if !self.fs.exists(&self.path) {
            snapshot.clear();
            return Ok(StateMap::new());
        }

        let text = self
            .fs
            .read(&self.path)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        let map = decode_map(&text)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;

        *snapshot = map.clone();
        Ok(map)
    }

    /// Like [`try_load`](Self::try_load) but never fails: an unreadable file
    /// is logged and tracking starts from an empty map.
    pub fn load(&self) -> StateMap {
        match self.try_load() {
            Ok(map) => {
                info!(path = %self.path.display(), entries = map.len(), "loaded cursor positions");
                map
            }
            Err(error) => {
                warn!(error = %error, "starting with no cursor history");
                self.snapshot_guard().clear();
                StateMap::new()
            }
        }
    }

    /// Whether `current` differs from what was last written.
    pub fn is_dirty(&self, current: &PositionMap) -> bool {
        *self.snapshot_guard() != current.snapshot()
    }

    /// Write `current` if it differs from the last-flushed snapshot.
    ///
    /// The map is captured once, up front, so mutations racing with the
    /// write land in the next flush instead of producing a torn file.
    /// Concurrent flushes serialize on the snapshot lock.
    pub fn flush(&self, current: &PositionMap) -> Result<FlushOutcome, StoreError> {
        let mut snapshot = self.snapshot_guard();
        let captured = current.snapshot();
        if *snapshot == captured {
            debug!(path = %self.path.display(), "position map unchanged, skipping write");
            return Ok(FlushOutcome::Unchanged);
        }

        let encoded = encode_map(&captured)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !self.fs.exists(parent) {
                self.fs
                    .mkdir(parent)
                    .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            }
        }
        self.fs
            .write(&self.path, &encoded)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;

        let entries = captured.len();
        *snapshot = captured;
        debug!(path = %self.path.display(), entries, "position map written");
        Ok(FlushOutcome::Written { entries })
    }
}

/// Serialize a map with keys in sorted order so identical maps produce
/// identical bytes.
pub fn encode_map(map: &StateMap) -> Result<String, serde_json::Error> {
    let ordered: BTreeMap<&DocumentId, &EphemeralState> = map.iter().collect();
    serde_json::to_string(&ordered)
}

/// Parse a persisted map. The top level must be a JSON object; each entry
/// is decoded leniently with [`EphemeralState::from_json_value`].
pub fn decode_map(text: &str) -> Result<StateMap, serde_json::Error> {
    let raw: serde_json::Map<String, Value> = serde_json::from_str(text)?;
    Ok(raw
        .iter()
        .map(|(doc, value)| (DocumentId::new(doc.clone()), EphemeralState::from_json_value(value)))
        .collect())
}
