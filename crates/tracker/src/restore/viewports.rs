// Which document each viewport last had a restore attempted for.
//
// A restore for (viewport, document) is suppressed while the viewport is
// still on the same document. Showing another document in the viewport
// starts a new epoch, so coming back later restores again. A restore that
// never got to run hands its epoch back with `leave`.

use std::collections::HashMap;

use revisit_common::{DocumentId, ViewportId};

/// Identifies one epoch; never reused within a `RecentViewports`.
pub type EpochId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Epoch {
    id: EpochId,
    doc: DocumentId,
}

#[derive(Debug, Default)]
pub struct RecentViewports {
    current: HashMap<ViewportId, Epoch>,
    next_id: EpochId,
}

impl RecentViewports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `viewport` now shows `doc`. Returns the new epoch, or
    /// `None` if the viewport already was on `doc`, meaning a restore has
    /// been attempted there in this epoch.
    pub fn enter(&mut self, viewport: ViewportId, doc: DocumentId) -> Option<EpochId> {
        if self.current.get(&viewport).is_some_and(|epoch| epoch.doc == doc) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.current.insert(viewport, Epoch { id, doc });
        Some(id)
    }

    /// End `epoch` in `viewport` if it is still the current one, so the
    /// next open of the same document there restores again.
    pub fn leave(&mut self, viewport: &ViewportId, epoch: EpochId) -> bool {
        if self.current.get(viewport).is_some_and(|current| current.id == epoch) {
            self.current.remove(viewport);
            true
        } else {
            false
        }
    }

    /// Document of `epoch` in `viewport`, following renames. `None` once
    /// the viewport has moved on to another epoch.
    pub fn document(&self, viewport: &ViewportId, epoch: EpochId) -> Option<&DocumentId> {
        self.current.get(viewport).filter(|current| current.id == epoch).map(|current| &current.doc)
    }

    /// Drop a closed viewport.
    pub fn forget(&mut self, viewport: &ViewportId) -> bool {
        self.current.remove(viewport).is_some()
    }

    /// Follow a rename so a viewport showing the renamed document does not
    /// restore it a second time under the new id.
    pub fn rename_document(&mut self, from: &DocumentId, to: &DocumentId) {
        for epoch in self.current.values_mut() {
            if epoch.doc == *from {
                epoch.doc = to.clone();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
