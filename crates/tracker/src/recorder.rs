// Decides whether an observed editing position is worth keeping and writes
// it into the working copy. Never touches storage.

use std::sync::Arc;

use revisit_common::{states_equal, DocumentId, EphemeralState};
use tracing::trace;

use crate::store::PositionMap;

#[derive(Debug, Clone)]
pub struct Recorder {
    positions: Arc<PositionMap>,
}

impl Recorder {
    pub fn new(positions: Arc<PositionMap>) -> Self {
        Self { positions }
    }

    /// Record `candidate` for `doc`. Returns true if the working copy changed.
    ///
    /// A first observation is always kept. Later ones replace the entry only
    /// when they differ from it and carry a usable scroll offset; states
    /// observed before the viewport reports scroll metrics are dropped.
    pub fn observe(&self, doc: &DocumentId, candidate: EphemeralState) -> bool {
        if doc.is_empty() {
            return false;
        }

        self.positions.update_with(|entries| match entries.get(doc).copied() {
            None => {
                trace!(doc = %doc, "recording first position");
                entries.insert(doc.clone(), without_unusable_scroll(candidate));
                true
            }
            Some(prior) if states_equal(&prior, &candidate) => false,
            Some(_) if !has_usable_scroll(&candidate) => {
                trace!(doc = %doc, "ignoring position without scroll metrics");
                false
            }
            Some(_) => {
                trace!(doc = %doc, "recording changed position");
                entries.insert(doc.clone(), candidate);
                true
            }
        })
    }
}

fn has_usable_scroll(state: &EphemeralState) -> bool {
    state.scroll.is_some_and(f64::is_finite)
}

// JSON has no NaN or infinity; keeping one would make the entry unequal to
// itself and the map permanently dirty.
fn without_unusable_scroll(state: EphemeralState) -> EphemeralState {
    EphemeralState { scroll: state.scroll.filter(|s| s.is_finite()), ..state }
}
