// Turns editing-surface updates into candidate positions for the recorder.
//
// Runs inline on the host's input path: no I/O, no awaiting, one short lock.

use std::sync::Arc;

use revisit_common::text::LineIndex;
use revisit_common::{CursorRange, EphemeralState};
use tracing::trace;

use crate::host::{active_document_id, EditorHost};
use crate::recorder::Recorder;

/// One mutation notification from an editing surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceUpdate<'a> {
    /// Whether the selection moved in this update.
    pub selection_changed: bool,
    /// Character offset of the selection anchor.
    pub anchor: usize,
    /// Character offset of the selection head.
    pub head: usize,
    /// Current vertical scroll offset, if the viewport has measured it yet.
    pub scroll: Option<f64>,
    /// Line index of the document text the offsets refer to.
    pub lines: &'a LineIndex,
}

impl SurfaceUpdate<'_> {
    fn candidate(&self) -> EphemeralState {
        let selection =
            CursorRange::new(self.lines.position_of(self.anchor), self.lines.position_of(self.head));
        EphemeralState::new(Some(selection), self.scroll)
    }
}

pub struct SelectionObserver<H> {
    host: Arc<H>,
    recorder: Recorder,
}

impl<H: EditorHost> SelectionObserver<H> {
    pub fn new(host: Arc<H>, recorder: Recorder) -> Self {
        Self { host, recorder }
    }

    /// Forward `update` to the recorder. Returns true if it was recorded.
    pub fn on_update(&self, update: &SurfaceUpdate<'_>) -> bool {
        if !update.selection_changed {
            return false;
        }
        let Some(doc) = active_document_id(&*self.host) else {
            trace!("selection changed with no active document");
            return false;
        };
        self.recorder.observe(&doc, update.candidate())
    }
}
