// Restores the stored cursor and scroll position when a document opens.
//
// The host needs time to finish building a freshly opened view; edits made
// before that are dropped silently. A restore therefore waits out a
// configurable settle delay, backs off if a deep link is already steering
// the view (navigation highlight shown), waits a further 10ms for such a
// highlight to appear, re-validates that the same document is still active
// in the same viewport, and only then applies. It is best-effort: no retry.
// A restore that is superseded or cancelled gives its viewport epoch back,
// so the next open of that document there restores again.

pub mod viewports;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use revisit_common::{DocumentId, EphemeralState, ViewportId};
use tracing::{debug, trace};

use crate::host::{active_document_id, EditorHost};
use crate::store::PositionMap;

pub use viewports::{EpochId, RecentViewports};

/// Wait between the navigation check and applying.
pub const INDICATOR_SETTLE_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreTiming {
    /// Wait after the open before looking at the view at all.
    pub open_delay: Duration,
    /// Further wait after the navigation check, before applying.
    pub settle_delay: Duration,
}

impl RestoreTiming {
    pub fn new(open_delay: Duration) -> Self {
        Self { open_delay, settle_delay: INDICATOR_SETTLE_DELAY }
    }
}

impl Default for RestoreTiming {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_OPEN_DELAY_MS))
    }
}

/// How a restore attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    NoActiveDocument,
    NoViewport,
    /// The viewport already had a restore attempted for this document.
    AlreadyRestored,
    NothingStored,
    /// A deep link is controlling the view; its position wins.
    NavigationInProgress,
    /// The active document or viewport changed while waiting.
    Superseded,
    /// A later open cancelled this restore before it applied.
    Cancelled,
    Applied { cursor: bool, scroll: bool },
}

/// A restore that passed the immediate checks and waits to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRestore {
    /// Document id at open time. A rename while waiting is followed
    /// through the viewport epoch.
    pub doc: DocumentId,
    pub viewport: ViewportId,
    pub epoch: EpochId,
    pub state: EphemeralState,
}

pub struct Restorer<H> {
    host: Arc<H>,
    positions: Arc<PositionMap>,
    viewports: Mutex<RecentViewports>,
    timing: RestoreTiming,
}

impl<H: EditorHost> Restorer<H> {
    pub fn new(host: Arc<H>, positions: Arc<PositionMap>, timing: RestoreTiming) -> Self {
        Self { host, positions, viewports: Mutex::new(RecentViewports::new()), timing }
    }

    pub fn timing(&self) -> RestoreTiming {
        self.timing
    }

    fn viewports(&self) -> MutexGuard<'_, RecentViewports> {
        self.viewports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the whole restore protocol for the active viewport.
    pub async fn restore_active(&self) -> RestoreOutcome {
        match self.prepare() {
            Ok(pending) => self.complete(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// The checks that need no waiting: active document, viewport epoch,
    /// stored state. The stored state is captured here, before the view has
    /// had a chance to report its own initial selection.
    pub fn prepare(&self) -> Result<PendingRestore, RestoreOutcome> {
        let Some(doc) = active_document_id(&*self.host) else {
            return Err(RestoreOutcome::NoActiveDocument);
        };
        let Some(viewport) = self.host.active_viewport() else {
            return Err(RestoreOutcome::NoViewport);
        };
        let Some(epoch) = self.viewports().enter(viewport.clone(), doc.clone()) else {
            trace!(doc = %doc, viewport = %viewport, "restore already attempted in this viewport");
            return Err(RestoreOutcome::AlreadyRestored);
        };
        let Some(state) = self.positions.get(&doc) else {
            trace!(doc = %doc, "no stored position");
            return Err(RestoreOutcome::NothingStored);
        };
        Ok(PendingRestore { doc, viewport, epoch, state })
    }

    /// Wait for the view to settle, then apply `pending` unless a deep link
    /// or a newer open took over in the meantime.
    pub async fn complete(&self, pending: PendingRestore) -> RestoreOutcome {
        tokio::time::sleep(self.timing.open_delay).await;
        if self.navigation_in_progress(&pending) {
            return RestoreOutcome::NavigationInProgress;
        }

        tokio::time::sleep(self.timing.settle_delay).await;
        if self.navigation_in_progress(&pending) {
            return RestoreOutcome::NavigationInProgress;
        }
        let Some(doc) = self.still_current(&pending) else {
            debug!(doc = %pending.doc, viewport = %pending.viewport, "view changed before restore");
            self.release(&pending);
            return RestoreOutcome::Superseded;
        };

        self.apply(&doc, &pending)
    }

    /// Give back the viewport epoch of a restore that will not apply.
    pub fn release(&self, pending: &PendingRestore) -> bool {
        self.viewports().leave(&pending.viewport, pending.epoch)
    }

    /// A guard that releases `pending`'s epoch if dropped before
    /// [`RestoreClaim::settle`], e.g. when the restore task is aborted.
    pub fn claim(self: &Arc<Self>, pending: &PendingRestore) -> RestoreClaim<H> {
        RestoreClaim { restorer: Arc::clone(self), pending: Some(pending.clone()) }
    }

    fn navigation_in_progress(&self, pending: &PendingRestore) -> bool {
        let shown = self.host.navigation_indicator_shown(&pending.viewport);
        if shown {
            debug!(doc = %pending.doc, "navigation highlight present, leaving position alone");
        }
        shown
    }

    /// The pending document's current id, if it is still what the active
    /// viewport shows.
    fn still_current(&self, pending: &PendingRestore) -> Option<DocumentId> {
        let doc = self.viewports().document(&pending.viewport, pending.epoch).cloned()?;
        let same_view = active_document_id(&*self.host).as_ref() == Some(&doc)
            && self.host.active_viewport().as_ref() == Some(&pending.viewport);
        same_view.then_some(doc)
    }

    // Fields are applied independently; a missing or unusable one never
    // blocks the other.
    fn apply(&self, doc: &DocumentId, pending: &PendingRestore) -> RestoreOutcome {
        let cursor = match pending.state.cursor {
            Some(selection) => {
                self.host.set_selection(&pending.viewport, selection);
                true
            }
            None => false,
        };
        let scroll = match pending.state.applicable_scroll().filter(|s| *s != 0.0) {
            Some(offset) => {
                self.host.set_scroll(&pending.viewport, offset);
                true
            }
            None => false,
        };
        debug!(doc = %doc, viewport = %pending.viewport, cursor, scroll, "restored position");
        RestoreOutcome::Applied { cursor, scroll }
    }

    /// Forget a closed viewport so its next document restores normally.
    pub fn forget_viewport(&self, viewport: &ViewportId) -> bool {
        self.viewports().forget(viewport)
    }

    pub fn rename_document(&self, from: &DocumentId, to: &DocumentId) {
        self.viewports().rename_document(from, to);
    }
}

/// Holds a pending restore's viewport epoch until the restore finishes.
pub struct RestoreClaim<H: EditorHost> {
    restorer: Arc<Restorer<H>>,
    pending: Option<PendingRestore>,
}

impl<H: EditorHost> RestoreClaim<H> {
    /// The restore ran to an outcome; keep whatever the epoch now says.
    pub fn settle(mut self) {
        self.pending = None;
    }
}

impl<H: EditorHost> Drop for RestoreClaim<H> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            if self.restorer.release(&pending) {
                trace!(doc = %pending.doc, viewport = %pending.viewport, "abandoned restore released");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revisit_common::{CursorPosition, CursorRange};
    use tokio::time;

    #[derive(Default)]
    struct FakeHost {
        active: Mutex<Option<DocumentId>>,
        viewport: Mutex<Option<ViewportId>>,
        indicator: Mutex<bool>,
        selections: Mutex<Vec<CursorRange>>,
        scrolls: Mutex<Vec<f64>>,
    }

    impl FakeHost {
        fn showing(doc: &str, viewport: &str) -> Arc<Self> {
            let host = Self::default();
            *host.active.lock().unwrap() = Some(DocumentId::new(doc));
            *host.viewport.lock().unwrap() = Some(ViewportId::new(viewport));
            Arc::new(host)
        }

        fn mutator_calls(&self) -> usize {
            self.selections.lock().unwrap().len() + self.scrolls.lock().unwrap().len()
        }
    }

    impl EditorHost for FakeHost {
        fn active_document(&self) -> Option<DocumentId> {
            self.active.lock().unwrap().clone()
        }
        fn active_viewport(&self) -> Option<ViewportId> {
            self.viewport.lock().unwrap().clone()
        }
        fn navigation_indicator_shown(&self, _viewport: &ViewportId) -> bool {
            *self.indicator.lock().unwrap()
        }
        fn set_selection(&self, _viewport: &ViewportId, selection: CursorRange) {
            self.selections.lock().unwrap().push(selection);
        }
        fn set_scroll(&self, _viewport: &ViewportId, offset: f64) {
            self.scrolls.lock().unwrap().push(offset);
        }
    }

    fn stored(doc: &str, state: EphemeralState) -> Arc<PositionMap> {
        let positions = Arc::new(PositionMap::new());
        positions.insert(DocumentId::new(doc), state);
        positions
    }

    fn caret_state(line: u32, scroll: Option<f64>) -> EphemeralState {
        EphemeralState::new(Some(CursorRange::caret(CursorPosition::new(line, 0))), scroll)
    }

    #[tokio::test]
    async fn applies_cursor_and_scroll() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(12, Some(340.0))),
            RestoreTiming::default(),
        );

        let outcome = restorer.restore_active().await;

        assert_eq!(outcome, RestoreOutcome::Applied { cursor: true, scroll: true });
        assert_eq!(
            *host.selections.lock().unwrap(),
            vec![CursorRange::caret(CursorPosition::new(12, 0))]
        );
        assert_eq!(*host.scrolls.lock().unwrap(), vec![340.0]);
    }

    #[tokio::test]
    async fn zero_scroll_is_not_applied() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(1, Some(0.0))),
            RestoreTiming::default(),
        );

        let outcome = restorer.restore_active().await;
        assert_eq!(outcome, RestoreOutcome::Applied { cursor: true, scroll: false });
        assert!(host.scrolls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scroll_only_state_still_applies_scroll() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", EphemeralState::new(None, Some(55.0))),
            RestoreTiming::default(),
        );

        let outcome = restorer.restore_active().await;
        assert_eq!(outcome, RestoreOutcome::Applied { cursor: false, scroll: true });
    }

    #[tokio::test]
    async fn missing_document_viewport_or_state_returns_early() {
        let host = Arc::new(FakeHost::default());
        let restorer =
            Restorer::new(Arc::clone(&host), Arc::new(PositionMap::new()), RestoreTiming::default());
        assert_eq!(restorer.restore_active().await, RestoreOutcome::NoActiveDocument);

        *host.active.lock().unwrap() = Some(DocumentId::new("a.md"));
        assert_eq!(restorer.restore_active().await, RestoreOutcome::NoViewport);

        *host.viewport.lock().unwrap() = Some(ViewportId::new("leaf-1"));
        assert_eq!(restorer.restore_active().await, RestoreOutcome::NothingStored);
    }

    #[tokio::test]
    async fn indicator_suppresses_restore() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        *host.indicator.lock().unwrap() = true;
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        );

        assert_eq!(restorer.restore_active().await, RestoreOutcome::NavigationInProgress);
        assert_eq!(host.mutator_calls(), 0);
    }

    #[tokio::test]
    async fn same_viewport_and_document_restores_once() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        );

        assert!(matches!(restorer.restore_active().await, RestoreOutcome::Applied { .. }));
        assert_eq!(restorer.restore_active().await, RestoreOutcome::AlreadyRestored);
        assert_eq!(host.selections.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn switching_document_during_wait_supersedes() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        );

        let pending = restorer.prepare().expect("restore should be pending");
        *host.active.lock().unwrap() = Some(DocumentId::new("b.md"));

        assert_eq!(restorer.complete(pending).await, RestoreOutcome::Superseded);
        assert_eq!(host.mutator_calls(), 0);
    }

    #[tokio::test]
    async fn rename_while_waiting_still_applies() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(6, Some(90.0))),
            RestoreTiming::default(),
        );

        let pending = restorer.prepare().expect("restore should be pending");
        restorer.rename_document(&DocumentId::new("a.md"), &DocumentId::new("archive/a.md"));
        *host.active.lock().unwrap() = Some(DocumentId::new("archive/a.md"));

        assert_eq!(
            restorer.complete(pending).await,
            RestoreOutcome::Applied { cursor: true, scroll: true }
        );
        assert_eq!(
            *host.selections.lock().unwrap(),
            vec![CursorRange::caret(CursorPosition::new(6, 0))]
        );
    }

    #[tokio::test]
    async fn superseded_restore_can_run_again() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        );

        let pending = restorer.prepare().expect("restore should be pending");
        *host.viewport.lock().unwrap() = Some(ViewportId::new("leaf-2"));
        assert_eq!(restorer.complete(pending).await, RestoreOutcome::Superseded);

        *host.viewport.lock().unwrap() = Some(ViewportId::new("leaf-1"));
        assert!(matches!(restorer.restore_active().await, RestoreOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn navigation_keeps_the_epoch() {
        time::pause();
        let host = FakeHost::showing("a.md", "leaf-1");
        *host.indicator.lock().unwrap() = true;
        let restorer = Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        );

        assert_eq!(restorer.restore_active().await, RestoreOutcome::NavigationInProgress);
        *host.indicator.lock().unwrap() = false;
        assert_eq!(restorer.restore_active().await, RestoreOutcome::AlreadyRestored);
    }

    #[test]
    fn dropped_claim_releases_the_epoch() {
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Arc::new(Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        ));

        let pending = restorer.prepare().expect("restore should be pending");
        drop(restorer.claim(&pending));
        assert!(restorer.prepare().is_ok());
        assert_eq!(restorer.prepare().err(), Some(RestoreOutcome::AlreadyRestored));
    }

    #[test]
    fn settled_claim_keeps_the_epoch() {
        let host = FakeHost::showing("a.md", "leaf-1");
        let restorer = Arc::new(Restorer::new(
            Arc::clone(&host),
            stored("a.md", caret_state(3, Some(90.0))),
            RestoreTiming::default(),
        ));

        let pending = restorer.prepare().expect("restore should be pending");
        restorer.claim(&pending).settle();
        assert_eq!(restorer.prepare().err(), Some(RestoreOutcome::AlreadyRestored));
    }
}
