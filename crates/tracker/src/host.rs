// Capabilities the tracker needs from the hosting editor.

use revisit_common::path::normalize_document_id;
use revisit_common::{CursorRange, DocumentId, ViewportId};
use tracing::trace;

/// The editor application embedding the tracker.
///
/// Calls are made from the tracker's tasks and must not block for long;
/// hosts with a UI thread should forward mutations to it.
pub trait EditorHost: Send + Sync + 'static {
    /// Document shown in the focused editor, if any.
    fn active_document(&self) -> Option<DocumentId>;

    /// Most recently used text viewport, if any.
    fn active_viewport(&self) -> Option<ViewportId>;

    /// Whether `viewport` is currently showing a navigation highlight, i.e.
    /// a deep link is already steering its scroll and selection.
    fn navigation_indicator_shown(&self, viewport: &ViewportId) -> bool;

    fn set_selection(&self, viewport: &ViewportId, selection: CursorRange);

    fn set_scroll(&self, viewport: &ViewportId, offset: f64);
}

/// Active document id in canonical form. Ids the host reports that cannot
/// be normalized count as "no active document".
pub(crate) fn active_document_id<H: EditorHost + ?Sized>(host: &H) -> Option<DocumentId> {
    let raw = host.active_document()?;
    match normalize_document_id(raw.as_str()) {
        Ok(doc) => Some(doc),
        Err(error) => {
            trace!(doc = %raw, error = %error, "ignoring active document with unusable id");
            None
        }
    }
}
