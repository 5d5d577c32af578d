// Semantic equality of ephemeral states, used to suppress no-op writes.

use crate::types::{CursorRange, EphemeralState};

/// Returns true when `a` and `b` describe the same editing position.
///
/// Cursors must both be absent or match exactly. Scroll offsets compare by
/// truthiness first: `0` (and NaN) count as "no scroll recorded", so a
/// document scrolled back to the top never looks changed on that account.
pub fn states_equal(a: &EphemeralState, b: &EphemeralState) -> bool {
    cursors_equal(a.cursor.as_ref(), b.cursor.as_ref())
        && truthy_scroll(a.scroll) == truthy_scroll(b.scroll)
}

fn cursors_equal(a: Option<&CursorRange>, b: Option<&CursorRange>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.from.line == b.from.line
                && a.from.ch == b.from.ch
                && a.to.line == b.to.line
                && a.to.ch == b.to.ch
        }
        _ => false,
    }
}

fn truthy_scroll(scroll: Option<f64>) -> Option<f64> {
    scroll.filter(|s| *s != 0.0 && !s.is_nan())
}
