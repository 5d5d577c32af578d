// revisit-common: shared value types for cursor/scroll tracking

pub mod compare;
pub mod path;
pub mod text;
pub mod types;

pub use compare::states_equal;
pub use types::{CursorPosition, CursorRange, DocumentId, EphemeralState, ViewportId};
