// revisit-tracker: remembers and restores per-document cursor and scroll
// positions for an embedding editor.

pub mod config;
pub mod fs;
pub mod host;
pub mod lifecycle;
pub mod observer;
pub mod recorder;
pub mod restore;
pub mod runtime;
pub mod store;

pub use config::{TrackerConfig, TrackerPaths};
pub use fs::{LocalFs, MemoryFs, StateFs};
pub use host::EditorHost;
pub use lifecycle::{HostEvent, ScheduledRestore, Tracker};
pub use observer::SurfaceUpdate;
pub use restore::RestoreOutcome;
pub use store::{FlushOutcome, PositionMap, StateStore, StoreError};
