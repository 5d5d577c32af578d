// Document identity normalization.

pub mod normalize;

pub use normalize::{normalize_document_id, PathError};
