// Document id canonicalization: unified separators and traversal rejection.

use thiserror::Error;

use crate::types::DocumentId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("document id is empty")]
    Empty,

    #[error("document id contains directory traversal component: {0}")]
    Traversal(String),

    #[error("document id contains null byte")]
    NullByte,
}

/// Normalize a vault-relative path into the key used by the position map.
///
/// Rules:
/// - Convert all separators to `/`
/// - Collapse consecutive `/` into one
/// - Strip leading and trailing `/`
/// - Reject `.` and `..` components
/// - Reject null bytes and empty ids
///
/// Length is not limited and Unicode is left untouched: the id must keep
/// matching the host's own path for the same file byte for byte.
pub fn normalize_document_id(input: &str) -> Result<DocumentId, PathError> {
    if input.contains('\0') {
        return Err(PathError::NullByte);
    }

    let unified = input.replace('\\', "/");
    let components: Vec<&str> = unified.split('/').filter(|s| !s.is_empty()).collect();

    if components.is_empty() {
        return Err(PathError::Empty);
    }

    if let Some(bad) = components.iter().find(|c| **c == "." || **c == "..") {
        return Err(PathError::Traversal((*bad).to_string()));
    }

    Ok(DocumentId::new(components.join("/")))
}
