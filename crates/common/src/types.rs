// Core value types shared across all revisit crates.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of a document: its vault-relative path.
///
/// Renaming a document changes its identity, so entries keyed by a
/// `DocumentId` have to be migrated on rename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identity of a single visible editing surface (a pane, tab or split).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewportId(String);

impl ViewportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A 0-based line/column position inside a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub ch: u32,
}

impl CursorPosition {
    pub const fn new(line: u32, ch: u32) -> Self {
        Self { line, ch }
    }
}

/// A selection: `from` is the anchor, `to` is the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorRange {
    pub from: CursorPosition,
    pub to: CursorPosition,
}

impl CursorRange {
    pub const fn new(from: CursorPosition, to: CursorPosition) -> Self {
        Self { from, to }
    }

    /// A collapsed selection at `pos`.
    pub const fn caret(pos: CursorPosition) -> Self {
        Self { from: pos, to: pos }
    }
}

/// Last-known editing position of one document.
///
/// A missing field means "not tracked for this observation", which is not
/// the same as a zero value. Absent fields are omitted when serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EphemeralState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<f64>,
}

impl EphemeralState {
    pub fn new(cursor: Option<CursorRange>, scroll: Option<f64>) -> Self {
        Self { cursor, scroll }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_none() && self.scroll.is_none()
    }

    /// Scroll offset if it is a usable value to hand to an editor: finite
    /// and not negative.
    pub fn applicable_scroll(&self) -> Option<f64> {
        self.scroll.filter(|s| s.is_finite() && *s >= 0.0)
    }

    /// Decode a stored entry field by field.
    ///
    /// A malformed `cursor` or `scroll` is dropped on its own, so one bad
    /// field never prevents the other from being restored.
    pub fn from_json_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let cursor = object
            .get("cursor")
            .and_then(|raw| serde_json::from_value::<CursorRange>(raw.clone()).ok());
        let scroll = object.get("scroll").and_then(Value::as_f64).filter(|s| s.is_finite());

        Self { cursor, scroll }
    }
}
