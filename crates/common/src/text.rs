// Offset <-> line/column conversion over a document's text.
//
// Offsets count characters, not bytes. Line breaks are `\n`; a `\r` before
// it belongs to the previous line's content.

use crate::types::CursorPosition;

/// Character offsets of every line start in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len_chars: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut len_chars = 0;
        for ch in text.chars() {
            len_chars += 1;
            if ch == '\n' {
                line_starts.push(len_chars);
            }
        }
        Self { line_starts, len_chars }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn len_chars(&self) -> usize {
        self.len_chars
    }

    /// Position of `offset`. Offsets past the end clamp to the end.
    pub fn position_of(&self, offset: usize) -> CursorPosition {
        let offset = offset.min(self.len_chars);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let ch = offset - self.line_starts[line];
        CursorPosition { line: saturating_u32(line), ch: saturating_u32(ch) }
    }

    /// Offset of `pos`. Lines past the end clamp to the last line, columns
    /// past the end of a line clamp to the line end.
    pub fn offset_of(&self, pos: CursorPosition) -> usize {
        let line = (pos.line as usize).min(self.line_starts.len() - 1);
        let start = self.line_starts[line];
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len_chars,
        };
        (start + pos.ch as usize).min(end)
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
