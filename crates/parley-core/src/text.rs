//! Character-offset helpers.
//!
//! Entity spans are expressed in Unicode scalar positions, while `regex`
//! reports byte offsets. [`CharIndex`] converts between the two.

/// Number of characters (Unicode scalar values) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Return the substring covering characters `start..end`.
///
/// Out-of-range bounds are clamped; an inverted range yields `""`.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let index = CharIndex::new(text);
    let from = index.to_byte(start);
    let to = index.to_byte(end);
    &text[from..to]
}

/// Byte/char offset lookup table for a single string.
#[derive(Debug, Clone)]
pub struct CharIndex {
    /// Byte offset of every character, plus a trailing entry for `text.len()`.
    byte_starts: Vec<usize>,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        let mut byte_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        byte_starts.push(text.len());
        Self { byte_starts }
    }

    /// Number of characters in the indexed text.
    pub fn char_len(&self) -> usize {
        self.byte_starts.len() - 1
    }

    /// Convert a byte offset (on a char boundary) to a char offset.
    ///
    /// Offsets inside a multi-byte character resolve to that character.
    pub fn to_char(&self, byte: usize) -> usize {
        match self.byte_starts.binary_search(&byte) {
            Ok(pos) => pos,
            Err(pos) => pos.saturating_sub(1),
        }
    }

    /// Convert a char offset to a byte offset, clamping to the text end.
    pub fn to_byte(&self, ch: usize) -> usize {
        let last = self.byte_starts.len() - 1;
        self.byte_starts[ch.min(last)]
    }
}
