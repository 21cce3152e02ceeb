//! Character allow-list filtering for generated text.

use std::ops::RangeInclusive;

/// Replacement used when filtering leaves nothing behind.
pub const EMPTY_PLACEHOLDER: &str = "...";

/// A set of inclusive code-point ranges that may appear in output.
#[derive(Debug, Clone, Copy)]
pub struct CharsetPolicy {
    ranges: &'static [RangeInclusive<u32>],
}

/// ASCII plus the Hangul Syllables block.
pub const ASCII_AND_HANGUL: CharsetPolicy = CharsetPolicy {
    ranges: &[0x0000..=0x007F, 0xAC00..=0xD7A3],
};

impl CharsetPolicy {
    pub const fn new(ranges: &'static [RangeInclusive<u32>]) -> Self {
        Self { ranges }
    }

    pub fn allows(&self, c: char) -> bool {
        let code = c as u32;
        self.ranges.iter().any(|r| r.contains(&code))
    }

    /// Drop disallowed characters and trim. Never returns an empty string.
    pub fn apply(&self, text: &str) -> String {
        let kept: String = text.chars().filter(|c| self.allows(*c)).collect();
        let trimmed = kept.trim();
        if trimmed.is_empty() {
            EMPTY_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        }
    }
}
