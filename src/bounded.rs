//! Bounded text fields with a single source of capacity truth.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// A text field holding at most `CAP - 1` bytes.
///
/// Mirrors a fixed-capacity NUL-terminated buffer: anything longer than
/// `CAP - 1` bytes is truncated on construction, backing off to the nearest
/// UTF-8 character boundary. All comparisons against unbounded input go
/// through [`BoundedText::matches`], which applies the same truncation to
/// the other side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundedText<const CAP: usize>(String);

impl<const CAP: usize> BoundedText<CAP> {
    /// Total capacity in bytes, including the reserved terminator slot.
    pub const CAPACITY: usize = CAP;

    pub fn new(text: &str) -> Self {
        Self(truncate(text, CAP - 1).to_owned())
    }

    pub fn set(&mut self, text: &str) {
        self.0 = truncate(text, CAP - 1).to_owned();
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated equality: `other` is compared as if it had been admitted
    /// through the same capacity.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == truncate(other, CAP - 1)
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl<const CAP: usize> Deref for BoundedText<CAP> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const CAP: usize> fmt::Display for BoundedText<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const CAP: usize> From<&str> for BoundedText<CAP> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const CAP: usize> PartialEq<str> for BoundedText<CAP> {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<const CAP: usize> PartialEq<&str> for BoundedText<CAP> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
