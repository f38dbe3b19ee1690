use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A contiguous interval `[start, start + len)` of indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    start: usize,
    len: usize,
}

impl Segment {
    /// Creates a segment covering `len` indices from `start`.
    #[must_use]
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Creates a segment from a half-open range.
    ///
    /// An inverted range yields an empty segment.
    #[must_use]
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            len: range.end.saturating_sub(range.start),
        }
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// One past the last covered index.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Returns true if both segments share at least one index.
    #[must_use]
    pub fn overlaps(&self, other: &Segment) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end() && other.start < self.end()
    }

    /// Returns the shared part of both segments, if any.
    #[must_use]
    pub fn intersection(&self, other: &Segment) -> Option<Segment> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        (start < end).then(|| Segment::new(start, end - start))
    }
}

impl From<Range<usize>> for Segment {
    fn from(range: Range<usize>) -> Self {
        Self::from_range(range)
    }
}
