mod matrix;
mod segment;

pub use matrix::{MatrixBlockView, MatrixBlocks};
pub use segment::Segment;

use ndarray::{Array1, Array2, ArrayBase, Data, DataMut, Ix1, Ix2, s};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered set of disjoint index intervals over a flat vector.
///
/// Intervals are kept sorted and merged: no two stored segments overlap or
/// touch, so `[a, b)` followed by `[b, c)` is stored as `[a, c)`.
///
/// The same set addresses rows or columns; orientation is chosen by the view
/// method used (`rview_rows`, `cview_cols`, or the vector views).
///
/// # Examples
///
/// ```
/// use hitch_core::BlockIndices;
/// use ndarray::array;
///
/// let mut blocks = BlockIndices::new();
/// blocks.add_row(4, 2);
/// blocks.add_row(0, 1);
/// blocks.add_row(1, 1);
///
/// assert_eq!(blocks.nb_indices(), 4);
/// assert_eq!(blocks.segments().len(), 2);
///
/// let v = array![0., 1., 2., 3., 4., 5.];
/// assert_eq!(blocks.rview(&v), array![0., 1., 4., 5.]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Segment>", into = "Vec<Segment>"))]
pub struct BlockIndices {
    segments: Vec<Segment>,
}

impl BlockIndices {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set covering a single interval.
    #[must_use]
    pub fn from_segment(start: usize, len: usize) -> Self {
        let mut blocks = Self::new();
        blocks.add(start, len);
        blocks
    }

    /// Inserts the interval `[start, start + len)`.
    ///
    /// Overlapping and adjacent segments are merged with the new one.
    /// A zero-length interval leaves the set unchanged.
    pub fn add(&mut self, start: usize, len: usize) {
        if len == 0 {
            return;
        }

        let mut merged = Segment::new(start, len);
        let lo = self.segments.partition_point(|seg| seg.end() < merged.start());
        let hi = self
            .segments
            .partition_point(|seg| seg.start() <= merged.end());

        if lo < hi {
            let begin = self.segments[lo].start().min(merged.start());
            let end = self.segments[hi - 1].end().max(merged.end());
            merged = Segment::new(begin, end - begin);
        }

        self.segments.splice(lo..hi, [merged]);
    }

    /// Inserts a block of rows.
    pub fn add_row(&mut self, start: usize, len: usize) {
        self.add(start, len);
    }

    /// Inserts a block of columns.
    pub fn add_col(&mut self, start: usize, len: usize) {
        self.add(start, len);
    }

    /// Inserts every segment of `other`.
    pub fn union_with(&mut self, other: &BlockIndices) {
        for seg in &other.segments {
            self.add(seg.start(), seg.len());
        }
    }

    /// The merged segments, sorted by start index.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total number of covered indices.
    #[must_use]
    pub fn nb_indices(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// One past the largest covered index, or zero for an empty set.
    #[must_use]
    pub fn end(&self) -> usize {
        self.segments.last().map_or(0, Segment::end)
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        let at = self.segments.partition_point(|seg| seg.end() <= index);
        self.segments
            .get(at)
            .is_some_and(|seg| seg.start() <= index)
    }

    /// Returns true if every index of `other` is covered by `self`.
    #[must_use]
    pub fn covers(&self, other: &BlockIndices) -> bool {
        other.difference(self).is_empty()
    }

    /// Returns true if both sets share at least one index.
    #[must_use]
    pub fn overlaps(&self, other: &BlockIndices) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.segments.len() && j < other.segments.len() {
            let (a, b) = (&self.segments[i], &other.segments[j]);
            if a.overlaps(b) {
                return true;
            }
            if a.end() <= b.start() {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Indices covered by both sets.
    #[must_use]
    pub fn intersection(&self, other: &BlockIndices) -> BlockIndices {
        let mut shared = BlockIndices::new();
        let (mut i, mut j) = (0, 0);
        while i < self.segments.len() && j < other.segments.len() {
            let (a, b) = (&self.segments[i], &other.segments[j]);
            if let Some(seg) = a.intersection(b) {
                shared.add(seg.start(), seg.len());
            }
            if a.end() <= b.end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        shared
    }

    /// Indices covered by `self` but not by `other`.
    #[must_use]
    pub fn difference(&self, other: &BlockIndices) -> BlockIndices {
        let mut rest = BlockIndices::new();
        for seg in &self.segments {
            let mut cursor = seg.start();
            for cut in other.segments.iter().filter(|cut| cut.overlaps(seg)) {
                if cut.start() > cursor {
                    rest.add(cursor, cut.start() - cursor);
                }
                cursor = cursor.max(cut.end());
            }
            if cursor < seg.end() {
                rest.add(cursor, seg.end() - cursor);
            }
        }
        rest
    }

    /// Indices of `[0, size)` not covered by `self`.
    #[must_use]
    pub fn complement(&self, size: usize) -> BlockIndices {
        BlockIndices::from_segment(0, size).difference(self)
    }

    /// Iterates over the covered indices in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().flat_map(Segment::range)
    }

    /// Returns the `k`-th covered index.
    #[must_use]
    pub fn index_at(&self, k: usize) -> Option<usize> {
        self.placed()
            .find(|(offset, seg)| k < offset + seg.len())
            .map(|(offset, seg)| seg.start() + (k - offset))
    }

    /// Returns the rank of `index` among the covered indices.
    #[must_use]
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.placed()
            .find(|(_, seg)| seg.range().contains(&index))
            .map(|(offset, seg)| offset + (index - seg.start()))
    }

    /// Gathers the covered entries of `vector`, in segment order.
    ///
    /// # Panics
    ///
    /// Panics if a segment extends past the end of `vector`.
    #[must_use]
    pub fn rview<S>(&self, vector: &ArrayBase<S, Ix1>) -> Array1<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut gathered = Array1::zeros(self.nb_indices());
        for (offset, seg) in self.placed() {
            gathered
                .slice_mut(s![offset..offset + seg.len()])
                .assign(&vector.slice(s![seg.range()]));
        }
        gathered
    }

    /// Scatters `values` into the covered entries of `target`.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold [`Self::nb_indices`] entries or a
    /// segment extends past the end of `target`.
    pub fn write_to<S, T>(&self, values: &ArrayBase<S, Ix1>, target: &mut ArrayBase<T, Ix1>)
    where
        S: Data<Elem = f64>,
        T: DataMut<Elem = f64>,
    {
        assert_eq!(values.len(), self.nb_indices(), "gathered length mismatch");
        for (offset, seg) in self.placed() {
            target
                .slice_mut(s![seg.range()])
                .assign(&values.slice(s![offset..offset + seg.len()]));
        }
    }

    /// Gathers the covered rows of `matrix`.
    ///
    /// # Panics
    ///
    /// Panics if a segment extends past the last row of `matrix`.
    #[must_use]
    pub fn rview_rows<S>(&self, matrix: &ArrayBase<S, Ix2>) -> Array2<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut gathered = Array2::zeros((self.nb_indices(), matrix.ncols()));
        for (offset, seg) in self.placed() {
            gathered
                .slice_mut(s![offset..offset + seg.len(), ..])
                .assign(&matrix.slice(s![seg.range(), ..]));
        }
        gathered
    }

    /// Gathers the covered columns of `matrix`.
    ///
    /// # Panics
    ///
    /// Panics if a segment extends past the last column of `matrix`.
    #[must_use]
    pub fn cview_cols<S>(&self, matrix: &ArrayBase<S, Ix2>) -> Array2<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut gathered = Array2::zeros((matrix.nrows(), self.nb_indices()));
        for (offset, seg) in self.placed() {
            gathered
                .slice_mut(s![.., offset..offset + seg.len()])
                .assign(&matrix.slice(s![.., seg.range()]));
        }
        gathered
    }

    /// Scatters the rows of `values` into the covered rows of `target`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes are incompatible.
    pub fn write_rows<S, T>(&self, values: &ArrayBase<S, Ix2>, target: &mut ArrayBase<T, Ix2>)
    where
        S: Data<Elem = f64>,
        T: DataMut<Elem = f64>,
    {
        assert_eq!(values.nrows(), self.nb_indices(), "gathered rows mismatch");
        for (offset, seg) in self.placed() {
            target
                .slice_mut(s![seg.range(), ..])
                .assign(&values.slice(s![offset..offset + seg.len(), ..]));
        }
    }

    /// Segments paired with their offset inside a gathered view.
    fn placed(&self) -> impl Iterator<Item = (usize, Segment)> + '_ {
        self.segments.iter().scan(0, |offset, seg| {
            let at = *offset;
            *offset += seg.len();
            Some((at, *seg))
        })
    }
}

impl FromIterator<Segment> for BlockIndices {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut blocks = Self::new();
        for seg in iter {
            blocks.add(seg.start(), seg.len());
        }
        blocks
    }
}

impl From<Vec<Segment>> for BlockIndices {
    fn from(segments: Vec<Segment>) -> Self {
        segments.into_iter().collect()
    }
}

impl From<BlockIndices> for Vec<Segment> {
    fn from(blocks: BlockIndices) -> Self {
        blocks.segments
    }
}
