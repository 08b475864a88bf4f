/// A row index within an archetype's table.
///
/// Rows are dense and stable only between structural changes: a swap-remove
/// reorders rows, so a `Row` must never be cached across mutations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row(usize);

impl Row {
    /// Create a new Row with the given index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Row(index)
    }

    /// Get the index for this row.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for Row {
    #[inline]
    fn from(value: usize) -> Self {
        Self(value)
    }
}
