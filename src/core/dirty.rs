//! Dirty row tracking
//!
//! One flag per grid row, set by every screen mutation and cleared only
//! when the embedder says it has rendered. Queries never clear.

/// Set of rows changed since the last [`DirtyRows::clear`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRows {
    flags: Vec<bool>,
    count: usize,
}

impl DirtyRows {
    /// Create a tracker for `rows` rows, all of them dirty
    pub fn new(rows: usize) -> Self {
        Self {
            flags: vec![true; rows],
            count: rows,
        }
    }

    /// Number of rows tracked
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of rows currently dirty
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether any row is dirty
    pub fn any(&self) -> bool {
        self.count > 0
    }

    pub fn is_dirty(&self, row: usize) -> bool {
        self.flags.get(row).copied().unwrap_or(false)
    }

    /// Mark one row dirty; out-of-range rows are ignored
    pub fn mark(&mut self, row: usize) {
        if let Some(flag) = self.flags.get_mut(row) {
            if !*flag {
                *flag = true;
                self.count += 1;
            }
        }
    }

    /// Mark rows `top..=bottom` dirty
    pub fn mark_range(&mut self, top: usize, bottom: usize) {
        for row in top..=bottom.min(self.flags.len().saturating_sub(1)) {
            self.mark(row);
        }
    }

    pub fn mark_all(&mut self) {
        self.flags.fill(true);
        self.count = self.flags.len();
    }

    pub fn clear(&mut self) {
        self.flags.fill(false);
        self.count = 0;
    }

    /// Re-dimension the set; every row is dirty afterwards
    pub fn resize(&mut self, rows: usize) {
        self.flags.clear();
        self.flags.resize(rows, true);
        self.count = rows;
    }

    /// Dirty row indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(row, &dirty)| dirty.then_some(row))
    }

    /// Write ascending dirty row indices into `buf`, returning how many
    /// were written. Rows past the buffer's capacity stay dirty.
    pub fn copy_into(&self, buf: &mut [u16]) -> usize {
        let mut written = 0;
        for (slot, row) in buf.iter_mut().zip(self.iter()) {
            *slot = u16::try_from(row).unwrap_or(u16::MAX);
            written += 1;
        }
        written
    }
}
