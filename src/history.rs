//! Bounded store of the raw lines typed into the shell.

use std::collections::VecDeque;
use std::collections::vec_deque;
use std::iter::{Enumerate, FusedIterator};

/// Fixed-capacity ring of history entries.
///
/// Entries keep their absolute position: the first line ever recorded is `1`,
/// and numbering keeps counting after old entries have been evicted.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    capacity: usize,
    recorded: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` lines.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    /// Store a copy of `line`, dropping the oldest entry once the buffer is full.
    pub fn record(&mut self, line: &str) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_owned());
        self.recorded += 1;
    }

    /// Iterate over the retained entries, oldest first, with their absolute index.
    ///
    /// The iterator borrows the buffer and can be cloned to walk it again.
    pub fn list(&self) -> HistoryIter<'_> {
        HistoryIter {
            first: self.recorded - self.entries.len() + 1,
            inner: self.entries.iter().enumerate(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines recorded since creation, evicted ones included.
    pub fn total_recorded(&self) -> usize {
        self.recorded
    }

    /// Release every entry. Numbering continues where it was.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink_to_fit();
    }
}

/// Iterator returned by [`HistoryBuffer::list`].
#[derive(Debug, Clone)]
pub struct HistoryIter<'a> {
    first: usize,
    inner: Enumerate<vec_deque::Iter<'a, String>>,
}

impl<'a> Iterator for HistoryIter<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(offset, line)| (self.first + offset, line.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for HistoryIter<'_> {}

impl FusedIterator for HistoryIter<'_> {}
