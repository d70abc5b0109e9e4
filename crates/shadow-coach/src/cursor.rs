/// Position of the next halfmove to replay within a reference game.
///
/// Only moves forward. Once `index == len` the cursor is exhausted and stays so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCursor {
    index: usize,
    len: usize,
}

impl ReplayCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the next halfmove, or `None` once exhausted.
    pub fn next_index(&self) -> Option<usize> {
        (self.index < self.len).then_some(self.index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.len
    }

    /// Step past the current halfmove. Returns false, and does nothing, when exhausted.
    pub fn advance(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Mark the rest of the line as unplayable.
    pub fn exhaust(&mut self) {
        self.index = self.index.max(self.len);
    }
}
