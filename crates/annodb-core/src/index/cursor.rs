use crate::{index::leaf::LeafIndex, store::RecordStore, types::Handle};
use thiserror::Error as ThisError;

///
/// CursorError
///
/// Raised when a detached cursor mark can no longer be trusted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CursorError {
    #[error("cursor mark on '{index}' is stale: marked at epoch {marked}, index is at {current}")]
    Stale {
        index: String,
        marked: u64,
        current: u64,
    },

    #[error("cursor mark belongs to index '{found}', not '{expected}'")]
    ForeignIndex { expected: String, found: String },
}

///
/// Position
///
/// Cursor state. Only `At` is valid for `get()`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    BeforeFirst,
    At(usize),
    AfterLast,
}

impl Position {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::At(_))
    }
}

///
/// CursorMark
///
/// A detached cursor position, tagged with the epoch it was taken at.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CursorMark {
    pub(crate) label: String,
    pub(crate) epoch: u64,
    pub(crate) position: Position,
}

impl CursorMark {
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }
}

///
/// LeafCursor
///
/// Bidirectional cursor over a [`LeafIndex`]. Holding one borrows the index,
/// so the ordering cannot change underneath it.
///

pub struct LeafCursor<'a, S: ?Sized> {
    index: &'a LeafIndex,
    store: &'a S,
    position: Position,
}

impl<'a, S> LeafCursor<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub(crate) const fn new(index: &'a LeafIndex, store: &'a S) -> Self {
        Self {
            index,
            store,
            position: Position::BeforeFirst,
        }
    }

    pub(crate) fn at(index: &'a LeafIndex, store: &'a S, position: Position) -> Self {
        let position = match position {
            Position::At(i) if i >= index.len() => Position::AfterLast,
            other => other,
        };

        Self {
            index,
            store,
            position,
        }
    }

    #[must_use]
    pub const fn index(&self) -> &'a LeafIndex {
        self.index
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.position.is_valid()
    }

    /// The current handle.
    ///
    /// # Panics
    /// If the cursor is not positioned on a record. This is a caller bug.
    #[must_use]
    pub fn get(&self) -> Handle {
        match self.current() {
            Some(handle) => handle,
            None => panic!(
                "invariant violation: get() on cursor over '{}' in state {:?}",
                self.index.label(),
                self.position
            ),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Handle> {
        match self.position {
            Position::At(i) => self.index.handles().get(i).copied(),
            Position::BeforeFirst | Position::AfterLast => None,
        }
    }

    pub const fn move_to_first(&mut self) {
        self.position = if self.index.is_empty() {
            Position::AfterLast
        } else {
            Position::At(0)
        };
    }

    pub const fn move_to_last(&mut self) {
        self.position = match self.index.len() {
            0 => Position::BeforeFirst,
            len => Position::At(len - 1),
        };
    }

    pub const fn move_to_next(&mut self) {
        self.position = match self.position {
            Position::BeforeFirst => {
                if self.index.is_empty() {
                    Position::AfterLast
                } else {
                    Position::At(0)
                }
            }
            Position::At(i) if i + 1 < self.index.len() => Position::At(i + 1),
            Position::At(_) | Position::AfterLast => Position::AfterLast,
        };
    }

    pub const fn move_to_previous(&mut self) {
        self.position = match self.position {
            Position::AfterLast => match self.index.len() {
                0 => Position::BeforeFirst,
                len => Position::At(len - 1),
            },
            Position::At(i) if i > 0 => Position::At(i - 1),
            Position::At(_) | Position::BeforeFirst => Position::BeforeFirst,
        };
    }

    /// Position at the leftmost record not less than `probe`.
    pub fn move_to(&mut self, probe: Handle) {
        let at = self.index.lower_bound(self.store, probe);
        self.position = if at < self.index.len() {
            Position::At(at)
        } else {
            Position::AfterLast
        };
    }

    /// Detach the current position.
    #[must_use]
    pub fn mark(&self) -> CursorMark {
        CursorMark {
            label: self.index.label().to_string(),
            epoch: self.index.epoch(),
            position: self.position,
        }
    }
}

impl<S> Iterator for LeafCursor<'_, S>
where
    S: RecordStore + ?Sized,
{
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let handle = self.current()?;
        self.move_to_next();

        Some(handle)
    }
}
