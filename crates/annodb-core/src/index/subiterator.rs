use crate::{
    index::{cursor::Position, leaf::LeafIndex},
    store::RecordStore,
    types::{Handle, Span},
};
use std::cmp::Ordering;

///
/// SpanBound
///
/// How a subiteration relates candidates to the bounding record.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpanBound {
    /// Candidate span lies within the bound: `begin >= bound.begin && end <= bound.end`.
    Contained,

    /// Candidate span intersects the bound: `begin < bound.end && end > bound.begin`.
    Overlapping,
}

#[derive(Clone, Copy, Debug)]
struct Bound {
    handle: Handle,
    span: Span,
    relation: SpanBound,
}

///
/// AnnotationCursor
///
/// Span-aware cursor over an annotation-ordered leaf index.
///
/// The scanned region is fixed when the cursor is created: the whole
/// ordering, or for a subiteration the slice that can possibly hold
/// qualifying records. Filtering happens one step at a time. Unambiguous
/// cursors additionally skip any record that begins before the previously
/// emitted one ends, and keep the positions they emitted so they can walk
/// back.
///

pub struct AnnotationCursor<'a, S: ?Sized> {
    leaf: &'a LeafIndex,
    store: &'a S,
    bound: Option<Bound>,
    start: usize,
    end: usize,
    ambiguous: bool,
    position: Position,
    trail: Vec<usize>,
}

impl<'a, S> AnnotationCursor<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub(crate) fn over_all(leaf: &'a LeafIndex, store: &'a S, ambiguous: bool) -> Self {
        let mut cursor = Self {
            leaf,
            store,
            bound: None,
            start: 0,
            end: leaf.len(),
            ambiguous,
            position: Position::BeforeFirst,
            trail: Vec::new(),
        };
        cursor.move_to_first();

        cursor
    }

    pub(crate) fn bounded(
        leaf: &'a LeafIndex,
        store: &'a S,
        bound: Handle,
        relation: SpanBound,
        ambiguous: bool,
    ) -> Self {
        let span = store.span(bound);
        let handles = leaf.handles();

        // records are sorted by begin, so the region is a contiguous slice
        let (start, end) = match relation {
            SpanBound::Contained => {
                let start = leaf.upper_bound(store, bound);
                let end =
                    start + handles[start..].partition_point(|h| store.span(*h).begin <= span.end);
                (start, end)
            }
            SpanBound::Overlapping => {
                (0, handles.partition_point(|h| store.span(*h).begin < span.end))
            }
        };

        let mut cursor = Self {
            leaf,
            store,
            bound: Some(Bound {
                handle: bound,
                span,
                relation,
            }),
            start,
            end,
            ambiguous,
            position: Position::BeforeFirst,
            trail: Vec::new(),
        };
        cursor.move_to_first();

        cursor
    }

    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    /// The bounding record, for a subiteration.
    #[must_use]
    pub fn bound(&self) -> Option<Handle> {
        self.bound.map(|b| b.handle)
    }

    #[must_use]
    pub fn relation(&self) -> Option<SpanBound> {
        self.bound.map(|b| b.relation)
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
                "invariant violation: get() on annotation cursor over '{}' in state {:?}",
                self.leaf.label(),
                self.position
            ),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Handle> {
        match self.position {
            Position::At(i) => self.leaf.handles().get(i).copied(),
            Position::BeforeFirst | Position::AfterLast => None,
        }
    }

    pub fn move_to_first(&mut self) {
        self.trail.clear();
        self.settle_forward(self.start, None);
    }

    pub fn move_to_next(&mut self) {
        match self.position {
            Position::BeforeFirst => self.move_to_first(),
            Position::At(i) => {
                let floor = (!self.ambiguous).then(|| self.span_at(i).end);
                self.settle_forward(i + 1, floor);
            }
            Position::AfterLast => {}
        }
    }

    pub fn move_to_previous(&mut self) {
        if self.ambiguous {
            match self.position {
                Position::At(i) => {
                    self.position = self.scan_backward(i).map_or(Position::BeforeFirst, Position::At);
                }
                Position::AfterLast => self.move_to_last(),
                Position::BeforeFirst => {}
            }
            return;
        }

        match self.position {
            Position::At(_) => {
                self.trail.pop();
            }
            Position::AfterLast | Position::BeforeFirst => {}
        }
        self.position = self
            .trail
            .last()
            .map_or(Position::BeforeFirst, |i| Position::At(*i));
    }

    pub fn move_to_last(&mut self) {
        if self.ambiguous {
            self.position = self
                .scan_backward(self.end)
                .map_or(Position::BeforeFirst, Position::At);
            return;
        }

        // the greedy filter is only defined walking forward
        self.move_to_first();
        while self.is_valid() {
            self.move_to_next();
        }
        self.position = self
            .trail
            .last()
            .map_or(Position::BeforeFirst, |i| Position::At(*i));
    }

    /// Position at the first qualifying record not less than `probe`.
    pub fn move_to(&mut self, probe: Handle) {
        if self.ambiguous {
            let at = self.leaf.lower_bound(self.store, probe).max(self.start);
            self.settle_forward(at, None);
            return;
        }

        self.move_to_first();
        while let Some(handle) = self.current() {
            if self.leaf.compare(self.store, handle, probe) != Ordering::Less {
                break;
            }
            self.move_to_next();
        }
    }

    fn settle_forward(&mut self, from: usize, floor: Option<i32>) {
        match self.scan_forward(from, floor) {
            Some(i) => {
                self.position = Position::At(i);
                if !self.ambiguous {
                    self.trail.push(i);
                }
            }
            None => self.position = Position::AfterLast,
        }
    }

    fn scan_forward(&self, from: usize, floor: Option<i32>) -> Option<usize> {
        (from..self.end).find(|i| {
            self.qualifies(*i) && floor.is_none_or(|floor| self.span_at(*i).begin >= floor)
        })
    }

    fn scan_backward(&self, before: usize) -> Option<usize> {
        (self.start..before.min(self.end))
            .rev()
            .find(|i| self.qualifies(*i))
    }

    fn qualifies(&self, i: usize) -> bool {
        let Some(bound) = self.bound else {
            return true;
        };
        let handle = self.leaf.handles()[i];

        match bound.relation {
            // region starts past the bound's equivalence run and stops at
            // begin > bound.end, so only the end needs checking
            SpanBound::Contained => self.span_at(i).end <= bound.span.end,
            SpanBound::Overlapping => {
                handle != bound.handle
                    && self.span_at(i).end > bound.span.begin
                    && self.leaf.compare(self.store, handle, bound.handle) != Ordering::Equal
            }
        }
    }

    fn span_at(&self, i: usize) -> Span {
        self.store.span(self.leaf.handles()[i])
    }
}

impl<S> Iterator for AnnotationCursor<'_, S>
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
