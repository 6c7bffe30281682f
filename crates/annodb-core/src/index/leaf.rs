use crate::{
    index::{
        comparator::CompiledComparator,
        cursor::{CursorError, CursorMark, LeafCursor, Position},
        kind::IndexKind,
    },
    obs::sink::{self, MetricsEvent},
    store::RecordStore,
    types::Handle,
};
use std::{cmp::Ordering, ops::Range, sync::Arc};

///
/// LeafIndex
///
/// One comparator-ordered run of handles for one record type and its
/// subtypes. The index owns only the positions; records live in the store.
///
/// Every structural change bumps `epoch`. Live cursors borrow the index, so
/// they cannot observe a change; detached [`CursorMark`]s are checked
/// against the epoch on resume.
///

#[derive(Clone, Debug)]
pub struct LeafIndex {
    label: String,
    kind: IndexKind,
    comparator: Arc<CompiledComparator>,
    handles: Vec<Handle>,
    epoch: u64,
}

impl LeafIndex {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: IndexKind, comparator: Arc<CompiledComparator>) -> Self {
        Self {
            label: label.into(),
            kind,
            comparator,
            handles: Vec::new(),
            epoch: 0,
        }
    }

    /// Build an index over `records` in one pass.
    ///
    /// Sorting is stable, so a sorted index matches inserting every record
    /// in order. A set index keeps the first record of each equivalence class.
    pub fn from_records<S>(
        label: impl Into<String>,
        kind: IndexKind,
        comparator: Arc<CompiledComparator>,
        store: &S,
        records: impl IntoIterator<Item = Handle>,
    ) -> Self
    where
        S: RecordStore + ?Sized,
    {
        let mut index = Self::new(label, kind, comparator);
        let mut handles: Vec<Handle> = records.into_iter().collect();
        handles.sort_by(|a, b| index.comparator.compare(store, *a, *b));
        handles.dedup_by(|later, earlier| {
            later == earlier
                || (kind == IndexKind::Set
                    && index.comparator.compare(store, *earlier, *later) == Ordering::Equal)
        });
        index.handles = handles;

        index
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        self.kind
    }

    #[must_use]
    pub const fn comparator(&self) -> &Arc<CompiledComparator> {
        &self.comparator
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Structural modification counter.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The ordering, as a slice.
    #[must_use]
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn compare<S>(&self, store: &S, left: Handle, right: Handle) -> Ordering
    where
        S: RecordStore + ?Sized,
    {
        self.comparator.compare(store, left, right)
    }

    /// Insert a handle. Returns `false` only when a set index already holds
    /// an equivalent record; re-inserting a handle that is already present
    /// is a no-op.
    pub fn insert<S>(&mut self, store: &S, handle: Handle) -> bool
    where
        S: RecordStore + ?Sized,
    {
        // None: the handle was already present, nothing changed
        let outcome = match self.kind {
            IndexKind::Set => {
                let at = self.lower_bound(store, handle);
                let duplicate = self
                    .handles
                    .get(at)
                    .is_some_and(|existing| self.compare(store, *existing, handle) == Ordering::Equal);
                if !duplicate {
                    self.place(at, handle);
                }
                Some(!duplicate)
            }
            IndexKind::Sorted => {
                // fast path: appending in order
                match self.handles.last().copied() {
                    None => {
                        self.place(0, handle);
                        Some(true)
                    }
                    Some(last) if last == handle => None,
                    Some(last) if self.compare(store, last, handle) == Ordering::Less => {
                        self.place(self.handles.len(), handle);
                        Some(true)
                    }
                    Some(_) => {
                        let run = self.equivalence_run(store, handle);
                        (!self.handles[run.clone()].contains(&handle)).then(|| {
                            self.place(run.end, handle);
                            true
                        })
                    }
                }
            }
            IndexKind::Bag => {
                let run = self.equivalence_run(store, handle);
                (!self.handles[run.clone()].contains(&handle)).then(|| {
                    self.place(run.start, handle);
                    true
                })
            }
        };

        let Some(admitted) = outcome else {
            return true;
        };
        sink::record(MetricsEvent::IndexInsert {
            index: &self.label,
            admitted,
        });

        admitted
    }

    /// Remove exactly `handle`, not merely an equivalent record.
    pub fn remove<S>(&mut self, store: &S, handle: Handle) -> bool
    where
        S: RecordStore + ?Sized,
    {
        let run = self.equivalence_run(store, handle);
        let Some(offset) = self.handles[run.clone()].iter().position(|h| *h == handle) else {
            return false;
        };

        self.handles.remove(run.start + offset);
        self.bump_epoch();
        sink::record(MetricsEvent::IndexRemove { index: &self.label });

        true
    }

    /// Whether this exact handle is indexed.
    pub fn contains<S>(&self, store: &S, handle: Handle) -> bool
    where
        S: RecordStore + ?Sized,
    {
        let run = self.equivalence_run(store, handle);
        self.handles[run].contains(&handle)
    }

    /// Any indexed record equivalent to `probe`.
    pub fn find<S>(&self, store: &S, probe: Handle) -> Option<Handle>
    where
        S: RecordStore + ?Sized,
    {
        let at = self.lower_bound(store, probe);
        self.handles
            .get(at)
            .copied()
            .filter(|found| self.compare(store, *found, probe) == Ordering::Equal)
    }

    /// Drop every handle, e.g. at the end of a processing unit.
    pub fn clear(&mut self) {
        if !self.handles.is_empty() {
            self.handles.clear();
            self.bump_epoch();
        }
    }

    /// Ascending cursor over the whole ordering, positioned at the first record.
    pub fn iterator<'a, S>(&'a self, store: &'a S) -> LeafCursor<'a, S>
    where
        S: RecordStore + ?Sized,
    {
        let mut cursor = LeafCursor::new(self, store);
        cursor.move_to_first();
        cursor
    }

    /// Ascending cursor positioned at the first record not less than `from`.
    pub fn iterator_from<'a, S>(&'a self, store: &'a S, from: Handle) -> LeafCursor<'a, S>
    where
        S: RecordStore + ?Sized,
    {
        let mut cursor = LeafCursor::new(self, store);
        cursor.move_to(from);
        cursor
    }

    /// Reattach a cursor from a mark taken earlier on this index.
    pub fn resume<'a, S>(
        &'a self,
        store: &'a S,
        mark: &CursorMark,
    ) -> Result<LeafCursor<'a, S>, CursorError>
    where
        S: RecordStore + ?Sized,
    {
        if mark.label != self.label {
            return Err(CursorError::ForeignIndex {
                expected: self.label.clone(),
                found: mark.label.clone(),
            });
        }
        if mark.epoch != self.epoch {
            sink::record(MetricsEvent::CursorInvalidated { index: &self.label });
            tracing::warn!(
                index = %self.label,
                marked = mark.epoch,
                current = self.epoch,
                "cursor mark invalidated by structural change"
            );

            return Err(CursorError::Stale {
                index: self.label.clone(),
                marked: mark.epoch,
                current: self.epoch,
            });
        }

        Ok(LeafCursor::at(self, store, mark.position))
    }

    /// First position whose record is not less than `probe`.
    pub(crate) fn lower_bound<S>(&self, store: &S, probe: Handle) -> usize
    where
        S: RecordStore + ?Sized,
    {
        self.handles
            .partition_point(|h| self.compare(store, *h, probe) == Ordering::Less)
    }

    /// First position whose record is greater than `probe`.
    pub(crate) fn upper_bound<S>(&self, store: &S, probe: Handle) -> usize
    where
        S: RecordStore + ?Sized,
    {
        self.handles
            .partition_point(|h| self.compare(store, *h, probe) != Ordering::Greater)
    }

    fn equivalence_run<S>(&self, store: &S, probe: Handle) -> Range<usize>
    where
        S: RecordStore + ?Sized,
    {
        let start = self.lower_bound(store, probe);
        let end = start
            + self.handles[start..]
                .partition_point(|h| self.compare(store, *h, probe) == Ordering::Equal);

        start..end
    }

    fn place(&mut self, at: usize, handle: Handle) {
        self.handles.insert(at, handle);
        self.bump_epoch();
    }

    const fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}
