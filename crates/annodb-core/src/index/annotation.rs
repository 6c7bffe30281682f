use crate::{
    index::{
        comparator::{CompiledComparator, ConfigError},
        key::ComparatorSpec,
        kind::IndexKind,
        leaf::LeafIndex,
        subiterator::{AnnotationCursor, SpanBound},
        tree::AnnotationTree,
    },
    model::{LinearTypeOrder, TypeSystem},
    store::RecordStore,
    types::Handle,
};
use std::{cmp::Ordering, sync::Arc};

/// Label of the built-in index over every annotation.
pub const ANNOTATION_INDEX_LABEL: &str = "AnnotationIndex";

///
/// AnnotationIndex
///
/// Span-aware view over a sorted leaf index whose comparator is fixed to
/// begin ascending, end descending, type order as tiebreak.
///

#[derive(Clone, Debug)]
pub struct AnnotationIndex {
    leaf: LeafIndex,
}

impl AnnotationIndex {
    /// Compile the annotation comparator for `type_name` and create an empty index.
    pub fn compile(
        label: impl Into<String>,
        type_name: &str,
        type_system: &TypeSystem,
        type_order: &Arc<LinearTypeOrder>,
    ) -> Result<Self, ConfigError> {
        let comparator = Self::comparator(type_name, type_system, type_order)?;

        Ok(Self {
            leaf: LeafIndex::new(label, IndexKind::Sorted, Arc::new(comparator)),
        })
    }

    pub(crate) fn comparator(
        type_name: &str,
        type_system: &TypeSystem,
        type_order: &Arc<LinearTypeOrder>,
    ) -> Result<CompiledComparator, ConfigError> {
        let code = type_system
            .type_code(type_name)
            .ok_or_else(|| ConfigError::UnknownType(type_name.to_string()))?;
        if !type_system.is_annotation(code) {
            return Err(ConfigError::NotAnnotation(type_name.to_string()));
        }

        CompiledComparator::compile(&ComparatorSpec::annotation(type_name), type_system, type_order)
    }

    pub(crate) const fn from_leaf(leaf: LeafIndex) -> Self {
        Self { leaf }
    }

    #[must_use]
    pub const fn leaf(&self) -> &LeafIndex {
        &self.leaf
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.leaf.label()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.leaf.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.leaf.is_empty()
    }

    // Span reads assume an annotation record; callers route by type first.
    pub(crate) fn insert<S>(&mut self, store: &S, handle: Handle) -> bool
    where
        S: RecordStore + ?Sized,
    {
        self.leaf.insert(store, handle)
    }

    pub(crate) fn remove<S>(&mut self, store: &S, handle: Handle) -> bool
    where
        S: RecordStore + ?Sized,
    {
        self.leaf.remove(store, handle)
    }

    /// Drop every handle, keeping the comparator.
    pub fn clear(&mut self) {
        self.leaf.clear();
    }

    pub fn compare<S>(&self, store: &S, left: Handle, right: Handle) -> Ordering
    where
        S: RecordStore + ?Sized,
    {
        self.leaf.compare(store, left, right)
    }

    /// Every record in index order (`ambiguous`), or the greedy
    /// non-overlapping subsequence.
    pub fn iterator<'a, S>(&'a self, store: &'a S, ambiguous: bool) -> AnnotationCursor<'a, S>
    where
        S: RecordStore + ?Sized,
    {
        AnnotationCursor::over_all(&self.leaf, store, ambiguous)
    }

    /// Records related to `bound`'s span: contained in it when `strict`,
    /// overlapping it otherwise. `bound` itself is never produced and need
    /// not be a member of this index.
    pub fn subiterator<'a, S>(
        &'a self,
        store: &'a S,
        bound: Handle,
        ambiguous: bool,
        strict: bool,
    ) -> AnnotationCursor<'a, S>
    where
        S: RecordStore + ?Sized,
    {
        let relation = if strict {
            SpanBound::Contained
        } else {
            SpanBound::Overlapping
        };

        AnnotationCursor::bounded(&self.leaf, store, bound, relation, ambiguous)
    }

    /// Span-nesting tree under `root`. Read-only.
    pub fn tree<S>(&self, store: &S, root: Handle) -> AnnotationTree
    where
        S: RecordStore + ?Sized,
    {
        AnnotationTree::build(self, store, root)
    }
}
