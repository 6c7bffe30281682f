//! Comparator-ordered indexes over store records.
//!
//! Layering, leaves first: [`ComparatorSpec`] is compiled into a
//! [`CompiledComparator`]; a [`LeafIndex`] keeps one ordering of handles;
//! an [`AnnotationIndex`] adds span semantics (unambiguous iteration,
//! subiteration, trees) on top of a leaf; the [`IndexRepository`] owns every
//! index of one type-system generation and keeps them in step with the store.

mod annotation;
mod comparator;
mod cursor;
mod key;
mod kind;
mod leaf;
mod repository;
mod subiterator;
mod tree;

#[cfg(test)]
mod tests;

pub use annotation::{ANNOTATION_INDEX_LABEL, AnnotationIndex};
pub use comparator::{
    CompiledComparator, ConfigError, compare_double_bits_raw, compare_float_bits_raw,
};
pub use cursor::{CursorError, CursorMark, LeafCursor, Position};
pub use key::{ComparatorSpec, KeyDirection, KeyTarget, SortKey};
pub use kind::IndexKind;
pub use leaf::LeafIndex;
pub use repository::{IndexDefinition, IndexRepository};
pub use subiterator::{AnnotationCursor, SpanBound};
pub use tree::{AnnotationTree, NodeId, TreeNode};
