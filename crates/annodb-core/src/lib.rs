//! Core engine for AnnoDB: a typed in-memory record store, comparator-driven
//! indexes over its records, and span-aware iteration over annotations.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod obs;
pub mod store;
pub mod types;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary only. Errors, metrics and configuration stay in their
/// modules.
///

pub mod prelude {
    pub use crate::{
        index::{
            AnnotationIndex, ComparatorSpec, IndexDefinition, IndexKind, IndexRepository,
            KeyDirection, LeafIndex,
        },
        model::{LinearTypeOrder, LinearTypeOrderBuilder, TypeSystem},
        store::{FieldValue, MemoryStore, RecordStore},
        types::{Handle, Span, TypeCode},
    };
}
