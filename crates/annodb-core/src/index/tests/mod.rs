mod repository;

use crate::{
    index::{ComparatorSpec, CompiledComparator, IndexKind, LeafIndex},
    model::{LinearTypeOrderBuilder, TypeSystem},
    store::MemoryStore,
    test_support::natural_order,
};
use std::sync::Arc;

/// Compile `spec` against the store's type system with the natural order.
fn compile(store: &MemoryStore, spec: &ComparatorSpec) -> Arc<CompiledComparator> {
    let type_system = store.type_system();
    Arc::new(CompiledComparator::compile(spec, type_system, &natural_order(type_system)).unwrap())
}

/// Compile `spec` with declared type priorities.
fn compile_with_priorities(
    type_system: &TypeSystem,
    spec: &ComparatorSpec,
    priorities: &[&str],
) -> Arc<CompiledComparator> {
    let mut builder = LinearTypeOrderBuilder::new(type_system);
    builder.add(priorities).unwrap();
    let order = Arc::new(builder.build());

    Arc::new(CompiledComparator::compile(spec, type_system, &order).unwrap())
}

fn leaf(store: &MemoryStore, kind: IndexKind, spec: &ComparatorSpec) -> LeafIndex {
    LeafIndex::new("test", kind, compile(store, spec))
}
