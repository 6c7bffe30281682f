use crate::{
    index::{ANNOTATION_INDEX_LABEL, AnnotationIndex},
    model::{FeatureKind, LinearTypeOrder, TypeSystem},
    store::{MemoryStore, RecordStore},
    types::{Handle, Span},
};
use annodb_primitives::PrimitiveKind;
use std::sync::Arc;

/// Text-analysis type system shared by index and store tests.
///
/// `Token`, `Sentence` and `NamedEntity` are annotations; `Person` extends
/// `NamedEntity`; `Document` is a plain record. `Token` carries a `pos`
/// string plus numeric features of every other primitive kind.
pub(crate) fn text_types() -> Arc<TypeSystem> {
    let mut builder = TypeSystem::builder();
    builder.add_type("Token", "Annotation").unwrap();
    builder.add_type("Sentence", "Annotation").unwrap();
    builder.add_type("NamedEntity", "Annotation").unwrap();
    builder.add_type("Person", "NamedEntity").unwrap();
    builder.add_type("Document", "Top").unwrap();

    for (name, kind) in [
        ("pos", PrimitiveKind::String),
        ("length", PrimitiveKind::Int),
        ("stop", PrimitiveKind::Boolean),
        ("flags", PrimitiveKind::Byte),
        ("rank", PrimitiveKind::Short),
        ("offset", PrimitiveKind::Long),
        ("score", PrimitiveKind::Float),
        ("weight", PrimitiveKind::Double),
    ] {
        builder.add_primitive("Token", name, kind).unwrap();
    }
    builder
        .add_primitive("NamedEntity", "confidence", PrimitiveKind::Double)
        .unwrap();
    builder
        .add_primitive("Person", "age", PrimitiveKind::Short)
        .unwrap();
    builder
        .add_feature(
            "Token",
            "head",
            FeatureKind::Reference(TypeSystem::ANNOTATION),
        )
        .unwrap();

    Arc::new(builder.build().unwrap())
}

/// Natural type order for a type system.
pub(crate) fn natural_order(type_system: &TypeSystem) -> Arc<LinearTypeOrder> {
    Arc::new(LinearTypeOrder::natural(type_system))
}

/// Empty store over [`text_types`].
pub(crate) fn text_store() -> MemoryStore {
    MemoryStore::new(text_types())
}

/// Create one annotation of `type_name` per span.
pub(crate) fn annotate(store: &mut MemoryStore, type_name: &str, spans: &[(i32, i32)]) -> Vec<Handle> {
    spans
        .iter()
        .map(|(begin, end)| store.create_annotation(type_name, *begin, *end).unwrap())
        .collect()
}

/// Built-in style annotation index over every annotation in `store`.
pub(crate) fn annotation_index(store: &MemoryStore) -> AnnotationIndex {
    let type_system = store.type_system();
    let mut index = AnnotationIndex::compile(
        ANNOTATION_INDEX_LABEL,
        "Annotation",
        type_system,
        &natural_order(type_system),
    )
    .unwrap();
    for handle in store.live_handles() {
        index.insert(store, handle);
    }

    index
}

/// Spans of a handle sequence, for readable assertions.
pub(crate) fn spans(store: &MemoryStore, handles: impl IntoIterator<Item = Handle>) -> Vec<(i32, i32)> {
    handles
        .into_iter()
        .map(|h| {
            let Span { begin, end } = store.span_of(h).unwrap();
            (begin, end)
        })
        .collect()
}
