use crate::{
    error::ErrorClass,
    store::{FieldValue, MemoryStore, RecordStore, StoreError},
    test_support::{text_store, text_types},
    types::{Handle, Span},
};

#[test]
fn handles_are_heap_addresses_and_never_null() {
    let mut store = text_store();
    let first = store.create("Document").unwrap();
    let second = store.create("Token").unwrap();

    assert!(!first.is_null());
    assert!(second.get() > first.get());
    assert_eq!(store.len(), 2);
    assert_eq!(store.live_handles().collect::<Vec<_>>(), vec![first, second]);
}

#[test]
fn every_primitive_kind_round_trips_through_its_slot() {
    let mut store = text_store();
    let token = store.create_annotation("Token", 3, 7).unwrap();

    let values: [(&str, FieldValue); 8] = [
        ("pos", FieldValue::from("NN")),
        ("length", FieldValue::Int(-4)),
        ("stop", FieldValue::Boolean(true)),
        ("flags", FieldValue::Byte(-3)),
        ("rank", FieldValue::Short(1200)),
        ("offset", FieldValue::Long(i64::MIN + 1)),
        ("score", FieldValue::Float(0.25)),
        ("weight", FieldValue::Double(-1.5)),
    ];
    for (feature, value) in &values {
        store.set(token, feature, value.clone()).unwrap();
    }
    for (feature, value) in values {
        assert_eq!(store.get(token, feature).unwrap(), value, "{feature}");
    }
    assert_eq!(store.span_of(token).unwrap(), Span::new(3, 7));
}

#[test]
fn unset_strings_and_references_read_as_null() {
    let mut store = text_store();
    let token = store.create_annotation("Token", 0, 1).unwrap();

    assert_eq!(store.get(token, "pos").unwrap(), FieldValue::String(None));
    assert_eq!(store.get(token, "head").unwrap(), FieldValue::Reference(None));

    let other = store.create_annotation("Token", 1, 2).unwrap();
    store.set(token, "head", other).unwrap();
    assert_eq!(store.get(token, "head").unwrap(), FieldValue::Reference(Some(other)));
}

#[test]
fn long_slots_are_independent_per_record() {
    let mut store = text_store();
    let a = store.create("Token").unwrap();
    let b = store.create("Token").unwrap();
    store.set(a, "offset", 10_i64).unwrap();
    store.set(b, "offset", 20_i64).unwrap();

    assert_eq!(store.get(a, "offset").unwrap(), FieldValue::Long(10));
    assert_eq!(store.get(b, "offset").unwrap(), FieldValue::Long(20));
}

#[test]
fn inherited_features_are_writable_on_subtypes() {
    let mut store = text_store();
    let person = store.create_annotation("Person", 0, 4).unwrap();
    store.set(person, "confidence", 0.75_f64).unwrap();
    store.set(person, "age", 42_i16).unwrap();

    assert_eq!(store.get(person, "confidence").unwrap(), FieldValue::Double(0.75));
    assert_eq!(store.get(person, "age").unwrap(), FieldValue::Short(42));
}

#[test]
fn kind_mismatch_is_rejected_without_writing() {
    let mut store = text_store();
    let token = store.create("Token").unwrap();

    let err = store.set(token, "length", "seven").unwrap_err();
    assert!(matches!(err, StoreError::KindMismatch { ref feature, found: "String", .. } if feature == "length"));
    assert_eq!(store.get(token, "length").unwrap(), FieldValue::Int(0));
}

#[test]
fn unknown_names_are_not_found() {
    let mut store = text_store();
    let doc = store.create("Document").unwrap();

    assert_eq!(
        store.create("Paragraph").unwrap_err(),
        StoreError::UnknownTypeName("Paragraph".to_string())
    );
    let err = store.get(doc, "begin").unwrap_err();
    assert!(matches!(err, StoreError::UnknownFeature { .. }));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn annotation_geometry_is_checked_at_creation() {
    let mut store = text_store();

    assert_eq!(
        store.create_annotation("Token", 5, 4).unwrap_err(),
        StoreError::InvalidSpan { begin: 5, end: 4 }
    );
    assert_eq!(
        store.create_annotation("Token", -1, 4).unwrap_err(),
        StoreError::InvalidSpan { begin: -1, end: 4 }
    );
    assert_eq!(
        store.create_annotation("Document", 0, 1).unwrap_err(),
        StoreError::NotAnnotation("Document".to_string())
    );
    assert!(store.create_annotation("Token", 4, 4).is_ok());
    assert!(!store.is_empty());
}

#[test]
fn deleted_handles_are_dead_but_not_reissued() {
    let mut store = text_store();
    let a = store.create("Document").unwrap();
    assert!(store.delete(a));
    assert!(!store.delete(a));
    assert!(!store.is_live(a));

    let b = store.create("Document").unwrap();
    assert_ne!(a, b);
    assert_eq!(store.get(a, "begin").unwrap_err(), StoreError::UnknownHandle(a));
}

#[test]
fn reset_starts_a_new_processing_unit() {
    let mut store = text_store();
    let first = store.create_annotation("Token", 0, 1).unwrap();
    store.set(first, "pos", "DT").unwrap();
    store.reset();

    assert!(store.is_empty());
    let again = store.create_annotation("Token", 0, 1).unwrap();
    assert_eq!(again, first);
    assert_eq!(store.get(again, "pos").unwrap(), FieldValue::String(None));
}

#[test]
fn reset_with_moves_the_store_to_a_new_generation() {
    let mut store = text_store();
    let before = store.generation();
    store.reset_with(text_types());

    assert_ne!(store.generation(), before);
    assert!(store.is_empty());
}

#[test]
fn store_is_usable_as_a_trait_object() {
    let mut store: MemoryStore = text_store();
    let token = store.create_annotation("Token", 2, 9).unwrap();
    let dyn_store: &dyn RecordStore = &store;

    assert_eq!(dyn_store.span(token), Span::new(2, 9));
    assert!(!dyn_store.is_live(Handle::NULL));
}
