use crate::{
    error::{ErrorClass, ErrorOrigin},
    index::{
        ANNOTATION_INDEX_LABEL, ComparatorSpec, IndexDefinition, IndexKind, IndexRepository,
        KeyDirection,
    },
    model::LinearTypeOrderBuilder,
    obs::{metrics_report, metrics_reset_all},
    store::{MemoryStore, RecordStore},
    test_support::{spans, text_store, text_types},
    types::Handle,
};
use std::sync::Arc;

fn repository(store: &MemoryStore) -> IndexRepository {
    IndexRepository::with_natural_order(Arc::clone(store.type_system())).unwrap()
}

fn entities_by_confidence() -> IndexDefinition {
    IndexDefinition::new(
        "Entities",
        IndexKind::Sorted,
        ComparatorSpec::new("NamedEntity").key("confidence", KeyDirection::Reverse),
    )
}

fn create(
    store: &mut MemoryStore,
    repo: &mut IndexRepository,
    type_name: &str,
    span: (i32, i32),
) -> Handle {
    let handle = store.create_annotation(type_name, span.0, span.1).unwrap();
    repo.add(&*store, handle).unwrap();
    handle
}

#[test]
fn builtin_annotation_index_is_always_present() {
    let store = text_store();
    let repo = repository(&store);

    assert_eq!(repo.labels().collect::<Vec<_>>(), vec![ANNOTATION_INDEX_LABEL]);
    assert!(repo.index(ANNOTATION_INDEX_LABEL).is_some());
    assert!(repo.annotation_index().is_empty());
    assert_eq!(repo.generation(), store.generation());
}

#[test]
fn add_routes_records_to_every_covering_index() {
    let mut store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();

    let token = store.create_annotation("Token", 0, 3).unwrap();
    let person = store.create_annotation("Person", 4, 9).unwrap();
    let document = store.create("Document").unwrap();

    assert_eq!(repo.add(&store, token).unwrap(), 1);
    assert_eq!(repo.add(&store, person).unwrap(), 2);
    assert_eq!(repo.add(&store, document).unwrap(), 0);
    assert_eq!(repo.annotation_index().len(), 2);
    assert_eq!(repo.index("Entities").unwrap().handles(), &[person]);
}

#[test]
fn define_populates_from_existing_records() {
    let mut store = text_store();
    let mut repo = repository(&store);
    let low = create(&mut store, &mut repo, "NamedEntity", (0, 1));
    let high = create(&mut store, &mut repo, "Person", (2, 3));
    store.set(low, "confidence", 0.2_f64).unwrap();
    store.set(high, "confidence", 0.9_f64).unwrap();

    repo.define(&store, entities_by_confidence()).unwrap();

    assert_eq!(repo.index("Entities").unwrap().handles(), &[high, low]);
    assert_eq!(repo.definition("Entities"), Some(&entities_by_confidence()));
}

#[test]
fn redefining_a_label_must_match_exactly() {
    let store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();
    repo.define(&store, entities_by_confidence()).unwrap();

    let mut changed = entities_by_confidence();
    changed.kind = IndexKind::Set;
    let err = repo.define(&store, changed).unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);
    assert_eq!(err.origin, ErrorOrigin::Index);

    let reserved = IndexDefinition::new(
        ANNOTATION_INDEX_LABEL,
        IndexKind::Sorted,
        ComparatorSpec::default_annotation(),
    );
    assert_eq!(repo.define(&store, reserved).unwrap_err().class, ErrorClass::Conflict);
}

#[test]
fn invalid_definitions_leave_the_repository_untouched() {
    let store = text_store();
    let mut repo = repository(&store);
    let bad = IndexDefinition::new(
        "Broken",
        IndexKind::Bag,
        ComparatorSpec::new("Token").key("lemma", KeyDirection::Standard),
    );

    let err = repo.define(&store, bad).unwrap_err();
    assert!(err.is_config());
    assert!(repo.index("Broken").is_none());
}

#[test]
fn remove_and_dead_handles() {
    let mut store = text_store();
    let mut repo = repository(&store);
    let token = create(&mut store, &mut repo, "Token", (0, 3));

    assert_eq!(repo.remove(&store, token).unwrap(), 1);
    assert_eq!(repo.remove(&store, token).unwrap(), 0);
    assert!(repo.annotation_index().is_empty());

    store.delete(token);
    let err = repo.add(&store, token).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.origin, ErrorOrigin::Store);
}

#[test]
fn stores_of_another_generation_are_rejected() {
    let store = text_store();
    let mut repo = repository(&store);
    let mut foreign = text_store();
    let handle = foreign.create_annotation("Token", 0, 1).unwrap();

    let err = repo.add(&foreign, handle).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert!(err.message.contains("rebind"));
}

#[test]
fn subtype_annotation_index_is_created_on_demand() {
    let mut store = text_store();
    let mut repo = repository(&store);
    let sentence = create(&mut store, &mut repo, "Sentence", (0, 20));
    create(&mut store, &mut repo, "Token", (5, 9));
    create(&mut store, &mut repo, "Token", (0, 4));
    create(&mut store, &mut repo, "NamedEntity", (0, 9));

    let tokens = repo.annotation_index_for(&store, "Token").unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(
        spans(&store, tokens.subiterator(&store, sentence, true, true)),
        vec![(0, 4), (5, 9)]
    );

    // later records reach the new index too
    create(&mut store, &mut repo, "Token", (12, 13));
    assert_eq!(repo.annotation_index_for(&store, "Token").unwrap().len(), 3);
    assert!(repo.labels().any(|label| label == "AnnotationIndex:Token"));
}

#[test]
fn annotation_index_for_checks_the_type() {
    let store = text_store();
    let mut repo = repository(&store);

    assert_eq!(
        repo.annotation_index_for(&store, "Annotation").unwrap().label(),
        ANNOTATION_INDEX_LABEL
    );
    let err = repo.annotation_index_for(&store, "Document").unwrap_err();
    assert_eq!(err.class, ErrorClass::Config);
}

#[test]
fn rebind_recompiles_against_new_priorities() {
    metrics_reset_all();
    let mut store = text_store();
    let mut repo = repository(&store);
    let token = create(&mut store, &mut repo, "Token", (0, 4));
    let sentence = create(&mut store, &mut repo, "Sentence", (0, 4));
    assert_eq!(repo.annotation_index().leaf().handles(), &[token, sentence]);

    let type_system = Arc::clone(store.type_system());
    let mut builder = LinearTypeOrderBuilder::new(&type_system);
    builder.add(&["Sentence", "Token"]).unwrap();
    let order = Arc::new(builder.build());
    repo.rebind(&store, type_system, order).unwrap();

    assert_eq!(repo.annotation_index().leaf().handles(), &[sentence, token]);
    assert!(metrics_report().counters.unwrap().ops.index_rebuilds >= 1);
}

#[test]
fn rebind_follows_a_store_into_a_new_type_system() {
    let mut store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();
    create(&mut store, &mut repo, "Token", (0, 4));

    // new processing unit under a new type system
    repo.clear();
    let next = text_types();
    store.reset_with(Arc::clone(&next));
    let person = store.create_annotation("Person", 1, 2).unwrap();

    // stale until rebound
    assert!(repo.add(&store, person).is_err());

    let order = Arc::new(crate::model::LinearTypeOrder::natural(&next));
    repo.rebind(&store, next, order).unwrap();
    assert_eq!(repo.generation(), store.generation());
    assert!(repo.annotation_index().is_empty());

    assert_eq!(repo.add(&store, person).unwrap(), 2);
    assert_eq!(repo.annotation_index().leaf().handles(), &[person]);
    assert_eq!(repo.index("Entities").unwrap().handles(), &[person]);
}

#[test]
fn failed_rebind_changes_nothing() {
    let mut store = text_store();
    let mut repo = repository(&store);
    create(&mut store, &mut repo, "Token", (0, 4));
    let generation = repo.generation();

    // order computed for another type system
    let other = text_types();
    let order = Arc::new(crate::model::LinearTypeOrder::natural(&other));
    let err = repo
        .rebind(&store, Arc::clone(store.type_system()), order)
        .unwrap_err();
    assert_eq!(err.origin, ErrorOrigin::TypeOrder);

    // store still on the old generation
    let order = Arc::new(crate::model::LinearTypeOrder::natural(&other));
    assert!(repo.rebind(&store, other, order).is_err());

    assert_eq!(repo.generation(), generation);
    assert_eq!(repo.annotation_index().len(), 1);
}

#[test]
fn clear_forgets_added_records() {
    let mut store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();
    create(&mut store, &mut repo, "NamedEntity", (0, 4));
    create(&mut store, &mut repo, "Token", (5, 6));

    repo.clear();
    assert!(repo.annotation_index().is_empty());
    assert!(repo.index("Entities").unwrap().is_empty());
    assert!(repo.definition("Entities").is_some());

    // the records are still live, but no longer indexed
    repo.reindex(&store).unwrap();
    assert!(repo.annotation_index().is_empty());
    assert!(repo.index("Entities").unwrap().is_empty());
}

#[test]
fn reindex_drops_records_the_store_deleted() {
    let mut store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();
    let entity = create(&mut store, &mut repo, "NamedEntity", (0, 4));
    let token = create(&mut store, &mut repo, "Token", (5, 6));

    // deleted without being removed first
    store.delete(token);
    repo.reindex(&store).unwrap();
    assert_eq!(repo.annotation_index().leaf().handles(), &[entity]);
    assert_eq!(repo.index("Entities").unwrap().handles(), &[entity]);
}

// One kept record, one added then removed, two never added. All of them
// stay live in the store.
fn mixed_membership() -> (MemoryStore, IndexRepository, Handle) {
    let mut store = text_store();
    let mut repo = repository(&store);
    let kept = create(&mut store, &mut repo, "Token", (0, 4));
    let removed = create(&mut store, &mut repo, "Token", (5, 6));
    repo.remove(&store, removed).unwrap();
    store.create_annotation("Token", 7, 9).unwrap();
    store.create_annotation("NamedEntity", 1, 3).unwrap();

    (store, repo, kept)
}

#[test]
fn rebind_keeps_the_added_records_only() {
    let (store, mut repo, kept) = mixed_membership();
    assert_eq!(repo.annotation_index().leaf().handles(), &[kept]);

    let type_system = Arc::clone(store.type_system());
    let mut builder = LinearTypeOrderBuilder::new(&type_system);
    builder.add(&["Sentence", "Token"]).unwrap();
    let order = Arc::new(builder.build());
    repo.rebind(&store, type_system, order).unwrap();

    assert_eq!(repo.annotation_index().leaf().handles(), &[kept]);
    assert_eq!(
        repo.annotation_index_for(&store, "Token").unwrap().leaf().handles(),
        &[kept]
    );
}

#[test]
fn reindex_keeps_the_added_records_only() {
    let (store, mut repo, kept) = mixed_membership();

    repo.reindex(&store).unwrap();
    assert_eq!(repo.annotation_index().leaf().handles(), &[kept]);
}

#[test]
fn late_indexes_see_only_added_records() {
    let (store, mut repo, kept) = mixed_membership();

    let by_begin = IndexDefinition::new(
        "AnnotationsByBegin",
        IndexKind::Bag,
        ComparatorSpec::new("Annotation").key("begin", KeyDirection::Standard),
    );
    repo.define(&store, by_begin).unwrap();
    assert_eq!(repo.index("AnnotationsByBegin").unwrap().handles(), &[kept]);

    assert!(
        repo.annotation_index_for(&store, "NamedEntity")
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        repo.annotation_index_for(&store, "Token").unwrap().leaf().handles(),
        &[kept]
    );
}

#[test]
fn plain_records_never_reach_annotation_indexes() {
    let mut store = text_store();
    let mut repo = repository(&store);
    let sentence = create(&mut store, &mut repo, "Sentence", (0, 10));
    let document = store.create("Document").unwrap();

    assert_eq!(repo.add(&store, document).unwrap(), 0);
    assert_eq!(repo.annotation_index().leaf().handles(), &[sentence]);

    // a later index over the plain type picks the added record up
    let documents = IndexDefinition::new(
        "Documents",
        IndexKind::Sorted,
        ComparatorSpec::new("Document").type_order(KeyDirection::Standard),
    );
    repo.define(&store, documents).unwrap();
    assert_eq!(repo.index("Documents").unwrap().handles(), &[document]);
}

#[test]
fn undefine_drops_user_indexes_only() {
    let store = text_store();
    let mut repo = repository(&store);
    repo.define(&store, entities_by_confidence()).unwrap();

    assert_eq!(repo.undefine("Entities").unwrap(), entities_by_confidence());
    assert!(repo.index("Entities").is_none());
    assert!(repo.undefine(ANNOTATION_INDEX_LABEL).unwrap_err().is_not_found());
    assert!(repo.index(ANNOTATION_INDEX_LABEL).is_some());
}
