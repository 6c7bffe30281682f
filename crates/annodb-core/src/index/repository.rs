use crate::{
    config::RepositoryConfig,
    error::InternalError,
    index::{
        annotation::{ANNOTATION_INDEX_LABEL, AnnotationIndex},
        comparator::CompiledComparator,
        key::ComparatorSpec,
        kind::IndexKind,
        leaf::LeafIndex,
    },
    model::{LinearTypeOrder, TYPE_NAME_ANNOTATION, TypeOrderError, TypeSystem},
    obs::sink::{self, MetricsEvent},
    store::{RecordStore, StoreError},
    types::{Generation, Handle, TypeCode},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// IndexDefinition
///
/// Declarative description of one index. The indexed type is the
/// comparator's type; its subtypes are covered too.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDefinition {
    pub label: String,
    pub kind: IndexKind,
    pub comparator: ComparatorSpec,
}

impl IndexDefinition {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: IndexKind, comparator: ComparatorSpec) -> Self {
        Self {
            label: label.into(),
            kind,
            comparator,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.comparator.type_name
    }
}

#[derive(Clone, Debug)]
enum IndexEntry {
    Leaf(LeafIndex),
    Annotation(AnnotationIndex),
}

impl IndexEntry {
    const fn leaf(&self) -> &LeafIndex {
        match self {
            Self::Leaf(leaf) => leaf,
            Self::Annotation(index) => index.leaf(),
        }
    }

    fn insert<S: RecordStore + ?Sized>(&mut self, store: &S, handle: Handle) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.insert(store, handle),
            Self::Annotation(index) => index.insert(store, handle),
        }
    }

    fn remove<S: RecordStore + ?Sized>(&mut self, store: &S, handle: Handle) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.remove(store, handle),
            Self::Annotation(index) => index.remove(store, handle),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Leaf(leaf) => leaf.clear(),
            Self::Annotation(index) => index.clear(),
        }
    }
}

#[derive(Clone, Debug)]
struct Registered {
    definition: IndexDefinition,
    type_code: TypeCode,
    index: IndexEntry,
}

///
/// IndexRepository
///
/// Every index of one type-system generation, keyed by label. The store
/// reports inserts and removals here; the repository routes each to the
/// indexes whose type subsumes the record's type.
///
/// The built-in annotation index is always present.
///
/// Membership is what callers `add`ed and have not `remove`d. Defining,
/// reindexing and rebinding rebuild from that set, never from the store's
/// whole record population.
///

#[derive(Debug)]
pub struct IndexRepository {
    type_system: Arc<TypeSystem>,
    type_order: Arc<LinearTypeOrder>,
    annotations: AnnotationIndex,
    entries: BTreeMap<String, Registered>,
    members: BTreeSet<Handle>,
}

impl IndexRepository {
    /// Empty repository bound to a type system and its type order.
    pub fn new(
        type_system: Arc<TypeSystem>,
        type_order: Arc<LinearTypeOrder>,
    ) -> Result<Self, InternalError> {
        check_order(&type_system, &type_order)?;
        let annotations = AnnotationIndex::compile(
            ANNOTATION_INDEX_LABEL,
            TYPE_NAME_ANNOTATION,
            &type_system,
            &type_order,
        )?;

        tracing::debug!(
            generation = %type_system.generation(),
            declared_priorities = !type_order.is_empty_order(),
            "index repository created"
        );

        Ok(Self {
            type_system,
            type_order,
            annotations,
            entries: BTreeMap::new(),
            members: BTreeSet::new(),
        })
    }

    /// Repository with no declared type priorities.
    pub fn with_natural_order(type_system: Arc<TypeSystem>) -> Result<Self, InternalError> {
        let order = Arc::new(LinearTypeOrder::natural(&type_system));
        Self::new(type_system, order)
    }

    /// Build the type order and every index a configuration declares.
    /// Nothing is returned unless every definition compiles.
    pub fn from_config(
        type_system: Arc<TypeSystem>,
        config: &RepositoryConfig,
    ) -> Result<Self, InternalError> {
        let order = Arc::new(config.type_order(&type_system)?);
        let mut repository = Self::new(type_system, order)?;
        for index in &config.indexes {
            repository.install(index.definition()?)?;
        }

        Ok(repository)
    }

    #[must_use]
    pub const fn type_system(&self) -> &Arc<TypeSystem> {
        &self.type_system
    }

    #[must_use]
    pub const fn type_order(&self) -> &Arc<LinearTypeOrder> {
        &self.type_order
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.type_system.generation()
    }

    /// Labels of every index, the built-in annotation index first.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(ANNOTATION_INDEX_LABEL).chain(self.entries.keys().map(String::as_str))
    }

    #[must_use]
    pub fn index(&self, label: &str) -> Option<&LeafIndex> {
        if label == ANNOTATION_INDEX_LABEL {
            return Some(self.annotations.leaf());
        }

        self.entries.get(label).map(|entry| entry.index.leaf())
    }

    #[must_use]
    pub fn definition(&self, label: &str) -> Option<&IndexDefinition> {
        self.entries.get(label).map(|entry| &entry.definition)
    }

    /// The built-in index over every annotation.
    #[must_use]
    pub const fn annotation_index(&self) -> &AnnotationIndex {
        &self.annotations
    }

    /// Annotation index restricted to `type_name` and its subtypes, created
    /// and populated from the added records on first request.
    pub fn annotation_index_for<S>(
        &mut self,
        store: &S,
        type_name: &str,
    ) -> Result<&AnnotationIndex, InternalError>
    where
        S: RecordStore + ?Sized,
    {
        if type_name == TYPE_NAME_ANNOTATION {
            return Ok(&self.annotations);
        }
        self.check_store(store)?;

        let label = format!("{ANNOTATION_INDEX_LABEL}:{type_name}");
        if !self.entries.contains_key(&label) {
            let comparator =
                AnnotationIndex::comparator(type_name, &self.type_system, &self.type_order)?;
            let definition =
                IndexDefinition::new(&label, IndexKind::Sorted, comparator.spec().clone());
            let entry = self.populated_entry(store, definition, Arc::new(comparator), true);
            self.entries.insert(label.clone(), entry);
        }

        match self.entries.get(&label).map(|entry| &entry.index) {
            Some(IndexEntry::Annotation(index)) => Ok(index),
            Some(IndexEntry::Leaf(_)) => Err(InternalError::index_conflict(format!(
                "label '{label}' is taken by a non-annotation index"
            ))),
            None => Err(InternalError::index_invariant(format!(
                "annotation index '{label}' missing after creation"
            ))),
        }
    }

    /// Define an index and populate it from the records added so far.
    ///
    /// Redefining a label with an identical definition is a no-op; any other
    /// reuse of a label is a conflict.
    pub fn define<S>(&mut self, store: &S, definition: IndexDefinition) -> Result<(), InternalError>
    where
        S: RecordStore + ?Sized,
    {
        self.check_store(store)?;
        if self.is_defined(&definition)? {
            return Ok(());
        }

        let comparator = self.compile(&definition)?;
        let entry = self.populated_entry(store, definition, Arc::new(comparator), false);
        self.entries.insert(entry.definition.label.clone(), entry);

        Ok(())
    }

    /// Drop an index. The built-in annotation index cannot be removed.
    pub fn undefine(&mut self, label: &str) -> Result<IndexDefinition, InternalError> {
        self.entries
            .remove(label)
            .map(|entry| entry.definition)
            .ok_or_else(|| InternalError::index_not_found(format!("no removable index '{label}'")))
    }

    /// Index a newly created record. Returns how many indexes admitted it.
    pub fn add<S>(&mut self, store: &S, handle: Handle) -> Result<usize, InternalError>
    where
        S: RecordStore + ?Sized,
    {
        let code = self.checked_type(store, handle)?;
        self.members.insert(handle);
        let mut admitted = 0;

        if self.type_system.is_annotation(code) && self.annotations.insert(store, handle) {
            admitted += 1;
        }
        for entry in self.entries.values_mut() {
            if self.type_system.subsumes(entry.type_code, code) && entry.index.insert(store, handle)
            {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Unindex a record. Call before the store deletes it. Returns how many
    /// indexes held it.
    pub fn remove<S>(&mut self, store: &S, handle: Handle) -> Result<usize, InternalError>
    where
        S: RecordStore + ?Sized,
    {
        let code = self.checked_type(store, handle)?;
        self.members.remove(&handle);
        let mut removed = 0;

        if self.type_system.is_annotation(code) && self.annotations.remove(store, handle) {
            removed += 1;
        }
        for entry in self.entries.values_mut() {
            if self.type_system.subsumes(entry.type_code, code) && entry.index.remove(store, handle)
            {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Empty every index and forget every added record, keeping the
    /// definitions. Call before the store starts a new processing unit.
    pub fn clear(&mut self) {
        self.members.clear();
        self.annotations.clear();
        for entry in self.entries.values_mut() {
            entry.index.clear();
        }
    }

    /// Re-sort every index from the added records. Records the store has
    /// deleted since they were added are dropped.
    pub fn reindex<S>(&mut self, store: &S) -> Result<(), InternalError>
    where
        S: RecordStore + ?Sized,
    {
        self.check_store(store)?;
        self.retain_live(store);

        let comparator = Arc::clone(self.annotations.leaf().comparator());
        self.annotations = self.rebuilt_annotations(store, comparator);
        let type_system = Arc::clone(&self.type_system);
        for entry in self.entries.values_mut() {
            let comparator = Arc::clone(entry.index.leaf().comparator());
            entry.index = rebuild(&type_system, store, &self.members, entry, comparator);
        }

        Ok(())
    }

    /// Switch to a new type system and type order.
    ///
    /// Every comparator is recompiled and every index re-sorted over the
    /// same added records, dropping any the store no longer holds. The store
    /// must already be laid out for the new type system. On error the
    /// repository is left unchanged.
    pub fn rebind<S>(
        &mut self,
        store: &S,
        type_system: Arc<TypeSystem>,
        type_order: Arc<LinearTypeOrder>,
    ) -> Result<(), InternalError>
    where
        S: RecordStore + ?Sized,
    {
        check_order(&type_system, &type_order)?;
        if store.generation() != type_system.generation() {
            return Err(InternalError::stale_generation(
                "store",
                type_system.generation(),
                store.generation(),
            ));
        }

        // compile everything before touching any index
        let annotation_comparator = Arc::new(AnnotationIndex::comparator(
            TYPE_NAME_ANNOTATION,
            &type_system,
            &type_order,
        )?);
        let mut compiled = Vec::with_capacity(self.entries.len());
        for (label, entry) in &self.entries {
            let comparator = match entry.index {
                IndexEntry::Leaf(_) => CompiledComparator::compile(
                    &entry.definition.comparator,
                    &type_system,
                    &type_order,
                )?,
                IndexEntry::Annotation(_) => AnnotationIndex::comparator(
                    entry.definition.type_name(),
                    &type_system,
                    &type_order,
                )?,
            };
            compiled.push((label.clone(), Arc::new(comparator)));
        }

        tracing::debug!(
            from = %self.type_system.generation(),
            to = %type_system.generation(),
            indexes = compiled.len() + 1,
            "rebinding index repository"
        );

        self.type_system = type_system;
        self.type_order = type_order;
        self.retain_live(store);
        self.annotations = self.rebuilt_annotations(store, annotation_comparator);
        for (label, comparator) in compiled {
            if let Some(entry) = self.entries.get_mut(&label) {
                entry.type_code = comparator.type_code();
                entry.index =
                    rebuild(&self.type_system, store, &self.members, entry, comparator);
            }
        }

        Ok(())
    }

    // Register a definition without populating it.
    fn install(&mut self, definition: IndexDefinition) -> Result<(), InternalError> {
        if self.is_defined(&definition)? {
            return Ok(());
        }

        let comparator = Arc::new(self.compile(&definition)?);
        let entry = Registered {
            type_code: comparator.type_code(),
            index: IndexEntry::Leaf(LeafIndex::new(&definition.label, definition.kind, comparator)),
            definition,
        };
        self.entries.insert(entry.definition.label.clone(), entry);

        Ok(())
    }

    fn compile(&self, definition: &IndexDefinition) -> Result<CompiledComparator, InternalError> {
        let comparator =
            CompiledComparator::compile(&definition.comparator, &self.type_system, &self.type_order)?;
        tracing::debug!(
            index = %definition.label,
            kind = %definition.kind,
            comparator = %definition.comparator,
            "index defined"
        );

        Ok(comparator)
    }

    // Ok(true) when an identical definition already holds the label.
    fn is_defined(&self, definition: &IndexDefinition) -> Result<bool, InternalError> {
        if definition.label == ANNOTATION_INDEX_LABEL {
            return Err(InternalError::index_conflict(format!(
                "label '{ANNOTATION_INDEX_LABEL}' is reserved for the built-in annotation index"
            )));
        }

        match self.entries.get(&definition.label) {
            None => Ok(false),
            Some(existing) if existing.definition == *definition => Ok(true),
            Some(existing) => Err(InternalError::index_conflict(format!(
                "index '{}' is already defined as {} {}",
                definition.label, existing.definition.kind, existing.definition.comparator
            ))),
        }
    }

    fn populated_entry<S>(
        &self,
        store: &S,
        definition: IndexDefinition,
        comparator: Arc<CompiledComparator>,
        annotation: bool,
    ) -> Registered
    where
        S: RecordStore + ?Sized,
    {
        let type_code = comparator.type_code();
        let records = covered_records(&self.type_system, store, &self.members, type_code);
        let leaf =
            LeafIndex::from_records(&definition.label, definition.kind, comparator, store, records);

        Registered {
            definition,
            type_code,
            index: if annotation {
                IndexEntry::Annotation(AnnotationIndex::from_leaf(leaf))
            } else {
                IndexEntry::Leaf(leaf)
            },
        }
    }

    fn rebuilt_annotations<S>(
        &self,
        store: &S,
        comparator: Arc<CompiledComparator>,
    ) -> AnnotationIndex
    where
        S: RecordStore + ?Sized,
    {
        let records =
            covered_records(&self.type_system, store, &self.members, TypeSystem::ANNOTATION);
        let leaf = LeafIndex::from_records(
            ANNOTATION_INDEX_LABEL,
            IndexKind::Sorted,
            comparator,
            store,
            records,
        );
        sink::record(MetricsEvent::IndexRebuilt {
            index: ANNOTATION_INDEX_LABEL,
            records: leaf.len() as u64,
        });

        AnnotationIndex::from_leaf(leaf)
    }

    fn retain_live<S>(&mut self, store: &S)
    where
        S: RecordStore + ?Sized,
    {
        let before = self.members.len();
        self.members.retain(|handle| store.is_live(*handle));
        if self.members.len() != before {
            tracing::debug!(
                dropped = before - self.members.len(),
                "dropped deleted records from the index repository"
            );
        }
    }

    fn check_store<S>(&self, store: &S) -> Result<(), InternalError>
    where
        S: RecordStore + ?Sized,
    {
        if store.generation() == self.generation() {
            return Ok(());
        }

        tracing::warn!(
            repository = %self.generation(),
            store = %store.generation(),
            "store and index repository disagree on type system generation"
        );

        Err(InternalError::stale_generation(
            "index repository",
            self.generation(),
            store.generation(),
        ))
    }

    fn checked_type<S>(&self, store: &S, handle: Handle) -> Result<TypeCode, InternalError>
    where
        S: RecordStore + ?Sized,
    {
        self.check_store(store)?;
        if !store.is_live(handle) {
            return Err(StoreError::UnknownHandle(handle).into());
        }

        Ok(store.type_code(handle))
    }
}

fn check_order(type_system: &TypeSystem, type_order: &LinearTypeOrder) -> Result<(), InternalError> {
    if type_order.generation() == type_system.generation() {
        Ok(())
    } else {
        Err(TypeOrderError::GenerationMismatch {
            order: type_order.generation(),
            type_system: type_system.generation(),
        }
        .into())
    }
}

// Added records of `type_code` or a subtype, in handle order.
fn covered_records<S>(
    type_system: &TypeSystem,
    store: &S,
    members: &BTreeSet<Handle>,
    type_code: TypeCode,
) -> Vec<Handle>
where
    S: RecordStore + ?Sized,
{
    members
        .iter()
        .copied()
        .filter(|handle| {
            store.is_live(*handle) && type_system.subsumes(type_code, store.type_code(*handle))
        })
        .collect()
}

fn rebuild<S>(
    type_system: &TypeSystem,
    store: &S,
    members: &BTreeSet<Handle>,
    entry: &Registered,
    comparator: Arc<CompiledComparator>,
) -> IndexEntry
where
    S: RecordStore + ?Sized,
{
    let definition = &entry.definition;
    let records = covered_records(type_system, store, members, comparator.type_code());
    let leaf =
        LeafIndex::from_records(&definition.label, definition.kind, comparator, store, records);
    sink::record(MetricsEvent::IndexRebuilt {
        index: &definition.label,
        records: leaf.len() as u64,
    });

    match entry.index {
        IndexEntry::Leaf(_) => IndexEntry::Leaf(leaf),
        IndexEntry::Annotation(_) => IndexEntry::Annotation(AnnotationIndex::from_leaf(leaf)),
    }
}
