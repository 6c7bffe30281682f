use crate::{
    model::{FeatureDescriptor, FeatureKind, SpanLayout, TypeSystem},
    store::{FieldValue, RecordStore, StoreError},
    types::{Generation, Handle, Span, TypeCode},
};
use annodb_primitives::{PrimitiveKind, SlotStorage};
use std::{collections::BTreeSet, sync::Arc};

// string code 0 is the null string
const NULL_STRING: i32 = 0;

///
/// MemoryStore
///
/// Arena record store. A record is a run of 32-bit words in `heap`: the
/// type code followed by one slot per feature. 64-bit values live in a side
/// heap referenced from their slot, strings in a table referenced by code.
/// A handle is the heap address of the record's type word.
///

#[derive(Clone, Debug)]
pub struct MemoryStore {
    type_system: Arc<TypeSystem>,
    span_layout: SpanLayout,
    heap: Vec<i32>,
    wide_heap: Vec<i64>,
    strings: Vec<String>,
    live: BTreeSet<Handle>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(type_system: Arc<TypeSystem>) -> Self {
        let span_layout = type_system.span_layout();

        Self {
            type_system,
            span_layout,
            // address 0 is the null handle
            heap: vec![0],
            wide_heap: vec![0],
            strings: vec![String::new()],
            live: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn type_system(&self) -> &Arc<TypeSystem> {
        &self.type_system
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Allocate a record of `type_name` with zeroed / null slots.
    pub fn create(&mut self, type_name: &str) -> Result<Handle, StoreError> {
        let code = self
            .type_system
            .type_code(type_name)
            .ok_or_else(|| StoreError::UnknownTypeName(type_name.to_string()))?;

        self.create_code(code)
    }

    /// Allocate a record by type code.
    pub fn create_code(&mut self, code: TypeCode) -> Result<Handle, StoreError> {
        if code.index() >= self.type_system.len() {
            return Err(StoreError::UnknownType(code));
        }
        let address = u32::try_from(self.heap.len()).map_err(|_| StoreError::UnknownType(code))?;

        self.heap.push(code.0.cast_signed());
        for feature in self.type_system.features(code) {
            let slot = match slot_storage(feature.kind) {
                SlotStorage::Wide => {
                    let index = self.wide_heap.len();
                    self.wide_heap.push(0);
                    i32::try_from(index).unwrap_or(i32::MAX)
                }
                SlotStorage::Word | SlotStorage::StringRef => 0,
            };
            self.heap.push(slot);
        }

        let handle = Handle(address);
        self.live.insert(handle);

        Ok(handle)
    }

    /// Allocate an annotation and set its span.
    pub fn create_annotation(
        &mut self,
        type_name: &str,
        begin: i32,
        end: i32,
    ) -> Result<Handle, StoreError> {
        if begin < 0 || begin > end {
            return Err(StoreError::InvalidSpan { begin, end });
        }
        let code = self
            .type_system
            .type_code(type_name)
            .ok_or_else(|| StoreError::UnknownTypeName(type_name.to_string()))?;
        if !self.type_system.is_annotation(code) {
            return Err(StoreError::NotAnnotation(type_name.to_string()));
        }

        let handle = self.create_code(code)?;
        let layout = self.span_layout;
        let base = self.slot_address(handle, 0);
        self.heap[base + layout.begin] = begin;
        self.heap[base + layout.end] = end;

        Ok(handle)
    }

    /// Write one feature value.
    pub fn set(
        &mut self,
        handle: Handle,
        feature: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), StoreError> {
        let descriptor = self.descriptor(handle, feature)?;
        let value = value.into();
        if !value.fits(descriptor.kind) {
            return Err(StoreError::KindMismatch {
                feature: descriptor.name,
                expected: descriptor.kind,
                found: value.label(),
            });
        }

        let address = self.slot_address(handle, descriptor.offset);
        match value {
            FieldValue::String(text) => {
                self.heap[address] = match text {
                    Some(text) => {
                        let code = i32::try_from(self.strings.len()).unwrap_or(i32::MAX);
                        self.strings.push(text);
                        code
                    }
                    None => NULL_STRING,
                };
            }
            FieldValue::Int(v) => self.heap[address] = v,
            FieldValue::Boolean(v) => self.heap[address] = i32::from(v),
            FieldValue::Byte(v) => self.heap[address] = i32::from(v),
            FieldValue::Short(v) => self.heap[address] = i32::from(v),
            FieldValue::Float(v) => self.heap[address] = v.to_bits().cast_signed(),
            FieldValue::Reference(target) => {
                self.heap[address] = target.map_or(0, |h| h.0.cast_signed());
            }
            FieldValue::Long(v) => {
                let wide = self.wide_index(address);
                self.wide_heap[wide] = v;
            }
            FieldValue::Double(v) => {
                let wide = self.wide_index(address);
                self.wide_heap[wide] = v.to_bits().cast_signed();
            }
        }

        Ok(())
    }

    /// Read one feature value.
    pub fn get(&self, handle: Handle, feature: &str) -> Result<FieldValue, StoreError> {
        let descriptor = self.descriptor(handle, feature)?;
        let offset = descriptor.offset;

        let value = match descriptor.kind {
            FeatureKind::Reference(_) => {
                let raw = self.word(handle, offset);
                FieldValue::Reference((raw != 0).then(|| Handle(raw.cast_unsigned())))
            }
            FeatureKind::Primitive(kind) => match kind {
                PrimitiveKind::String => {
                    FieldValue::String(self.text(handle, offset).map(str::to_string))
                }
                PrimitiveKind::Int => FieldValue::Int(self.word(handle, offset)),
                PrimitiveKind::Boolean => FieldValue::Boolean(self.word(handle, offset) != 0),
                PrimitiveKind::Byte => {
                    FieldValue::Byte(i8::try_from(self.word(handle, offset)).unwrap_or_default())
                }
                PrimitiveKind::Short => {
                    FieldValue::Short(i16::try_from(self.word(handle, offset)).unwrap_or_default())
                }
                PrimitiveKind::Float => {
                    FieldValue::Float(f32::from_bits(self.word(handle, offset).cast_unsigned()))
                }
                PrimitiveKind::Long => FieldValue::Long(self.wide(handle, offset)),
                PrimitiveKind::Double => {
                    FieldValue::Double(f64::from_bits(self.wide(handle, offset).cast_unsigned()))
                }
            },
        };

        Ok(value)
    }

    /// Span of a live annotation record.
    pub fn span_of(&self, handle: Handle) -> Result<Span, StoreError> {
        let code = self.live_type(handle)?;
        if !self.type_system.is_annotation(code) {
            return Err(StoreError::NotAnnotation(
                self.type_system.type_name(code).to_string(),
            ));
        }

        Ok(self.span(handle))
    }

    /// Drop a record from the live set. Its heap words stay allocated until
    /// `reset`; the handle is never reissued before then.
    pub fn delete(&mut self, handle: Handle) -> bool {
        self.live.remove(&handle)
    }

    /// Start a new processing unit: drop every record.
    pub fn reset(&mut self) {
        self.heap.truncate(1);
        self.wide_heap.truncate(1);
        self.strings.truncate(1);
        self.live.clear();
    }

    /// Start a new processing unit under a different type system.
    pub fn reset_with(&mut self, type_system: Arc<TypeSystem>) {
        self.span_layout = type_system.span_layout();
        self.type_system = type_system;
        self.reset();
    }

    fn live_type(&self, handle: Handle) -> Result<TypeCode, StoreError> {
        if !self.live.contains(&handle) {
            return Err(StoreError::UnknownHandle(handle));
        }

        Ok(self.type_code(handle))
    }

    fn descriptor(&self, handle: Handle, feature: &str) -> Result<FeatureDescriptor, StoreError> {
        let code = self.live_type(handle)?;

        self.type_system
            .feature(code, feature)
            .cloned()
            .ok_or_else(|| StoreError::UnknownFeature {
                type_name: self.type_system.type_name(code).to_string(),
                feature: feature.to_string(),
            })
    }

    const fn slot_address(&self, handle: Handle, offset: usize) -> usize {
        handle.0 as usize + 1 + offset
    }

    fn wide_index(&self, address: usize) -> usize {
        usize::try_from(self.heap[address]).unwrap_or_default()
    }
}

const fn slot_storage(kind: FeatureKind) -> SlotStorage {
    match kind {
        FeatureKind::Primitive(kind) => kind.storage(),
        FeatureKind::Reference(_) => SlotStorage::Word,
    }
}

impl RecordStore for MemoryStore {
    fn generation(&self) -> Generation {
        self.type_system.generation()
    }

    fn is_live(&self, handle: Handle) -> bool {
        self.live.contains(&handle)
    }

    fn type_code(&self, handle: Handle) -> TypeCode {
        TypeCode(self.heap[handle.0 as usize].cast_unsigned())
    }

    fn word(&self, handle: Handle, offset: usize) -> i32 {
        self.heap[self.slot_address(handle, offset)]
    }

    fn wide(&self, handle: Handle, offset: usize) -> i64 {
        self.wide_heap[self.wide_index(self.slot_address(handle, offset))]
    }

    fn text(&self, handle: Handle, offset: usize) -> Option<&str> {
        match self.word(handle, offset) {
            NULL_STRING => None,
            code => self
                .strings
                .get(usize::try_from(code).unwrap_or_default())
                .map(String::as_str),
        }
    }

    fn span(&self, handle: Handle) -> Span {
        let base = self.slot_address(handle, 0);

        Span::new(
            self.heap[base + self.span_layout.begin],
            self.heap[base + self.span_layout.end],
        )
    }

    fn live_handles(&self) -> Box<dyn Iterator<Item = Handle> + '_> {
        Box::new(self.live.iter().copied())
    }
}
