use crate::{
    index::key::{ComparatorSpec, KeyDirection, KeyTarget},
    model::{FeatureKind, LinearTypeOrder, TypeOrderError, TypeSystem},
    obs::sink::{self, MetricsEvent},
    store::RecordStore,
    types::{Generation, Handle, TypeCode},
};
use annodb_primitives::PrimitiveKind;
use std::{cmp::Ordering, sync::Arc};
use thiserror::Error as ThisError;

///
/// ConfigError
///
/// Comparator compilation failures. Reported once, synchronously, to the
/// caller that asked for the index; no index is constructed.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("comparator for '{0}' has no keys")]
    EmptyKeyList(String),

    #[error("comparator references unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{type_name}' has no feature '{feature}'")]
    UnknownFeature { type_name: String, feature: String },

    #[error("feature '{feature}' of '{type_name}' has kind {kind}, which cannot be a sort key")]
    UnsupportedFeatureKind {
        type_name: String,
        feature: String,
        kind: FeatureKind,
    },

    #[error("type '{0}' does not carry a span and cannot back an annotation index")]
    NotAnnotation(String),

    #[error("index '{label}': {reason}")]
    InvalidDefinition { label: String, reason: String },

    #[error(transparent)]
    TypeOrder(#[from] TypeOrderError),
}

// One resolved key: where to read and how to compare.
#[derive(Clone, Debug, PartialEq)]
enum KeyStep {
    Word(usize),
    Wide(usize),
    Float(usize),
    Double(usize),
    Text(usize),
    TypeOrder(Arc<LinearTypeOrder>),
}

#[derive(Clone, Debug, PartialEq)]
struct CompiledKey {
    step: KeyStep,
    direction: KeyDirection,
}

///
/// CompiledComparator
///
/// Executable multi-key comparator for one record type. The key plan is
/// resolved once at compile time; comparison is a single match per key with
/// no per-call lookup. Immutable and shareable across indexes.
///

#[derive(Clone, Debug)]
pub struct CompiledComparator {
    spec: ComparatorSpec,
    type_code: TypeCode,
    generation: Generation,
    keys: Box<[CompiledKey]>,
}

impl CompiledComparator {
    /// Compile a declarative spec against a type system and its type order.
    pub fn compile(
        spec: &ComparatorSpec,
        type_system: &TypeSystem,
        type_order: &Arc<LinearTypeOrder>,
    ) -> Result<Self, ConfigError> {
        if spec.keys.is_empty() {
            return Err(ConfigError::EmptyKeyList(spec.type_name.clone()));
        }
        let type_code = type_system
            .type_code(&spec.type_name)
            .ok_or_else(|| ConfigError::UnknownType(spec.type_name.clone()))?;
        if type_order.generation() != type_system.generation() {
            return Err(TypeOrderError::GenerationMismatch {
                order: type_order.generation(),
                type_system: type_system.generation(),
            }
            .into());
        }

        let mut keys = Vec::with_capacity(spec.keys.len());
        for key in &spec.keys {
            let step = match &key.target {
                KeyTarget::TypeOrder => KeyStep::TypeOrder(Arc::clone(type_order)),
                KeyTarget::Feature(name) => {
                    let feature = type_system.feature(type_code, name).ok_or_else(|| {
                        ConfigError::UnknownFeature {
                            type_name: spec.type_name.clone(),
                            feature: name.clone(),
                        }
                    })?;
                    match feature.kind {
                        FeatureKind::Primitive(kind) => step_for(kind, feature.offset),
                        FeatureKind::Reference(_) => {
                            return Err(ConfigError::UnsupportedFeatureKind {
                                type_name: spec.type_name.clone(),
                                feature: name.clone(),
                                kind: feature.kind,
                            });
                        }
                    }
                }
            };
            keys.push(CompiledKey {
                step,
                direction: key.direction,
            });
        }

        sink::record(MetricsEvent::ComparatorCompiled {
            keys: keys.len() as u64,
        });
        tracing::debug!(
            comparator = %spec,
            generation = %type_system.generation(),
            "compiled comparator"
        );

        Ok(Self {
            spec: spec.clone(),
            type_code,
            generation: type_system.generation(),
            keys: keys.into_boxed_slice(),
        })
    }

    #[must_use]
    pub const fn spec(&self) -> &ComparatorSpec {
        &self.spec
    }

    /// Record type the comparator was compiled for.
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Type-system generation the key plan was resolved against.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub const fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn uses_type_order(&self) -> bool {
        self.keys
            .iter()
            .any(|key| matches!(key.step, KeyStep::TypeOrder(_)))
    }

    /// Compare two records key by key, stopping at the first difference.
    /// `Equal` means the records are index-equivalent, whatever their handles.
    pub fn compare<S>(&self, store: &S, left: Handle, right: Handle) -> Ordering
    where
        S: RecordStore + ?Sized,
    {
        for key in &self.keys {
            let ordering = match &key.step {
                KeyStep::Word(offset) => store
                    .word(left, *offset)
                    .cmp(&store.word(right, *offset)),
                KeyStep::Wide(offset) => store
                    .wide(left, *offset)
                    .cmp(&store.wide(right, *offset)),
                KeyStep::Float(offset) => {
                    compare_float_bits_raw(store.word(left, *offset), store.word(right, *offset))
                }
                KeyStep::Double(offset) => {
                    compare_double_bits_raw(store.wide(left, *offset), store.wide(right, *offset))
                }
                // None sorts before any string
                KeyStep::Text(offset) => store
                    .text(left, *offset)
                    .cmp(&store.text(right, *offset)),
                KeyStep::TypeOrder(order) => {
                    let (left_type, right_type) = (store.type_code(left), store.type_code(right));
                    if left_type == right_type {
                        Ordering::Equal
                    } else if order.less_than(left_type, right_type) {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                }
            };

            if ordering != Ordering::Equal {
                return key.direction.apply(ordering);
            }
        }

        Ordering::Equal
    }
}

impl PartialEq for CompiledComparator {
    fn eq(&self, other: &Self) -> bool {
        self.type_code == other.type_code && self.keys == other.keys
    }
}

const fn step_for(kind: PrimitiveKind, offset: usize) -> KeyStep {
    match kind {
        PrimitiveKind::String => KeyStep::Text(offset),
        PrimitiveKind::Float => KeyStep::Float(offset),
        PrimitiveKind::Double => KeyStep::Double(offset),
        PrimitiveKind::Long => KeyStep::Wide(offset),
        PrimitiveKind::Int | PrimitiveKind::Boolean | PrimitiveKind::Byte | PrimitiveKind::Short => {
            KeyStep::Word(offset)
        }
    }
}

/// Compare two 32-bit float slots by plain `<` / `>` on the reinterpreted bits.
///
/// This is not a total order: NaN compares equal to everything and `-0.0`
/// equals `0.0`. Kept bit-for-bit compatible with stored indexes; do not
/// swap in `f32::total_cmp` without a migration of existing orderings.
#[must_use]
pub fn compare_float_bits_raw(left: i32, right: i32) -> Ordering {
    let (left, right) = (
        f32::from_bits(left.cast_unsigned()),
        f32::from_bits(right.cast_unsigned()),
    );

    raw_relational(left < right, left > right)
}

/// 64-bit counterpart of [`compare_float_bits_raw`], with the same caveats.
#[must_use]
pub fn compare_double_bits_raw(left: i64, right: i64) -> Ordering {
    let (left, right) = (
        f64::from_bits(left.cast_unsigned()),
        f64::from_bits(right.cast_unsigned()),
    );

    raw_relational(left < right, left > right)
}

const fn raw_relational(less: bool, greater: bool) -> Ordering {
    if less {
        Ordering::Less
    } else if greater {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}
