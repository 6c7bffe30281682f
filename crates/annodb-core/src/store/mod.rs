//! Record store boundary.
//!
//! The index engine reads records only through [`RecordStore`]; it never
//! writes through it. [`MemoryStore`] is the arena implementation used by
//! processing units and tests.

mod memory;

#[cfg(test)]
mod tests;

pub use memory::MemoryStore;

use crate::{
    error::ErrorClass,
    model::FeatureKind,
    types::{Generation, Handle, Span, TypeCode},
};
use annodb_primitives::PrimitiveKind;
use derive_more::From;
use thiserror::Error as ThisError;

///
/// RecordStore
///
/// Typed slot reads by (handle, offset). These are the comparator's hot
/// path: no liveness check is performed, presenting a handle that is not
/// live is a caller contract violation.
///

pub trait RecordStore {
    /// Generation of the type system the store's records are laid out for.
    fn generation(&self) -> Generation;

    fn is_live(&self, handle: Handle) -> bool;

    fn type_code(&self, handle: Handle) -> TypeCode;

    /// 32-bit slot (Int, Boolean, Byte, Short, Float bits, references).
    fn word(&self, handle: Handle, offset: usize) -> i32;

    /// 64-bit slot (Long, Double bits).
    fn wide(&self, handle: Handle, offset: usize) -> i64;

    /// String slot; `None` is the null string.
    fn text(&self, handle: Handle, offset: usize) -> Option<&str>;

    /// Span of an annotation record.
    fn span(&self, handle: Handle) -> Span;

    /// Every live record, in creation order.
    fn live_handles(&self) -> Box<dyn Iterator<Item = Handle> + '_>;
}

///
/// StoreError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("record {0} is not live in this store")]
    UnknownHandle(Handle),

    #[error("unknown type code {0}")]
    UnknownType(TypeCode),

    #[error("unknown type '{0}'")]
    UnknownTypeName(String),

    #[error("type '{type_name}' has no feature '{feature}'")]
    UnknownFeature { type_name: String, feature: String },

    #[error("feature '{feature}' has kind {expected}, got a {found} value")]
    KindMismatch {
        feature: String,
        expected: FeatureKind,
        found: &'static str,
    },

    #[error("type '{0}' is not an annotation type")]
    NotAnnotation(String),

    #[error("invalid span [{begin}, {end}): offsets must satisfy 0 <= begin <= end")]
    InvalidSpan { begin: i32, end: i32 },
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownHandle(_)
            | Self::UnknownType(_)
            | Self::UnknownTypeName(_)
            | Self::UnknownFeature { .. } => {
                ErrorClass::NotFound
            }
            Self::KindMismatch { .. } | Self::NotAnnotation(_) => ErrorClass::Unsupported,
            Self::InvalidSpan { .. } => ErrorClass::InvariantViolation,
        }
    }
}

///
/// FieldValue
///
/// Typed value of one feature, as written to or read from the store.
///

#[derive(Clone, Debug, From, PartialEq)]
pub enum FieldValue {
    String(Option<String>),
    Int(i32),
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Long(i64),
    Float(f32),
    Double(f64),
    Reference(Option<Handle>),
}

impl FieldValue {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Int(_) => "Integer",
            Self::Boolean(_) => "Boolean",
            Self::Byte(_) => "Byte",
            Self::Short(_) => "Short",
            Self::Long(_) => "Long",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::Reference(_) => "Reference",
        }
    }

    /// Whether the value may be stored in a feature of `kind`.
    #[must_use]
    pub const fn fits(&self, kind: FeatureKind) -> bool {
        matches!(
            (self, kind),
            (Self::String(_), FeatureKind::Primitive(PrimitiveKind::String))
                | (Self::Int(_), FeatureKind::Primitive(PrimitiveKind::Int))
                | (Self::Boolean(_), FeatureKind::Primitive(PrimitiveKind::Boolean))
                | (Self::Byte(_), FeatureKind::Primitive(PrimitiveKind::Byte))
                | (Self::Short(_), FeatureKind::Primitive(PrimitiveKind::Short))
                | (Self::Long(_), FeatureKind::Primitive(PrimitiveKind::Long))
                | (Self::Float(_), FeatureKind::Primitive(PrimitiveKind::Float))
                | (Self::Double(_), FeatureKind::Primitive(PrimitiveKind::Double))
                | (Self::Reference(_), FeatureKind::Reference(_))
        )
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(Some(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(Some(value))
    }
}

impl From<Handle> for FieldValue {
    fn from(value: Handle) -> Self {
        Self::Reference(Some(value))
    }
}
