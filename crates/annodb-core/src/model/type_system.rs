use crate::{
    error::ErrorClass,
    types::{Generation, TypeCode},
};
use annodb_primitives::PrimitiveKind;
use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};
use thiserror::Error as ThisError;

/// Name of the root type every record type descends from.
pub const TYPE_NAME_TOP: &str = "Top";

/// Name of the built-in span-carrying type.
pub const TYPE_NAME_ANNOTATION: &str = "Annotation";

pub const FEATURE_BEGIN: &str = "begin";
pub const FEATURE_END: &str = "end";

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> Generation {
    Generation(NEXT_GENERATION.fetch_add(1, AtomicOrdering::Relaxed))
}

///
/// TypeSystemError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum TypeSystemError {
    #[error("type '{0}' already declared")]
    DuplicateType(String),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("feature '{feature}' already declared on '{type_name}' or one of its supertypes")]
    DuplicateFeature { type_name: String, feature: String },

    #[error("type system holds more than {max} types", max = u32::MAX)]
    TooManyTypes,
}

impl TypeSystemError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownType(_) => ErrorClass::NotFound,
            Self::DuplicateType(_) | Self::DuplicateFeature { .. } => ErrorClass::Conflict,
            Self::TooManyTypes => ErrorClass::Unsupported,
        }
    }
}

///
/// FeatureKind
///
/// Range of a feature. Primitive ranges are sortable; references to other
/// records are storable but can never drive an index key.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FeatureKind {
    Primitive(PrimitiveKind),
    Reference(TypeCode),
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Reference(code) => write!(f, "ref<{code}>"),
        }
    }
}

///
/// FeatureDescriptor
///
/// Resolved field of a type: its slot offset in the record layout and its kind.
/// Inherited features keep the offset assigned by the declaring type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeatureDescriptor {
    pub name: String,
    pub owner: TypeCode,
    pub offset: usize,
    pub kind: FeatureKind,
}

///
/// SpanLayout
///
/// Slot offsets of the `begin`/`end` features shared by every annotation type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpanLayout {
    pub begin: usize,
    pub end: usize,
}

#[derive(Clone, Debug)]
struct TypeDef {
    name: String,
    parent: Option<TypeCode>,
    children: Vec<TypeCode>,
    features: Vec<FeatureDescriptor>,
}

///
/// TypeSystem
///
/// Committed, immutable set of record types with single inheritance.
/// Type codes are dense and every parent has a smaller code than its children.
///

#[derive(Clone, Debug)]
pub struct TypeSystem {
    generation: Generation,
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeCode>,
    span_layout: SpanLayout,
}

impl TypeSystem {
    pub const TOP: TypeCode = TypeCode(0);
    pub const ANNOTATION: TypeCode = TypeCode(1);

    #[must_use]
    pub fn builder() -> TypeSystemBuilder {
        TypeSystemBuilder::new()
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[must_use]
    pub fn type_code(&self, name: &str) -> Option<TypeCode> {
        self.by_name.get(name).copied()
    }

    pub fn require_type(&self, name: &str) -> Result<TypeCode, TypeSystemError> {
        self.type_code(name)
            .ok_or_else(|| TypeSystemError::UnknownType(name.to_string()))
    }

    /// Name of a type; unknown codes render as `?`.
    #[must_use]
    pub fn type_name(&self, code: TypeCode) -> &str {
        self.types.get(code.index()).map_or("?", |def| def.name.as_str())
    }

    #[must_use]
    pub fn parent(&self, code: TypeCode) -> Option<TypeCode> {
        self.types.get(code.index()).and_then(|def| def.parent)
    }

    /// Codes of every declared type, in code order.
    pub fn type_codes(&self) -> impl Iterator<Item = TypeCode> + '_ {
        (0..self.types.len()).map(|i| TypeCode(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Whether `sub` is `sup` or one of its descendants.
    #[must_use]
    pub fn subsumes(&self, sup: TypeCode, sub: TypeCode) -> bool {
        let mut current = Some(sub);
        while let Some(code) = current {
            if code == sup {
                return true;
            }
            // parents always carry smaller codes
            if code < sup {
                return false;
            }
            current = self.parent(code);
        }

        false
    }

    /// `code` followed by all of its descendants, depth-first.
    #[must_use]
    pub fn subtypes(&self, code: TypeCode) -> Vec<TypeCode> {
        let mut out = Vec::new();
        let mut stack = vec![code];
        while let Some(next) = stack.pop() {
            let Some(def) = self.types.get(next.index()) else {
                continue;
            };
            out.push(next);
            stack.extend(def.children.iter().rev().copied());
        }

        out
    }

    /// All features of a type, inherited ones first, in slot order.
    #[must_use]
    pub fn features(&self, code: TypeCode) -> &[FeatureDescriptor] {
        self.types
            .get(code.index())
            .map_or(&[], |def| def.features.as_slice())
    }

    #[must_use]
    pub fn feature(&self, code: TypeCode, name: &str) -> Option<&FeatureDescriptor> {
        self.features(code).iter().find(|feature| feature.name == name)
    }

    /// Number of value slots in a record of this type.
    #[must_use]
    pub fn slot_count(&self, code: TypeCode) -> usize {
        self.features(code).len()
    }

    #[must_use]
    pub fn is_annotation(&self, code: TypeCode) -> bool {
        self.subsumes(Self::ANNOTATION, code)
    }

    #[must_use]
    pub const fn span_layout(&self) -> SpanLayout {
        self.span_layout
    }
}

#[derive(Clone, Debug)]
struct PendingType {
    name: String,
    parent: Option<TypeCode>,
    features: Vec<(String, FeatureKind)>,
}

///
/// TypeSystemBuilder
///
/// Mutable declaration phase. `build` commits the declarations, lays out
/// feature slots and stamps a fresh generation.
///

#[derive(Clone, Debug)]
pub struct TypeSystemBuilder {
    types: Vec<PendingType>,
    by_name: HashMap<String, TypeCode>,
}

impl TypeSystemBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        };

        builder.push(TYPE_NAME_TOP, None);
        builder.push(TYPE_NAME_ANNOTATION, Some(TypeSystem::TOP));
        let annotation = &mut builder.types[TypeSystem::ANNOTATION.index()];
        annotation.features.push((
            FEATURE_BEGIN.to_string(),
            FeatureKind::Primitive(PrimitiveKind::Int),
        ));
        annotation.features.push((
            FEATURE_END.to_string(),
            FeatureKind::Primitive(PrimitiveKind::Int),
        ));

        builder
    }

    fn push(&mut self, name: &str, parent: Option<TypeCode>) -> TypeCode {
        let code = TypeCode(u32::try_from(self.types.len()).unwrap_or(u32::MAX));
        self.types.push(PendingType {
            name: name.to_string(),
            parent,
            features: Vec::new(),
        });
        self.by_name.insert(name.to_string(), code);

        code
    }

    fn require(&self, name: &str) -> Result<TypeCode, TypeSystemError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeSystemError::UnknownType(name.to_string()))
    }

    /// Declare a type under an existing parent.
    pub fn add_type(&mut self, name: &str, parent: &str) -> Result<TypeCode, TypeSystemError> {
        if self.by_name.contains_key(name) {
            return Err(TypeSystemError::DuplicateType(name.to_string()));
        }
        if u32::try_from(self.types.len()).is_err() {
            return Err(TypeSystemError::TooManyTypes);
        }
        let parent = self.require(parent)?;

        Ok(self.push(name, Some(parent)))
    }

    /// Declare a feature on an existing type.
    pub fn add_feature(
        &mut self,
        type_name: &str,
        feature: &str,
        kind: FeatureKind,
    ) -> Result<(), TypeSystemError> {
        let code = self.require(type_name)?;
        let pending = &mut self.types[code.index()];
        if pending.features.iter().any(|(name, _)| name == feature) {
            return Err(TypeSystemError::DuplicateFeature {
                type_name: type_name.to_string(),
                feature: feature.to_string(),
            });
        }
        pending.features.push((feature.to_string(), kind));

        Ok(())
    }

    /// Convenience for primitive features.
    pub fn add_primitive(
        &mut self,
        type_name: &str,
        feature: &str,
        kind: PrimitiveKind,
    ) -> Result<(), TypeSystemError> {
        self.add_feature(type_name, feature, FeatureKind::Primitive(kind))
    }

    /// Commit the declarations.
    pub fn build(self) -> Result<TypeSystem, TypeSystemError> {
        let mut types: Vec<TypeDef> = Vec::with_capacity(self.types.len());

        for (index, pending) in self.types.into_iter().enumerate() {
            let code = TypeCode(u32::try_from(index).map_err(|_| TypeSystemError::TooManyTypes)?);
            let mut features = pending
                .parent
                .map(|parent| types[parent.index()].features.clone())
                .unwrap_or_default();

            for (name, kind) in pending.features {
                if features.iter().any(|feature| feature.name == name) {
                    return Err(TypeSystemError::DuplicateFeature {
                        type_name: pending.name,
                        feature: name,
                    });
                }
                let offset = features.len();
                features.push(FeatureDescriptor {
                    name,
                    owner: code,
                    offset,
                    kind,
                });
            }

            if let Some(parent) = pending.parent {
                types[parent.index()].children.push(code);
            }
            types.push(TypeDef {
                name: pending.name,
                parent: pending.parent,
                children: Vec::new(),
                features,
            });
        }

        let annotation = &types[TypeSystem::ANNOTATION.index()].features;
        let slot = |name: &str| {
            annotation
                .iter()
                .find(|feature| feature.name == name)
                .map_or(0, |feature| feature.offset)
        };
        let span_layout = SpanLayout {
            begin: slot(FEATURE_BEGIN),
            end: slot(FEATURE_END),
        };

        Ok(TypeSystem {
            generation: next_generation(),
            types,
            by_name: self.by_name,
            span_layout,
        })
    }
}

impl Default for TypeSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
