use crate::model::{FEATURE_BEGIN, FEATURE_END, TYPE_NAME_ANNOTATION};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

///
/// KeyDirection
///
/// `Standard` sorts ascending, `Reverse` negates the key's comparison.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDirection {
    #[default]
    Standard,
    Reverse,
}

impl KeyDirection {
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Standard => ordering,
            Self::Reverse => ordering.reverse(),
        }
    }
}

///
/// KeyTarget
///
/// What one sort key reads: a named feature, or the record's declared type
/// ranked by the linear type order.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum KeyTarget {
    Feature(String),
    TypeOrder,
}

impl fmt::Display for KeyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(name) => f.write_str(name),
            Self::TypeOrder => f.write_str("<type-order>"),
        }
    }
}

///
/// SortKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SortKey {
    pub target: KeyTarget,
    pub direction: KeyDirection,
}

impl SortKey {
    #[must_use]
    pub fn feature(name: impl Into<String>, direction: KeyDirection) -> Self {
        Self {
            target: KeyTarget::Feature(name.into()),
            direction,
        }
    }

    #[must_use]
    pub const fn type_order(direction: KeyDirection) -> Self {
        Self {
            target: KeyTarget::TypeOrder,
            direction,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            KeyDirection::Standard => write!(f, "{}", self.target),
            KeyDirection::Reverse => write!(f, "{} desc", self.target),
        }
    }
}

///
/// ComparatorSpec
///
/// Declarative comparator: the record type it applies to and an ordered
/// key list. Two specs are equal iff type and keys are equal.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ComparatorSpec {
    pub type_name: String,
    pub keys: Vec<SortKey>,
}

impl ComparatorSpec {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            keys: Vec::new(),
        }
    }

    /// Append a feature key.
    #[must_use]
    pub fn key(mut self, feature: impl Into<String>, direction: KeyDirection) -> Self {
        self.keys.push(SortKey::feature(feature, direction));
        self
    }

    /// Append a type-order key.
    #[must_use]
    pub fn type_order(mut self, direction: KeyDirection) -> Self {
        self.keys.push(SortKey::type_order(direction));
        self
    }

    /// The fixed annotation ordering: begin ascending, end descending,
    /// type order as tiebreak.
    #[must_use]
    pub fn annotation(type_name: impl Into<String>) -> Self {
        Self::new(type_name)
            .key(FEATURE_BEGIN, KeyDirection::Standard)
            .key(FEATURE_END, KeyDirection::Reverse)
            .type_order(KeyDirection::Standard)
    }

    #[must_use]
    pub fn default_annotation() -> Self {
        Self::annotation(TYPE_NAME_ANNOTATION)
    }
}

impl fmt::Display for ComparatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name)?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str(")")
    }
}
