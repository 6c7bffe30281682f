use serde::{Deserialize, Serialize};
use std::fmt;

///
/// IndexKind
///
/// Admission policy of a leaf index. Fixed at creation; the comparator is
/// the same for every kind.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Every record admitted; equivalents kept in insertion order.
    #[default]
    Sorted,

    /// At most one record per equivalence class.
    Set,

    /// Every record admitted; no order promised among equivalents.
    Bag,
}

impl IndexKind {
    #[must_use]
    pub const fn admits_duplicates(self) -> bool {
        !matches!(self, Self::Set)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sorted => "sorted",
            Self::Set => "set",
            Self::Bag => "bag",
        };
        write!(f, "{label}")
    }
}
