//! Small value types shared by every layer: record handles, type codes,
//! type-system generations, and annotation spans.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

///
/// Handle
///
/// Opaque store-assigned identifier of one record.
/// Handles are never reused while the store's current processing unit lives.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[display("#{_0}")]
pub struct Handle(pub u32);

impl Handle {
    /// Reserved null handle; never assigned to a record.
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

///
/// TypeCode
///
/// Dense code of a declared record type within one type system.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TypeCode(pub u32);

impl TypeCode {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// Generation
///
/// Process-unique tag of one committed type system.
/// Compiled comparators and type orders remember the generation they were
/// built against so stale use can be detected instead of silently tolerated.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("gen{_0}")]
pub struct Generation(pub u64);

///
/// Span
///
/// Half-open character interval `[begin, end)` carried by annotation records.
/// Well-formedness (`begin <= end`) is enforced by the store at creation time.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[display("[{begin}, {end})")]
pub struct Span {
    pub begin: i32,
    pub end: i32,
}

impl Span {
    #[must_use]
    pub const fn new(begin: i32, end: i32) -> Self {
        Self { begin, end }
    }

    #[must_use]
    pub const fn len(self) -> i32 {
        self.end - self.begin
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.begin == self.end
    }

    /// Non-strict interval containment: `other` lies within `self`.
    /// Identical spans contain each other.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// Non-disjoint intervals: `other.begin < self.end && other.end > self.begin`.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        other.begin < self.end && other.end > self.begin
    }
}

///
/// TESTS
///
