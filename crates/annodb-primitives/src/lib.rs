//! Primitive field kinds shared by the AnnoDB type system, record store,
//! and comparator compiler.

#[macro_use]
mod macros;

///
/// PrimitiveKind
///
/// Closed set of primitive kinds a record field may carry.
/// Sort keys may only reference fields of these kinds.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PrimitiveKind {
    String,
    Int,
    Boolean,
    Byte,
    Short,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    /// Return the full metadata descriptor for one primitive kind.
    #[must_use]
    pub const fn metadata(self) -> PrimitiveMetadata {
        primitive_kind_registry!(metadata_from_registry, self)
    }

    /// Return the slot storage class used by the record layout.
    #[must_use]
    pub const fn storage(self) -> SlotStorage {
        self.metadata().storage
    }

    /// Canonical type-system name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.metadata().name
    }

    #[must_use]
    pub const fn is_floating(self) -> bool {
        self.metadata().is_floating
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        self.metadata().is_integral
    }

    /// Resolve a canonical kind name (as used in configuration) to a kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_PRIMITIVE_KINDS
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

///
/// PrimitiveMetadata
///
/// Capability metadata for one primitive kind.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PrimitiveMetadata {
    pub storage: SlotStorage,
    pub name: &'static str,
    pub is_floating: bool,
    pub is_integral: bool,
}

///
/// SlotStorage
///
/// Where a field's value physically lives in the record layout.
/// `Word` values sit in the 32-bit slot itself; `Wide` slots hold an index
/// into the 64-bit side heap; `StringRef` slots hold a string-table code.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SlotStorage {
    Word,
    Wide,
    StringRef,
}

/// Ordered list of all primitive kinds in registry order.
pub const ALL_PRIMITIVE_KINDS: [PrimitiveKind; 8] = primitive_kind_registry!(all_kinds_from_registry);

///
/// TESTS
///
