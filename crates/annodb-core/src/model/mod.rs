//! Type system collaborators: declared record types with their feature
//! layout, and the linear type order used as a comparator tiebreak.

mod type_order;
mod type_system;


pub use type_order::{LinearTypeOrder, LinearTypeOrderBuilder, TypeOrderError};
pub use type_system::{
    FEATURE_BEGIN, FEATURE_END, FeatureDescriptor, FeatureKind, SpanLayout, TYPE_NAME_ANNOTATION,
    TYPE_NAME_TOP, TypeSystem, TypeSystemBuilder, TypeSystemError,
};
