#[macro_export]
macro_rules! primitive_kind_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (String, StringRef, name = "String", is_floating = false, is_integral = false),
            (Int, Word, name = "Integer", is_floating = false, is_integral = true),
            (Boolean, Word, name = "Boolean", is_floating = false, is_integral = true),
            (Byte, Word, name = "Byte", is_floating = false, is_integral = true),
            (Short, Word, name = "Short", is_floating = false, is_integral = true),
            (Long, Wide, name = "Long", is_floating = false, is_integral = true),
            (Float, Word, name = "Float", is_floating = true, is_integral = false),
            (Double, Wide, name = "Double", is_floating = true, is_integral = false),
        }
    };
}

macro_rules! primitive_kind_registry {
    ($macro:ident) => {
        $crate::primitive_kind_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::primitive_kind_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $kind:expr; @entries $( ($primitive:ident, $storage:ident, name = $name:expr, is_floating = $is_floating:expr, is_integral = $is_integral:expr) ),* $(,)? ) => {
        match $kind {
            $(
                $crate::PrimitiveKind::$primitive => $crate::PrimitiveMetadata {
                    storage: $crate::SlotStorage::$storage,
                    name: $name,
                    is_floating: $is_floating,
                    is_integral: $is_integral,
                },
            )*
        }
    };
}

macro_rules! all_kinds_from_registry {
    ( @entries $( ($primitive:ident, $storage:ident, name = $name:expr, is_floating = $is_floating:expr, is_integral = $is_integral:expr) ),* $(,)? ) => {
        [ $( $crate::PrimitiveKind::$primitive ),* ]
    };
}
