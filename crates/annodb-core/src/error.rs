use crate::{
    config::ConfigFileError,
    index::{ConfigError, CursorError},
    model::{TypeOrderError, TypeSystemError},
    store::StoreError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Every fallible engine operation surfaces this type; the origin-specific
/// cause (if any) is kept in `detail`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Index,
            message.into(),
        )
    }

    /// Construct an index-origin conflict (label reuse with a different definition).
    pub(crate) fn index_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, ErrorOrigin::Index, message.into())
    }

    /// Construct an index-origin not-found error.
    pub(crate) fn index_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Index, message.into())
    }

    /// Construct a stale-generation error: something compiled against one
    /// type system was presented to a store of another.
    pub(crate) fn stale_generation(
        what: &str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::TypeOrder,
            format!(
                "{what} was compiled for type system {expected}, store is at {found}; rebind required"
            ),
        )
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self.class, ErrorClass::Config)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Comparator(ConfigError),
    #[error("{0}")]
    ConfigFile(ConfigFileError),
    #[error("{0}")]
    Cursor(CursorError),
    #[error("{0}")]
    Store(StoreError),
    #[error("{0}")]
    TypeOrder(TypeOrderError),
    #[error("{0}")]
    TypeSystem(TypeSystemError),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Comparator, err.to_string())
            .with_detail(ErrorDetail::Comparator(err))
    }
}

impl From<ConfigFileError> for InternalError {
    fn from(err: ConfigFileError) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Config, err.to_string())
            .with_detail(ErrorDetail::ConfigFile(err))
    }
}

impl From<CursorError> for InternalError {
    fn from(err: CursorError) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Cursor,
            err.to_string(),
        )
        .with_detail(ErrorDetail::Cursor(err))
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        Self::new(err.class(), ErrorOrigin::Store, err.to_string())
            .with_detail(ErrorDetail::Store(err))
    }
}

impl From<TypeOrderError> for InternalError {
    fn from(err: TypeOrderError) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::TypeOrder, err.to_string())
            .with_detail(ErrorDetail::TypeOrder(err))
    }
}

impl From<TypeSystemError> for InternalError {
    fn from(err: TypeSystemError) -> Self {
        Self::new(err.class(), ErrorOrigin::TypeSystem, err.to_string())
            .with_detail(ErrorDetail::TypeSystem(err))
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Rejected configuration: comparator keys, type priorities, index definitions.
    Config,
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    TypeSystem,
    TypeOrder,
    Store,
    Comparator,
    Index,
    Cursor,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TypeSystem => "type_system",
            Self::TypeOrder => "type_order",
            Self::Store => "store",
            Self::Comparator => "comparator",
            Self::Index => "index",
            Self::Cursor => "cursor",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
