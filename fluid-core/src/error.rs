//! Error types shared across the crate.

use thiserror::Error;

/// Errors raised by the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// Computations can only be created while an ownership scope is current.
    #[error("a computation must be created inside an ownership scope (see `create_root`)")]
    NoActiveScope,

    /// The memo body unwound before producing its first value.
    #[error("memo did not produce an initial value")]
    MemoUninitialized,
}

/// Errors raised when addressing or updating a [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A key was applied to something other than an object.
    #[error("cannot select key `{0}` on a non-object value")]
    NotAnObject(String),

    /// An index was applied to something other than an array.
    #[error("cannot select index {0} on a non-array value")]
    NotAnArray(usize),

    /// A predicate was applied to something other than an array.
    #[error("predicates are only supported on arrays")]
    PredicateOnNonArray,

    /// The key does not exist on the selected object.
    #[error("no value stored under key `{0}`")]
    MissingKey(String),

    /// The index is past the end of the selected array.
    #[error("index {index} is out of bounds for an array of length {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Length of the array at the time of the lookup.
        len: usize,
    },

    /// Partial updates must be JSON objects.
    #[error("partial updates must be objects, got {0}")]
    PartialNotObject(String),

    /// A value was overwritten with one of another shape (object, array or
    /// scalar).
    #[error("the value at `{0}` cannot change shape")]
    ShapeMismatch(String),
}

/// Errors raised while loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the runtime cannot work with.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Result alias defaulting to [`ReactiveError`].
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
