use thiserror::Error;

/// Errors raised by array operations.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Uninitialized array access: {0}")]
    UninitializedArrayAccess(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cast error: {0}")]
    CastError(String),
}

/// Returns early with [`ArrayError::IndexOutOfRange`] unless the condition holds.
///
/// With the `unchecked` feature the check is compiled out.
macro_rules! ensure_in_range {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(not(feature = "unchecked")) && !$cond {
            return Err($crate::ArrayError::IndexOutOfRange(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_in_range;
