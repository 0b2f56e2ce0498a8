use thiserror::Error;

/// Errors raised by the matrix engine and everything built on it.
///
/// Every operation checks its preconditions before allocating, so an `Err`
/// never comes with a partially built result.
#[derive(Debug, Error)]
pub enum NnError {
    /// Operand dimensions are incompatible for the named operation.
    #[error("shape mismatch in {op}: left is {left:?}, right is {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A required argument was absent (empty literal, model without layers, empty dataset).
    #[error("missing required input: {0}")]
    NullInput(&'static str),

    /// The buffer for a new matrix could not be obtained, or the shape is degenerate.
    #[error("cannot allocate a {rows}x{cols} matrix")]
    AllocationFailure { rows: usize, cols: usize },

    #[error("index ({row}, {col}) out of bounds for a {rows}x{cols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A configuration value is outside its valid range.
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("model snapshot could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NnError>;
