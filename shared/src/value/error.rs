use thiserror::Error;

/// Errors that can occur while building a buffer value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The element count isn't the product of the dimensions
    #[error("Buffer of shape {shape:?} needs {expected} elements, got {actual}")]
    ElementCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// Product of the dimensions doesn't fit in usize
    #[error("Buffer shape {shape:?} is too large")]
    ShapeOverflow {
        shape: Vec<usize>,
    },
}
