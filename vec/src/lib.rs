use core::fmt;

pub mod array;
pub mod vector;

pub use array::Array;
pub use vector::Vector;

/// Errors reported by the checked container operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Index at or past the end of the container.
    OutOfBounds { index: usize, len: usize },
    /// Construction input whose length does not match the container arity.
    LengthMismatch { expected: usize, got: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::LengthMismatch { expected, got } => {
                write!(f, "expected exactly {expected} elements, got {got}")
            }
        }
    }
}

impl std::error::Error for Error {}
