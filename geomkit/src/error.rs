//! Module containing the universal error type
use thiserror::Error;

/// Universal error type for `geomkit`
#[derive(Error, Debug)]
pub enum Error {
    /// A triangle references a vertex that does not exist
    #[error("index {0} is out of range for {1} vertices")]
    BadIndex(u32, usize),

    /// A strided component range does not fit inside its stride
    #[error("component range {index}..{index}+{size} does not fit in stride {stride}")]
    BadStride {
        /// First component of the range
        index: usize,
        /// Number of components in the range
        size: usize,
        /// Number of components per item
        stride: usize,
    },

    /// io error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
