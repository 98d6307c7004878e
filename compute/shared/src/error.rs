//! Configuration errors of the benchmark harness

use thiserror::Error;

/// Things that can go wrong when setting up or running a benchmark
///
/// All of these are fatal to the benchmark invocation that triggered them.
/// Wrong kernel output is not among them, see [`crate::BenchResult::verified`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Invalid domain layout or failed allocation
    #[error(transparent)]
    Data(#[from] data::Error),

    /// Stencil name that is not part of the family
    #[error("unknown stencil '{0}'")]
    UnknownStencil(String),

    /// Kernel table does not cover the whole stencil family
    #[error("incomplete kernel table, missing {}", .missing.join(", "))]
    IncompleteKernelTable { missing: Vec<&'static str> },

    /// Kernel table has several entries for one stencil
    #[error("stencil '{0}' has several kernels")]
    DuplicateKernel(&'static str),

    /// Block sizes must be strictly positive
    #[error("invalid block size {i}x{j}, both must be positive")]
    InvalidBlockSize { i: usize, j: usize },

    /// Halo is too narrow for the stencil's neighborhood
    #[error("halo of {actual} is too small, minimum required halo is {required}")]
    InsufficientHalo { required: usize, actual: usize },

    /// Kernel assumes a unit stride along some axis
    #[error("this variant is only compatible with unit {axis}-stride layout, got stride {stride}")]
    NonUnitStride { axis: &'static str, stride: usize },

    /// Statistics need at least one sample
    #[error("at least one repetition is needed")]
    NoRepetitions,
}
