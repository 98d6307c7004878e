//! Data layout of the stencil benchmark domains
//!
//! Everything that touches memory lives here: the mapping from logical 3D
//! coordinates to flat storage offsets, the allocator context used to obtain
//! that storage, and halo-extended fields built on top of both.

pub mod alloc;
pub mod element;
pub mod field;
pub mod layout;

pub use element::Element;
use thiserror::Error;

/// Build an array of three values from a function of the axis index
#[inline]
pub fn array3<T>(f: impl FnMut(usize) -> T) -> [T; 3] {
    std::array::from_fn(f)
}

/// Things that can go wrong when setting up domain storage
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Two axes were given the same stride rank, or a rank is out of range
    #[error("invalid layout (i: {}, j: {}, k: {}), expected a permutation of 0, 1, 2", .ranks[0], .ranks[1], .ranks[2])]
    InvalidLayout { ranks: [usize; 3] },

    /// Alignment must be at least one element
    #[error("invalid alignment 0, must be at least one element")]
    InvalidAlignment,

    /// All domain sizes must be positive
    #[error("invalid domain size {}x{}x{}, all sizes must be positive", .sizes[0], .sizes[1], .sizes[2])]
    EmptyDomain { sizes: [usize; 3] },

    /// Domain does not fit in the address space
    #[error("domain {}x{}x{} with halo {halo} is too large to be indexed", .sizes[0], .sizes[1], .sizes[2])]
    TooLarge { sizes: [usize; 3], halo: usize },

    /// Memory allocation failed
    #[error("could not allocate {bytes} bytes of aligned memory")]
    Allocation { bytes: usize },
}
