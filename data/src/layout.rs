//! Mapping from logical 3D coordinates to flat storage offsets
//!
//! A domain of `isize x jsize x ksize` points is surrounded by a halo of
//! `halo` cells on every side. Each axis is given a stride rank, rank 0 being
//! the fastest-varying one. Strides are the cumulative products of the
//! halo-extended axis extents in rank order, where the extent of the rank 0
//! axis is additionally rounded up to the requested alignment.
//!
//! The region addressed by the strides, the *storage box*, is therefore the
//! halo-extended domain plus some padding cells at the far end of the rank 0
//! axis. Every cell of the storage box maps to exactly one offset in
//! `[0, storage_size)`.

use crate::{array3, Element, Error};
use log::debug;
use ndarray::{ArrayView3, ArrayViewMut3, ShapeBuilder};

/// Axis names, for diagnostics
pub const AXIS_NAMES: [&str; 3] = ["i", "j", "k"];

/// User-facing description of a domain
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct DomainConfig {
    /// Number of interior points along the i, j and k axes
    pub sizes: [usize; 3],

    /// Stride rank of the i, j and k axes (0 = fastest varying)
    pub ranks: [usize; 3],

    /// Number of halo cells on each side of each axis
    pub halo: usize,

    /// Extent of the rank 0 axis is rounded up to a multiple of this many
    /// elements
    pub alignment: usize,
}
//
impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            sizes: [1024, 1024, 80],
            ranks: [0, 1, 2],
            halo: 2,
            alignment: 1,
        }
    }
}

/// Validated domain layout
///
/// Immutable once constructed. Coordinates passed to the indexing functions
/// are signed offsets from the domain origin, so that `-halo` addresses the
/// first halo cell.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Layout {
    /// Interior sizes
    sizes: [usize; 3],

    /// Halo width
    halo: usize,

    /// Stride rank of each axis
    ranks: [usize; 3],

    /// Extents of the storage box (halo-extended, padded on rank 0)
    extents: [usize; 3],

    /// Distance in elements between two neighbors along each axis
    strides: [usize; 3],

    /// Number of elements of the storage box
    storage_size: usize,
}
//
impl Layout {
    /// Validate a domain configuration and derive its strides
    pub fn new(config: DomainConfig) -> Result<Self, Error> {
        let DomainConfig {
            sizes,
            ranks,
            halo,
            alignment,
        } = config;

        // Axis of each rank, which must be a bijection
        let mut axis_of_rank = [None; 3];
        for (axis, &rank) in ranks.iter().enumerate() {
            if rank >= 3 || axis_of_rank[rank].is_some() {
                return Err(Error::InvalidLayout { ranks });
            }
            axis_of_rank[rank] = Some(axis);
        }
        let axis_of_rank = axis_of_rank.map(|axis| axis.expect("all three ranks were seen"));
        if alignment == 0 {
            return Err(Error::InvalidAlignment);
        }
        if sizes.contains(&0) {
            return Err(Error::EmptyDomain { sizes });
        }

        let too_large = Error::TooLarge { sizes, halo };
        let mut extents = [0; 3];
        for axis in 0..3 {
            extents[axis] = halo
                .checked_mul(2)
                .and_then(|h2| sizes[axis].checked_add(h2))
                .ok_or_else(|| too_large.clone())?;
        }
        let fastest = axis_of_rank[0];
        extents[fastest] = extents[fastest]
            .checked_next_multiple_of(alignment)
            .ok_or_else(|| too_large.clone())?;

        let mut strides = [0; 3];
        let mut storage_size = 1usize;
        for axis in axis_of_rank {
            strides[axis] = storage_size;
            storage_size = storage_size
                .checked_mul(extents[axis])
                .ok_or_else(|| too_large.clone())?;
        }
        if storage_size > isize::MAX as usize {
            return Err(too_large);
        }

        debug!(
            "Domain {}x{}x{} with halo {halo} and alignment {alignment}: \
             strides {strides:?}, storage box {extents:?}, {storage_size} elements",
            sizes[0], sizes[1], sizes[2]
        );
        Ok(Self {
            sizes,
            halo,
            ranks,
            extents,
            strides,
            storage_size,
        })
    }

    /// Interior sizes along i, j and k
    pub fn sizes(&self) -> [usize; 3] {
        self.sizes
    }

    /// Halo width
    pub fn halo(&self) -> usize {
        self.halo
    }

    /// Stride rank of each axis
    pub fn ranks(&self) -> [usize; 3] {
        self.ranks
    }

    /// Strides along i, j and k
    pub fn strides(&self) -> [usize; 3] {
        self.strides
    }

    /// Number of elements that storage for this layout must hold
    pub fn storage_size(&self) -> usize {
        self.storage_size
    }

    /// Number of interior points
    pub fn num_points(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Extents of the halo-extended domain, without alignment padding
    pub fn extended_shape(&self) -> [usize; 3] {
        array3(|axis| self.sizes[axis] + 2 * self.halo)
    }

    /// Extents of the storage box, including alignment padding
    pub fn storage_shape(&self) -> [usize; 3] {
        self.extents
    }

    /// Affine index of a point relative to the origin
    #[inline]
    pub fn index(&self, i: isize, j: isize, k: isize) -> isize {
        let [istride, jstride, kstride] = self.strides.map(|s| s as isize);
        i * istride + j * jstride + k * kstride
    }

    /// Flat index of the logical origin
    #[inline]
    pub fn zero_offset(&self) -> isize {
        let h = self.halo as isize;
        self.index(h, h, h)
    }

    /// Offset of a point within the storage
    ///
    /// Coordinates must lie within the storage box, i.e. in
    /// `[-halo, size + halo)` save for the padding of the rank 0 axis.
    #[inline]
    pub fn offset(&self, i: isize, j: isize, k: isize) -> usize {
        let offset = self.zero_offset() + self.index(i, j, k);
        debug_assert!(
            (0..self.storage_size as isize).contains(&offset),
            "point ({i}, {j}, {k}) is outside of the storage box"
        );
        offset as usize
    }

    /// View storage as a 3D array over the halo-extended domain
    ///
    /// Array coordinates are shifted by `halo` with respect to logical
    /// coordinates, so that logical point `(i, j, k)` is found at array index
    /// `[i + halo, j + halo, k + halo]`.
    pub fn view<'a, T: Element>(&self, data: &'a [T]) -> ArrayView3<'a, T> {
        assert_eq!(data.len(), self.storage_size, "storage does not match layout");
        ArrayView3::from_shape(self.extended_shape().strides(self.strides), data)
            .expect("strides of a valid layout never alias")
    }

    /// Mutable version of [`Layout::view()`]
    pub fn view_mut<'a, T: Element>(&self, data: &'a mut [T]) -> ArrayViewMut3<'a, T> {
        assert_eq!(data.len(), self.storage_size, "storage does not match layout");
        ArrayViewMut3::from_shape(self.extended_shape().strides(self.strides), data)
            .expect("strides of a valid layout never alias")
    }
}
