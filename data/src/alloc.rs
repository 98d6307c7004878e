//! Aligned allocation of field storage
//!
//! Large fields that are traversed together tend to map to the same cache
//! sets when their base addresses share the same low-order bits. To avoid
//! this, the allocator can shift successive allocations by a rotating amount
//! of padding. Both the padding state and the true base address of each
//! allocation are tracked explicitly, nothing is stored next to user memory.

use crate::{Element, Error};
use log::debug;
use std::{
    alloc::{self as sys, Layout},
    fmt,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

/// Alignment of every allocation, in bytes
pub const BASE_ALIGNMENT: usize = 64;

/// First padding value of the rotation, in bytes
const MIN_PADDING: usize = 64;

/// Padding values are doubled until they reach this, then wrap around
const PADDING_WRAP: usize = 16384;

/// Allocator context
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Allocator {
    /// Padding of the next allocation, if padding rotation is enabled
    next_padding: Option<usize>,
}
//
impl Allocator {
    /// Allocator returning base-aligned storage
    pub fn new() -> Self {
        Self { next_padding: None }
    }

    /// Allocator shifting successive allocations by 64, 128, ... 8192 bytes
    pub fn with_rotating_padding() -> Self {
        Self {
            next_padding: Some(MIN_PADDING),
        }
    }

    /// Pick the padding of the next allocation and advance the rotation
    fn take_padding(&mut self) -> usize {
        let Some(next) = &mut self.next_padding else {
            return 0;
        };
        let padding = *next;
        *next *= 2;
        if *next >= PADDING_WRAP {
            *next = MIN_PADDING;
        }
        padding
    }

    /// Allocate zero-initialized storage for `len` elements
    pub fn allocate<T: Element>(&mut self, len: usize) -> Result<Allocation<T>, Error> {
        assert!(std::mem::align_of::<T>() <= BASE_ALIGNMENT);
        let padding = self.take_padding();
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .and_then(|bytes| bytes.checked_add(padding))
            .ok_or(Error::Allocation { bytes: usize::MAX })?;
        let layout = Layout::from_size_align(bytes.max(1), BASE_ALIGNMENT)
            .map_err(|_| Error::Allocation { bytes })?;

        // SAFETY: layout has nonzero size
        let base = NonNull::new(unsafe { sys::alloc(layout) }).ok_or(Error::Allocation { bytes })?;
        // SAFETY: padding is within the allocation and a multiple of
        //         BASE_ALIGNMENT, so data is aligned for T and followed by
        //         room for len elements.
        let data = unsafe { base.add(padding) }.cast::<T>();
        for idx in 0..len {
            // SAFETY: idx < len, see above
            unsafe { data.add(idx).write(T::ZERO) };
        }
        debug!("Allocated {len} {} elements with {padding} bytes of padding", T::PRECISION);

        Ok(Allocation {
            base,
            layout,
            data,
            len,
            padding,
        })
    }
}

/// Owned aligned storage, freed through its recorded base address
pub struct Allocation<T: Element> {
    /// Start of the underlying memory block
    base: NonNull<u8>,

    /// Layout the memory block was allocated with
    layout: Layout,

    /// First element
    data: NonNull<T>,

    /// Number of elements
    len: usize,

    /// Distance between base and data in bytes
    padding: usize,
}
//
impl<T: Element> Allocation<T> {
    /// Padding that was inserted before the first element, in bytes
    pub fn padding(&self) -> usize {
        self.padding
    }
}
//
impl<T: Element> Deref for Allocation<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: data points to len initialized elements owned by self
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}
//
impl<T: Element> DerefMut for Allocation<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: data points to len initialized elements owned by self
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}
//
impl<T: Element> Drop for Allocation<T> {
    fn drop(&mut self) {
        // SAFETY: base was allocated by this layout and is freed only once
        unsafe { sys::dealloc(self.base.as_ptr(), self.layout) }
    }
}
//
impl<T: Element> fmt::Debug for Allocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("len", &self.len)
            .field("padding", &self.padding)
            .finish_non_exhaustive()
    }
}
//
// SAFETY: Allocation uniquely owns its elements, like a Vec<T>
unsafe impl<T: Element> Send for Allocation<T> {}
unsafe impl<T: Element> Sync for Allocation<T> {}
