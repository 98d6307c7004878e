//! Halo-extended 3D fields

use crate::{
    alloc::{Allocation, Allocator},
    layout::Layout,
    Element, Error,
};
use ndarray::{s, ArrayView3, ArrayViewMut3};

/// Storage for one value per point of a halo-extended domain
///
/// Allocated once, then reused for as long as the field lives.
#[derive(Debug)]
pub struct Field<T: Element> {
    /// Layout of the underlying storage
    layout: Layout,

    /// Flat storage, indexed via `layout`
    data: Allocation<T>,
}
//
impl<T: Element> Field<T> {
    /// Allocate a zero-filled field
    pub fn new(layout: Layout, allocator: &mut Allocator) -> Result<Self, Error> {
        Ok(Self {
            data: allocator.allocate(layout.storage_size())?,
            layout,
        })
    }

    /// Layout of this field
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Flat storage
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable flat storage
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Value at a point of the halo-extended domain
    #[inline]
    pub fn at(&self, i: isize, j: isize, k: isize) -> T {
        self.data[self.layout.offset(i, j, k)]
    }

    /// Set every element of the storage, including padding, to some value
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Set every point of the halo-extended domain to a function of its
    /// coordinates
    pub fn fill_with(&mut self, mut value: impl FnMut(isize, isize, isize) -> T) {
        let h = self.layout.halo() as isize;
        let [si, sj, sk] = self.layout.sizes().map(|s| s as isize);
        for k in -h..sk + h {
            for j in -h..sj + h {
                for i in -h..si + h {
                    let offset = self.layout.offset(i, j, k);
                    self.data[offset] = value(i, j, k);
                }
            }
        }
    }

    /// View of the halo-extended domain, see [`Layout::view()`]
    pub fn view(&self) -> ArrayView3<'_, T> {
        self.layout.view(&self.data)
    }

    /// Mutable view of the halo-extended domain
    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.layout.view_mut(&mut self.data)
    }

    /// View of the interior, shifted by some offset along each axis
    ///
    /// Element `[i, j, k]` of the result is the value at logical point
    /// `(i + di, j + dj, k + dk)`. Offsets must not exceed the halo width.
    pub fn shifted(&self, [di, dj, dk]: [isize; 3]) -> ArrayView3<'_, T> {
        let [ri, rj, rk] = self.shifted_ranges([di, dj, dk]);
        self.view().slice_move(s![ri, rj, rk])
    }

    /// Mutable view of the interior
    pub fn interior_mut(&mut self) -> ArrayViewMut3<'_, T> {
        let [ri, rj, rk] = self.shifted_ranges([0; 3]);
        self.view_mut().slice_move(s![ri, rj, rk])
    }

    /// Array ranges covering the interior shifted by some offset
    fn shifted_ranges(&self, offset: [isize; 3]) -> [std::ops::Range<usize>; 3] {
        let h = self.layout.halo() as isize;
        let sizes = self.layout.sizes();
        crate::array3(|axis| {
            assert!(offset[axis].abs() <= h, "shift exceeds the halo");
            let start = (h + offset[axis]) as usize;
            start..start + sizes[axis]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DomainConfig;

    fn layout() -> Layout {
        Layout::new(DomainConfig {
            sizes: [4, 3, 2],
            ranks: [1, 2, 0],
            halo: 1,
            alignment: 4,
        })
        .unwrap()
    }

    #[test]
    fn fill_with_covers_halo() {
        let layout = layout();
        let mut field = Field::<f64>::new(layout, &mut Allocator::new()).unwrap();
        field.fill_with(|i, j, k| layout.index(i, j, k) as f64);
        for k in -1..3 {
            for j in -1..4 {
                for i in -1..5 {
                    assert_eq!(field.at(i, j, k), layout.index(i, j, k) as f64);
                }
            }
        }
    }

    #[test]
    fn shifted_views_follow_offsets() {
        let layout = layout();
        let mut field = Field::<f32>::new(layout, &mut Allocator::with_rotating_padding()).unwrap();
        field.fill_with(|i, j, k| (100 * i + 10 * j + k) as f32);
        let view = field.shifted([1, -1, 0]);
        assert_eq!(view.shape(), &[4, 3, 2]);
        for ((i, j, k), &value) in view.indexed_iter() {
            let (i, j, k) = (i as isize, j as isize, k as isize);
            assert_eq!(value, field.at(i + 1, j - 1, k));
        }
    }

    #[test]
    fn interior_writes_land_in_place() {
        let layout = layout();
        let mut field = Field::<f64>::new(layout, &mut Allocator::new()).unwrap();
        field.interior_mut().fill(1.0);
        let total: f64 = field.as_slice().iter().sum();
        assert_eq!(total, layout.num_points() as f64);
        assert_eq!(field.at(0, 0, 0), 1.0);
        assert_eq!(field.at(-1, 0, 0), 0.0);
        assert_eq!(field.at(3, 2, 1), 1.0);
        assert_eq!(field.at(4, 2, 1), 0.0);
    }
}
