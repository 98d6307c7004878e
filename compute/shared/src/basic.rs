//! Fields and checks shared by all implementations of the basic stencils

use crate::{stencil::BasicStencil, Error};
use data::{alloc::Allocator, field::Field, layout::Layout, Element};
use log::debug;

/// Minimal halo width needed by the basic stencils
pub const MIN_HALO: usize = 1;

/// Source and destination fields of the basic stencils
///
/// The source field holds its own flat index at every point of the
/// halo-extended domain, which makes any indexing mistake visible.
#[derive(Debug)]
pub struct BasicFields<T: Element> {
    /// Input of every stencil
    src: Field<T>,

    /// Output of every stencil
    dst: Field<T>,
}
//
impl<T: Element> BasicFields<T> {
    /// Allocate and initialize the fields
    pub fn new(layout: Layout, allocator: &mut Allocator) -> Result<Self, Error> {
        if layout.halo() < MIN_HALO {
            return Err(Error::InsufficientHalo {
                required: MIN_HALO,
                actual: layout.halo(),
            });
        }
        let mut src = Field::new(layout, allocator)?;
        let dst = Field::new(layout, allocator)?;
        src.fill_with(|i, j, k| T::from_index(layout.index(i, j, k)));
        debug!("Initialized basic stencil fields");
        Ok(Self { src, dst })
    }

    /// Layout shared by both fields
    pub fn layout(&self) -> &Layout {
        self.src.layout()
    }

    /// Source field
    pub fn src(&self) -> &Field<T> {
        &self.src
    }

    /// Destination field
    pub fn dst(&self) -> &Field<T> {
        &self.dst
    }

    /// Source field for reading, destination field for writing
    pub fn src_dst_mut(&mut self) -> (&Field<T>, &mut Field<T>) {
        (&self.src, &mut self.dst)
    }

    /// Clear the destination field
    pub fn reset(&mut self) {
        self.dst.fill(T::ZERO);
    }

    /// Value that a stencil should produce at some interior point
    pub fn expected(&self, stencil: BasicStencil, i: isize, j: isize, k: isize) -> T {
        let src = |di, dj, dk| self.src.at(i + di, j + dj, k + dk);
        match stencil {
            BasicStencil::Copy => src(0, 0, 0),
            BasicStencil::CopyI => src(1, 0, 0),
            BasicStencil::CopyJ => src(0, 1, 0),
            BasicStencil::CopyK => src(0, 0, 1),
            BasicStencil::AvgI => src(-1, 0, 0) + src(1, 0, 0),
            BasicStencil::AvgJ => src(0, -1, 0) + src(0, 1, 0),
            BasicStencil::AvgK => src(0, 0, -1) + src(0, 0, 1),
            BasicStencil::SumI => src(0, 0, 0) + src(1, 0, 0),
            BasicStencil::SumJ => src(0, 0, 0) + src(0, 1, 0),
            BasicStencil::SumK => src(0, 0, 0) + src(0, 0, 1),
            BasicStencil::LapIj => {
                src(0, 0, 0) + src(-1, 0, 0) + src(1, 0, 0) + src(0, -1, 0) + src(0, 1, 0)
            }
        }
    }

    /// Check the destination field against the source field at every
    /// interior point
    pub fn verify(&self, stencil: BasicStencil) -> bool {
        let [si, sj, sk] = self.layout().sizes().map(|s| s as isize);
        (0..sk).all(|k| {
            (0..sj).all(|j| (0..si).all(|i| self.dst.at(i, j, k) == self.expected(stencil, i, j, k)))
        })
    }

    /// Bytes moved by one run of a stencil
    ///
    /// Counts each interior output once, and each input once per point of the
    /// interior widened by the stencil's reach along each axis.
    pub fn bytes(&self, stencil: BasicStencil) -> usize {
        let [si, sj, sk] = self.layout().sizes();
        let points = si * sj * sk;
        let inputs = match stencil {
            BasicStencil::Copy | BasicStencil::CopyI | BasicStencil::CopyJ | BasicStencil::CopyK => {
                points
            }
            BasicStencil::AvgI => (si + 2) * sj * sk,
            BasicStencil::AvgJ => si * (sj + 2) * sk,
            BasicStencil::AvgK => si * sj * (sk + 2),
            BasicStencil::SumI => (si + 1) * sj * sk,
            BasicStencil::SumJ => si * (sj + 1) * sk,
            BasicStencil::SumK => si * sj * (sk + 1),
            BasicStencil::LapIj => (si + 2) * (sj + 2) * (sk * 2),
        };
        std::mem::size_of::<T>() * (inputs + points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stencil;
    use data::layout::DomainConfig;

    fn layout(sizes: [usize; 3], halo: usize) -> Layout {
        Layout::new(DomainConfig {
            sizes,
            halo,
            ..DomainConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn source_holds_flat_index() {
        let layout = layout([3, 4, 5], 1);
        let fields = BasicFields::<f64>::new(layout, &mut Allocator::new()).unwrap();
        assert_eq!(fields.src().at(-1, -1, -1), layout.index(-1, -1, -1) as f64);
        assert_eq!(fields.src().at(2, 3, 4), layout.index(2, 3, 4) as f64);
    }

    #[test]
    fn halo_is_required() {
        assert_eq!(
            BasicFields::<f32>::new(layout([3, 3, 3], 0), &mut Allocator::new()).err(),
            Some(Error::InsufficientHalo {
                required: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn zeroed_destination_fails_verification() {
        let fields = BasicFields::<f32>::new(layout([4, 4, 4], 1), &mut Allocator::new()).unwrap();
        for &stencil in BasicStencil::ALL {
            assert!(!fields.verify(stencil), "{stencil}");
        }
    }

    #[test]
    fn copy_of_source_passes_verification() {
        let mut fields = BasicFields::<f64>::new(layout([4, 3, 2], 1), &mut Allocator::new()).unwrap();
        let source = fields.src().as_slice().to_vec();
        let (_, dst) = fields.src_dst_mut();
        dst.as_mut_slice().copy_from_slice(&source);
        assert!(fields.verify(BasicStencil::Copy));
        assert!(!fields.verify(BasicStencil::CopyI));
        fields.reset();
        assert!(fields.dst().as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn copy_traffic() {
        for sizes in [[8, 8, 8], [13, 7, 3], [1, 1, 1]] {
            let fields = BasicFields::<f64>::new(layout(sizes, 2), &mut Allocator::new()).unwrap();
            let points = sizes.iter().product::<usize>();
            assert_eq!(fields.bytes(BasicStencil::Copy), 2 * 8 * points);
        }
        let fields = BasicFields::<f32>::new(layout([8, 8, 8], 2), &mut Allocator::new()).unwrap();
        assert_eq!(fields.bytes(BasicStencil::Copy), 2 * 4 * 512);
        assert_eq!(fields.bytes(BasicStencil::AvgI), 4 * (10 * 64 + 512));
        assert_eq!(fields.bytes(BasicStencil::SumK), 4 * (9 * 64 + 512));
        assert_eq!(fields.bytes(BasicStencil::LapIj), 4 * (100 * 16 + 512));
    }
}
