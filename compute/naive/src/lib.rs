//! Naive implementation of the stencil benchmarks
//!
//! Sequential loops over flat storage, computing each neighbor's offset from
//! the layout strides. This is the baseline that other variants are compared
//! against, and its horizontal diffusion is the reference evaluation.

use compute::{
    basic::BasicFields,
    hdiff::HdiffFields,
    stencil::{BasicStencil, HdiffStencil},
    Error, Kernel, KernelTable, NoArgs, Variant, VariantCreate,
};
use data::{alloc::Allocator, layout::Layout, Element};

/// Basic stencils, one point at a time
#[derive(Debug)]
pub struct Basic<T: Element> {
    /// Source and destination fields
    fields: BasicFields<T>,

    /// Kernel of each stencil
    kernels: KernelTable<BasicStencil, Self>,
}
//
impl<T: Element> Basic<T> {
    /// Fields of this variant
    pub fn fields(&self) -> &BasicFields<T> {
        &self.fields
    }

    /// Set each interior point of the destination to a function of the
    /// source values found at some offsets from that point
    fn apply<const N: usize>(&mut self, offsets: [[isize; 3]; N], op: impl Fn([T; N]) -> T) {
        let (src, dst) = self.fields.src_dst_mut();
        let layout = *src.layout();
        let deltas = offsets.map(|[di, dj, dk]| layout.index(di, dj, dk));
        let (src, dst) = (src.as_slice(), dst.as_mut_slice());
        let [si, sj, sk] = layout.sizes().map(|s| s as isize);
        for k in 0..sk {
            for j in 0..sj {
                for i in 0..si {
                    let center = layout.offset(i, j, k);
                    dst[center] = op(deltas.map(|delta| src[(center as isize + delta) as usize]));
                }
            }
        }
    }

    fn copy(&mut self) {
        self.apply([[0, 0, 0]], |[c]| c)
    }

    fn copy_i(&mut self) {
        self.apply([[1, 0, 0]], |[ip]| ip)
    }

    fn copy_j(&mut self) {
        self.apply([[0, 1, 0]], |[jp]| jp)
    }

    fn copy_k(&mut self) {
        self.apply([[0, 0, 1]], |[kp]| kp)
    }

    fn avg_i(&mut self) {
        self.apply([[-1, 0, 0], [1, 0, 0]], |[im, ip]| im + ip)
    }

    fn avg_j(&mut self) {
        self.apply([[0, -1, 0], [0, 1, 0]], |[jm, jp]| jm + jp)
    }

    fn avg_k(&mut self) {
        self.apply([[0, 0, -1], [0, 0, 1]], |[km, kp]| km + kp)
    }

    fn sum_i(&mut self) {
        self.apply([[0, 0, 0], [1, 0, 0]], |[c, ip]| c + ip)
    }

    fn sum_j(&mut self) {
        self.apply([[0, 0, 0], [0, 1, 0]], |[c, jp]| c + jp)
    }

    fn sum_k(&mut self) {
        self.apply([[0, 0, 0], [0, 0, 1]], |[c, kp]| c + kp)
    }

    fn lap_ij(&mut self) {
        self.apply(
            [[0, 0, 0], [-1, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0]],
            |[c, im, ip, jm, jp]| c + im + ip + jm + jp,
        )
    }
}
//
impl<T: Element> Variant for Basic<T> {
    const NAME: &'static str = "naive";

    type Stencil = BasicStencil;

    type Value = T;

    fn kernels(&self) -> &KernelTable<BasicStencil, Self> {
        &self.kernels
    }

    fn prerun(&mut self) {
        self.fields.reset();
    }

    fn verify(&self, stencil: BasicStencil) -> bool {
        self.fields.verify(stencil)
    }

    fn bytes(&self, stencil: BasicStencil) -> usize {
        self.fields.bytes(stencil)
    }
}
//
impl<T: Element> VariantCreate for Basic<T> {
    type CliArgs = NoArgs;

    type Error = Error;

    fn new(layout: Layout, _args: NoArgs, allocator: &mut Allocator) -> Result<Self, Error> {
        let kernels = KernelTable::new([
            (BasicStencil::Copy, Self::copy as Kernel<Self>),
            (BasicStencil::CopyI, Self::copy_i),
            (BasicStencil::CopyJ, Self::copy_j),
            (BasicStencil::CopyK, Self::copy_k),
            (BasicStencil::AvgI, Self::avg_i),
            (BasicStencil::AvgJ, Self::avg_j),
            (BasicStencil::AvgK, Self::avg_k),
            (BasicStencil::SumI, Self::sum_i),
            (BasicStencil::SumJ, Self::sum_j),
            (BasicStencil::SumK, Self::sum_k),
            (BasicStencil::LapIj, Self::lap_ij),
        ])?;
        Ok(Self {
            fields: BasicFields::new(layout, allocator)?,
            kernels,
        })
    }
}

/// Untiled horizontal diffusion
#[derive(Debug)]
pub struct Hdiff<T: Element> {
    /// Input, scratch and output fields
    fields: HdiffFields<T>,

    /// Kernel of each stencil
    kernels: KernelTable<HdiffStencil, Self>,
}
//
impl<T: Element> Hdiff<T> {
    /// Fields of this variant
    pub fn fields(&self) -> &HdiffFields<T> {
        &self.fields
    }

    fn hdiff(&mut self) {
        self.fields.run_reference();
    }
}
//
impl<T: Element> Variant for Hdiff<T> {
    const NAME: &'static str = "hdiff-naive";

    type Stencil = HdiffStencil;

    type Value = T;

    fn kernels(&self) -> &KernelTable<HdiffStencil, Self> {
        &self.kernels
    }

    fn prerun(&mut self) {
        self.fields.reset();
    }

    fn verify(&self, _stencil: HdiffStencil) -> bool {
        self.fields.verify()
    }

    fn bytes(&self, stencil: HdiffStencil) -> usize {
        self.fields.bytes(stencil)
    }
}
//
impl<T: Element> VariantCreate for Hdiff<T> {
    type CliArgs = NoArgs;

    type Error = Error;

    fn new(layout: Layout, _args: NoArgs, allocator: &mut Allocator) -> Result<Self, Error> {
        Ok(Self {
            fields: HdiffFields::new(layout, allocator)?,
            kernels: KernelTable::new([(HdiffStencil::Hdiff, Self::hdiff as Kernel<Self>)])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::{harness::ALL_STENCILS, Harness, Stencil};
    use data::layout::DomainConfig;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn layout(ranks: [usize; 3], alignment: usize) -> Layout {
        Layout::new(DomainConfig {
            sizes: [5, 4, 3],
            ranks,
            halo: 2,
            alignment,
        })
        .unwrap()
    }

    fn check_basic<T: Element>(layout: Layout) {
        let variant = Basic::<T>::new(layout, NoArgs {}, &mut Allocator::new()).unwrap();
        let mut harness = Harness::new(variant);
        let results = harness.run_selection(ALL_STENCILS, 2).unwrap();
        assert_eq!(results.len(), BasicStencil::ALL.len());
        for result in results {
            assert!(result.verified, "{} failed on {layout:?}", result.stencil);
        }
    }

    #[test]
    fn basic_stencils_verify_on_all_layouts() {
        init_logger();
        for ranks in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
            check_basic::<f64>(layout(ranks, 1));
            check_basic::<f32>(layout(ranks, 8));
        }
    }

    #[test]
    fn sum_k_writes_expected_values() {
        init_logger();
        let layout = layout([0, 1, 2], 1);
        let mut variant = Basic::<f64>::new(layout, NoArgs {}, &mut Allocator::new()).unwrap();
        variant.sum_k();
        let expected = (layout.index(1, 2, 0) + layout.index(1, 2, 1)) as f64;
        assert_eq!(variant.fields().dst().at(1, 2, 0), expected);
        assert!(variant.verify(BasicStencil::SumK));
    }

    #[test]
    fn prerun_clears_previous_output() {
        init_logger();
        let mut variant = Basic::<f32>::new(layout([0, 1, 2], 1), NoArgs {}, &mut Allocator::new()).unwrap();
        variant.copy();
        assert!(variant.verify(BasicStencil::Copy));
        variant.prerun();
        assert!(!variant.verify(BasicStencil::Copy));
    }

    #[test]
    fn hdiff_verifies() {
        init_logger();
        for ranks in [[0, 1, 2], [2, 0, 1]] {
            let variant = Hdiff::<f64>::new(layout(ranks, 1), NoArgs {}, &mut Allocator::new()).unwrap();
            let result = Harness::new(variant).run_named("hdiff", 1).unwrap();
            assert!(result.verified);
            assert_eq!(result.stencil, "hdiff");
        }
    }

    #[test]
    fn hdiff_needs_two_halo_cells() {
        let layout = Layout::new(DomainConfig {
            halo: 1,
            sizes: [4, 4, 4],
            ..DomainConfig::default()
        })
        .unwrap();
        assert_eq!(
            Hdiff::<f32>::new(layout, NoArgs {}, &mut Allocator::new()).err(),
            Some(Error::InsufficientHalo {
                required: 2,
                actual: 1
            })
        );
    }
}
