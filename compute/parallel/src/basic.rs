//! Basic stencils over parallel array views

use crate::{thread_pool, Error, ParallelArgs};
use compute::{
    basic::BasicFields, stencil::BasicStencil, Kernel, KernelTable, Variant, VariantCreate,
};
use data::{alloc::Allocator, layout::Layout, Element};
use ndarray::Zip;
use rayon::ThreadPool;

/// Basic stencils, parallelized by ndarray's rayon integration
///
/// Every kernel zips the interior of the destination with shifted interior
/// views of the source, so each worker writes a disjoint set of points.
#[derive(Debug)]
pub struct Basic<T: Element> {
    /// Source and destination fields
    fields: BasicFields<T>,

    /// Workers
    pool: ThreadPool,

    /// Kernel of each stencil
    kernels: KernelTable<BasicStencil, Self>,
}
//
impl<T: Element> Basic<T> {
    /// Fields of this variant
    pub fn fields(&self) -> &BasicFields<T> {
        &self.fields
    }

    /// `dst = op(src(p + offset))`
    fn unary(&mut self, offset: [isize; 3], op: impl Fn(T) -> T + Send + Sync) {
        let (src, dst) = self.fields.src_dst_mut();
        self.pool.install(|| {
            Zip::from(dst.interior_mut())
                .and(src.shifted(offset))
                .par_for_each(|out, &x| *out = op(x))
        })
    }

    /// `dst = op(src(p + offsets[0]), src(p + offsets[1]))`
    fn binary(&mut self, [left, right]: [[isize; 3]; 2], op: impl Fn(T, T) -> T + Send + Sync) {
        let (src, dst) = self.fields.src_dst_mut();
        self.pool.install(|| {
            Zip::from(dst.interior_mut())
                .and(src.shifted(left))
                .and(src.shifted(right))
                .par_for_each(|out, &x, &y| *out = op(x, y))
        })
    }

    fn copy(&mut self) {
        self.unary([0, 0, 0], |c| c)
    }

    fn copy_i(&mut self) {
        self.unary([1, 0, 0], |ip| ip)
    }

    fn copy_j(&mut self) {
        self.unary([0, 1, 0], |jp| jp)
    }

    fn copy_k(&mut self) {
        self.unary([0, 0, 1], |kp| kp)
    }

    fn avg_i(&mut self) {
        self.binary([[-1, 0, 0], [1, 0, 0]], |im, ip| im + ip)
    }

    fn avg_j(&mut self) {
        self.binary([[0, -1, 0], [0, 1, 0]], |jm, jp| jm + jp)
    }

    fn avg_k(&mut self) {
        self.binary([[0, 0, -1], [0, 0, 1]], |km, kp| km + kp)
    }

    fn sum_i(&mut self) {
        self.binary([[0, 0, 0], [1, 0, 0]], |c, ip| c + ip)
    }

    fn sum_j(&mut self) {
        self.binary([[0, 0, 0], [0, 1, 0]], |c, jp| c + jp)
    }

    fn sum_k(&mut self) {
        self.binary([[0, 0, 0], [0, 0, 1]], |c, kp| c + kp)
    }

    fn lap_ij(&mut self) {
        let (src, dst) = self.fields.src_dst_mut();
        self.pool.install(|| {
            Zip::from(dst.interior_mut())
                .and(src.shifted([0, 0, 0]))
                .and(src.shifted([-1, 0, 0]))
                .and(src.shifted([1, 0, 0]))
                .and(src.shifted([0, -1, 0]))
                .and(src.shifted([0, 1, 0]))
                .par_for_each(|out, &c, &im, &ip, &jm, &jp| *out = c + im + ip + jm + jp)
        })
    }
}
//
impl<T: Element> Variant for Basic<T> {
    const NAME: &'static str = "parallel";

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
    type CliArgs = ParallelArgs;

    type Error = Error;

    fn new(layout: Layout, args: ParallelArgs, allocator: &mut Allocator) -> Result<Self, Error> {
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
            pool: thread_pool(args.threads)?,
            kernels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::{harness::ALL_STENCILS, Harness};
    use data::layout::DomainConfig;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn all_stencils_verify() {
        init_logger();
        for (ranks, alignment) in [([0, 1, 2], 1), ([2, 0, 1], 4), ([1, 2, 0], 1)] {
            let layout = Layout::new(DomainConfig {
                sizes: [9, 6, 5],
                ranks,
                halo: 1,
                alignment,
            })
            .unwrap();
            let args = ParallelArgs {
                threads: 2,
                ..ParallelArgs::default()
            };
            let variant = Basic::<f64>::new(layout, args, &mut Allocator::new()).unwrap();
            let mut harness = Harness::new(variant);
            for result in harness.run_selection(ALL_STENCILS, 3).unwrap() {
                assert!(result.verified, "{} failed with ranks {ranks:?}", result.stencil);
            }
        }
    }

    #[test]
    fn matches_sequential_values() {
        init_logger();
        let layout = Layout::new(DomainConfig {
            sizes: [7, 7, 3],
            halo: 2,
            ..DomainConfig::default()
        })
        .unwrap();
        let mut variant =
            Basic::<f32>::new(layout, ParallelArgs::default(), &mut Allocator::new()).unwrap();
        variant.lap_ij();
        let fields = variant.fields();
        let src = |i, j| fields.src().at(i, j, 2);
        assert_eq!(
            fields.dst().at(3, 4, 2),
            src(3, 4) + src(2, 4) + src(4, 4) + src(3, 3) + src(3, 5)
        );
    }
}
