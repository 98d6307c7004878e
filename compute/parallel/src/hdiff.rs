//! Tiled horizontal diffusion
//!
//! The horizontal plane is cut into tiles of `i_blocksize x j_blocksize`
//! interior points, which are processed in parallel over the full k range.
//!
//! - Stage 1 fills `lap`, `flx` and `fly` on the interior widened by one cell
//!   in i and j. That widened region is partitioned between tiles, with the
//!   first and last tile along each axis also owning the extra boundary
//!   cell, so every scratch value has exactly one writer. A flux whose
//!   forward Laplacian neighbor belongs to the next tile recomputes that
//!   Laplacian from `in` instead of reading it.
//! - Stage 2 computes `out` tile by tile from the fluxes, once stage 1 is
//!   complete everywhere.
//!
//! Each point is evaluated with the shared [`compute::hdiff`] functions, so
//! the output is bit-identical to the untiled reference.

use crate::{thread_pool, Error, ParallelArgs};
use compute::{
    hdiff::{self, HdiffFields, HdiffFieldsMut},
    stencil::HdiffStencil,
    Kernel, KernelTable, Variant, VariantCreate,
};
use data::{alloc::Allocator, layout::Layout, Element};
use log::debug;
use ndarray::{s, ArrayView3, ArrayViewMut3, Axis};
use rayon::ThreadPool;

/// Horizontal diffusion over i/j tiles
#[derive(Debug)]
pub struct IjBlocked<T: Element> {
    /// Input, scratch and output fields
    fields: HdiffFields<T>,

    /// Tile extents along i and j
    block: [usize; 2],

    /// Tiling of the widened region filled by stage 1
    flux_tiling: [Tiling; 2],

    /// Tiling of the interior filled by stage 2
    out_tiling: [Tiling; 2],

    /// Workers
    pool: ThreadPool,

    /// Kernel of each stencil
    kernels: KernelTable<HdiffStencil, Self>,
}
//
impl<T: Element> IjBlocked<T> {
    /// Fields of this variant
    pub fn fields(&self) -> &HdiffFields<T> {
        &self.fields
    }

    /// Tile extents along i and j
    pub fn block(&self) -> [usize; 2] {
        self.block
    }

    fn hdiff(&mut self) {
        let layout = *self.fields.layout();
        let tilings = [self.flux_tiling, self.out_tiling];
        let fields = self.fields.split_mut();
        self.pool.install(|| run_tiled(&layout, tilings, fields));
    }
}
//
impl<T: Element> Variant for IjBlocked<T> {
    const NAME: &'static str = "hdiff-ij-blocked";

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
impl<T: Element> VariantCreate for IjBlocked<T> {
    type CliArgs = ParallelArgs;

    type Error = Error;

    fn new(layout: Layout, args: ParallelArgs, allocator: &mut Allocator) -> Result<Self, Error> {
        let block = [args.i_blocksize, args.j_blocksize];
        if block.contains(&0) {
            return Err(compute::Error::InvalidBlockSize {
                i: block[0],
                j: block[1],
            }
            .into());
        }
        let istride = layout.strides()[0];
        if istride != 1 {
            return Err(compute::Error::NonUnitStride {
                axis: "i",
                stride: istride,
            }
            .into());
        }
        let fields = HdiffFields::new(layout, allocator)?;
        let [si, sj, _] = layout.sizes();
        let flux_tiling = [Tiling::new(si, block[0], 1), Tiling::new(sj, block[1], 1)];
        let out_tiling = [Tiling::new(si, block[0], 0), Tiling::new(sj, block[1], 0)];
        debug!(
            "Tiling the i/j plane into {}x{} blocks of {}x{} points",
            out_tiling[0].count, out_tiling[1].count, block[0], block[1]
        );
        Ok(Self {
            fields,
            block,
            flux_tiling,
            out_tiling,
            pool: thread_pool(args.threads)?,
            kernels: KernelTable::new([(HdiffStencil::Hdiff, Self::hdiff as Kernel<Self>)])?,
        })
    }
}

/// Run both stages on the current thread pool
///
/// Tiles are reached by recursive splitting, so nothing is allocated here.
fn run_tiled<T: Element>(
    layout: &Layout,
    [flux_tiling, out_tiling]: [[Tiling; 2]; 2],
    fields: HdiffFieldsMut<'_, T>,
) {
    let h = layout.halo();
    let [si, sj, sk] = layout.sizes();
    let HdiffFieldsMut {
        input,
        coeff,
        lap,
        flx,
        fly,
        out,
    } = fields;

    // Inputs, with element [i + 2, j + 2, k] at logical point (i, j, k)
    let input = input.view().slice_move(s![h - 2..h + si + 2, h - 2..h + sj + 2, h..h + sk]);
    let coeff = coeff.shifted([0; 3]);

    // Scratch fields over the widened region, with element [i + 1, j + 1, k]
    // at logical point (i, j, k)
    let widened = || s![h - 1..h + si + 1, h - 1..h + sj + 1, h..h + sk];
    let extents = [si + 2, sj + 2];

    // Stage 1: widened region is cut right after each interior tile boundary
    let tiles = FluxTile {
        lap: lap.view_mut().slice_move(widened()),
        flx: flx.view_mut().slice_move(widened()),
        fly: fly.view_mut().slice_move(widened()),
    };
    let flux_tile = |tile: FluxTile<'_, T>, origin: [usize; 2]| {
        tile.compute(origin, input.view(), extents)
    };
    for_each_tile(tiles, flux_tiling, &flux_tile);

    // Stage 2
    let flx = flx.view().slice_move(widened());
    let fly = fly.view().slice_move(widened());
    let diffuse_tile = |mut tile: ArrayViewMut3<'_, T>, [i0, j0]: [usize; 2]| {
        let [ni, nj, nk] = shape(&tile);
        for k in 0..nk {
            for tj in 0..nj {
                let j = j0 + tj;
                for ti in 0..ni {
                    let i = i0 + ti;
                    tile[[ti, tj, k]] = hdiff::diffuse(
                        input[[i + 2, j + 2, k]],
                        coeff[[i, j, k]],
                        [flx[[i + 1, j + 1, k]], flx[[i, j + 1, k]]],
                        [fly[[i + 1, j + 1, k]], fly[[i + 1, j, k]]],
                    );
                }
            }
        }
    };
    for_each_tile(out.interior_mut(), out_tiling, &diffuse_tile);
}

/// Stage 1 work item, exclusive owner of a rectangle of the widened region
struct FluxTile<'a, T> {
    lap: ArrayViewMut3<'a, T>,
    flx: ArrayViewMut3<'a, T>,
    fly: ArrayViewMut3<'a, T>,
}
//
impl<T: Element> FluxTile<'_, T> {
    /// Fill the owned scratch values
    ///
    /// `origin` is the widened region position of the first owned cell.
    /// `input` has element `[e + 1]` at widened region position `e`, and
    /// `extents` is the i/j extent of the widened region.
    fn compute(
        mut self,
        [i0, j0]: [usize; 2],
        input: ArrayView3<'_, T>,
        [ei_end, ej_end]: [usize; 2],
    ) {
        let [ni, nj, nk] = shape(&self.lap);
        let laplacian = |ei: usize, ej: usize, k: usize| {
            let [ci, cj] = [ei + 1, ej + 1];
            hdiff::laplacian(
                input[[ci, cj, k]],
                [
                    input[[ci - 1, cj, k]],
                    input[[ci + 1, cj, k]],
                    input[[ci, cj - 1, k]],
                    input[[ci, cj + 1, k]],
                ],
            )
        };

        for k in 0..nk {
            for tj in 0..nj {
                for ti in 0..ni {
                    self.lap[[ti, tj, k]] = laplacian(i0 + ti, j0 + tj, k);
                }
            }
        }

        for k in 0..nk {
            for tj in 0..nj {
                let ej = j0 + tj;
                for ti in 0..ni {
                    let ei = i0 + ti;
                    let center = self.lap[[ti, tj, k]];
                    let gradient = |di: usize, dj: usize| {
                        input[[ei + 1 + di, ej + 1 + dj, k]] - input[[ei + 1, ej + 1, k]]
                    };

                    // flx covers all but the last i and the first and last j
                    if ei + 1 < ei_end && ej >= 1 && ej + 1 < ej_end {
                        let next = if ti + 1 < ni {
                            self.lap[[ti + 1, tj, k]]
                        } else {
                            laplacian(ei + 1, ej, k)
                        };
                        self.flx[[ti, tj, k]] = hdiff::limit(next - center, gradient(1, 0));
                    }

                    // fly covers all but the last j and the first and last i
                    if ej + 1 < ej_end && ei >= 1 && ei + 1 < ei_end {
                        let next = if tj + 1 < nj {
                            self.lap[[ti, tj + 1, k]]
                        } else {
                            laplacian(ei, ej + 1, k)
                        };
                        self.fly[[ti, tj, k]] = hdiff::limit(next - center, gradient(0, 1));
                    }
                }
            }
        }
    }
}

/// Cutting of one axis into tiles
///
/// A region of `size` interior points plus `margin` leading cells is cut
/// into tiles of `block` interior points. The first tile also owns the
/// leading margin, and the last tile owns whatever lies after the last cut.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Tiling {
    block: usize,
    margin: usize,
    count: usize,
}
//
impl Tiling {
    fn new(size: usize, block: usize, margin: usize) -> Self {
        Self {
            block,
            margin,
            count: size.div_ceil(block).max(1),
        }
    }

    /// Position of the first cell of tile `tile`
    fn start(&self, tile: usize) -> usize {
        if tile == 0 {
            0
        } else {
            tile * self.block + self.margin
        }
    }
}

/// Views over a rectangle of tiles, which can be cut in two along i or j
trait SplitTiles: Sized + Send {
    fn split_at(self, axis: Axis, index: usize) -> (Self, Self);
}
//
impl<T: Send> SplitTiles for ArrayViewMut3<'_, T> {
    fn split_at(self, axis: Axis, index: usize) -> (Self, Self) {
        ArrayViewMut3::split_at(self, axis, index)
    }
}
//
impl<T: Send> SplitTiles for FluxTile<'_, T> {
    fn split_at(self, axis: Axis, index: usize) -> (Self, Self) {
        let (lap_1, lap_2) = self.lap.split_at(axis, index);
        let (flx_1, flx_2) = self.flx.split_at(axis, index);
        let (fly_1, fly_2) = self.fly.split_at(axis, index);
        (
            Self {
                lap: lap_1,
                flx: flx_1,
                fly: fly_1,
            },
            Self {
                lap: lap_2,
                flx: flx_2,
                fly: fly_2,
            },
        )
    }
}

/// Process every tile of `views` in parallel
///
/// `op` gets each tile along with the position of its first cell.
fn for_each_tile<P: SplitTiles>(
    views: P,
    tiling: [Tiling; 2],
    op: &(impl Fn(P, [usize; 2]) + Sync),
) {
    split_tiles(views, tiling, [0, 0], tiling.map(|axis| axis.count), op)
}

/// Recursive part of [`for_each_tile()`], over tiles `first..end`
fn split_tiles<P: SplitTiles>(
    views: P,
    tiling: [Tiling; 2],
    first: [usize; 2],
    end: [usize; 2],
    op: &(impl Fn(P, [usize; 2]) + Sync),
) {
    let counts = [end[0] - first[0], end[1] - first[1]];
    if counts == [1, 1] {
        op(views, [tiling[0].start(first[0]), tiling[1].start(first[1])]);
        return;
    }

    // Split across the axis with the most tiles
    let axis = usize::from(counts[1] > counts[0]);
    let middle = first[axis] + counts[axis] / 2;
    let split_point = tiling[axis].start(middle) - tiling[axis].start(first[axis]);
    let (views_1, views_2) = views.split_at(Axis(axis), split_point);
    let (mut end_1, mut first_2) = (end, first);
    end_1[axis] = middle;
    first_2[axis] = middle;
    rayon::join(
        || split_tiles(views_1, tiling, first, end_1, op),
        || split_tiles(views_2, tiling, first_2, end, op),
    );
}

/// Shape of a 3D view as an array
fn shape<T>(view: &ArrayViewMut3<'_, T>) -> [usize; 3] {
    let (ni, nj, nk) = view.dim();
    [ni, nj, nk]
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::Harness;
    use data::layout::DomainConfig;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn layout(sizes: [usize; 3], ranks: [usize; 3], halo: usize) -> Layout {
        Layout::new(DomainConfig {
            sizes,
            ranks,
            halo,
            alignment: 1,
        })
        .unwrap()
    }

    fn args(i_blocksize: usize, j_blocksize: usize) -> ParallelArgs {
        ParallelArgs {
            threads: 3,
            i_blocksize,
            j_blocksize,
        }
    }

    #[test]
    fn tile_starts() {
        let tiling = Tiling::new(10, 4, 1);
        assert_eq!(tiling.count, 3);
        assert_eq!([0, 1, 2].map(|t| tiling.start(t)), [0, 5, 9]);
        let tiling = Tiling::new(8, 4, 0);
        assert_eq!(tiling.count, 2);
        assert_eq!(tiling.start(1), 4);
        assert_eq!(Tiling::new(3, 8, 1).count, 1);
    }

    #[test]
    fn tiles_partition_the_view() {
        let mut storage = vec![0u32; 6 * 5 * 2];
        let view = ArrayViewMut3::from_shape((6, 5, 2), &mut storage).unwrap();
        // Widened extents 6 and 5 come from 4 and 3 interior points
        let tiling = [Tiling::new(4, 3, 1), Tiling::new(3, 2, 1)];
        let visited = AtomicUsize::new(0);
        let fill = |mut tile: ArrayViewMut3<'_, u32>, [i0, j0]: [usize; 2]| {
            visited.fetch_add(1, Ordering::Relaxed);
            for ((ti, tj, k), value) in tile.indexed_iter_mut() {
                *value += ((i0 + ti) * 100 + (j0 + tj) * 10 + k) as u32 + 1;
            }
        };
        for_each_tile(view, tiling, &fill);
        assert_eq!(visited.into_inner(), 4);
        let view = ArrayView3::from_shape((6, 5, 2), &storage).unwrap();
        for ((i, j, k), &value) in view.indexed_iter() {
            assert_eq!(value, (i * 100 + j * 10 + k) as u32 + 1);
        }
    }

    #[test]
    fn matches_reference_for_any_tiling() {
        init_logger();
        for sizes in [[16, 16, 3], [13, 7, 2], [1, 1, 1]] {
            for [bi, bj] in [[1, 1], [4, 4], [5, 3], [8, 8], [64, 2]] {
                let variant = IjBlocked::<f64>::new(
                    layout(sizes, [0, 1, 2], 2),
                    args(bi, bj),
                    &mut Allocator::new(),
                )
                .unwrap();
                let result = Harness::new(variant).run_named("hdiff", 2).unwrap();
                assert!(result.verified, "{sizes:?} with {bi}x{bj} tiles");
            }
        }
    }

    #[test]
    fn matches_reference_with_wide_halo_and_other_layout() {
        init_logger();
        let variant = IjBlocked::<f32>::new(
            layout([11, 9, 4], [0, 2, 1], 3),
            args(4, 2),
            &mut Allocator::new(),
        )
        .unwrap();
        let mut harness = Harness::new(variant);
        assert!(harness.run(HdiffStencil::Hdiff, 1).unwrap().verified);
    }

    #[test]
    fn limiter_on_random_input() {
        init_logger();
        let layout = layout([12, 10, 3], [0, 1, 2], 2);
        let mut variant =
            IjBlocked::<f64>::new(layout, args(5, 4), &mut Allocator::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        variant
            .fields
            .input_mut()
            .fill_with(|_, _, _| rng.gen_range(-1.0..1.0));
        variant.hdiff();
        assert!(variant.fields().verify());

        let fields = variant.fields();
        let (lap, input) = (fields.lap(), fields.input());
        let (mut limited_i, mut limited_j) = (0, 0);
        for k in 0..3 {
            for j in -1..11 {
                for i in -1..13 {
                    if (0..10).contains(&j) && i < 12 {
                        let flux = lap.at(i + 1, j, k) - lap.at(i, j, k);
                        let gradient = input.at(i + 1, j, k) - input.at(i, j, k);
                        let expected = if flux * gradient > 0.0 { 0.0 } else { flux };
                        assert_eq!(fields.flx().at(i, j, k), expected, "flx({i}, {j}, {k})");
                        limited_i += usize::from(flux * gradient > 0.0);
                    }
                    if (0..12).contains(&i) && j < 10 {
                        let flux = lap.at(i, j + 1, k) - lap.at(i, j, k);
                        let gradient = input.at(i, j + 1, k) - input.at(i, j, k);
                        let expected = if flux * gradient > 0.0 { 0.0 } else { flux };
                        assert_eq!(fields.fly().at(i, j, k), expected, "fly({i}, {j}, {k})");
                        limited_j += usize::from(flux * gradient > 0.0);
                    }
                }
            }
        }
        assert!(limited_i > 0 && limited_j > 0);
    }

    #[test]
    fn invalid_configurations() {
        let new = |layout, args| IjBlocked::<f64>::new(layout, args, &mut Allocator::new()).err();
        assert!(matches!(
            new(layout([8, 8, 2], [0, 1, 2], 2), args(0, 4)),
            Some(Error::Compute(compute::Error::InvalidBlockSize { i: 0, j: 4 }))
        ));
        assert!(matches!(
            new(layout([8, 8, 2], [1, 0, 2], 2), args(4, 4)),
            Some(Error::Compute(compute::Error::NonUnitStride { axis: "i", stride: 12 }))
        ));
        assert!(matches!(
            new(layout([8, 8, 2], [0, 1, 2], 1), args(4, 4)),
            Some(Error::Compute(compute::Error::InsufficientHalo {
                required: 2,
                actual: 1
            }))
        ));
    }
}
