//! Horizontal diffusion with flux limiter
//!
//! Two stages per horizontal level:
//!
//! 1. `lap` is the 5-point Laplacian of `in`, on the interior widened by one
//!    cell in i and j. `flx` and `fly` are its forward differences along i
//!    and j, zeroed whenever they have the same sign as the matching forward
//!    difference of `in` (anti-diffusive flux).
//! 2. `out = in - coeff * ((flx - flx(i-1)) + (fly - fly(j-1)))` on the
//!    interior.
//!
//! All implementations must evaluate each point with the functions below, so
//! that results are bit-identical no matter how the domain is traversed.

use crate::{stencil::HdiffStencil, Error};
use data::{alloc::Allocator, field::Field, layout::Layout, Element};
use log::debug;
use std::f64::consts::PI;

/// Minimal halo width needed by horizontal diffusion
pub const MIN_HALO: usize = 2;

/// 5-point horizontal Laplacian from a center value and its i-1, i+1, j-1
/// and j+1 neighbors
#[inline(always)]
pub fn laplacian<T: Element>(center: T, [im, ip, jm, jp]: [T; 4]) -> T {
    T::from_f64(4.0) * center - (im + ip + jm + jp)
}

/// Flux limiter: a flux that has the same sign as the input gradient along
/// the same direction is replaced with zero
#[inline(always)]
pub fn limit<T: Element>(flux: T, gradient: T) -> T {
    if flux * gradient > T::ZERO {
        T::ZERO
    } else {
        flux
    }
}

/// Final update of a point from its fluxes at p and p-1 along i and j
#[inline(always)]
pub fn diffuse<T: Element>(input: T, coeff: T, [flx, flx_im]: [T; 2], [fly, fly_jm]: [T; 2]) -> T {
    input - coeff * ((flx - flx_im) + (fly - fly_jm))
}

/// Untiled evaluation over flat storage, valid for any layout
///
/// `lap`, `flx`, `fly` are scratch buffers sized like the other fields.
pub fn reference<T: Element>(
    layout: &Layout,
    input: &[T],
    coeff: &[T],
    lap: &mut [T],
    flx: &mut [T],
    fly: &mut [T],
    out: &mut [T],
) {
    let [is, js, _] = layout.strides();
    let [si, sj, sk] = layout.sizes().map(|s| s as isize);
    for k in 0..sk {
        for j in -1..sj + 1 {
            for i in -1..si + 1 {
                let p = layout.offset(i, j, k);
                lap[p] = laplacian(
                    input[p],
                    [input[p - is], input[p + is], input[p - js], input[p + js]],
                );
            }
        }
        for j in 0..sj {
            for i in -1..si {
                let p = layout.offset(i, j, k);
                flx[p] = limit(lap[p + is] - lap[p], input[p + is] - input[p]);
            }
        }
        for j in -1..sj {
            for i in 0..si {
                let p = layout.offset(i, j, k);
                fly[p] = limit(lap[p + js] - lap[p], input[p + js] - input[p]);
            }
        }
    }
    for k in 0..sk {
        for j in 0..sj {
            for i in 0..si {
                let p = layout.offset(i, j, k);
                out[p] = diffuse(input[p], coeff[p], [flx[p], flx[p - is]], [fly[p], fly[p - js]]);
            }
        }
    }
}

/// Fields of the horizontal diffusion stencil
///
/// The scratch fields `lap`, `flx` and `fly` span the whole halo-extended
/// domain and are shared by all workers of an invocation.
#[derive(Debug)]
pub struct HdiffFields<T: Element> {
    input: Field<T>,
    coeff: Field<T>,
    lap: Field<T>,
    flx: Field<T>,
    fly: Field<T>,
    out: Field<T>,
}
//
/// Simultaneous access to all fields, read-only for inputs
pub struct HdiffFieldsMut<'a, T: Element> {
    pub input: &'a Field<T>,
    pub coeff: &'a Field<T>,
    pub lap: &'a mut Field<T>,
    pub flx: &'a mut Field<T>,
    pub fly: &'a mut Field<T>,
    pub out: &'a mut Field<T>,
}
//
impl<T: Element> HdiffFields<T> {
    /// Allocate the fields and fill the inputs with smooth data
    pub fn new(layout: Layout, allocator: &mut Allocator) -> Result<Self, Error> {
        if layout.halo() < MIN_HALO {
            return Err(Error::InsufficientHalo {
                required: MIN_HALO,
                actual: layout.halo(),
            });
        }
        let mut field = || Field::new(layout, allocator);
        let mut result = Self {
            input: field()?,
            coeff: field()?,
            lap: field()?,
            flx: field()?,
            fly: field()?,
            out: field()?,
        };

        let [si, sj, sk] = layout.sizes().map(|s| s as f64);
        result.input.fill_with(|i, j, k| {
            let (x, y, z) = (i as f64 / si, j as f64 / sj, k as f64 / sk);
            let phase = x + 1.5 * y;
            T::from_f64(
                5.0 + 8.0 * (2.0 + (PI * phase).cos() + (2.0 * PI * phase).sin()) / 4.0 + z,
            )
        });
        result
            .coeff
            .fill_with(|_, _, k| T::from_f64(0.025 * (1.0 + 0.1 * k as f64 / sk)));
        debug!("Initialized horizontal diffusion fields");
        Ok(result)
    }

    /// Layout shared by all fields
    pub fn layout(&self) -> &Layout {
        self.input.layout()
    }

    /// Diffused field
    pub fn input(&self) -> &Field<T> {
        &self.input
    }

    /// Mutable access to the diffused field, for synthetic inputs
    pub fn input_mut(&mut self) -> &mut Field<T> {
        &mut self.input
    }

    /// Diffusion coefficient
    pub fn coeff(&self) -> &Field<T> {
        &self.coeff
    }

    /// Laplacian scratch field
    pub fn lap(&self) -> &Field<T> {
        &self.lap
    }

    /// Limited i-flux scratch field
    pub fn flx(&self) -> &Field<T> {
        &self.flx
    }

    /// Limited j-flux scratch field
    pub fn fly(&self) -> &Field<T> {
        &self.fly
    }

    /// Output field
    pub fn out(&self) -> &Field<T> {
        &self.out
    }

    /// Access all fields at once
    pub fn split_mut(&mut self) -> HdiffFieldsMut<'_, T> {
        HdiffFieldsMut {
            input: &self.input,
            coeff: &self.coeff,
            lap: &mut self.lap,
            flx: &mut self.flx,
            fly: &mut self.fly,
            out: &mut self.out,
        }
    }

    /// Clear the output field
    pub fn reset(&mut self) {
        self.out.fill(T::ZERO);
    }

    /// Run the untiled reference evaluation on these fields
    pub fn run_reference(&mut self) {
        let layout = *self.layout();
        reference(
            &layout,
            self.input.as_slice(),
            self.coeff.as_slice(),
            self.lap.as_mut_slice(),
            self.flx.as_mut_slice(),
            self.fly.as_mut_slice(),
            self.out.as_mut_slice(),
        );
    }

    /// Output of the reference evaluation, computed in separate storage
    pub fn reference_output(&self) -> Vec<T> {
        let size = self.layout().storage_size();
        let scratch = || vec![T::ZERO; size];
        let (mut lap, mut flx, mut fly, mut out) = (scratch(), scratch(), scratch(), scratch());
        reference(
            self.layout(),
            self.input.as_slice(),
            self.coeff.as_slice(),
            &mut lap,
            &mut flx,
            &mut fly,
            &mut out,
        );
        out
    }

    /// Check that the output field is bit-identical to the reference on the
    /// interior
    pub fn verify(&self) -> bool {
        let expected = self.reference_output();
        let layout = self.layout();
        let [si, sj, sk] = layout.sizes().map(|s| s as isize);
        (0..sk).all(|k| {
            (0..sj).all(|j| {
                (0..si).all(|i| {
                    let p = layout.offset(i, j, k);
                    self.out.as_slice()[p].to_bits_u64() == expected[p].to_bits_u64()
                })
            })
        })
    }

    /// Bytes moved by one run
    ///
    /// `in` is read over the interior widened by the 2-cell horizontal reach
    /// of the stencil, `coeff` is read and `out` written on the interior.
    pub fn bytes(&self, stencil: HdiffStencil) -> usize {
        let [si, sj, sk] = self.layout().sizes();
        match stencil {
            HdiffStencil::Hdiff => {
                std::mem::size_of::<T>() * ((si + 4) * (sj + 4) * sk + 2 * si * sj * sk)
            }
        }
    }
}
