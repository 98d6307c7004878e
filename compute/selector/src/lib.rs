//! Pick a variant and a precision at runtime, expose the result as a
//! type-erased [`Benchmark`].

use clap::{Args, ValueEnum};
use compute::{
    args::{DomainArgs, Precision},
    Benchmark, Harness, NoArgs, VariantCreate,
};
use compute_parallel::ParallelArgs;
use data::{alloc::Allocator, layout::Layout, Element};
use log::info;
use std::fmt;
use thiserror::Error;

/// Available stencil implementations
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum VariantKind {
    /// Sequential basic stencils
    #[default]
    Naive,

    /// Multithreaded basic stencils
    Parallel,

    /// Untiled horizontal diffusion
    HdiffNaive,

    /// Horizontal diffusion over parallel i/j tiles
    HdiffIjBlocked,
}
//
impl VariantKind {
    /// Truth that this variant's work decomposition depends on the i/j block
    /// sizes
    pub fn is_blocked(self) -> bool {
        self == Self::HdiffIjBlocked
    }
}
//
impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .to_possible_value()
            .expect("no variant kind is skipped");
        f.write_str(value.get_name())
    }
}

/// Everything needed to set up a benchmark
#[derive(Args, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SelectorArgs {
    /// Stencil implementation
    #[arg(long, env, value_enum, default_value_t)]
    pub variant: VariantKind,

    /// Floating-point precision of the fields
    #[arg(long, env, value_enum, default_value_t)]
    pub precision: Precision,

    /// Domain configuration
    #[command(flatten)]
    pub domain: DomainArgs,

    /// Tuning of the parallel variants
    #[command(flatten)]
    pub parallel: ParallelArgs,
}

/// Set up the benchmark described by some arguments
///
/// All fields are allocated and initialized here.
pub fn create(args: &SelectorArgs) -> Result<Box<dyn Benchmark>, Error> {
    info!(
        "Setting up {} variant in {} precision for a {}x{}x{} domain",
        args.variant, args.precision, args.domain.i_size, args.domain.j_size, args.domain.k_size
    );
    match args.precision {
        Precision::Single => create_typed::<f32>(args),
        Precision::Double => create_typed::<f64>(args),
    }
}

/// Precision-specific part of [`create()`]
fn create_typed<T: Element>(args: &SelectorArgs) -> Result<Box<dyn Benchmark>, Error> {
    let layout = args.domain.layout()?;
    let allocator = &mut args.domain.allocator();
    let parallel = args.parallel;
    match args.variant {
        VariantKind::Naive => boxed::<compute_naive::Basic<T>>(layout, NoArgs {}, allocator),
        VariantKind::Parallel => boxed::<compute_parallel::Basic<T>>(layout, parallel, allocator),
        VariantKind::HdiffNaive => boxed::<compute_naive::Hdiff<T>>(layout, NoArgs {}, allocator),
        VariantKind::HdiffIjBlocked => {
            boxed::<compute_parallel::IjBlocked<T>>(layout, parallel, allocator)
        }
    }
}

/// Construct a variant and wrap it into a harness
fn boxed<V: VariantCreate + 'static>(
    layout: Layout,
    args: V::CliArgs,
    allocator: &mut Allocator,
) -> Result<Box<dyn Benchmark>, Error>
where
    Error: From<V::Error>,
{
    Ok(Box::new(Harness::new(V::new(layout, args, allocator)?)))
}

/// Things that can go wrong when setting up a benchmark
#[derive(Debug, Error)]
pub enum Error {
    /// Error shared by all variants
    #[error(transparent)]
    Compute(#[from] compute::Error),

    /// Error specific to parallel variants
    #[error(transparent)]
    Parallel(#[from] compute_parallel::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::harness::ALL_STENCILS;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small(variant: VariantKind, precision: Precision) -> SelectorArgs {
        SelectorArgs {
            variant,
            precision,
            domain: DomainArgs {
                i_size: 10,
                j_size: 6,
                k_size: 3,
                ..DomainArgs::default()
            },
            parallel: ParallelArgs {
                threads: 2,
                i_blocksize: 4,
                j_blocksize: 4,
            },
        }
    }

    #[test]
    fn every_combination_runs_and_verifies() {
        init_logger();
        for variant in VariantKind::value_variants() {
            for precision in [Precision::Single, Precision::Double] {
                let mut benchmark = create(&small(*variant, precision)).unwrap();
                assert_eq!(benchmark.variant_name(), variant.to_string());
                let results = benchmark.run(ALL_STENCILS, 2).unwrap();
                assert_eq!(results.len(), benchmark.stencil_names().len());
                assert!(results.iter().all(|result| result.verified));
            }
        }
    }

    #[test]
    fn configuration_errors_surface() {
        init_logger();
        let mut args = small(VariantKind::HdiffIjBlocked, Precision::Double);
        args.domain.halo = 1;
        assert!(matches!(
            create(&args),
            Err(Error::Parallel(compute_parallel::Error::Compute(
                compute::Error::InsufficientHalo { .. }
            )))
        ));

        let mut args = small(VariantKind::Naive, Precision::Single);
        args.domain.k_layout = 1;
        assert!(matches!(
            create(&args),
            Err(Error::Compute(compute::Error::Data(
                data::Error::InvalidLayout { .. }
            )))
        ));

        let mut benchmark = create(&small(VariantKind::HdiffNaive, Precision::Single)).unwrap();
        assert!(matches!(
            benchmark.run("copy", 1),
            Err(compute::Error::UnknownStencil(_))
        ));
    }
}
