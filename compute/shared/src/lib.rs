//! Common facilities shared by all stencil benchmark variants
//!
//! A variant is one implementation of a family of named stencils, for one
//! numeric precision. Variants own their fields, expose their kernels through
//! a [`KernelTable`], and know how to check their output and how many bytes a
//! kernel moves. The [`Harness`] takes care of everything else.

pub mod args;
pub mod basic;
#[cfg(feature = "criterion")]
pub mod benchmark;
pub mod counter;
pub mod dispatch;
mod error;
pub mod harness;
pub mod hdiff;
pub mod stats;
pub mod stencil;

pub use crate::{
    dispatch::{Kernel, KernelTable},
    error::Error,
    harness::{Benchmark, Harness},
    stats::{BenchResult, Metric, Statistics},
    stencil::Stencil,
};
use clap::Args;
use data::{alloc::Allocator, layout::Layout, Element};

/// Implementation of a family of stencils
pub trait Variant: Sized {
    /// Human-readable name of this implementation
    const NAME: &'static str;

    /// Family of stencils implemented by this variant
    type Stencil: Stencil;

    /// Numeric type of the fields
    type Value: Element;

    /// Kernel of every stencil of the family
    fn kernels(&self) -> &KernelTable<Self::Stencil, Self>;

    /// Prepare the fields before the timed repetitions of a stencil
    fn prerun(&mut self) {}

    /// Clean up after the timed repetitions of a stencil
    fn postrun(&mut self) {}

    /// Check that the output of the last kernel run is right
    fn verify(&self, stencil: Self::Stencil) -> bool;

    /// Number of bytes moved to and from memory by one run of a stencil
    fn bytes(&self, stencil: Self::Stencil) -> usize;
}

/// Variant construction
///
/// All buffers are allocated here, so that the timed region of a benchmark
/// never pays for allocation.
pub trait VariantCreate: Variant {
    /// Tuning parameters exposed via CLI args and environment variables
    type CliArgs: Args + Clone;

    /// Error that can occur during construction
    type Error: std::error::Error + From<Error> + Send + Sync + 'static;

    /// Set up the variant's fields for a given domain layout
    fn new(layout: Layout, args: Self::CliArgs, allocator: &mut Allocator) -> Result<Self, Self::Error>;
}

/// Placeholder for variants which have no tuning parameters
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NoArgs {}
