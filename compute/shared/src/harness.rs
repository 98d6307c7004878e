//! Timed execution of stencil kernels

use crate::{
    counter::{Counter, CounterSample, NullCounter},
    BenchResult, Error, Stencil, Variant,
};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::time::Instant;

/// Stencil selection which runs the whole family
pub const ALL_STENCILS: &str = "all";

/// Benchmark harness wrapping a variant
pub struct Harness<V: Variant> {
    /// Variant under test
    variant: V,

    /// Hardware counter sampled around each repetition
    counter: Box<dyn Counter>,
}
//
impl<V: Variant> Harness<V> {
    /// Set up a harness without hardware counters
    pub fn new(variant: V) -> Self {
        Self::with_counter(variant, Box::new(NullCounter))
    }

    /// Set up a harness sampling some hardware counter
    pub fn with_counter(variant: V, counter: Box<dyn Counter>) -> Self {
        Self { variant, counter }
    }

    /// Access the variant under test
    pub fn variant(&self) -> &V {
        &self.variant
    }

    /// Mutably access the variant under test
    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }

    /// Run a stencil `repetitions` times and measure it
    ///
    /// Each repetition is timed as a whole, including any parallel work it
    /// spawns. Output is checked once, after the last repetition.
    pub fn run(&mut self, stencil: V::Stencil, repetitions: usize) -> Result<BenchResult, Error> {
        let kernel = self.variant.kernels().get(stencil);
        self.run_kernel(stencil, kernel, repetitions)
    }

    /// Like `run()`, but with a stencil name that must be resolved first
    pub fn run_named(&mut self, name: &str, repetitions: usize) -> Result<BenchResult, Error> {
        let (stencil, kernel) = self.variant.kernels().resolve(name)?;
        self.run_kernel(stencil, kernel, repetitions)
    }

    /// Run either a single stencil, by name, or all of them
    pub fn run_selection(
        &mut self,
        selection: &str,
        repetitions: usize,
    ) -> Result<Vec<BenchResult>, Error> {
        if selection == ALL_STENCILS {
            (V::Stencil::ALL.iter())
                .map(|&stencil| self.run(stencil, repetitions))
                .collect()
        } else {
            Ok(vec![self.run_named(selection, repetitions)?])
        }
    }

    /// Shared implementation of the run methods
    fn run_kernel(
        &mut self,
        stencil: V::Stencil,
        kernel: crate::Kernel<V>,
        repetitions: usize,
    ) -> Result<BenchResult, Error> {
        if repetitions == 0 {
            return Err(Error::NoRepetitions);
        }
        debug!("Running {}::{stencil} {repetitions} times", V::NAME);

        self.variant.prerun();
        let mut samples = Vec::with_capacity(repetitions);
        for _ in 0..repetitions {
            self.counter.start();
            let start = Instant::now();
            kernel(&mut self.variant);
            let elapsed = start.elapsed();
            let counts = self.counter.stop();
            samples.push((elapsed, CounterSample::from_threads(&counts)));
        }
        self.variant.postrun();

        let verified = self.variant.verify(stencil);
        if !verified {
            warn!("{}::{stencil} produced wrong results", V::NAME);
        }
        let bytes = self.variant.bytes(stencil);
        let result = BenchResult::new(stencil.name(), verified, bytes, &samples)?;
        info!(
            "{}::{stencil}: min time {:.3} ms, max bandwidth {:.2} GB/s, verified: {verified}",
            V::NAME,
            result.time.min() * 1000.0,
            result.bandwidth.max(),
        );
        Ok(result)
    }
}

/// Object-safe benchmark interface, for picking variants at runtime
pub trait Benchmark {
    /// Name of the underlying variant
    fn variant_name(&self) -> &'static str;

    /// Names of the stencils that can be run
    fn stencil_names(&self) -> Vec<&'static str>;

    /// See [`Harness::run_selection()`]
    fn run(&mut self, selection: &str, repetitions: usize) -> Result<Vec<BenchResult>, Error>;
}
//
impl<V: Variant> Benchmark for Harness<V> {
    fn variant_name(&self) -> &'static str {
        V::NAME
    }

    fn stencil_names(&self) -> Vec<&'static str> {
        V::Stencil::ALL.iter().map(|s| s.name()).collect()
    }

    fn run(&mut self, selection: &str, repetitions: usize) -> Result<Vec<BenchResult>, Error> {
        self.run_selection(selection, repetitions)
    }
}
