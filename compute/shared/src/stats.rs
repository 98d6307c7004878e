//! Benchmark results

use crate::{counter::CounterSample, Error};
use clap::ValueEnum;
use std::time::Duration;

/// Distribution of a quantity over the repetitions of a benchmark
///
/// Only exists once at least one sample has been recorded.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Statistics {
    min: f64,
    avg: f64,
    max: f64,
}
//
impl Statistics {
    /// Summarize samples, if there are any
    pub fn from_samples(samples: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for sample in samples {
            count += 1;
            sum += sample;
            min = min.min(sample);
            max = max.max(sample);
        }
        (count > 0).then(|| Self {
            min,
            // Rounding can push the mean of near-identical samples out of range
            avg: (sum / count as f64).clamp(min, max),
            max,
        })
    }

    /// Smallest sample
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Mean of the samples
    pub fn avg(&self) -> f64 {
        self.avg
    }

    /// Largest sample
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Measurements of one stencil
#[derive(Clone, Debug, PartialEq)]
pub struct BenchResult {
    /// Stencil name
    pub stencil: &'static str,

    /// Whether the output of the last repetition was right
    ///
    /// Wrong output does not abort a benchmark, so that a sweep over many
    /// configurations keeps producing timings. Check this flag.
    pub verified: bool,

    /// Bytes moved by one repetition
    pub bytes: usize,

    /// Execution time in seconds
    pub time: Statistics,

    /// Achieved bandwidth in GB/s
    pub bandwidth: Statistics,

    /// Hardware counter value, summed over threads
    pub counter: Statistics,

    /// Hardware counter imbalance between threads
    pub counter_imbalance: Statistics,
}
//
impl BenchResult {
    /// Aggregate per-repetition measurements
    pub fn new(
        stencil: &'static str,
        verified: bool,
        bytes: usize,
        samples: &[(Duration, CounterSample)],
    ) -> Result<Self, Error> {
        let distribution = |f: &dyn Fn(&(Duration, CounterSample)) -> f64| {
            Statistics::from_samples(samples.iter().map(f)).ok_or(Error::NoRepetitions)
        };
        Ok(Self {
            stencil,
            verified,
            bytes,
            time: distribution(&|(time, _)| time.as_secs_f64())?,
            bandwidth: distribution(&|(time, _)| bytes as f64 / time.as_secs_f64() / 1e9)?,
            counter: distribution(&|(_, counter)| counter.total)?,
            counter_imbalance: distribution(&|(_, counter)| counter.imbalance)?,
        })
    }
}

/// Headline quantity of a benchmark, used by sweeps
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum Metric {
    /// Minimal execution time
    Time,

    /// Maximal bandwidth
    #[default]
    Bandwidth,

    /// Minimal hardware counter value
    #[value(alias = "papi")]
    Counter,

    /// Minimal hardware counter imbalance
    #[value(alias = "papi-imbalance")]
    CounterImbalance,
}
//
impl Metric {
    /// Extract this metric from a result
    pub fn value(self, result: &BenchResult) -> f64 {
        match self {
            Self::Time => result.time.min(),
            Self::Bandwidth => result.bandwidth.max(),
            Self::Counter => result.counter.min(),
            Self::CounterImbalance => result.counter_imbalance.min(),
        }
    }

    /// Explanation of the reported value
    pub fn description(self) -> &'static str {
        match self {
            Self::Time => "measured min. time in ms",
            Self::Bandwidth => "estimated max. bandwidth in GB/s",
            Self::Counter => "measured min. counter value",
            Self::CounterImbalance => "measured min. counter thread imbalance",
        }
    }

    /// Scale factor from the stored value to the reported value
    pub fn scale(self) -> f64 {
        match self {
            Self::Time => 1000.0,
            _ => 1.0,
        }
    }
}
