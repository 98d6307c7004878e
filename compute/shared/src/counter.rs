//! Hardware performance counter interface
//!
//! Sampling actual hardware counters is platform-specific and handled by
//! external implementations of [`Counter`]. Without one, the harness uses
//! [`NullCounter`] and the counter distributions stay at zero.

/// Source of per-thread hardware counter values
pub trait Counter {
    /// Start counting, right before a timed kernel run
    fn start(&mut self);

    /// Stop counting and report the value counted by each thread since the
    /// last call to `start()`
    fn stop(&mut self) -> Vec<f64>;
}

/// Counter that counts nothing
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NullCounter;
//
impl Counter for NullCounter {
    fn start(&mut self) {}

    fn stop(&mut self) -> Vec<f64> {
        Vec::new()
    }
}

/// Summary of one counter sample
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CounterSample {
    /// Sum of the per-thread values
    pub total: f64,

    /// Relative excess of the busiest thread over the mean
    pub imbalance: f64,
}
//
impl CounterSample {
    /// Summarize per-thread counter values
    pub fn from_threads(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let total = values.iter().sum::<f64>();
        let mean = total / values.len() as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let imbalance = if mean == 0.0 { 0.0 } else { max / mean - 1.0 };
        Self { total, imbalance }
    }
}
