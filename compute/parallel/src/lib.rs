//! Parallel implementation of the stencil benchmarks
//!
//! This crate implements multithreaded versions of the stencil benchmarks
//! based on domain decomposition and fork-join parallelism. Each variant owns
//! its thread pool, and every kernel invocation runs inside of it, returning
//! only once all workers are done.

mod args;
pub mod basic;
pub mod hdiff;

pub use crate::{args::ParallelArgs, basic::Basic, hdiff::IjBlocked};
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/// Set up the thread pool of a variant
///
/// A thread count of 0 lets rayon pick its default.
fn thread_pool(num_threads: usize) -> Result<ThreadPool, Error> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(Error::ThreadPool)?;
    debug!("Set up a thread pool with {} threads", pool.current_num_threads());
    Ok(pool)
}

/// Things that can go wrong when setting up a parallel variant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error shared with other variants
    #[error(transparent)]
    Compute(#[from] compute::Error),

    /// Failed to configure thread pool
    #[error("failed to configure thread pool")]
    ThreadPool(#[source] ThreadPoolBuildError),
}
