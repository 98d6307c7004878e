//! CLI arguments

use clap::Args;

/// CLI parameters for the multithreaded implementations
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ParallelArgs {
    /// Number of processing threads, 0 means rayon's default
    #[arg(long, env, default_value_t = 0)]
    pub threads: usize,

    /// Extent of a tile along i, in grid points
    ///
    /// Tiles are the unit of parallel work of blocked kernels. Smaller tiles
    /// expose more parallelism, larger ones recompute fewer values at tile
    /// boundaries and keep the inner loops longer.
    #[arg(long, env, default_value_t = 8)]
    pub i_blocksize: usize,

    /// Extent of a tile along j, in grid points
    #[arg(long, env, default_value_t = 8)]
    pub j_blocksize: usize,
}
//
impl Default for ParallelArgs {
    fn default() -> Self {
        Self {
            threads: 0,
            i_blocksize: 8,
            j_blocksize: 8,
        }
    }
}
