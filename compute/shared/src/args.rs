//! CLI arguments shared by all variants

use crate::Error;
use clap::{Args, ValueEnum};
use data::{
    alloc::Allocator,
    layout::{DomainConfig, Layout},
};
use std::fmt;

/// Domain shape and storage layout
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct DomainArgs {
    /// Number of interior points along i
    #[arg(long, env, default_value_t = 1024)]
    pub i_size: usize,

    /// Number of interior points along j
    #[arg(long, env, default_value_t = 1024)]
    pub j_size: usize,

    /// Number of interior points along k
    #[arg(long, env, default_value_t = 80)]
    pub k_size: usize,

    /// Stride rank of the i axis, 0 being the fastest varying
    #[arg(long, env, default_value_t = 0)]
    pub i_layout: usize,

    /// Stride rank of the j axis
    #[arg(long, env, default_value_t = 1)]
    pub j_layout: usize,

    /// Stride rank of the k axis
    #[arg(long, env, default_value_t = 2)]
    pub k_layout: usize,

    /// Width of the boundary layer around the interior
    #[arg(long, env, default_value_t = 2)]
    pub halo: usize,

    /// Alignment of the fastest varying axis, in elements
    #[arg(long, env, default_value_t = 1)]
    pub alignment: usize,

    /// Shift successive field allocations by increasing amounts of padding
    ///
    /// This keeps fields from mapping onto the same cache sets or memory
    /// channels when their sizes are large powers of two.
    #[arg(long, env)]
    pub rotating_padding: bool,
}
//
impl DomainArgs {
    /// Interior sizes along i, j and k
    pub fn sizes(&self) -> [usize; 3] {
        [self.i_size, self.j_size, self.k_size]
    }

    /// Stride ranks of the i, j and k axes
    pub fn ranks(&self) -> [usize; 3] {
        [self.i_layout, self.j_layout, self.k_layout]
    }

    /// Validate the domain configuration and derive its layout
    pub fn layout(&self) -> Result<Layout, Error> {
        Ok(Layout::new(DomainConfig {
            sizes: self.sizes(),
            ranks: self.ranks(),
            halo: self.halo,
            alignment: self.alignment,
        })?)
    }

    /// Allocator context matching the padding policy
    pub fn allocator(&self) -> Allocator {
        if self.rotating_padding {
            Allocator::with_rotating_padding()
        } else {
            Allocator::new()
        }
    }
}
//
impl Default for DomainArgs {
    fn default() -> Self {
        let DomainConfig {
            sizes: [i_size, j_size, k_size],
            ranks: [i_layout, j_layout, k_layout],
            halo,
            alignment,
        } = DomainConfig::default();
        Self {
            i_size,
            j_size,
            k_size,
            i_layout,
            j_layout,
            k_layout,
            halo,
            alignment,
            rotating_padding: false,
        }
    }
}

/// Floating-point precision of the fields
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum Precision {
    /// 32-bit floats
    Single,

    /// 64-bit floats
    #[default]
    Double,
}
//
impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Double => "double",
        })
    }
}
