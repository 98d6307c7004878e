//! Benchmarking utilities
//!
//! Please consider using the [`criterion_benchmark!`](crate::criterion_benchmark)
//! macro instead of calling these implementation details directly.

use crate::{Stencil, Variant, VariantCreate};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{
    layout::{DomainConfig, Layout},
    Element,
};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all stencil variants
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<V: VariantCreate>(c: &mut Criterion, backend_name: &str) {
    init_logger();

    let args = V::CliArgs::from_arg_matches(
        &V::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    for &stencil in V::Stencil::ALL {
        let mut group = c.benchmark_group(format!(
            "{backend_name}::{}<{}>::{stencil}",
            V::NAME,
            <V::Value as Element>::PRECISION
        ));
        for size_pow2 in 4..=7 {
            let size = 2usize.pow(size_pow2);
            let layout = Layout::new(DomainConfig {
                sizes: [size, size, 16],
                ..DomainConfig::default()
            })
            .expect("Benchmark domains are valid");
            let mut variant = V::new(black_box(layout), args.clone(), &mut Default::default())
                .expect("Failed to set up variant");

            let kernel = variant.kernels().get(stencil);
            variant.prerun();
            group.throughput(Throughput::Bytes(variant.bytes(stencil) as u64));
            group.bench_function(
                BenchmarkId::from_parameter(format!("{size}x{size}x16")),
                |b| b.iter(|| kernel(&mut variant)),
            );
            variant.postrun();
            black_box(variant);
        }
        group.finish();
    }
}

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
macro_rules! criterion_benchmark {
    ($backend:ident, $($variant:ty),+ $(,)?) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $(
                $crate::benchmark::criterion_benchmark::<$variant>(c, stringify!($backend));
            )+
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}
