//! End-to-end runs through the type-erased benchmark interface

use compute::args::{DomainArgs, Precision};
use compute_selector::{SelectorArgs, VariantKind};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cube(variant: VariantKind, precision: Precision) -> SelectorArgs {
    SelectorArgs {
        variant,
        precision,
        domain: DomainArgs {
            i_size: 8,
            j_size: 8,
            k_size: 8,
            halo: 2,
            alignment: 1,
            ..DomainArgs::default()
        },
        ..SelectorArgs::default()
    }
}

#[test]
fn copy_on_8_cube() {
    init_logger();
    let args = cube(VariantKind::Naive, Precision::Double);
    let layout = args.domain.layout().unwrap();
    assert_eq!(layout.storage_size(), 1728);

    for variant in [VariantKind::Naive, VariantKind::Parallel] {
        for (precision, element) in [(Precision::Single, 4), (Precision::Double, 8)] {
            let mut benchmark = compute_selector::create(&cube(variant, precision)).unwrap();
            let results = benchmark.run("copy", 1).unwrap();
            assert_eq!(results.len(), 1);
            let result = &results[0];
            assert_eq!(result.stencil, "copy");
            assert!(result.verified);
            assert_eq!(result.bytes, 2 * element * 512);
            assert!(result.bandwidth.max() > 0.0);
        }
    }
}

#[test]
fn hdiff_variants_agree() {
    init_logger();
    for variant in [VariantKind::HdiffNaive, VariantKind::HdiffIjBlocked] {
        let mut args = cube(variant, Precision::Double);
        args.parallel.i_blocksize = 3;
        args.parallel.j_blocksize = 5;
        let mut benchmark = compute_selector::create(&args).unwrap();
        let results = benchmark.run("all", 3).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].verified, "{variant}");
        assert_eq!(results[0].bytes, 8 * (12 * 12 * 8 + 2 * 512));
    }
}

#[test]
fn rotating_padding_does_not_change_results() {
    init_logger();
    let mut args = cube(VariantKind::Parallel, Precision::Single);
    args.domain.rotating_padding = true;
    args.domain.i_layout = 2;
    args.domain.k_layout = 0;
    args.domain.alignment = 16;
    let mut benchmark = compute_selector::create(&args).unwrap();
    for result in benchmark.run("all", 2).unwrap() {
        assert!(result.verified, "{}", result.stencil);
    }
}
