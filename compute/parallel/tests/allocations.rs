//! Heap usage of the timed kernels
//!
//! Lives in its own test binary because it replaces the global allocator, and
//! holds a single test so that nothing else allocates concurrently.

use compute::{stencil::HdiffStencil, Variant, VariantCreate};
use compute_parallel::{IjBlocked, ParallelArgs};
use data::{
    alloc::Allocator,
    layout::{DomainConfig, Layout},
};
use std::{
    alloc::{GlobalAlloc, Layout as AllocLayout, System},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Number of heap allocations performed by all threads so far
static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

/// System allocator that counts allocations
struct CountingAlloc;

// SAFETY: Delegates all allocation and deallocation to the system allocator
unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: AllocLayout) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        // SAFETY: Forwarded with the caller's layout
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: AllocLayout) {
        // SAFETY: ptr was allocated by System.alloc with the same layout
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: CountingAlloc = CountingAlloc;

#[test]
fn tiled_hdiff_kernel_does_not_allocate() {
    let layout = Layout::new(DomainConfig {
        sizes: [256, 256, 4],
        ..DomainConfig::default()
    })
    .unwrap();
    let args = ParallelArgs {
        threads: 2,
        i_blocksize: 8,
        j_blocksize: 8,
    };
    let mut variant = IjBlocked::<f64>::new(layout, args, &mut Allocator::new()).unwrap();
    let kernel = variant.kernels().get(HdiffStencil::Hdiff);

    // The first calls set up rayon's per-thread state
    kernel(&mut variant);
    kernel(&mut variant);

    let before = ALLOCATIONS.load(Ordering::SeqCst);
    kernel(&mut variant);
    let allocations = ALLOCATIONS.load(Ordering::SeqCst) - before;
    assert_eq!(allocations, 0, "one kernel call performed {allocations} allocations");
    assert!(variant.fields().verify());
}
