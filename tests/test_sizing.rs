use genheap::memory_manager;
use genheap::policy::barriers::BarrierKind;
use genheap::policy::generational::GenerationName;
use genheap::util::constants::BYTES_IN_MBYTE;
use genheap::{PolicyBuilder, PolicyError, PolicyKind};

const M: usize = BYTES_IN_MBYTE;

fn builder(options: &str) -> PolicyBuilder {
    let mut builder = PolicyBuilder::new_no_env_vars();
    assert!(memory_manager::process_bulk(&mut builder, options));
    builder
}

#[test]
fn fixed_heap_split_by_new_ratio() {
    let policy = memory_manager::init_policy(&builder(
        "use_large_pages=true large_page_size=1m max_heap_size=256m initial_heap_size=256m new_ratio=2",
    ))
    .unwrap();
    assert_eq!(policy.space_alignment(), 64 * 1024);
    assert_eq!(policy.heap_alignment(), 2 * M);

    let young = policy.generational().unwrap().young_size_params();
    let old = policy.two_gen().unwrap().old_size_params();
    assert_eq!(young.initial(), 85 * M);
    assert_eq!(young.max(), 85 * M);
    assert_eq!(old.initial(), 171 * M);
    assert_eq!(old.max(), 171 * M);
    assert_eq!(young.initial() + old.initial(), 256 * M);
    assert_eq!(young.max() + old.max(), policy.max_heap_byte_size());
}

#[test]
fn new_size_above_ratio_wins() {
    let policy = memory_manager::init_policy(&builder(
        "use_large_pages=true large_page_size=1m max_heap_size=150m initial_heap_size=150m new_size=64m",
    ))
    .unwrap();
    // The ratio alone would give the young generation 50M.
    let gen = policy.generational().unwrap();
    assert_eq!(gen.scale_by_new_ratio_aligned(150 * M), 50 * M);

    let young = gen.young_size_params();
    let old = policy.two_gen().unwrap().old_size_params();
    assert_eq!(young.initial(), 64 * M);
    assert_eq!(old.initial(), 86 * M);
    assert_eq!(young.initial() + old.initial(), 150 * M);
}

#[test]
fn growable_heap() {
    let policy = memory_manager::init_policy(&builder(
        "max_heap_size=96m initial_heap_size=48m min_heap_size=24m use_large_pages=true large_page_size=1m",
    ))
    .unwrap();
    let heap = policy.base().heap_size_params();
    assert_eq!((heap.min(), heap.initial(), heap.max()), (24 * M, 48 * M, 96 * M));

    let generations = policy.generational().unwrap().generations().unwrap();
    let young = generations.youngest().size;
    let old = generations.oldest().size;
    assert_eq!((young.min(), young.initial(), young.max()), (8 * M, 16 * M, 32 * M));
    assert_eq!((old.min(), old.initial(), old.max()), (16 * M, 32 * M, 64 * M));
}

#[test]
fn collector_selection() {
    let policy = memory_manager::init_policy(&builder("max_heap_size=64m")).unwrap();
    assert_eq!(policy.kind(), PolicyKind::MarkSweep);
    assert_eq!(policy.barrier_set_name(), BarrierKind::CardTableModRef);

    let policy = memory_manager::init_policy(&builder("collector=ConcurrentMarkSweep max_heap_size=64m")).unwrap();
    assert_eq!(policy.kind(), PolicyKind::ConcurrentMarkSweep);
    assert!(policy.kind().is_concurrent_mark_sweep());
    assert!(policy.size_policy().is_none());
    let generations = policy.generational().unwrap().generations().unwrap();
    assert_eq!(generations.oldest().name, GenerationName::ConcurrentMarkSweep);

    let policy = memory_manager::init_policy(&builder(
        "collector=ConcurrentMarkSweep use_adaptive_size_policy=true max_heap_size=64m",
    ))
    .unwrap();
    assert_eq!(policy.kind(), PolicyKind::AdaptiveConcurrentMarkSweep);
    assert!(policy.size_policy().is_some());
}

#[test]
fn initial_above_max_is_rejected() {
    let result = memory_manager::init_policy(&builder("max_heap_size=64m initial_heap_size=128m"));
    assert_eq!(
        result.err(),
        Some(PolicyError::InitialHeapExceedsMax {
            initial: 128 * M,
            max: 64 * M
        })
    );
}

#[test]
fn max_below_min_is_rejected() {
    let result = memory_manager::init_policy(&builder("max_heap_size=64m min_heap_size=128m"));
    assert!(matches!(result, Err(PolicyError::IncompatibleMinMaxHeap { .. })));
}

#[test]
fn min_above_ergonomic_max_sizes_the_heap() {
    let policy = memory_manager::init_policy(&builder("min_heap_size=1000g")).unwrap();
    let g = 1024 * M;
    assert_eq!(policy.min_heap_byte_size(), 1000 * g);
    assert_eq!(policy.max_heap_byte_size(), 1000 * g);
    let young = policy.generational().unwrap().young_size_params();
    let old = policy.two_gen().unwrap().old_size_params();
    assert_eq!(young.max() + old.max(), 1000 * g);
}

#[test]
fn ratio_without_room_is_rejected() {
    let result = memory_manager::init_policy(&builder(&format!("max_heap_size=64m new_ratio={}", usize::MAX)));
    assert_eq!(
        result.err(),
        Some(PolicyError::InvalidRatio {
            name: "new_ratio",
            value: usize::MAX
        })
    );
}

#[test]
fn initial_below_min_is_rejected() {
    let result =
        memory_manager::init_policy(&builder("max_heap_size=256m min_heap_size=128m initial_heap_size=64m"));
    assert!(matches!(result, Err(PolicyError::IncompatibleMinInitialHeap { .. })));
}

#[test]
fn tiny_heap_is_rejected() {
    let result = memory_manager::init_policy(&builder("max_heap_size=64m initial_heap_size=512k"));
    assert!(matches!(result, Err(PolicyError::HeapTooSmall { what: "initial", .. })));
}

#[test]
fn zero_ratio_is_rejected() {
    let result = memory_manager::init_policy(&builder("max_heap_size=64m survivor_ratio=0"));
    assert_eq!(
        result.err(),
        Some(PolicyError::InvalidRatio {
            name: "survivor_ratio",
            value: 0
        })
    );
}

#[test]
fn initializing_twice_is_an_error() {
    let mut policy = memory_manager::init_policy(&builder("max_heap_size=64m")).unwrap();
    assert_eq!(policy.initialize_all(), Err(PolicyError::AlreadyInitialized));
}
