//! Sizing invariants over many seeded random configurations.

use genheap::memory_manager;
use genheap::util::constants::BYTES_IN_MBYTE;
use genheap::{CollectorPolicy, PolicyBuilder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const M: usize = BYTES_IN_MBYTE;
const ROUNDS: usize = 200;

/// A consistent configuration: explicit heap sizes in multiples of 2M, sometimes an explicit
/// young size.
fn random_options(rng: &mut ChaCha8Rng) -> String {
    let min = rng.random_range(2..=64usize) * 2;
    let initial = min + rng.random_range(0..=64usize) * 2;
    let max = initial + rng.random_range(0..=128usize) * 2;
    let mut options = format!(
        "min_heap_size={}m initial_heap_size={}m max_heap_size={}m new_ratio={} survivor_ratio={}",
        min,
        initial,
        max,
        rng.random_range(1..=8usize),
        rng.random_range(1..=16usize)
    );
    if rng.random_bool(0.5) {
        options.push_str(" use_large_pages=true large_page_size=1m");
    }
    if rng.random_bool(0.3) {
        options.push_str(&format!(" new_size={}m", rng.random_range(1..=max / 2)));
    }
    if rng.random_bool(0.2) {
        options.push_str(&format!(" old_size={}m", rng.random_range(1..=max / 2)));
    }
    if rng.random_bool(0.3) {
        options.push_str(" collector=ConcurrentMarkSweep");
    }
    options
}

fn init(options: &str) -> Box<dyn CollectorPolicy> {
    let mut builder = PolicyBuilder::new_no_env_vars();
    assert!(memory_manager::process_bulk(&mut builder, options), "{}", options);
    match memory_manager::init_policy(&builder) {
        Ok(policy) => policy,
        Err(e) => panic!("{}: {}", options, e),
    }
}

#[test]
fn sizes_are_ordered_and_aligned() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x6e6e_6865_6170);
    for _ in 0..ROUNDS {
        let options = random_options(&mut rng);
        let policy = init(&options);
        let gen_alignment = policy.base().alignments().generation();

        let heap = policy.base().heap_size_params();
        assert!(heap.min() <= heap.initial() && heap.initial() <= heap.max(), "{}: {}", options, heap);
        assert!(heap.is_aligned_to(policy.heap_alignment()), "{}: {}", options, heap);

        let young = policy.generational().unwrap().young_size_params();
        let old = policy.two_gen().unwrap().old_size_params();
        for size in [young, old] {
            assert!(size.min() <= size.initial() && size.initial() <= size.max(), "{}: {}", options, size);
            assert!(size.is_aligned_to(gen_alignment), "{}: {}", options, size);
            assert!(size.min() >= gen_alignment, "{}: {}", options, size);
        }
        assert!(young.max() < heap.max(), "{}", options);
        assert_eq!(young.max() + old.max(), heap.max(), "{}", options);
    }
}

#[test]
fn fixed_heaps_are_filled_exactly() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..ROUNDS {
        let size = rng.random_range(2..=256usize) * 2;
        let options = format!(
            "min_heap_size={0}m initial_heap_size={0}m max_heap_size={0}m new_ratio={1} use_large_pages=true large_page_size=1m",
            size,
            rng.random_range(1..=8usize)
        );
        let policy = init(&options);
        let young = policy.generational().unwrap().young_size_params();
        let old = policy.two_gen().unwrap().old_size_params();
        assert_eq!(young.initial() + old.initial(), size * M, "{}", options);
        assert_eq!(young.min(), young.max(), "{}", options);
        assert_eq!(old.min(), old.max(), "{}", options);
    }
}

#[test]
fn scaling_never_exceeds_its_base() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..ROUNDS {
        let options = random_options(&mut rng);
        let policy = init(&options);
        let gen = policy.generational().unwrap();
        let base = rng.random_range(0..=1024 * M);
        let scaled = gen.scale_by_new_ratio_aligned(base);
        assert!(scaled <= base, "{}: {} -> {}", options, base, scaled);
        assert_eq!(scaled % gen.gen_alignment(), 0, "{}", options);
    }
}

#[test]
fn adjusted_generations_fit_their_heap() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xadd5);
    for _ in 0..ROUNDS {
        let options = random_options(&mut rng);
        let policy = init(&options);
        let two_gen = policy.two_gen().unwrap();
        let gen = policy.generational().unwrap();
        let alignment = gen.gen_alignment();
        let young = gen.young_size_params();
        let old = two_gen.old_size_params();

        let heap_size = rng.random_range(1..=(young.max() + old.max()) / alignment) * alignment;
        let before = (
            rng.random_range(1..=young.max() / alignment) * alignment,
            rng.random_range(1..=old.max() / alignment) * alignment,
        );
        let (mut gen0, mut gen1) = before;
        if two_gen.adjust_gen0_sizes(&mut gen0, &mut gen1, heap_size) {
            assert_eq!(gen0 + gen1, heap_size, "{}", options);
            assert!(young.contains(gen0), "{}: young {} outside {}", options, gen0, young);
            assert!(old.contains(gen1), "{}: old {} outside {}", options, gen1, old);
            assert_eq!(gen0 % alignment, 0, "{}", options);
        } else {
            assert_eq!((gen0, gen1), before, "{}", options);
            // Either nothing needed to change, or no split keeps both generations in bounds.
            let feasible = (young.min()..=young.max())
                .step_by(alignment)
                .any(|g0| heap_size >= g0 && old.contains(heap_size - g0));
            assert!(before.0 + before.1 == heap_size || !feasible, "{}: {} fits", options, heap_size);
        }
    }
}
