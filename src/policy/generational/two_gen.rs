use crate::error::{PolicyError, PolicyResult};
use crate::policy::generational::global::GenPolicy;
use crate::policy::generational::{GenerationName, GenerationSpec, Generations, SpaceLayout};
use crate::util::conversions::*;
use crate::util::heap::SizeParameters;
use crate::util::options::Options;
use crate::vm::CollectedHeap;
use std::sync::Arc;

/// A generational policy with exactly two generations: a young generation with an eden and two
/// survivor spaces, and a contiguous old generation.
pub struct TwoGenPolicy {
    pub gen: GenPolicy,
    min_old: usize,
    initial_old: usize,
    max_old: usize,
}

impl TwoGenPolicy {
    pub fn new(options: Arc<Options>) -> Self {
        TwoGenPolicy {
            gen: GenPolicy::new(options),
            min_old: 0,
            initial_old: 0,
            max_old: 0,
        }
    }

    /// The old generation size bounds.
    pub fn old_size_params(&self) -> SizeParameters {
        SizeParameters::new(self.min_old, self.initial_old, self.max_old)
    }

    pub fn initialize_flags(&mut self) -> PolicyResult<()> {
        self.gen.initialize_flags()?;
        let gen_alignment = self.gen.gen_alignment();
        let heap_alignment = self.gen.base.alignments().heap();
        let young_lower_bound = self.gen.young_gen_size_lower_bound();
        let max_heap_size_cmdline = self.gen.base.max_heap_size_cmdline();

        let flags = self.gen.base.flags_mut();
        if !raw_is_aligned(*flags.old_size, gen_alignment) {
            let aligned = raw_align_down(*flags.old_size, gen_alignment);
            flags.old_size.set_ergo(aligned);
        }

        if flags.old_size.is_explicit() && !flags.max_heap_size.is_explicit() {
            // new_ratio sizes the young generation later. Size the heap so the requested old
            // generation is what is left.
            let new_ratio = *flags.new_ratio;
            let mut heap_size = (*flags.old_size / new_ratio)
                .checked_mul(new_ratio + 1)
                .and_then(|size| raw_align_up_checked(size, heap_alignment))
                .ok_or(PolicyError::SizeOverflow {
                    what: "heap sized from old_size",
                })?;
            if flags.initial_heap_size.is_explicit() {
                heap_size = heap_size.max(*flags.initial_heap_size);
            } else {
                flags.initial_heap_size.set_ergo(heap_size);
            }
            debug!("Heap size from old_size: {}", bytes_to_formatted_string(heap_size));
            flags.max_heap_size.set_ergo(heap_size);
            if *flags.min_heap_size > *flags.initial_heap_size {
                let initial = *flags.initial_heap_size;
                flags.min_heap_size.set_ergo(initial);
            }
        }

        let new_size = *flags.new_size;
        let old_size = *flags.old_size;
        let max_heap = *flags.max_heap_size;
        if new_size.saturating_add(old_size) > max_heap {
            if max_heap_size_cmdline {
                // The user does not want the heap to grow beyond max_heap_size. Shrink both
                // generations in proportion.
                let shrunk = (new_size as u128 * max_heap as u128 / (new_size as u128 + old_size as u128)) as usize;
                let smaller_new_size = young_lower_bound.max(raw_align_down(shrunk, gen_alignment));
                debug!(
                    "Shrinking new_size to {} to fit the maximum heap {}",
                    bytes_to_formatted_string(smaller_new_size),
                    bytes_to_formatted_string(max_heap)
                );
                flags.new_size.set_ergo(smaller_new_size);
                // max_heap is aligned to the heap alignment, which is a multiple of the
                // generation alignment, so the old size stays aligned.
                flags.old_size.set_ergo(max_heap - smaller_new_size);
                self.gen.set_initial_young(smaller_new_size);
            } else {
                let grown = new_size
                    .checked_add(old_size)
                    .and_then(|size| raw_align_up_checked(size, heap_alignment))
                    .ok_or(PolicyError::SizeOverflow {
                        what: "heap holding new_size and old_size",
                    })?;
                debug!("Growing maximum heap to {} to fit both generations", bytes_to_formatted_string(grown));
                flags.max_heap_size.set_ergo(grown);
            }
        }

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_flags();
        Ok(())
    }

    pub fn initialize_size_info(&mut self) -> PolicyResult<()> {
        self.gen.initialize_size_info()?;

        let gen_alignment = self.gen.gen_alignment();
        let min_heap = self.gen.base.min_heap_byte_size();
        let initial_heap = self.gen.base.initial_heap_byte_size();
        let max_heap = self.gen.base.max_heap_byte_size();
        let young = self.gen.young_size_params();

        // The old generation gets what the young generation leaves, but at least one unit.
        self.max_old = max_heap.saturating_sub(young.max()).max(gen_alignment);

        let old_size = *self.gen.base.flags().old_size;
        if !self.gen.base.flags().old_size.is_explicit() {
            self.min_old = min_heap.saturating_sub(young.min()).max(gen_alignment);
            self.initial_old = initial_heap.saturating_sub(young.initial()).max(gen_alignment);
        } else {
            // The user wants a specific old size. The young generation gives way where it can.
            self.min_old = old_size.min(min_heap.saturating_sub(young.min()));
            self.initial_old = old_size;
            if self.min_old + young.min() + gen_alignment < min_heap {
                warn!(
                    "Inconsistency between minimum heap size and minimum generation sizes: using minimum heap = {}",
                    bytes_to_formatted_string(min_heap)
                );
            }
            if old_size > self.max_old {
                warn!(
                    "Inconsistency between maximum heap size and maximum generation sizes: using maximum heap = {} -XX:OldSize flag is being ignored",
                    bytes_to_formatted_string(max_heap)
                );
                self.initial_old = self.max_old;
            }
            self.min_old = self.min_old.min(self.max_old);

            // The minimums are what is being adjusted, so only the absolute lower bounds apply.
            let young_lower_bound = self.gen.young_gen_size_lower_bound();
            let (mut min_young, mut min_old) = (young.min(), self.min_old);
            let adjusted =
                self.adjust_gen0_sizes_within(&mut min_young, &mut min_old, min_heap, young_lower_bound, gen_alignment);
            if adjusted {
                debug!(
                    "Adjusted minimum young {} and old {}",
                    bytes_to_formatted_string(min_young),
                    bytes_to_formatted_string(min_old)
                );
            }
            let (mut initial_young, mut initial_old) = (young.initial(), self.initial_old);
            let adjusted =
                self.adjust_gen0_sizes_within(&mut initial_young, &mut initial_old, initial_heap, min_young, min_old);
            if adjusted {
                debug!(
                    "Adjusted initial young {} and old {}",
                    bytes_to_formatted_string(initial_young),
                    bytes_to_formatted_string(initial_old)
                );
            }
            self.gen.set_young_sizes(min_young, initial_young);
            self.min_old = min_old;
            self.initial_old = initial_old;
        }

        // min <= initial <= max
        self.min_old = self.min_old.min(self.max_old);
        self.initial_old = self.initial_old.max(self.min_old).min(self.max_old);

        self.gen.write_back_young_flags();
        let initial_old = self.initial_old;
        let flags = self.gen.base.flags_mut();
        if *flags.old_size != initial_old {
            flags.old_size.set_ergo(initial_old);
        }
        debug!("Old generation: {}", self.old_size_params());

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_size_info();
        Ok(())
    }

    /// Split `heap_size` between the young (`gen0`) and old (`gen1`) generation when their sizes
    /// do not add up to it. Returns whether the sizes changed.
    ///
    /// The generation that is further from its configured size in the direction of the change
    /// gives way (the young one on a tie), and the young size is clamped so both generations stay
    /// within their `[min, max]` bounds. Nothing changes if no split fits or `heap_size` is not
    /// aligned to the generation alignment.
    pub fn adjust_gen0_sizes(&self, gen0: &mut usize, gen1: &mut usize, heap_size: usize) -> bool {
        let young_min = self.gen.young_size_params().min();
        self.adjust_gen0_sizes_within(gen0, gen1, heap_size, young_min, self.min_old)
    }

    /// [`Self::adjust_gen0_sizes`] with the given minimum generation sizes. Used while the
    /// minimums are still being computed.
    fn adjust_gen0_sizes_within(
        &self,
        gen0: &mut usize,
        gen1: &mut usize,
        heap_size: usize,
        young_min: usize,
        old_min: usize,
    ) -> bool {
        let gen_alignment = self.gen.gen_alignment();
        let sum = gen0.checked_add(*gen1);
        if sum == Some(heap_size) || !raw_is_aligned(heap_size, gen_alignment) {
            return false;
        }

        // gen0 in [low, high] keeps gen1 = heap_size - gen0 in [old_min, max_old].
        let Some(young_room) = heap_size.checked_sub(old_min) else {
            trace!(
                "A heap of {} has no room for an old generation of {}",
                bytes_to_formatted_string(heap_size),
                bytes_to_formatted_string(old_min)
            );
            return false;
        };
        let young_max = self.gen.young_size_params().max();
        let low = raw_align_up(young_min.max(heap_size.saturating_sub(self.max_old)), gen_alignment);
        let high = raw_align_down(young_max.min(young_room), gen_alignment);
        if low > high {
            trace!(
                "No young size in [{}, {}] fits a heap of {}",
                bytes_to_formatted_string(low),
                bytes_to_formatted_string(high),
                bytes_to_formatted_string(heap_size)
            );
            return false;
        }

        let flags = self.gen.base.flags();
        let young_deviation = *gen0 as i128 - *flags.new_size as i128;
        let old_deviation = *gen1 as i128 - *flags.old_size as i128;
        let shrinking = sum.map_or(true, |sum| sum > heap_size);
        let young_yields = if shrinking {
            young_deviation >= old_deviation
        } else {
            young_deviation <= old_deviation
        };

        let proposal = if young_yields {
            heap_size.saturating_sub(*gen1)
        } else {
            *gen0
        };
        let new_gen0 = raw_align_down(proposal, gen_alignment).clamp(low, high);
        let new_gen1 = heap_size - new_gen0;
        let changed = new_gen0 != *gen0 || new_gen1 != *gen1;
        *gen0 = new_gen0;
        *gen1 = new_gen1;
        changed
    }

    /// Describe the two generations, with the young generation split into eden and survivors.
    pub fn generations_spec(&self, young: GenerationName, old: GenerationName) -> Generations {
        let young_size = self.gen.young_size_params();
        let layout = SpaceLayout::eden_survivor(
            young_size.initial(),
            *self.gen.base.flags().survivor_ratio,
            self.gen.base.alignments().space(),
        );
        Generations::new(
            GenerationSpec::new(young, young_size, layout),
            GenerationSpec::new(old, self.old_size_params(), SpaceLayout::Contiguous),
        )
    }

    pub fn post_heap_initialize(&mut self, heap: &dyn CollectedHeap) -> PolicyResult<()> {
        self.gen.post_heap_initialize(heap)
    }

    pub fn assert_flags(&self) {
        self.gen.assert_flags();
        assert!(
            raw_is_aligned(*self.gen.base.flags().old_size, self.gen.gen_alignment()),
            "old_size alignment"
        );
    }

    pub fn assert_size_info(&self) {
        self.gen.assert_size_info();
        let old = self.old_size_params();
        assert!(
            old.min() == self.min_old && old.initial() == self.initial_old && old.max() == self.max_old,
            "Ergonomics decided on incompatible old gen sizes: min {}, initial {}, max {}",
            self.min_old,
            self.initial_old,
            self.max_old
        );
        assert!(old.is_aligned_to(self.gen.gen_alignment()), "Old gen sizes {} are not aligned", old);
        assert!(
            self.gen.base.max_heap_byte_size() <= self.gen.young_size_params().max() + self.max_old,
            "Total maximum heap sizes must be sum of generation maximum sizes"
        );
    }
}
