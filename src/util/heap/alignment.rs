//! Alignment rules shared by the generational policies.
//!
//! Three granularities are in play. Spaces inside a generation are sized in units of the space
//! alignment, generation boundaries fall on the generation alignment, and the whole reservation
//! is a multiple of the heap alignment. Each is a multiple of the one before it.

use crate::util::constants::*;
use crate::util::conversions::*;
use crate::util::options::Options;
use std::fmt;

/// The space, generation and heap alignments of a policy.
///
/// The only way to build one is [`AlignmentSet::new`], which raises the generation and heap
/// alignments to the least common multiple of what was asked for and the finer granularity, so
/// `heap % generation == 0` and `generation % space == 0` hold for every value of this type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlignmentSet {
    space: usize,
    generation: usize,
    heap: usize,
}

impl AlignmentSet {
    pub fn new(space: usize, generation: usize, heap: usize) -> Self {
        debug_assert!(
            space != 0 && generation != 0 && heap != 0,
            "Alignments must be non-zero"
        );
        let generation = lcm(space, generation);
        let heap = lcm(generation, heap);
        let set = AlignmentSet {
            space,
            generation,
            heap,
        };
        set.assert_valid();
        set
    }

    pub fn space(&self) -> usize {
        self.space
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn heap(&self) -> usize {
        self.heap
    }

    pub fn assert_valid(&self) {
        debug_assert!(self.space.is_power_of_two(), "Space alignment must be a power of two");
        debug_assert!(self.generation % self.space == 0, "Generation alignment must be a multiple of space alignment");
        debug_assert!(self.heap % self.generation == 0, "Heap alignment must be a multiple of generation alignment");
        debug_assert!(self.heap >= self.generation && self.generation >= self.space);
    }
}

impl fmt::Display for AlignmentSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "space {}, generation {}, heap {}",
            bytes_to_formatted_string(self.space),
            bytes_to_formatted_string(self.generation),
            bytes_to_formatted_string(self.heap)
        )
    }
}

/// The largest alignment any policy may ask for.
///
/// The card table is committed page by page, so the heap must cover a whole number of card table
/// pages. Large pages add their own constraint. This is usable before a policy is chosen.
pub fn compute_heap_alignment(options: &Options) -> usize {
    let alignment = CARD_SIZE * BYTES_IN_PAGE;
    if *options.use_large_pages {
        lcm(*options.large_page_size, alignment)
    } else {
        alignment
    }
}

/// Alignments for the two-generation policies: spaces and generations on the generation grain,
/// generations on large pages if we use them.
pub fn generational_alignments(options: &Options) -> AlignmentSet {
    let space = GEN_GRAIN;
    let generation = if *options.use_large_pages {
        lcm(space, *options.large_page_size)
    } else {
        space
    };
    AlignmentSet::new(space, generation, compute_heap_alignment(options))
}
