//! Generational policies.
//!
//! A generational heap is split into generations ordered from youngest to oldest. Objects are
//! allocated young and promoted when they survive. The policies here size the generations and
//! decide how a failed young allocation falls back to older generations.

use crate::policy::barriers::BarrierKind;
use crate::policy::policy_constraints::PolicyConstraints;
use crate::util::conversions::*;
use crate::util::heap::SizeParameters;
use enum_map::{Enum, EnumMap};
use std::fmt;

pub mod global;
pub mod two_gen;

pub use self::global::GenPolicy;
pub use self::two_gen::TwoGenPolicy;

/// Constraints shared by the two-generation policies. The old generation keeps a card table of
/// references into the young generation.
pub const TWO_GEN_CONSTRAINTS: PolicyConstraints = PolicyConstraints {
    number_of_generations: 2,
    barrier: BarrierKind::CardTableModRef,
    ..PolicyConstraints::default()
};

/// A generation's position in the heap. Declared youngest first, which is also the iteration
/// order of [`Generations`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, strum_macros::Display)]
pub enum GenerationKind {
    Young,
    Old,
}

/// The generation implementation the heap manager should build.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum GenerationName {
    /// Serial copying young generation.
    DefNew,
    /// Parallel copying young generation.
    ParNew,
    /// Parallel copying young generation with adaptive sizing.
    ASParNew,
    /// Serial mark-sweep-compact old generation.
    MarkSweepCompact,
    /// Concurrent mark-sweep old generation.
    ConcurrentMarkSweep,
    /// Concurrent mark-sweep old generation with adaptive sizing.
    ASConcurrentMarkSweep,
}

impl GenerationName {
    pub fn kind(self) -> GenerationKind {
        match self {
            GenerationName::DefNew | GenerationName::ParNew | GenerationName::ASParNew => GenerationKind::Young,
            GenerationName::MarkSweepCompact
            | GenerationName::ConcurrentMarkSweep
            | GenerationName::ASConcurrentMarkSweep => GenerationKind::Old,
        }
    }
}

/// How a generation is divided into spaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpaceLayout {
    /// An eden and two equally sized survivor spaces.
    EdenSurvivor { eden: usize, survivor: usize },
    /// A single space.
    Contiguous,
}

impl SpaceLayout {
    /// Split `size` bytes into an eden and two survivor spaces, each survivor being
    /// `1 / (survivor_ratio + 2)` of the generation, in units of `space_alignment` and never
    /// empty.
    pub fn eden_survivor(size: usize, survivor_ratio: usize, space_alignment: usize) -> Self {
        debug_assert!(survivor_ratio >= 1);
        let survivor = raw_align_down_bounded(size / (survivor_ratio + 2), space_alignment);
        debug_assert!(size >= 3 * survivor, "Young generation too small for its spaces: {}", size);
        SpaceLayout::EdenSurvivor {
            eden: size - 2 * survivor,
            survivor,
        }
    }
}

/// What the heap manager needs to build one generation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GenerationSpec {
    pub name: GenerationName,
    pub size: SizeParameters,
    pub layout: SpaceLayout,
}

impl GenerationSpec {
    pub fn new(name: GenerationName, size: SizeParameters, layout: SpaceLayout) -> Self {
        debug_assert!(
            matches!(
                (name.kind(), layout),
                (GenerationKind::Young, SpaceLayout::EdenSurvivor { .. })
                    | (GenerationKind::Old, SpaceLayout::Contiguous)
            ),
            "{} cannot have layout {:?}",
            name,
            layout
        );
        GenerationSpec { name, size, layout }
    }

    pub fn kind(&self) -> GenerationKind {
        self.name.kind()
    }
}

impl fmt::Display for GenerationSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.size)?;
        if let SpaceLayout::EdenSurvivor { eden, survivor } = self.layout {
            write!(
                f,
                ", eden {}, survivor {}",
                bytes_to_formatted_string(eden),
                bytes_to_formatted_string(survivor)
            )?;
        }
        Ok(())
    }
}

/// The generations of a heap, one per [`GenerationKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generations {
    specs: EnumMap<GenerationKind, GenerationSpec>,
}

impl Generations {
    pub fn new(young: GenerationSpec, old: GenerationSpec) -> Self {
        debug_assert_eq!(young.kind(), GenerationKind::Young);
        debug_assert_eq!(old.kind(), GenerationKind::Old);
        Generations {
            specs: EnumMap::from_array([young, old]),
        }
    }

    pub fn youngest(&self) -> &GenerationSpec {
        &self.specs[GenerationKind::Young]
    }

    pub fn oldest(&self) -> &GenerationSpec {
        &self.specs[GenerationKind::Old]
    }

    pub fn get(&self, kind: GenerationKind) -> &GenerationSpec {
        &self.specs[kind]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.values().next().is_none()
    }

    /// Youngest first.
    pub fn iter(&self) -> impl Iterator<Item = &GenerationSpec> + '_ {
        self.specs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::*;

    #[test]
    fn eden_survivor_split() {
        let layout = SpaceLayout::eden_survivor(10 * BYTES_IN_MBYTE, 8, GEN_GRAIN);
        assert_eq!(
            layout,
            SpaceLayout::EdenSurvivor {
                eden: 8 * BYTES_IN_MBYTE,
                survivor: BYTES_IN_MBYTE
            }
        );

        // The smallest young generation still has one grain per space.
        let layout = SpaceLayout::eden_survivor(3 * GEN_GRAIN, 8, GEN_GRAIN);
        assert_eq!(
            layout,
            SpaceLayout::EdenSurvivor {
                eden: GEN_GRAIN,
                survivor: GEN_GRAIN
            }
        );
    }

    #[test]
    fn youngest_first() {
        let young = GenerationSpec::new(
            GenerationName::DefNew,
            SizeParameters::fixed(10 * BYTES_IN_MBYTE),
            SpaceLayout::eden_survivor(10 * BYTES_IN_MBYTE, 8, GEN_GRAIN),
        );
        let old = GenerationSpec::new(
            GenerationName::MarkSweepCompact,
            SizeParameters::fixed(20 * BYTES_IN_MBYTE),
            SpaceLayout::Contiguous,
        );
        let gens = Generations::new(young, old);
        assert_eq!(gens.len(), 2);
        assert!(!gens.is_empty());
        assert_eq!(gens.youngest().name, GenerationName::DefNew);
        assert_eq!(gens.oldest().name, GenerationName::MarkSweepCompact);
        assert_eq!(gens.get(GenerationKind::Old), gens.oldest());
        let names: Vec<_> = gens.iter().map(|g| g.name).collect();
        assert_eq!(names, vec![GenerationName::DefNew, GenerationName::MarkSweepCompact]);
        assert_eq!(
            gens.youngest().to_string(),
            "DefNew (min 10M, initial 10M, max 10M), eden 8M, survivor 1M"
        );
    }
}
