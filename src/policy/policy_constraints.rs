//! Constraints that are fixed for each policy.

use crate::policy::barriers::BarrierKind;

/// Policy-specific constants. Each policy has one `const` of this type.
#[derive(Copy, Clone, Debug)]
pub struct PolicyConstraints {
    /// The number of generations.
    pub number_of_generations: usize,
    /// The barrier the generation layout needs.
    pub barrier: BarrierKind,
    /// Whether the old generation is collected concurrently with the mutators.
    pub concurrent_old_generation: bool,
    /// Whether the policy feeds an adaptive size policy.
    pub adaptive_sizing: bool,
    /// Whether the heap must update the barrier on every reference store, including stores the
    /// collector could otherwise prove to be young-to-young.
    pub always_do_update_barrier: bool,
}

impl PolicyConstraints {
    /// A const function to create the default constraints.
    pub const fn default() -> Self {
        PolicyConstraints {
            number_of_generations: 1,
            barrier: BarrierKind::Uninit,
            concurrent_old_generation: false,
            adaptive_sizing: false,
            always_do_update_barrier: false,
        }
    }
}
