//! Heap sizes chosen from the machine when the user did not choose them.

use crate::util::constants::*;

/// The default heap is this fraction of physical memory.
const MAX_RAM_FRACTION: usize = 4;
/// The default initial heap is this fraction of physical memory.
const INITIAL_RAM_FRACTION: usize = 64;
/// Never choose a default maximum heap below this.
pub const DEFAULT_MIN_MAX_HEAP_SIZE: usize = 96 * BYTES_IN_MBYTE;
/// Never choose a default maximum heap above this.
pub const DEFAULT_MAX_MAX_HEAP_SIZE: usize = 32 * BYTES_IN_GBYTE;

/// Get the total memory of the system in bytes.
pub fn get_system_total_memory() -> usize {
    use sysinfo::MemoryRefreshKind;
    use sysinfo::{RefreshKind, System};

    // Only load the memory component. Loading everything takes long enough to show up in start-up
    // time.
    let sys = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
    );
    usize::try_from(sys.total_memory()).unwrap_or(usize::MAX)
}

/// The maximum heap we pick on a machine with `phys_mem` bytes of memory.
pub fn ergonomic_max_heap_size(phys_mem: usize) -> usize {
    (phys_mem / MAX_RAM_FRACTION).clamp(DEFAULT_MIN_MAX_HEAP_SIZE, DEFAULT_MAX_MAX_HEAP_SIZE)
}

/// The initial heap we pick on a machine with `phys_mem` bytes of memory, given the maximum
/// heap and the smallest heap that fits the default generation sizes.
pub fn ergonomic_initial_heap_size(phys_mem: usize, max_heap: usize, reasonable_minimum: usize) -> usize {
    (phys_mem / INITIAL_RAM_FRACTION)
        .max(reasonable_minimum)
        .min(max_heap)
}
