//! Heap sizing: alignments, size bounds, ergonomics and the adaptive size policy.

pub mod adaptive_size_policy;
pub mod alignment;
pub mod ergonomics;
pub mod size_params;

pub use self::adaptive_size_policy::{AdaptiveSizePolicy, OverheadLimits};
pub use self::alignment::{compute_heap_alignment, AlignmentSet};
pub use self::size_params::SizeParameters;
