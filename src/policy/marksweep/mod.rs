//! Policy: a young copying generation over a serial mark-sweep-compact old generation.

mod global;

pub use self::global::MarkSweepPolicy;
pub use self::global::MS_CONSTRAINTS;
