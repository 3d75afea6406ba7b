//! Policy: a young copying generation over a concurrent mark-sweep old generation, optionally
//! with adaptive generation sizing.

mod global;

pub use self::global::ConcurrentMarkSweepPolicy;
pub use self::global::ADAPTIVE_CMS_CONSTRAINTS;
pub use self::global::CMS_CONSTRAINTS;
