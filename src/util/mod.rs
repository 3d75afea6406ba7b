//! Utilities used by the policies.

/// An address in the heap.
pub mod address;
/// Constants: units, page, card and grain sizes.
pub mod constants;
/// Alignment and unit conversions.
pub mod conversions;
/// Why a collection was requested.
pub mod gc_cause;
/// Heap sizing.
pub mod heap;
/// The built-in logger.
pub mod logger;
/// Options for the policy.
pub mod options;
/// Helpers and a mock heap for tests.
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

pub use self::address::Address;
