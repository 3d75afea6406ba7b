//! Errors reported while a policy validates its configuration.
//!
//! These are configuration errors: the embedder is expected to report them and abort start-up.
//! Allocation failure is not an error here, see [`crate::policy::AllocationFailure`].

use crate::util::conversions::bytes_to_formatted_string as fmt_bytes;

/// Policy operation result type
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that make a heap configuration unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Flags were processed before the alignments were set.
    #[error("Heap alignments must be set before the flags are processed")]
    MissingAlignment,

    #[error("Initial heap size ({}) must not be larger than the maximum heap size ({})", fmt_bytes(*.initial), fmt_bytes(*.max))]
    InitialHeapExceedsMax { initial: usize, max: usize },

    #[error("Incompatible minimum ({}) and maximum ({}) heap sizes specified", fmt_bytes(*.min), fmt_bytes(*.max))]
    IncompatibleMinMaxHeap { min: usize, max: usize },

    #[error("Incompatible minimum ({}) and initial ({}) heap sizes specified", fmt_bytes(*.min), fmt_bytes(*.initial))]
    IncompatibleMinInitialHeap { min: usize, initial: usize },

    /// The named heap size is below what any policy can run with.
    #[error("Too small {what} heap size: {} (at least {} required)", fmt_bytes(*.size), fmt_bytes(*.required))]
    HeapTooSmall {
        what: &'static str,
        size: usize,
        required: usize,
    },

    /// A ratio is zero, or too large to add the generations or spaces it divides.
    #[error("Invalid {name}: {value}")]
    InvalidRatio { name: &'static str, value: usize },

    /// A size derived from the flags does not fit in the address space.
    #[error("The {what} does not fit in the address space")]
    SizeOverflow { what: &'static str },

    /// `initialize_all` ran twice.
    #[error("The policy is already initialized")]
    AlreadyInitialized,

    /// An operation that needs an initialized policy ran before `initialize_all`.
    #[error("The policy is not initialized")]
    NotInitialized,

    /// An option could not be set. The string is the `name=value` pair.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl PolicyError {
    pub fn invalid_option(name: &str, value: &str) -> Self {
        Self::InvalidOption(format!("{}={}", name, value))
    }
}
