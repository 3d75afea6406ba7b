use crate::util::conversions::*;
use std::fmt;

/// The minimum, initial and maximum size of a region of the heap (the whole heap, or one
/// generation), in bytes.
///
/// `min <= initial <= max` always holds: the constructor and setters clamp rather than reject.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeParameters {
    min: usize,
    initial: usize,
    max: usize,
}

impl SizeParameters {
    pub const ZERO: SizeParameters = SizeParameters {
        min: 0,
        initial: 0,
        max: 0,
    };

    /// Build from three sizes. `max` is raised to `min`, and `initial` is clamped into the
    /// resulting range.
    pub fn new(min: usize, initial: usize, max: usize) -> Self {
        let max = max.max(min);
        SizeParameters {
            min,
            initial: initial.clamp(min, max),
            max,
        }
    }

    /// Like [`SizeParameters::new`], with every size rounded up to `alignment` first.
    pub fn aligned(min: usize, initial: usize, max: usize, alignment: usize) -> Self {
        Self::new(
            raw_align_up(min, alignment),
            raw_align_up(initial, alignment),
            raw_align_up(max, alignment),
        )
    }

    /// All three sizes equal.
    pub fn fixed(size: usize) -> Self {
        Self::new(size, size, size)
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn set_min(&mut self, min: usize) {
        *self = Self::new(min, self.initial, self.max);
    }

    pub fn set_initial(&mut self, initial: usize) {
        *self = Self::new(self.min, initial, self.max);
    }

    pub fn set_max(&mut self, max: usize) {
        *self = Self::new(self.min.min(max), self.initial, max);
    }

    /// Whether `size` lies within `[min, max]`.
    pub fn contains(&self, size: usize) -> bool {
        self.min <= size && size <= self.max
    }

    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        raw_is_aligned(self.min, alignment)
            && raw_is_aligned(self.initial, alignment)
            && raw_is_aligned(self.max, alignment)
    }

    pub fn assert_valid(&self, alignment: usize) {
        debug_assert!(self.min <= self.initial, "Ergonomics decided on incompatible minimum and initial sizes: {}", self);
        debug_assert!(self.initial <= self.max, "Ergonomics decided on incompatible initial and maximum sizes: {}", self);
        debug_assert!(self.is_aligned_to(alignment), "Sizes {} not aligned to {}", self, alignment);
    }
}

impl fmt::Display for SizeParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "min {}, initial {}, max {}",
            bytes_to_formatted_string(self.min),
            bytes_to_formatted_string(self.initial),
            bytes_to_formatted_string(self.max)
        )
    }
}
