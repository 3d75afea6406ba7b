use crate::util::constants::*;

/* Alignment */

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    // See https://github.com/rust-lang/rust/blob/e620d0f337d0643c757bab791fc7d88d63217704/src/libcore/alloc.rs#L192
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

/// Align `val` up, or `None` if the result does not fit in a `usize`.
pub const fn raw_align_up_checked(val: usize, align: usize) -> Option<usize> {
    match val.checked_add(align.wrapping_sub(1)) {
        Some(v) => Some(v & !align.wrapping_sub(1)),
        None => None,
    }
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/// Align `val` down, but never below one `align` unit.
pub const fn raw_align_down_bounded(val: usize, align: usize) -> usize {
    let aligned = raw_align_down(val, align);
    if aligned > 0 {
        aligned
    } else {
        align
    }
}

/// Greatest common divisor.
pub const fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple. Both arguments must be non-zero.
pub const fn lcm(a: usize, b: usize) -> usize {
    debug_assert!(a != 0 && b != 0);
    a / gcd(a, b) * b
}

/* Conversion */

pub const fn words_to_bytes(words: usize) -> usize {
    words << LOG_BYTES_IN_WORD
}

pub const fn bytes_to_words_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_WORD - 1) >> LOG_BYTES_IN_WORD
}

pub fn bytes_to_pages_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_PAGE - 1) >> LOG_BYTES_IN_PAGE
}

/// Print a byte count in the largest unit that divides it evenly, e.g. `256M`, `4096K`, `100`.
pub fn bytes_to_formatted_string(bytes: usize) -> String {
    const UNITS: [(usize, &str); 3] = [(BYTES_IN_GBYTE, "G"), (BYTES_IN_MBYTE, "M"), (BYTES_IN_KBYTE, "K")];
    for (unit, suffix) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    format!("{}", bytes)
}
