/// log2 of the number of bytes in a byte
pub const LOG_BYTES_IN_BYTE: u8 = 0;
/// The number of bytes in a byte
pub const BYTES_IN_BYTE: usize = 1;

/// log2 of the number of bytes in a gigabyte
pub const LOG_BYTES_IN_GBYTE: u8 = 30;
/// The number of bytes in a gigabyte
pub const BYTES_IN_GBYTE: usize = 1 << LOG_BYTES_IN_GBYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a heap word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a heap word. Allocation requests are expressed in words.
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;

/// log2 of the number of bytes in an OS page
pub const LOG_BYTES_IN_PAGE: u8 = 12;
/// The number of bytes in an OS page
pub const BYTES_IN_PAGE: usize = 1 << LOG_BYTES_IN_PAGE;

/// log2 of the number of heap bytes covered by one card table entry
pub const LOG_CARD_SIZE: u8 = 9;
/// The number of heap bytes covered by one card table entry
pub const CARD_SIZE: usize = 1 << LOG_CARD_SIZE;

/// log2 of the generation grain. Spaces and generations are sized in multiples of the grain.
pub const LOG_GEN_GRAIN: u8 = 16;
/// The generation grain (64 KiB).
pub const GEN_GRAIN: usize = 1 << LOG_GEN_GRAIN;

/// The smallest heap (initial or minimum) a policy accepts.
pub const MIN_HEAP_BYTES: usize = BYTES_IN_MBYTE;

/// Default large page size, used when large pages are requested but no size is given.
pub const DEFAULT_LARGE_PAGE_SIZE: usize = 2 << LOG_BYTES_IN_MBYTE;

// The card table commits whole OS pages, so a page must cover a whole number of cards,
// and the generation grain must be page aligned.
const_assert!(BYTES_IN_PAGE % CARD_SIZE == 0);
const_assert!(GEN_GRAIN % BYTES_IN_PAGE == 0);
const_assert!(GEN_GRAIN >= BYTES_IN_PAGE);
