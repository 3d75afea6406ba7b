//! Options for the heap policy.
//!
//! Every option carries its [`FlagOrigin`] so the sizing code can tell a value the user asked
//! for from a default or from a value that the policy itself derived (ergonomics). Policies never
//! write to the options they were created with; they copy them and adjust their own copy.

use crate::util::constants::*;
use std::fmt::Debug;
use std::ops::Deref;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Which collector policy to build. See [`crate::policy::create_policy`].
#[derive(Copy, Clone, EnumString, Display, Debug, PartialEq, Eq)]
pub enum CollectorSelector {
    /// Serial young collection with a mark-sweep-compact old generation.
    MarkSweep,
    /// Young collection with a concurrent mark-sweep old generation.
    ConcurrentMarkSweep,
    /// Concurrent mark-sweep with an adaptive size policy.
    AdaptiveConcurrentMarkSweep,
}

/// Where the current value of an option came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOrigin {
    /// The built-in default.
    Default,
    /// Set by the user, through [`Options::set_from_str`] or an environment variable.
    Explicit,
    /// Derived by a policy while it validated the configuration.
    Ergonomic,
}

/// Values an option can hold. Byte sizes accept a `K`, `M` or `G` suffix (case insensitive).
pub trait OptionValue: Sized + Clone + Debug {
    fn parse_option(s: &str) -> Option<Self>;
}

impl OptionValue for usize {
    fn parse_option(s: &str) -> Option<Self> {
        parse_byte_size(s)
    }
}

impl OptionValue for bool {
    fn parse_option(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl OptionValue for CollectorSelector {
    fn parse_option(s: &str) -> Option<Self> {
        CollectorSelector::from_str(s.trim()).ok()
    }
}

/// Parse a byte size such as `4096`, `512k`, `256M` or `2g`.
pub fn parse_byte_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], LOG_BYTES_IN_KBYTE),
        'm' | 'M' => (&s[..s.len() - 1], LOG_BYTES_IN_MBYTE),
        'g' | 'G' => (&s[..s.len() - 1], LOG_BYTES_IN_GBYTE),
        _ => (s, 0),
    };
    let value: usize = digits.parse().ok()?;
    value.checked_mul(1usize << shift)
}

/// One option value, with its validator and origin.
#[derive(Clone, Debug)]
pub struct HeapOption<T: OptionValue> {
    value: T,
    validator: fn(&T) -> bool,
    origin: FlagOrigin,
}

impl<T: OptionValue> HeapOption<T> {
    pub fn new(value: T, validator: fn(&T) -> bool) -> Self {
        debug_assert!(validator(&value), "Invalid default value {:?}", value);
        HeapOption {
            value,
            validator,
            origin: FlagOrigin::Default,
        }
    }

    /// Set the option as if the user asked for it. Returns false, and keeps the old value, if the
    /// value does not pass the validator.
    pub fn set(&mut self, value: T) -> bool {
        if (self.validator)(&value) {
            self.value = value;
            self.origin = FlagOrigin::Explicit;
            true
        } else {
            false
        }
    }

    /// Set the option on behalf of the policy.
    pub fn set_ergo(&mut self, value: T) {
        debug_assert!((self.validator)(&value), "Invalid ergonomic value {:?}", value);
        self.value = value;
        self.origin = FlagOrigin::Ergonomic;
    }

    /// Change the value without changing where it came from. Sizing code uses this to round a
    /// value while still treating it as the user's choice.
    pub fn update(&mut self, value: T) {
        debug_assert!((self.validator)(&value), "Invalid value {:?}", value);
        self.value = value;
    }

    pub fn origin(&self) -> FlagOrigin {
        self.origin
    }

    pub fn is_default(&self) -> bool {
        self.origin == FlagOrigin::Default
    }

    pub fn is_explicit(&self) -> bool {
        self.origin == FlagOrigin::Explicit
    }

    pub fn is_ergonomic(&self) -> bool {
        self.origin == FlagOrigin::Ergonomic
    }
}

impl<T: OptionValue> Deref for HeapOption<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

fn always_valid<T>(_: &T) -> bool {
    true
}

fn is_percentage(v: &usize) -> bool {
    *v <= 100
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty [$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty [$validator:expr] = $default:expr),*) => [
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: HeapOption<$type>),*
        }

        impl Options {
            /// Set an option by its snake_case name. Returns false if the name is unknown, or the
            /// value cannot be parsed or is invalid. In that case the option keeps its old value.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    $(stringify!($name) => match <$type as OptionValue>::parse_option(val) {
                        Some(v) => {
                            let is_valid = self.$name.set(v);
                            if !is_valid {
                                warn!("Unable to set {}={:?}. Invalid value. The previous value will be used.", s, val);
                            }
                            is_valid
                        }
                        None => {
                            warn!("Unable to set {}={:?}. Can't parse value. The previous value will be used.", s, val);
                            false
                        }
                    },)*
                    _ => {
                        warn!("Unknown option {}={:?}. Ignored.", s, val);
                        false
                    }
                }
            }

            /// Read options from environment variables that start with `GENHEAP_` and match an
            /// option name, such as `GENHEAP_MAX_HEAP_SIZE=256m`.
            pub fn read_env_var_settings(&mut self) {
                const PREFIX: &str = "GENHEAP_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }

        impl Default for Options {
            fn default() -> Self {
                Options {
                    $($name: HeapOption::new($default, $validator)),*
                }
            }
        }
    ]
}

options! {
    /// The collector policy to use.
    collector:                        CollectorSelector [always_valid] = CollectorSelector::MarkSweep,
    /// Initial heap size in bytes. 0 lets the policy choose.
    initial_heap_size:                usize [always_valid] = 0,
    /// Minimum heap size in bytes. 0 lets the policy choose.
    min_heap_size:                    usize [always_valid] = 0,
    /// Maximum heap size in bytes. 0 lets the policy choose from the physical memory size.
    max_heap_size:                    usize [always_valid] = 0,
    /// Initial (and lower bound of the) young generation size in bytes.
    new_size:                         usize [always_valid] = BYTES_IN_MBYTE,
    /// Maximum young generation size in bytes.
    max_new_size:                     usize [always_valid] = usize::MAX,
    /// Initial old generation size in bytes.
    old_size:                         usize [always_valid] = 4 * BYTES_IN_MBYTE,
    /// Ratio of old generation size to young generation size.
    new_ratio:                        usize [always_valid] = 2,
    /// Ratio of eden size to one survivor space.
    survivor_ratio:                   usize [always_valid] = 8,
    /// The minimum amount a generation grows by when the heap is expanded.
    min_heap_delta_bytes:             usize [always_valid] = 128 * BYTES_IN_KBYTE,
    /// Back the heap with large pages. Generation and heap alignment become large-page aware.
    use_large_pages:                  bool  [always_valid] = false,
    /// The large page size. Must be a power of two, and at least an OS page.
    large_page_size:                  usize [|v: &usize| v.is_power_of_two() && *v >= BYTES_IN_PAGE] = DEFAULT_LARGE_PAGE_SIZE,
    /// Resize generations at run time. Selects the adaptive variant of the concurrent collector.
    use_adaptive_size_policy:         bool  [always_valid] = false,
    /// Use the parallel young generation collector.
    use_par_new_gc:                   bool  [always_valid] = false,
    /// Run the concurrent collector incrementally. Gives the young generation a soft end.
    cms_incremental_mode:             bool  [always_valid] = false,
    /// Goal ratio of mutator time to GC time: 1 / (1 + gc_time_ratio) of the time is spent in GC.
    gc_time_ratio:                    usize [always_valid] = 99,
    /// Report the GC overhead limit when more than this percentage of time is spent in GC...
    gc_time_limit:                    usize [is_percentage] = 98,
    /// ...and less than this percentage of the heap is free after a full collection.
    gc_heap_free_limit:               usize [is_percentage] = 2,
    /// Number of consecutive collections over the limits before the limit is reported.
    gc_overhead_limit_threshold:      usize [|v: &usize| *v > 0] = 5,
    /// Fail allocations once the GC overhead limit is reached.
    use_gc_overhead_limit:            bool  [always_valid] = true,
    /// How many times an allocation stalls on the GC locker before it gives up.
    gc_locker_retry_allocation_count: usize [always_valid] = 2,
    /// Warn every this many allocation retries. 0 disables the warning.
    queued_allocation_warning_count:  usize [always_valid] = 0,
}

impl Options {
    /// Set options from a string such as `"max_heap_size=256m new_ratio=3"`. Returns true only if
    /// every option is set.
    pub fn set_bulk_from_str(&mut self, options: &str) -> bool {
        let mut all_set = true;
        for opt in options.split_ascii_whitespace() {
            match opt.split_once('=') {
                Some((key, val)) => all_set &= self.set_from_str(key, val),
                None => {
                    warn!("Option {:?} is not in the form of key=value. Ignored.", opt);
                    all_set = false;
                }
            }
        }
        all_set
    }

    /// Set an option by its camelCase name, such as `maxHeapSize`.
    pub fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        trace!("Trying to process option pair: ({}, {})", s, val);

        let mut sr = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                sr.push('_');
                for c in c.to_lowercase() {
                    sr.push(c);
                }
            } else {
                sr.push(c)
            }
        }

        let result = self.set_from_str(sr.as_str(), val);
        trace!("Validation {} for ({})", if result { "passed" } else { "failed" }, sr);
        result
    }

    /// The collector that will actually be built. Asking for adaptive sizing promotes the
    /// concurrent collector to its adaptive variant.
    pub fn effective_collector(&self) -> CollectorSelector {
        match *self.collector {
            CollectorSelector::ConcurrentMarkSweep if *self.use_adaptive_size_policy => {
                CollectorSelector::AdaptiveConcurrentMarkSweep
            }
            selector => selector,
        }
    }
}
