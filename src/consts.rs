//! Named constants from the external interface contract. Kept in one place so the
//! mode encoder, header codec, and upper-bound sizing agree on the same numbers.

/// Smallest supported binary exponent; anything below this marks reversible mode.
pub const MIN_EXP: i32 = -1074;

/// Per-block upper bound on the number of bits a single block may occupy.
pub const MAX_BITS: u32 = 16654;

/// Largest legal value of `maxprec`.
pub const MAX_PREC: u32 = 64;

/// Largest mode value representable in the 12-bit short encoding.
pub const MODE_SHORT_MAX: u64 = 4094;

/// Width, in bits, of the stream magic field.
pub const MAGIC_BITS: u32 = 32;

/// Width, in bits, of the classical-header metadata word.
pub const META_BITS: u32 = 52;

/// Width, in bits, of one stream word; determines flush/align granularity.
pub const STREAM_WORD_BITS: u32 = 64;

/// Current codec version, stored as the low byte of the magic field.
pub const CODEC_VERSION: u8 = 1;
