//! Root shard header constants (§6.3). These are compiled-in, not runtime
//! configuration - the header exists so future format revisions can be
//! detected, not so callers can tune it.

/// Current root shard format version.
pub const VERSION: i64 = 2;

/// The only supported key character set: printable ASCII, code points 0x20-0x7E.
pub const KEY_CHARS_ASCII: &str = "ascii";

/// Default/only supported maximum key size in bytes.
pub const MAX_KEY_SIZE: i64 = 4096;

/// True iff every byte of `key` is printable ASCII (0x20..=0x7E).
pub fn is_printable_ascii(key: &str) -> bool {
    key.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
