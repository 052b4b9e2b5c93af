//! Pairing-code generation.

use rand::Rng;

/// Length of a pairing code in digits.
pub const CODE_LEN: usize = 6;

/// Number of distinct codes. Small enough to type, large enough that
/// collisions among concurrently-pending codes are vanishingly rare.
pub const CODE_SPACE: u32 = 1_000_000;

/// Generate one candidate code. Uniqueness among live sessions is the
/// registry's job, not this function's.
pub fn generate() -> String {
    let n = rand::thread_rng().gen_range(0..CODE_SPACE);
    format!("{n:06}")
}
