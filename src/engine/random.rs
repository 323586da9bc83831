//! Thread-local xorshift64* generator used for shard selection.
//!
//! Each thread owns an independent state seeded with a fixed non-zero
//! constant, so the sequence is deterministic per thread. Not suitable for
//! anything security-sensitive.

use std::cell::Cell;
use std::thread_local;


thread_local! {static TL_RNG: Cell<u64> = const { Cell::new(0x9E37_79B9_7F4A_7C15) };}

/// Returns the next pseudo-random `u64` from this thread's generator.
#[inline]
pub fn tl_rand_u64() -> u64 {
    TL_RNG.with(|c| {
        let mut x = c.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        c.set(x);
        x.wrapping_mul(0x2545F4914F6CDD1D)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_values_differ() {
        let a = tl_rand_u64();
        let b = tl_rand_u64();
        assert_ne!(a, b);
    }
}
