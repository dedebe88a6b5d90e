//! The seeded PRNG pool (spec §2.7, §4.7): one instance per named
//! algorithm, all seeded from a single `u64` so a fixed seed makes
//! `specialize` byte-exact reproducible (spec §8 "determinism under
//! seed"). `DeterministicEnumerator` and `FixedSequence` are not
//! genuinely random — they advance a cursor the mutator indexes into its
//! own boundary/fixed-value list — but they're named alongside the true
//! PRNGs as pool members (spec §2.7, §4.7), so they're represented here
//! too.

use rand_core::{RngCore, SeedableRng};
use rand_mt::Mt19937GenRand32;
use rand_pcg::{Lcg64Xsh32, Lcg128Xsl64};
use rand_xorshift::XorShiftRng;

/// Which generator a `Mutator` draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrngAlgorithm {
    /// Default (spec §2 item 7).
    Xorshift128Plus,
    Mt19937,
    Pcg32,
    Pcg64,
    DeterministicEnumerator,
    FixedSequence,
}

impl Default for PrngAlgorithm {
    fn default() -> Self {
        PrngAlgorithm::Xorshift128Plus
    }
}

/// Owns one seeded instance of every algorithm in the pool.
pub struct PrngPool {
    xorshift: XorShiftRng,
    mt19937: Mt19937GenRand32,
    pcg32: Lcg64Xsh32,
    pcg64: Lcg128Xsl64,
    det_cursor: u64,
    fixed_cursor: u64,
}

impl PrngPool {
    pub fn new(seed: u64) -> Self {
        Self {
            xorshift: XorShiftRng::seed_from_u64(seed),
            mt19937: Mt19937GenRand32::seed_from_u64(seed),
            pcg32: Lcg64Xsh32::seed_from_u64(seed),
            pcg64: Lcg128Xsl64::seed_from_u64(seed),
            det_cursor: 0,
            fixed_cursor: 0,
        }
    }

    /// Draws the next `u64` from `algorithm`. For the two non-random
    /// "generators", this is a monotonically increasing cursor a
    /// mutator uses to index cyclically into its own value list.
    pub fn next_u64(&mut self, algorithm: PrngAlgorithm) -> u64 {
        match algorithm {
            PrngAlgorithm::Xorshift128Plus => self.xorshift.next_u64(),
            PrngAlgorithm::Mt19937 => self.mt19937.next_u64(),
            PrngAlgorithm::Pcg32 => self.pcg32.next_u64(),
            PrngAlgorithm::Pcg64 => self.pcg64.next_u64(),
            PrngAlgorithm::DeterministicEnumerator => {
                let v = self.det_cursor;
                self.det_cursor += 1;
                v
            }
            PrngAlgorithm::FixedSequence => {
                let v = self.fixed_cursor;
                self.fixed_cursor += 1;
                v
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_same_sequence() {
        let mut a = PrngPool::new(42);
        let mut b = PrngPool::new(42);
        for _ in 0..8 {
            assert_eq!(
                a.next_u64(PrngAlgorithm::Xorshift128Plus),
                b.next_u64(PrngAlgorithm::Xorshift128Plus)
            );
        }
    }

    #[test]
    fn deterministic_enumerator_counts_up_from_zero() {
        let mut pool = PrngPool::new(1);
        assert_eq!(pool.next_u64(PrngAlgorithm::DeterministicEnumerator), 0);
        assert_eq!(pool.next_u64(PrngAlgorithm::DeterministicEnumerator), 1);
    }
}
