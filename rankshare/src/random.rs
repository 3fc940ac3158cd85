//! Random sources that stay reproducible across any number of ranks.
//!
//! [`PhasedRandom`] interleaves one logical sequence across ranks: with `P`
//! ranks seeded identically, draw `n` on rank `r` is draw `r + n * P` of the
//! undivided sequence. No communication happens while drawing.
//!
//! Once a source is wrapped, draw from it only through the wrapper. Drawing
//! from the base directly, or mixing phased and unphased streams over the
//! same base, breaks the non-overlap guarantee.

use crate::comm::Communicator;
use crate::error::{RankshareError, Result};
use crate::types::Rank;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A reseedable stream of uniform draws in `[0, 1)` with exportable state.
pub trait RandomSource {
    /// Next draw in `[0, 1)`.
    fn random(&mut self) -> f64;

    /// Reset the stream from `seed`.
    fn seed(&mut self, seed: u64);

    /// Opaque snapshot of the stream position.
    fn state(&self) -> Vec<u8>;

    /// Restore a snapshot produced by [`state`](Self::state).
    fn set_state(&mut self, state: &[u8]) -> Result<()>;
}

/// [`RandomSource`] backed by ChaCha8.
///
/// State layout: seed (32 bytes) | stream (u64 LE) | word position (u128 LE).
#[derive(Debug, Clone)]
pub struct ChaChaSource {
    rng: ChaCha8Rng,
}

impl ChaChaSource {
    pub const STATE_LEN: usize = 32 + 8 + 16;

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Raw 32-bit output, for callers that need integers from the same stream.
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }
}

impl Default for ChaChaSource {
    fn default() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for ChaChaSource {
    fn random(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn state(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::STATE_LEN);
        out.extend_from_slice(&self.rng.get_seed());
        out.extend_from_slice(&self.rng.get_stream().to_le_bytes());
        out.extend_from_slice(&self.rng.get_word_pos().to_le_bytes());
        out
    }

    fn set_state(&mut self, state: &[u8]) -> Result<()> {
        if state.len() != Self::STATE_LEN {
            return Err(RankshareError::InvalidRandomState {
                expected: Self::STATE_LEN,
                actual: state.len(),
            });
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&state[..32]);
        let mut stream = [0u8; 8];
        stream.copy_from_slice(&state[32..40]);
        let mut word_pos = [0u8; 16];
        word_pos.copy_from_slice(&state[40..]);

        let mut rng = ChaCha8Rng::from_seed(seed);
        rng.set_stream(u64::from_le_bytes(stream));
        rng.set_word_pos(u128::from_le_bytes(word_pos));
        self.rng = rng;
        Ok(())
    }
}

/// Phase-shifted view of a shared random sequence.
///
/// Construction discards `rank` draws; every [`random`](RandomSource::random)
/// returns the next draw and discards `process_count - 1` more. With
/// `process_count == 1` this is a pass-through.
///
/// `PhasedRandom` is itself a [`RandomSource`], so a phased stream can be
/// phased again for nested groups.
#[derive(Debug, Clone)]
pub struct PhasedRandom<R> {
    base: R,
    process_count: u32,
    rank: Rank,
}

impl<R: RandomSource> PhasedRandom<R> {
    /// Wrap `base` for `rank` out of `process_count` ranks.
    ///
    /// # Panics
    /// If `process_count == 0` or `rank >= process_count`.
    pub fn new(base: R, process_count: u32, rank: Rank) -> Self {
        assert!(process_count >= 1, "process_count must be at least 1");
        assert!(
            rank < process_count,
            "rank {rank} out of range for {process_count} processes"
        );
        let mut phased = Self {
            base,
            process_count,
            rank,
        };
        phased.discard(rank);
        phased
    }

    /// Wrap `base` using the rank and size of `comm`.
    pub fn for_comm(base: R, comm: &dyn Communicator) -> Self {
        Self::new(base, comm.size(), comm.rank())
    }

    pub fn process_count(&self) -> u32 {
        self.process_count
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Release the base source.
    pub fn into_inner(self) -> R {
        self.base
    }

    fn discard(&mut self, n: u32) {
        for _ in 0..n {
            self.base.random();
        }
    }
}

impl<R: RandomSource> RandomSource for PhasedRandom<R> {
    fn random(&mut self) -> f64 {
        let r = self.base.random();
        self.discard(self.process_count - 1);
        r
    }

    /// Reseed the base and re-apply this rank's offset, so the stream stays
    /// phase-correct after reseeding.
    fn seed(&mut self, seed: u64) {
        self.base.seed(seed);
        self.discard(self.rank);
    }

    fn state(&self) -> Vec<u8> {
        self.base.state()
    }

    fn set_state(&mut self, state: &[u8]) -> Result<()> {
        self.base.set_state(state)
    }
}
