use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic scene randomness. Every random decision in the scene
/// (spawns, targets, phases) draws from one of these, so a fixed seed and the
/// same control sequence replay identically.
#[derive(Debug, Clone)]
pub struct SceneRng {
    inner: ChaCha8Rng,
}

impl SceneRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.r#gen()
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.inner.r#gen()
    }

    /// Uniform in `[lo, hi)`. An empty range yields `lo`.
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }
}
