use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// Random source shared by everything a level decides at random. Seeded once.
#[derive(Clone, Debug)]
pub struct Rng {
    inner: StdRng,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }

    /// Uniform over the closed interval `[min, max]`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.inner.random_range(min..=max)
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.inner.random_range(0..len)
    }
}
