//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: Every stochastic decision in the simulator (damage rolls, jamming,
//! transmission errors, scenario placement) MUST go through [`RandomSource`].

mod xorshift;

pub use xorshift::RngManager;

/// Injectable source of uniform randomness
///
/// Stochastic decisions take `&mut dyn RandomSource` instead of owning a
/// generator, so tests can force or suppress outcomes with a scripted source.
pub trait RandomSource {
    /// Uniform sample in `[0.0, 1.0)`
    fn next_f64(&mut self) -> f64;

    /// Bernoulli trial
    ///
    /// Always consumes exactly one sample so that the random stream does not
    /// depend on configured probabilities.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Uniform sample in `[min, max)`
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform index in `[0, len)`
    ///
    /// # Panics
    /// Panics if `len` is zero.
    fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick from an empty range");
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }
}

/// Source that replays a fixed list of samples, cycling when exhausted
///
/// # Example
/// ```
/// use satlink_core::rng::{RandomSource, ScriptedSource};
///
/// let mut rng = ScriptedSource::new(vec![0.0, 0.99]);
/// assert!(rng.chance(0.5));
/// assert!(!rng.chance(0.5));
/// assert!(rng.chance(0.5)); // wraps around
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// # Panics
    /// Panics if `samples` is empty or any sample is outside `[0.0, 1.0)`.
    pub fn new(samples: Vec<f64>) -> Self {
        assert!(!samples.is_empty(), "scripted source needs at least one sample");
        assert!(
            samples.iter().all(|s| (0.0..1.0).contains(s)),
            "scripted samples must be in [0.0, 1.0)"
        );
        Self { samples, cursor: 0 }
    }

    /// Source whose every Bernoulli trial fails for probabilities below 1
    pub fn never() -> Self {
        Self::new(vec![0.999_999_999])
    }

    /// Source whose every Bernoulli trial with positive probability succeeds
    pub fn always() -> Self {
        Self::new(vec![0.0])
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        sample
    }
}
