//! Randomness used by the packer for tie-breaking and by the gallery for the
//! first-load shuffle.
//!
//! Everything random goes through [`PickSource`] so tests can swap in a
//! deterministic sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait PickSource {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;

    /// Unbiased Fisher-Yates shuffle driven by [`PickSource::pick`].
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.pick(i + 1);
            items.swap(i, j);
        }
    }
}

/// Uniform picks from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomPick<R> {
    rng: R,
}

impl<R: Rng> RandomPick<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomPick<StdRng> {
    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> PickSource for RandomPick<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Always takes the first candidate; shuffling becomes the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPick;

impl PickSource for FirstPick {
    fn pick(&mut self, _len: usize) -> usize {
        0
    }

    fn shuffle<T>(&mut self, _items: &mut [T]) {}
}

/// Replays a fixed list of indices, each reduced modulo the candidate count.
/// Falls back to the first candidate once the script runs out.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedPick {
    script: std::collections::VecDeque<usize>,
}

#[cfg(test)]
impl ScriptedPick {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl PickSource for ScriptedPick {
    fn pick(&mut self, len: usize) -> usize {
        self.script.pop_front().map(|i| i % len).unwrap_or(0)
    }
}
