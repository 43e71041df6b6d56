//! Uniform reordering of samples before encoding.

use rand::Rng;
use rand::seq::SliceRandom;

/// Consume `pool` and return it in a uniformly random order.
pub fn shuffle<T, R: Rng>(mut pool: Vec<T>, rng: &mut R) -> Vec<T> {
    pool.shuffle(rng);
    pool
}
