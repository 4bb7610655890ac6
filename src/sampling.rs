//! Random coefficient vectors for keys, encryption randomness and noise.
//!
//! Every sampler takes the randomness source explicitly, so callers can use a seeded
//! `ChaCha20Rng` for reproducible runs.

use num_bigint::{BigInt, RandBigInt};
use num_traits::Zero;
use rand::{seq::index, CryptoRng, Rng, RngCore};

/// The discrete gaussian distribution of variance 10 is approximated by the centered binomial
/// distribution of variance 10.  So the number of iterations and the maximum magnitude is 20.
pub const ERROR_ITERATIONS: usize = 20;

/// Samples `len` values from the centered binomial distribution `B(2 * iterations, 1/2) -
/// iterations`.  `iterations` must not exceed 32.
pub fn sample_centered_binomial<R>(rng: &mut R, len: usize, iterations: usize) -> Vec<i64>
where
    R: CryptoRng + RngCore,
{
    (0..len)
        .map(|_| sample_binomial(&mut *rng, iterations) as i64 - iterations as i64)
        .collect()
}

/// Samples `len` values from `{-1, 0, 1}` with probabilities `1/4, 1/2, 1/4`.
pub fn sample_triangle<R>(rng: &mut R, len: usize) -> Vec<i64>
where
    R: CryptoRng + RngCore,
{
    sample_centered_binomial(rng, len, 1)
}

/// Samples a vector of length `len` with exactly `min(weight, len)` nonzero entries, each of which
/// is `-1` or `1` with equal probability.
pub fn sample_hamming_weight<R>(rng: &mut R, len: usize, weight: usize) -> Vec<i64>
where
    R: CryptoRng + RngCore,
{
    let mut result = vec![0; len];
    for position in index::sample(rng, len, weight.min(len)).into_iter() {
        result[position] = if rng.gen::<bool>() { 1 } else { -1 };
    }
    result
}

/// Samples `len` integers uniformly from `[0, modulus)`.
pub fn sample_uniform<R>(rng: &mut R, len: usize, modulus: &BigInt) -> Vec<BigInt>
where
    R: CryptoRng + RngCore,
{
    let zero = BigInt::zero();
    (0..len)
        .map(|_| rng.gen_bigint_range(&zero, modulus))
        .collect()
}

fn sample_binomial(mut rng: impl CryptoRng + RngCore, iterations: usize) -> u32 {
    debug_assert!(2 * iterations <= u64::BITS as usize);
    let mask = match 2 * iterations {
        0 => 0,
        64 => u64::MAX,
        bits => (1u64 << bits) - 1,
    };
    let bits = rng.gen::<u64>() & mask;
    bits.count_ones()
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn centered_binomial_is_bounded() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let samples = sample_centered_binomial(&mut rng, 10_000, ERROR_ITERATIONS);
        assert!(samples.iter().all(|e| e.abs() <= ERROR_ITERATIONS as i64));
        let mean = samples.iter().sum::<i64>() as f64 / samples.len() as f64;
        assert!(mean.abs() < 0.5);
        let variance = samples.iter().map(|&e| (e * e) as f64).sum::<f64>() / samples.len() as f64;
        assert!((variance - 10.0).abs() < 1.0);
    }

    #[test]
    fn triangle_is_ternary() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let samples = sample_triangle(&mut rng, 1000);
        assert!(samples.iter().all(|e| (-1..=1).contains(e)));
        assert!(samples.contains(&-1) && samples.contains(&0) && samples.contains(&1));
    }

    #[test]
    fn hamming_weight_is_exact() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let samples = sample_hamming_weight(&mut rng, 64, 16);
        assert_eq!(samples.iter().filter(|&&e| e != 0).count(), 16);
        assert!(samples.iter().all(|e| (-1..=1).contains(e)));
        let saturated = sample_hamming_weight(&mut rng, 4, 10);
        assert!(saturated.iter().all(|&e| e == 1 || e == -1));
    }

    #[test]
    fn uniform_is_in_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let modulus = BigInt::from(1000);
        let samples = sample_uniform(&mut rng, 1000, &modulus);
        assert!(samples.iter().all(|c| *c >= BigInt::from(0) && *c < modulus));
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let modulus = BigInt::from(1) << 100;
        let first = sample_uniform(&mut ChaCha20Rng::seed_from_u64(4), 8, &modulus);
        let second = sample_uniform(&mut ChaCha20Rng::seed_from_u64(4), 8, &modulus);
        assert_eq!(first, second);

        let sample_all = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (
                sample_centered_binomial(&mut rng, 16, ERROR_ITERATIONS),
                sample_triangle(&mut rng, 16),
                sample_hamming_weight(&mut rng, 16, 4),
            )
        };
        assert_eq!(sample_all(5), sample_all(5));
    }
}
