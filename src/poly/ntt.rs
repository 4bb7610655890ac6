//! Exact negacyclic convolution of big-integer coefficient vectors.
//!
//! The operands are reduced modulo several word-sized primes `p = 1 mod 2n`, multiplied there via
//! a twisted number-theoretic transform, and the exact integer result is recovered with the
//! Chinese remainder theorem.

use std::mem;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::ToPrimitive;

/// All primes are drawn from `(2^61, 2^62)`.
const PRIME_BITS: u32 = 62;

/// A prime `p = 1 mod 2n` together with the powers of a primitive `2n`-th root of unity `psi`.
#[derive(Clone, Debug)]
pub struct NttPrime {
    modulus: u64,
    psi_powers: Vec<u64>,
    psi_inverse_powers: Vec<u64>,
    /// Powers of `omega = psi^2`, a primitive `n`-th root of unity.
    root_powers: Vec<u64>,
    degree_inverse: u64,
}

impl NttPrime {
    pub fn new(modulus: u64, degree: usize) -> Self {
        debug_assert!(degree >= 2);
        debug_assert!(degree.count_ones() == 1);
        debug_assert!((modulus - 1) % (2 * degree as u64) == 0);

        let n = degree as u64;
        let exponent = (modulus - 1) / (2 * n);
        let mut generator = 2;
        let psi = loop {
            let candidate = pow_mod(generator, exponent, modulus);
            // psi has order exactly 2n iff psi^n = -1.
            if pow_mod(candidate, n, modulus) == modulus - 1 {
                break candidate;
            }
            generator += 1;
        };
        let psi_inverse = pow_mod(psi, modulus - 2, modulus);
        let omega = mul_mod(psi, psi, modulus);

        Self {
            modulus,
            psi_powers: powers(psi, degree, modulus),
            psi_inverse_powers: powers(psi_inverse, degree, modulus),
            root_powers: powers(omega, degree, modulus),
            degree_inverse: pow_mod(n % modulus, modulus - 2, modulus),
        }
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Computes `lhs * rhs` in `\mathbb{Z}_p[X]/(X^n + 1)`.
    pub fn negacyclic_multiply(&self, lhs: &[u64], rhs: &[u64]) -> Vec<u64> {
        let p = self.modulus;
        let twist = |input: &[u64]| -> Vec<u64> {
            input
                .iter()
                .zip(&self.psi_powers)
                .map(|(&x, &psi)| mul_mod(x, psi, p))
                .collect()
        };

        let mut output = fast_fourier_transform(&self.root_powers, false, twist(lhs), p);
        let rhs = fast_fourier_transform(&self.root_powers, false, twist(rhs), p);
        for (dst, src) in output.iter_mut().zip(rhs.iter()) {
            *dst = mul_mod(*dst, *src, p);
        }
        let convoluted = fast_fourier_transform(&self.root_powers, true, output, p);

        convoluted
            .iter()
            .zip(&self.psi_inverse_powers)
            .map(|(&x, &psi_inverse)| mul_mod(mul_mod(x, self.degree_inverse, p), psi_inverse, p))
            .collect()
    }
}

/// Stockham-style radix-2 transform over `\mathbb{Z}_p`.  The inverse direction omits the final
/// scaling by `n^{-1}`.
pub fn fast_fourier_transform(
    root_powers: &[u64],
    inverse: bool,
    mut input: Vec<u64>,
    modulus: u64,
) -> Vec<u64> {
    let n = input.len();
    debug_assert!(n >= 2);
    debug_assert!(n.count_ones() == 1);

    let mut output = vec![0; n];
    for shift in 0..n.trailing_zeros() {
        let size = 1 << shift;
        let count = n >> (shift + 1);
        for i in 0..count {
            for j in 0..size {
                let lhs = input[size * i + j];
                let mut rhs = input[size * i + j + n / 2];
                if j != 0 {
                    let root_power_index = if inverse {
                        count * (n - j) % n
                    } else {
                        count * j % n
                    };
                    rhs = mul_mod(rhs, root_powers[root_power_index], modulus);
                }
                output[size * (2 * i) + j] = add_mod(lhs, rhs, modulus);
                output[size * (2 * i + 1) + j] = sub_mod(lhs, rhs, modulus);
            }
        }
        mem::swap(&mut output, &mut input);
    }

    input
}

/// Computes the exact negacyclic product of two integer vectors of the same power-of-two length.
pub fn negacyclic_multiply(lhs: &[BigInt], rhs: &[BigInt]) -> Vec<BigInt> {
    let n = lhs.len();
    debug_assert_eq!(n, rhs.len());

    // |result| <= n * |lhs|_inf * |rhs|_inf; one more bit for the sign.
    let bound_bits = max_bits(lhs) + max_bits(rhs) + n.trailing_zeros() as u64 + 2;
    let num_primes = ((bound_bits + PRIME_BITS as u64 - 2) / (PRIME_BITS as u64 - 1)).max(1);
    let primes: Vec<_> = find_primes(n, num_primes as usize)
        .into_iter()
        .map(|p| NttPrime::new(p, n))
        .collect();

    let residues: Vec<Vec<u64>> = primes
        .iter()
        .map(|prime| {
            let p = BigInt::from(prime.modulus());
            let lhs = reduce_all(lhs, &p);
            let rhs = reduce_all(rhs, &p);
            prime.negacyclic_multiply(&lhs, &rhs)
        })
        .collect();

    let product: BigInt = primes.iter().map(|prime| BigInt::from(prime.modulus())).product();
    let half = &product >> 1;
    let crt_coefficients: Vec<BigInt> = primes
        .iter()
        .map(|prime| {
            let p = prime.modulus();
            let cofactor = &product / p;
            let cofactor_residue = (&cofactor % p).to_u64().unwrap_or_default();
            cofactor * pow_mod(cofactor_residue, p - 2, p)
        })
        .collect();

    (0..n)
        .map(|i| {
            let value: BigInt = residues
                .iter()
                .zip(&crt_coefficients)
                .map(|(residue, coefficient)| coefficient * residue[i])
                .sum();
            let value = value.mod_floor(&product);
            if value > half {
                value - &product
            } else {
                value
            }
        })
        .collect()
}

/// Returns `count` distinct primes `p = 1 mod 2 * degree` below `2^62`, in descending order.
pub fn find_primes(degree: usize, count: usize) -> Vec<u64> {
    let step = 2 * degree as u64;
    let mut candidate = ((1u64 << PRIME_BITS) - 2) / step * step + 1;
    let mut primes = Vec::with_capacity(count);
    while primes.len() < count {
        if is_prime(candidate) {
            primes.push(candidate);
        }
        candidate -= step;
    }
    primes
}

/// Deterministic Miller-Rabin test for 64-bit integers.
pub fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    if n < 2 {
        return false;
    }
    for p in WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for a in WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn max_bits(values: &[BigInt]) -> u64 {
    values.iter().map(BigInt::bits).max().unwrap_or(0)
}

fn reduce_all(values: &[BigInt], modulus: &BigInt) -> Vec<u64> {
    values
        .iter()
        .map(|c| c.mod_floor(modulus).to_u64().unwrap_or_default())
        .collect()
}

fn powers(base: u64, count: usize, modulus: u64) -> Vec<u64> {
    let mut result = Vec::with_capacity(count);
    let mut power = 1 % modulus;
    for _ in 0..count {
        result.push(power);
        power = mul_mod(power, base, modulus);
    }
    result
}

fn add_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 + b as u128) % modulus as u128) as u64
}

fn sub_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 + modulus as u128 - b as u128) % modulus as u128) as u64
}

fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

fn pow_mod(mut base: u64, mut exponent: u64, modulus: u64) -> u64 {
    let mut result = 1 % modulus;
    base %= modulus;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exponent >>= 1;
    }
    result
}
