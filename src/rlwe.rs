//! Key material and encryption primitives shared by the BFV and CKKS schemes.

use num_bigint::BigInt;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    poly::Polynomial,
    sampling::{
        sample_centered_binomial, sample_hamming_weight, sample_triangle, sample_uniform,
        ERROR_ITERATIONS,
    },
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SecretKey {
    pub(crate) s: Polynomial,
}

/// Encryption of zero under the secret key: `p0 + p1 * s = e (mod q)`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PublicKey {
    pub(crate) p0: Polynomial,
    pub(crate) p1: Polynomial,
}

impl SecretKey {
    /// Samples a secret with ternary coefficients.
    pub fn gen_ternary<R>(ring_degree: usize, rng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        Self {
            s: Polynomial::from_i64s(&sample_triangle(rng, ring_degree)),
        }
    }

    /// Samples a secret with exactly `weight` coefficients in `{-1, 1}` and all others zero.
    pub fn gen_hamming_weight<R>(ring_degree: usize, weight: usize, rng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        Self {
            s: Polynomial::from_i64s(&sample_hamming_weight(rng, ring_degree, weight)),
        }
    }

    pub fn poly(&self) -> &Polynomial {
        &self.s
    }

    pub fn ring_degree(&self) -> usize {
        self.s.ring_degree()
    }
}

impl PublicKey {
    pub fn gen<R>(secret_key: &SecretKey, modulus: &BigInt, rng: &mut R) -> Result<Self>
    where
        R: CryptoRng + RngCore,
    {
        let zero = Polynomial::zero(secret_key.ring_degree());
        let (p0, p1) = gen_switching_pair(secret_key, &zero, modulus, rng)?;
        Ok(Self { p0, p1 })
    }

    pub fn p0(&self) -> &Polynomial {
        &self.p0
    }

    pub fn p1(&self) -> &Polynomial {
        &self.p1
    }

    pub fn ring_degree(&self) -> usize {
        self.p0.ring_degree()
    }
}

/// Returns `(-a * s + e + target, a) mod modulus` for uniform `a` and fresh noise `e`, i.e. a pair
/// whose phase under `s` is `target + e`.
pub(crate) fn gen_switching_pair<R>(
    secret_key: &SecretKey,
    target: &Polynomial,
    modulus: &BigInt,
    rng: &mut R,
) -> Result<(Polynomial, Polynomial)>
where
    R: CryptoRng + RngCore,
{
    let n = secret_key.ring_degree();
    let a = Polynomial::new(sample_uniform(rng, n, modulus));
    let e = Polynomial::from_i64s(&sample_centered_binomial(rng, n, ERROR_ITERATIONS));

    let mut first = -a.multiply(&secret_key.s, Some(modulus))?;
    first += &e;
    let first = first.add(target, Some(modulus))?;
    Ok((first, a))
}

/// Encrypts an already scaled message: `c0 = p0 * u + e1 + scaled`, `c1 = p1 * u + e2`, both
/// modulo `modulus`.
pub(crate) fn encrypt_scaled<R>(
    public_key: &PublicKey,
    scaled: &Polynomial,
    modulus: &BigInt,
    rng: &mut R,
) -> Result<(Polynomial, Polynomial)>
where
    R: CryptoRng + RngCore,
{
    let n = public_key.ring_degree();
    scaled.check_degree(n)?;

    let u = Polynomial::from_i64s(&sample_triangle(rng, n));
    let e1 = Polynomial::from_i64s(&sample_centered_binomial(rng, n, ERROR_ITERATIONS));
    let e2 = Polynomial::from_i64s(&sample_centered_binomial(rng, n, ERROR_ITERATIONS));

    let mut c0 = public_key.p0.multiply(&u, Some(modulus))?;
    c0 += &e1;
    let c0 = c0.add(scaled, Some(modulus))?;

    let c1 = public_key
        .p1
        .multiply(&u, Some(modulus))?
        .add(&e2, Some(modulus))?;

    Ok((c0, c1))
}

/// Computes `c0 + c1 * s mod modulus` with coefficients in `[0, modulus)`.
pub(crate) fn phase(
    c0: &Polynomial,
    c1: &Polynomial,
    secret_key: &SecretKey,
    modulus: &BigInt,
) -> Result<Polynomial> {
    c1.multiply(&secret_key.s, Some(modulus))?
        .add(c0, Some(modulus))
}
