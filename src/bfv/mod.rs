//! The Brakerski/Fan-Vercauteren scheme for exact arithmetic on integer polynomials modulo `t`.
//!
//! A plaintext `m` is encrypted as `(c0, c1)` with `c0 + c1 * s = Δ * m + e (mod q)`, where
//! `Δ = floor(q / t)`.  Decryption recovers `m` as long as the noise `e` stays below `Δ / 2`.

pub mod decryptor;
pub mod encryptor;
pub mod evaluator;
pub mod keygen;
pub mod params;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    poly::Polynomial,
    util::decimal,
};

pub use self::{
    decryptor::BfvDecryptor, encryptor::BfvEncryptor, evaluator::BfvEvaluator,
    keygen::BfvKeyGenerator, params::BfvParameters,
};

/// A polynomial with coefficients in `[0, t)`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Plaintext {
    pub(crate) poly: Polynomial,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Ciphertext {
    pub(crate) c0: Polynomial,
    pub(crate) c1: Polynomial,
}

/// Keys for turning the quadratic term `c2` of a product back into a linear one.
///
/// `keys[i] = (-a_i * s + e_i + base^i * s^2, a_i) mod q`.
///
/// Deserialization rejects a base below 2 and an empty key list.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "RelinKeyConfig", into = "RelinKeyConfig")]
pub struct RelinKey {
    pub(crate) base: BigInt,
    pub(crate) keys: Vec<(Polynomial, Polynomial)>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct RelinKeyConfig {
    #[serde(with = "decimal")]
    base: BigInt,
    keys: Vec<(Polynomial, Polynomial)>,
}

impl Plaintext {
    /// Creates a plaintext from exactly `n` coefficients, reduced into `[0, t)`.
    pub fn new(params: &BfvParameters, coeffs: &[i64]) -> Result<Self> {
        Self::from_poly(params, Polynomial::from_i64s(coeffs))
    }

    pub fn from_poly(params: &BfvParameters, poly: Polynomial) -> Result<Self> {
        poly.check_degree(params.poly_degree())?;
        Ok(Self {
            poly: poly.reduce(params.plain_modulus()),
        })
    }

    /// The constant plaintext `value mod t`.
    pub fn constant(params: &BfvParameters, value: i64) -> Self {
        let poly = Polynomial::constant(params.poly_degree(), BigInt::from(value));
        Self {
            poly: poly.reduce(params.plain_modulus()),
        }
    }

    pub fn poly(&self) -> &Polynomial {
        &self.poly
    }

    pub fn coeffs(&self) -> &[BigInt] {
        self.poly.coeffs()
    }
}

impl Ciphertext {
    pub fn c0(&self) -> &Polynomial {
        &self.c0
    }

    pub fn c1(&self) -> &Polynomial {
        &self.c1
    }

    pub(crate) fn check_degree(&self, expected: usize) -> Result<()> {
        self.c0.check_degree(expected)?;
        self.c1.check_degree(expected)
    }
}

impl TryFrom<RelinKeyConfig> for RelinKey {
    type Error = Error;

    fn try_from(config: RelinKeyConfig) -> Result<Self> {
        if config.base < BigInt::from(2) {
            return Err(Error::invalid_parameters(format!(
                "relinearization base {} is smaller than 2",
                config.base
            )));
        }
        if config.keys.is_empty() {
            return Err(Error::invalid_parameters("relinearization key has no levels"));
        }
        Ok(Self {
            base: config.base,
            keys: config.keys,
        })
    }
}

impl From<RelinKey> for RelinKeyConfig {
    fn from(key: RelinKey) -> Self {
        Self {
            base: key.base,
            keys: key.keys,
        }
    }
}

impl RelinKey {
    pub fn base(&self) -> &BigInt {
        &self.base
    }

    pub fn num_levels(&self) -> usize {
        self.keys.len()
    }
}
