//! The Cheon-Kim-Kim-Song scheme for approximate arithmetic on vectors of complex numbers.
//!
//! Ciphertexts track their own scale and modulus: multiplication multiplies scales, and
//! [`CkksEvaluator::rescale`] divides both scale and modulus by a factor to keep the scale near `Δ`.

pub mod decryptor;
pub mod encoder;
pub mod encryptor;
pub mod evaluator;
pub mod fft;
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
    decryptor::CkksDecryptor, encoder::CkksEncoder, encryptor::CkksEncryptor,
    evaluator::CkksEvaluator, keygen::CkksKeyGenerator, params::CkksParameters,
};

/// An encoded message: integer coefficients that represent the message times `scaling_factor`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "PlaintextConfig", into = "PlaintextConfig")]
pub struct Plaintext {
    pub(crate) poly: Polynomial,
    pub(crate) scaling_factor: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct PlaintextConfig {
    poly: Polynomial,
    scaling_factor: f64,
}

/// Deserialization requires a modulus greater than 1 and a finite scale of at least 1.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "CiphertextConfig", into = "CiphertextConfig")]
pub struct Ciphertext {
    pub(crate) c0: Polynomial,
    pub(crate) c1: Polynomial,
    pub(crate) scaling_factor: f64,
    pub(crate) modulus: BigInt,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct CiphertextConfig {
    c0: Polynomial,
    c1: Polynomial,
    scaling_factor: f64,
    #[serde(with = "decimal")]
    modulus: BigInt,
}

/// Switching key from `s^2` to `s`, generated modulo `P * q`:
/// `p0 + p1 * s = P * s^2 + e (mod P * q)`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelinKey {
    pub(crate) p0: Polynomial,
    pub(crate) p1: Polynomial,
}

/// Scales below 1 cannot carry any precision, and non-finite ones round every coefficient to 0.
pub(crate) fn check_scaling_factor(scaling_factor: f64) -> Result<()> {
    if scaling_factor.is_finite() && scaling_factor >= 1.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameters(format!(
            "scaling factor {} is not a finite number of at least 1",
            scaling_factor
        )))
    }
}

impl Plaintext {
    pub fn new(poly: Polynomial, scaling_factor: f64) -> Result<Self> {
        check_scaling_factor(scaling_factor)?;
        Ok(Self {
            poly,
            scaling_factor,
        })
    }

    pub fn poly(&self) -> &Polynomial {
        &self.poly
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }
}

impl TryFrom<PlaintextConfig> for Plaintext {
    type Error = Error;

    fn try_from(config: PlaintextConfig) -> Result<Self> {
        Self::new(config.poly, config.scaling_factor)
    }
}

impl From<Plaintext> for PlaintextConfig {
    fn from(plaintext: Plaintext) -> Self {
        Self {
            poly: plaintext.poly,
            scaling_factor: plaintext.scaling_factor,
        }
    }
}

impl TryFrom<CiphertextConfig> for Ciphertext {
    type Error = Error;

    fn try_from(config: CiphertextConfig) -> Result<Self> {
        check_scaling_factor(config.scaling_factor)?;
        if config.modulus <= BigInt::from(1) {
            return Err(Error::invalid_parameters(format!(
                "ciphertext modulus {} is not greater than 1",
                config.modulus
            )));
        }
        Ok(Self {
            c0: config.c0,
            c1: config.c1,
            scaling_factor: config.scaling_factor,
            modulus: config.modulus,
        })
    }
}

impl From<Ciphertext> for CiphertextConfig {
    fn from(ciphertext: Ciphertext) -> Self {
        Self {
            c0: ciphertext.c0,
            c1: ciphertext.c1,
            scaling_factor: ciphertext.scaling_factor,
            modulus: ciphertext.modulus,
        }
    }
}

impl Ciphertext {
    pub fn c0(&self) -> &Polynomial {
        &self.c0
    }

    pub fn c1(&self) -> &Polynomial {
        &self.c1
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    pub(crate) fn check_degree(&self, expected: usize) -> Result<()> {
        self.c0.check_degree(expected)?;
        self.c1.check_degree(expected)
    }
}
