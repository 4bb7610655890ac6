use std::fmt;

use log::debug;
use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    util::decimal,
};

/// Parameters of the BFV scheme: ring degree `n`, plaintext modulus `t` and ciphertext modulus `q`.
///
/// Deserialization runs the same validation as [`BfvParameters::new`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "BfvParametersConfig", into = "BfvParametersConfig")]
pub struct BfvParameters {
    poly_degree: usize,
    plain_modulus: BigInt,
    ciph_modulus: BigInt,
    scaling_factor: BigInt,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BfvParametersConfig {
    poly_degree: usize,
    #[serde(with = "decimal")]
    plain_modulus: BigInt,
    #[serde(with = "decimal")]
    ciph_modulus: BigInt,
}

impl BfvParameters {
    pub fn new(poly_degree: usize, plain_modulus: BigInt, ciph_modulus: BigInt) -> Result<Self> {
        if poly_degree == 0 || !poly_degree.is_power_of_two() {
            return Err(Error::invalid_parameters(format!(
                "polynomial degree {} is not a power of two",
                poly_degree
            )));
        }
        if !plain_modulus.is_positive() || !ciph_modulus.is_positive() {
            return Err(Error::invalid_parameters("moduli must be positive"));
        }
        if plain_modulus >= ciph_modulus {
            return Err(Error::invalid_parameters(format!(
                "plaintext modulus {} is not smaller than ciphertext modulus {}",
                plain_modulus, ciph_modulus
            )));
        }

        let scaling_factor = &ciph_modulus / &plain_modulus;
        let this = Self {
            poly_degree,
            plain_modulus,
            ciph_modulus,
            scaling_factor,
        };
        debug!("created BFV parameters: {:?}", this);
        Ok(this)
    }

    /// Parses parameters from JSON, e.g.
    /// `{"poly_degree": 16, "plain_modulus": "256", "ciph_modulus": "8000000000000"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid_parameters(e.to_string()))
    }

    pub fn poly_degree(&self) -> usize {
        self.poly_degree
    }

    pub fn plain_modulus(&self) -> &BigInt {
        &self.plain_modulus
    }

    pub fn ciph_modulus(&self) -> &BigInt {
        &self.ciph_modulus
    }

    /// `Δ = floor(q / t)`.
    pub fn scaling_factor(&self) -> &BigInt {
        &self.scaling_factor
    }
}

impl TryFrom<BfvParametersConfig> for BfvParameters {
    type Error = Error;

    fn try_from(config: BfvParametersConfig) -> Result<Self> {
        Self::new(config.poly_degree, config.plain_modulus, config.ciph_modulus)
    }
}

impl From<BfvParameters> for BfvParametersConfig {
    fn from(params: BfvParameters) -> Self {
        Self {
            poly_degree: params.poly_degree,
            plain_modulus: params.plain_modulus,
            ciph_modulus: params.ciph_modulus,
        }
    }
}

impl fmt::Display for BfvParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Encryption parameters")?;
        writeln!(f, "\tpolynomial degree: {}", self.poly_degree)?;
        writeln!(f, "\tplaintext modulus: {}", self.plain_modulus)?;
        write!(f, "\tciphertext modulus size: {} bits", self.ciph_modulus.bits())
    }
}
