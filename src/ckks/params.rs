use std::fmt;

use log::{debug, warn};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    util::{decimal, is_power_of_two},
};

/// Parameters of the CKKS scheme.
///
/// * `poly_degree` - ring degree `n`, a power of two of at least 2; there are `n / 2` slots.
/// * `ciph_modulus` - top-level ciphertext modulus `q`.
/// * `big_modulus` - special modulus `P` for relinearization.  It should be at least `q`, otherwise
///   relinearization noise swamps the message.
/// * `scaling_factor` - default scale `Δ`, a power of two with `1 < Δ < q`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "CkksParametersConfig", into = "CkksParametersConfig")]
pub struct CkksParameters {
    poly_degree: usize,
    ciph_modulus: BigInt,
    big_modulus: BigInt,
    scaling_factor: BigInt,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct CkksParametersConfig {
    poly_degree: usize,
    #[serde(with = "decimal")]
    ciph_modulus: BigInt,
    #[serde(with = "decimal")]
    big_modulus: BigInt,
    #[serde(with = "decimal")]
    scaling_factor: BigInt,
}

impl CkksParameters {
    pub fn new(
        poly_degree: usize,
        ciph_modulus: BigInt,
        big_modulus: BigInt,
        scaling_factor: BigInt,
    ) -> Result<Self> {
        if poly_degree < 2 || !poly_degree.is_power_of_two() {
            return Err(Error::invalid_parameters(format!(
                "polynomial degree {} is not a power of two of at least 2",
                poly_degree
            )));
        }
        if !ciph_modulus.is_positive() || !big_modulus.is_positive() {
            return Err(Error::invalid_parameters("moduli must be positive"));
        }
        if !is_power_of_two(&scaling_factor) || scaling_factor <= BigInt::from(1) {
            return Err(Error::invalid_parameters(format!(
                "scaling factor {} is not a power of two greater than 1",
                scaling_factor
            )));
        }
        if scaling_factor >= ciph_modulus {
            return Err(Error::invalid_parameters(format!(
                "scaling factor {} is not smaller than ciphertext modulus {}",
                scaling_factor, ciph_modulus
            )));
        }
        if big_modulus < ciph_modulus {
            warn!(
                "big modulus ({} bits) is smaller than the ciphertext modulus ({} bits); \
                 relinearization will be noisy",
                big_modulus.bits(),
                ciph_modulus.bits()
            );
        }

        let this = Self {
            poly_degree,
            ciph_modulus,
            big_modulus,
            scaling_factor,
        };
        debug!(
            "created CKKS parameters: degree {}, log q = {}, log P = {}, log Δ = {}",
            this.poly_degree,
            this.ciph_modulus.bits(),
            this.big_modulus.bits(),
            this.scaling_factor_bits()
        );
        Ok(this)
    }

    /// Parameters whose moduli and scale are all powers of two.
    pub fn with_bits(
        poly_degree: usize,
        ciph_modulus_bits: u32,
        big_modulus_bits: u32,
        scaling_factor_bits: u32,
    ) -> Result<Self> {
        let one = BigInt::from(1);
        Self::new(
            poly_degree,
            &one << ciph_modulus_bits,
            &one << big_modulus_bits,
            &one << scaling_factor_bits,
        )
    }

    /// Parses parameters from JSON with decimal-string moduli.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid_parameters(e.to_string()))
    }

    pub fn poly_degree(&self) -> usize {
        self.poly_degree
    }

    pub fn num_slots(&self) -> usize {
        self.poly_degree / 2
    }

    pub fn ciph_modulus(&self) -> &BigInt {
        &self.ciph_modulus
    }

    pub fn big_modulus(&self) -> &BigInt {
        &self.big_modulus
    }

    pub fn scaling_factor(&self) -> &BigInt {
        &self.scaling_factor
    }

    /// `Δ` as a float, for encoding at the default scale.
    pub fn scale(&self) -> f64 {
        self.scaling_factor.to_f64().unwrap_or(f64::INFINITY)
    }

    /// `log2(Δ)`.
    pub fn scaling_factor_bits(&self) -> u64 {
        self.scaling_factor.bits() - 1
    }
}

impl TryFrom<CkksParametersConfig> for CkksParameters {
    type Error = Error;

    fn try_from(config: CkksParametersConfig) -> Result<Self> {
        Self::new(
            config.poly_degree,
            config.ciph_modulus,
            config.big_modulus,
            config.scaling_factor,
        )
    }
}

impl From<CkksParameters> for CkksParametersConfig {
    fn from(params: CkksParameters) -> Self {
        Self {
            poly_degree: params.poly_degree,
            ciph_modulus: params.ciph_modulus,
            big_modulus: params.big_modulus,
            scaling_factor: params.scaling_factor,
        }
    }
}

impl fmt::Display for CkksParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Encryption parameters")?;
        writeln!(f, "\tpolynomial degree: {}", self.poly_degree)?;
        writeln!(f, "\tciphertext modulus size: {} bits", self.ciph_modulus.bits())?;
        writeln!(f, "\tbig modulus size: {} bits", self.big_modulus.bits())?;
        write!(f, "\tscaling factor size: {} bits", self.scaling_factor_bits())
    }
}
