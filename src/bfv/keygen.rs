use log::debug;
use num_bigint::BigInt;
use num_traits::One;
use rand::{CryptoRng, RngCore};

use super::{BfvParameters, RelinKey};
use crate::{
    error::{Error, Result},
    rlwe::{self, PublicKey, SecretKey},
};

/// Generates and holds the secret, public and relinearization keys for one parameter set.
#[derive(Clone, Debug)]
pub struct BfvKeyGenerator {
    params: BfvParameters,
    secret_key: SecretKey,
    public_key: PublicKey,
    relin_key: RelinKey,
}

impl BfvKeyGenerator {
    /// Generates keys with the default relinearization base `ceil(sqrt(q))`.
    pub fn new<R>(params: &BfvParameters, rng: &mut R) -> Result<Self>
    where
        R: CryptoRng + RngCore,
    {
        let base = default_relin_base(params.ciph_modulus());
        Self::with_relin_base(params, &base, rng)
    }

    pub fn with_relin_base<R>(params: &BfvParameters, base: &BigInt, rng: &mut R) -> Result<Self>
    where
        R: CryptoRng + RngCore,
    {
        let secret_key = SecretKey::gen_ternary(params.poly_degree(), rng);
        let public_key = PublicKey::gen(&secret_key, params.ciph_modulus(), rng)?;
        let relin_key = gen_relin_key(params, &secret_key, base, rng)?;
        Ok(Self {
            params: params.clone(),
            secret_key,
            public_key,
            relin_key,
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn relin_key(&self) -> &RelinKey {
        &self.relin_key
    }

    /// Generates another relinearization key for the held secret, using a different base.  Smaller
    /// bases give more levels and less noise growth per relinearization.
    pub fn relin_key_with_base<R>(&self, base: &BigInt, rng: &mut R) -> Result<RelinKey>
    where
        R: CryptoRng + RngCore,
    {
        gen_relin_key(&self.params, &self.secret_key, base, rng)
    }
}

/// `ceil(sqrt(q))`, so that every coefficient of `c2` splits into two digits.
pub fn default_relin_base(ciph_modulus: &BigInt) -> BigInt {
    let root = ciph_modulus.sqrt();
    if &root * &root < *ciph_modulus {
        root + 1
    } else {
        root
    }
}

/// The number of base-`base` digits needed for values in `[0, q)`, i.e. `floor(log_base(q)) + 1`.
pub fn num_relin_levels(ciph_modulus: &BigInt, base: &BigInt) -> usize {
    let mut levels = 0;
    let mut power = BigInt::one();
    while power <= *ciph_modulus {
        power *= base;
        levels += 1;
    }
    levels
}

fn gen_relin_key<R>(
    params: &BfvParameters,
    secret_key: &SecretKey,
    base: &BigInt,
    rng: &mut R,
) -> Result<RelinKey>
where
    R: CryptoRng + RngCore,
{
    if *base < BigInt::from(2) {
        return Err(Error::invalid_parameters(format!(
            "relinearization base {} is smaller than 2",
            base
        )));
    }

    let q = params.ciph_modulus();
    let num_levels = num_relin_levels(q, base);
    let s_squared = secret_key.s.multiply(&secret_key.s, Some(q))?;

    let mut power = BigInt::one();
    let mut keys = Vec::with_capacity(num_levels);
    for _ in 0..num_levels {
        let target = s_squared.scalar_multiply(&power, Some(q));
        keys.push(rlwe::gen_switching_pair(secret_key, &target, q, rng)?);
        power = (power * base) % q;
    }

    debug!(
        "generated BFV relinearization key with base {} and {} levels",
        base, num_levels
    );
    Ok(RelinKey {
        base: base.clone(),
        keys,
    })
}
