use log::debug;
use rand::{CryptoRng, RngCore};

use super::{CkksParameters, RelinKey};
use crate::{
    error::Result,
    rlwe::{self, PublicKey, SecretKey},
};

/// Generates the secret, public and relinearization keys for one parameter set.
///
/// The secret has Hamming weight `max(1, n / 4)`, which keeps the rounding error of rescaling and
/// relinearization small.
#[derive(Clone, Debug)]
pub struct CkksKeyGenerator {
    secret_key: SecretKey,
    public_key: PublicKey,
    relin_key: RelinKey,
}

impl CkksKeyGenerator {
    pub fn new<R>(params: &CkksParameters, rng: &mut R) -> Result<Self>
    where
        R: CryptoRng + RngCore,
    {
        let n = params.poly_degree();
        let secret_key = SecretKey::gen_hamming_weight(n, (n / 4).max(1), rng);
        let public_key = PublicKey::gen(&secret_key, params.ciph_modulus(), rng)?;
        let relin_key = gen_relin_key(params, &secret_key, rng)?;
        Ok(Self {
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
}

fn gen_relin_key<R>(params: &CkksParameters, secret_key: &SecretKey, rng: &mut R) -> Result<RelinKey>
where
    R: CryptoRng + RngCore,
{
    let key_modulus = params.big_modulus() * params.ciph_modulus();
    let target = secret_key
        .s
        .multiply(&secret_key.s, None)?
        .scalar_multiply(params.big_modulus(), Some(&key_modulus));
    let (p0, p1) = rlwe::gen_switching_pair(secret_key, &target, &key_modulus, rng)?;
    debug!(
        "generated CKKS relinearization key modulo a {}-bit modulus",
        key_modulus.bits()
    );
    Ok(RelinKey { p0, p1 })
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::sampling::ERROR_ITERATIONS;

    #[test]
    fn keys_have_expected_shape() {
        let params = CkksParameters::with_bits(16, 200, 400, 20).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let keygen = CkksKeyGenerator::new(&params, &mut rng).unwrap();

        let s = keygen.secret_key().poly();
        let weight = s.coeffs().iter().filter(|c| **c != BigInt::from(0)).count();
        assert_eq!(weight, 4);

        let key_modulus = params.big_modulus() * params.ciph_modulus();
        let relin_key = keygen.relin_key();
        let phase = rlwe::phase(&relin_key.p0, &relin_key.p1, keygen.secret_key(), &key_modulus)
            .unwrap();
        let expected = s
            .multiply(s, None)
            .unwrap()
            .scalar_multiply(params.big_modulus(), None);
        let noise = phase
            .subtract(&expected, Some(&key_modulus))
            .unwrap()
            .reduce_centered(&key_modulus);
        assert!(noise.infinity_norm() <= BigInt::from(ERROR_ITERATIONS));
    }
}
