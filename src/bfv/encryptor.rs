use rand::{CryptoRng, RngCore};

use super::{BfvParameters, Ciphertext, Plaintext};
use crate::{
    error::Result,
    rlwe::{self, PublicKey},
};

#[derive(Clone, Debug)]
pub struct BfvEncryptor {
    params: BfvParameters,
    public_key: PublicKey,
}

impl BfvEncryptor {
    pub fn new(params: &BfvParameters, public_key: &PublicKey) -> Self {
        Self {
            params: params.clone(),
            public_key: public_key.clone(),
        }
    }

    /// Encrypts `plaintext` as `(p0 * u + e1 + Δ * m, p1 * u + e2) mod q`.
    pub fn encrypt<R>(&self, plaintext: &Plaintext, rng: &mut R) -> Result<Ciphertext>
    where
        R: CryptoRng + RngCore,
    {
        plaintext.poly.check_degree(self.params.poly_degree())?;
        let q = self.params.ciph_modulus();
        let scaled = plaintext
            .poly
            .scalar_multiply(self.params.scaling_factor(), Some(q));
        let (c0, c1) = rlwe::encrypt_scaled(&self.public_key, &scaled, q, rng)?;
        Ok(Ciphertext { c0, c1 })
    }
}
