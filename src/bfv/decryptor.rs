use super::{BfvParameters, Ciphertext, Plaintext};
use crate::{
    error::Result,
    poly::Polynomial,
    rlwe::{self, SecretKey},
};

#[derive(Clone, Debug)]
pub struct BfvDecryptor {
    params: BfvParameters,
    secret_key: SecretKey,
}

impl BfvDecryptor {
    pub fn new(params: &BfvParameters, secret_key: &SecretKey) -> Self {
        Self {
            params: params.clone(),
            secret_key: secret_key.clone(),
        }
    }

    /// Decrypts as `round(t * (c0 + c1 * s mod q) / q) mod t`.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Plaintext> {
        let t = self.params.plain_modulus();
        let poly = self
            .phase(ciphertext)?
            .scale_and_round(t, self.params.ciph_modulus())
            .reduce(t);
        Ok(Plaintext { poly })
    }

    /// Bits of noise that can still be added before decryption fails: `log2(q) - log2(|v|) - 1`,
    /// where `v = t * (c0 + c1 * s)` centered modulo `q`.  Zero means the ciphertext no longer
    /// decrypts reliably.
    pub fn invariant_noise_budget(&self, ciphertext: &Ciphertext) -> Result<u64> {
        let q = self.params.ciph_modulus();
        let noise = self
            .phase(ciphertext)?
            .scalar_multiply(self.params.plain_modulus(), None)
            .reduce_centered(q)
            .infinity_norm();
        Ok(q.bits().saturating_sub(noise.bits() + 1))
    }

    fn phase(&self, ciphertext: &Ciphertext) -> Result<Polynomial> {
        ciphertext.check_degree(self.params.poly_degree())?;
        rlwe::phase(
            &ciphertext.c0,
            &ciphertext.c1,
            &self.secret_key,
            self.params.ciph_modulus(),
        )
    }
}
