use super::{Ciphertext, CkksParameters, Plaintext};
use crate::{
    error::Result,
    rlwe::{self, SecretKey},
};

#[derive(Clone, Debug)]
pub struct CkksDecryptor {
    params: CkksParameters,
    secret_key: SecretKey,
}

impl CkksDecryptor {
    pub fn new(params: &CkksParameters, secret_key: &SecretKey) -> Self {
        Self {
            params: params.clone(),
            secret_key: secret_key.clone(),
        }
    }

    /// Returns `c0 + c1 * s`, centered modulo the ciphertext's current modulus, at the
    /// ciphertext's scale.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Plaintext> {
        ciphertext.check_degree(self.params.poly_degree())?;
        let modulus = &ciphertext.modulus;
        let poly = rlwe::phase(&ciphertext.c0, &ciphertext.c1, &self.secret_key, modulus)?
            .reduce_centered(modulus);
        Ok(Plaintext {
            poly,
            scaling_factor: ciphertext.scaling_factor,
        })
    }
}
