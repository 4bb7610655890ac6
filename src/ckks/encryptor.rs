use rand::{CryptoRng, RngCore};

use super::{Ciphertext, CkksParameters, Plaintext};
use crate::{
    error::Result,
    rlwe::{self, PublicKey},
};

#[derive(Clone, Debug)]
pub struct CkksEncryptor {
    params: CkksParameters,
    public_key: PublicKey,
}

impl CkksEncryptor {
    pub fn new(params: &CkksParameters, public_key: &PublicKey) -> Self {
        Self {
            params: params.clone(),
            public_key: public_key.clone(),
        }
    }

    /// Encrypts at the top-level modulus `q`, keeping the plaintext's scale.
    pub fn encrypt<R>(&self, plaintext: &Plaintext, rng: &mut R) -> Result<Ciphertext>
    where
        R: CryptoRng + RngCore,
    {
        plaintext.poly.check_degree(self.params.poly_degree())?;
        let q = self.params.ciph_modulus();
        let (c0, c1) = rlwe::encrypt_scaled(&self.public_key, &plaintext.poly.reduce(q), q, rng)?;
        Ok(Ciphertext {
            c0,
            c1,
            scaling_factor: plaintext.scaling_factor,
            modulus: q.clone(),
        })
    }
}
