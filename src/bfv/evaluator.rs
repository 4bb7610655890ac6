use log::{debug, trace};

use super::{BfvParameters, Ciphertext, Plaintext, RelinKey};
use crate::{
    error::{Error, Result},
    poly::Polynomial,
    util::is_power_of_two,
};

/// Homomorphic operations on BFV ciphertexts of one parameter set.
#[derive(Clone, Debug)]
pub struct BfvEvaluator {
    params: BfvParameters,
}

impl BfvEvaluator {
    pub fn new(params: &BfvParameters) -> Self {
        Self {
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &BfvParameters {
        &self.params
    }

    pub fn add(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check(lhs)?;
        self.check(rhs)?;
        let q = self.params.ciph_modulus();
        Ok(Ciphertext {
            c0: lhs.c0.add(&rhs.c0, Some(q))?,
            c1: lhs.c1.add(&rhs.c1, Some(q))?,
        })
    }

    pub fn subtract(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check(lhs)?;
        self.check(rhs)?;
        let q = self.params.ciph_modulus();
        Ok(Ciphertext {
            c0: lhs.c0.subtract(&rhs.c0, Some(q))?,
            c1: lhs.c1.subtract(&rhs.c1, Some(q))?,
        })
    }

    pub fn negate(&self, ciphertext: &Ciphertext) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let q = self.params.ciph_modulus();
        Ok(Ciphertext {
            c0: ciphertext.c0.negate(Some(q)),
            c1: ciphertext.c1.negate(Some(q)),
        })
    }

    pub fn add_plain(&self, ciphertext: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let q = self.params.ciph_modulus();
        let scaled = self.scale_plaintext(plaintext)?;
        Ok(Ciphertext {
            c0: ciphertext.c0.add(&scaled, Some(q))?,
            c1: ciphertext.c1.clone(),
        })
    }

    /// Multiplies by an unencrypted polynomial.  The noise grows by a factor of up to `n * t`.
    pub fn multiply_plain(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &Plaintext,
    ) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        plaintext.poly.check_degree(self.params.poly_degree())?;
        let q = self.params.ciph_modulus();
        // Centering mod t keeps the factor, and hence the noise growth, small.
        let factor = plaintext.poly.reduce_centered(self.params.plain_modulus());
        Ok(Ciphertext {
            c0: ciphertext.c0.multiply(&factor, Some(q))?,
            c1: ciphertext.c1.multiply(&factor, Some(q))?,
        })
    }

    /// The noiseless encryption `(Δ * m, 0)`.
    pub fn trivial_encrypt(&self, plaintext: &Plaintext) -> Result<Ciphertext> {
        Ok(Ciphertext {
            c0: self.scale_plaintext(plaintext)?,
            c1: Polynomial::zero(self.params.poly_degree()),
        })
    }

    /// Multiplies two ciphertexts and relinearizes the result back to two components.
    pub fn multiply(
        &self,
        lhs: &Ciphertext,
        rhs: &Ciphertext,
        relin_key: &RelinKey,
    ) -> Result<Ciphertext> {
        self.check(lhs)?;
        self.check(rhs)?;
        let q = self.params.ciph_modulus();
        let t = self.params.plain_modulus();

        // The tensor product is computed over the integers on centered representatives.
        let a0 = lhs.c0.reduce_centered(q);
        let a1 = lhs.c1.reduce_centered(q);
        let b0 = rhs.c0.reduce_centered(q);
        let b1 = rhs.c1.reduce_centered(q);

        let c0 = a0.multiply(&b0, None)?;
        let c1 = a0.multiply(&b1, None)?.add(&a1.multiply(&b0, None)?, None)?;
        let c2 = a1.multiply(&b1, None)?;

        let [c0, c1, c2] = [c0, c1, c2].map(|c| c.scale_and_round(t, q).reduce(q));
        self.relinearize(relin_key, &c0, &c1, &c2)
    }

    /// Folds the quadratic component `c2` into `(c0, c1)` using the digit decomposition of `c2`
    /// in the base of `relin_key`.
    pub fn relinearize(
        &self,
        relin_key: &RelinKey,
        c0: &Polynomial,
        c1: &Polynomial,
        c2: &Polynomial,
    ) -> Result<Ciphertext> {
        let n = self.params.poly_degree();
        let q = self.params.ciph_modulus();
        for poly in [c0, c1, c2] {
            poly.check_degree(n)?;
        }
        for (key0, key1) in &relin_key.keys {
            key0.check_degree(n)?;
            key1.check_degree(n)?;
        }

        let digits = c2
            .reduce(q)
            .base_decompose(&relin_key.base, relin_key.keys.len());
        trace!("relinearizing with {} digits", digits.len());

        let mut new_c0 = c0.reduce(q);
        let mut new_c1 = c1.reduce(q);
        for ((key0, key1), digit) in relin_key.keys.iter().zip(&digits) {
            new_c0 = new_c0.add(&key0.multiply(digit, Some(q))?, Some(q))?;
            new_c1 = new_c1.add(&key1.multiply(digit, Some(q))?, Some(q))?;
        }

        Ok(Ciphertext {
            c0: new_c0,
            c1: new_c1,
        })
    }

    /// Homomorphically divides `lhs` by `rhs`, i.e. multiplies `lhs` by the inverse of `rhs` in
    /// `\mathbb{Z}_t[X]/(X^n + 1)`.  See [`BfvEvaluator::inverse`] for the requirements.
    pub fn divide(
        &self,
        lhs: &Ciphertext,
        rhs: &Ciphertext,
        relin_key: &RelinKey,
    ) -> Result<Ciphertext> {
        let inverse = self.inverse(rhs, relin_key)?;
        self.multiply(lhs, &inverse, relin_key)
    }

    /// Computes an encryption of the inverse of the encrypted polynomial in
    /// `\mathbb{Z}_t[X]/(X^n + 1)`.
    ///
    /// Only plaintext moduli `t = 2^k` are supported; other moduli yield [`Error::Unsupported`].
    /// The encrypted polynomial `a` must be a unit, which for `t = 2^k` holds iff the sum of its
    /// coefficients is odd.  For non-units the result decrypts to garbage; this cannot be detected
    /// without the secret key.
    ///
    /// First, `a^{n-1}` is the inverse of `a` modulo 2, since `a^n = 1` for every unit of
    /// `\mathbb{F}_2[X]/(X + 1)^n`.  Then the Newton iteration `x <- x * (2 - a * x)` doubles the
    /// number of correct bits per step.  The multiplicative depth is
    /// `log2(n) + 2 * ceil(log2(k)) + 1`, so `q` has to be large accordingly.
    pub fn inverse(&self, ciphertext: &Ciphertext, relin_key: &RelinKey) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let t = self.params.plain_modulus();
        if !is_power_of_two(t) {
            return Err(Error::unsupported(format!(
                "inversion modulo t = {} (t must be a power of two)",
                t
            )));
        }
        let bits = t.bits() - 1;

        let mut inverse = self.power(ciphertext, self.params.poly_degree() - 1, relin_key)?;
        let two = self.trivial_encrypt(&Plaintext::constant(&self.params, 2))?;
        let mut precision = 1;
        while precision < bits {
            let product = self.multiply(ciphertext, &inverse, relin_key)?;
            let correction = self.subtract(&two, &product)?;
            inverse = self.multiply(&inverse, &correction, relin_key)?;
            precision *= 2;
        }
        debug!("computed inverse modulo 2^{}", bits);
        Ok(inverse)
    }

    /// Square-and-multiply exponentiation.  `exponent == 0` gives the trivial encryption of 1.
    fn power(
        &self,
        ciphertext: &Ciphertext,
        mut exponent: usize,
        relin_key: &RelinKey,
    ) -> Result<Ciphertext> {
        let mut result: Option<Ciphertext> = None;
        let mut base = ciphertext.clone();
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = Some(match result {
                    Some(result) => self.multiply(&result, &base, relin_key)?,
                    None => base.clone(),
                });
            }
            exponent >>= 1;
            if exponent > 0 {
                base = self.multiply(&base, &base, relin_key)?;
            }
        }
        match result {
            Some(result) => Ok(result),
            None => self.trivial_encrypt(&Plaintext::constant(&self.params, 1)),
        }
    }

    fn scale_plaintext(&self, plaintext: &Plaintext) -> Result<Polynomial> {
        plaintext.poly.check_degree(self.params.poly_degree())?;
        Ok(plaintext.poly.scalar_multiply(
            self.params.scaling_factor(),
            Some(self.params.ciph_modulus()),
        ))
    }

    fn check(&self, ciphertext: &Ciphertext) -> Result<()> {
        ciphertext.check_degree(self.params.poly_degree())
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_integer::Integer;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::bfv::{BfvDecryptor, BfvEncryptor, BfvKeyGenerator};

    const VEC1: [i64; 16] = [
        246, 211, 243, 250, 152, 111, 147, 153, 73, 244, 58, 61, 63, 49, 93, 168,
    ];
    const VEC2: [i64; 16] = [
        24, 122, 109, 170, 26, 28, 180, 110, 39, 223, 78, 100, 177, 114, 3, 91,
    ];

    struct Context {
        params: BfvParameters,
        keygen: BfvKeyGenerator,
        encryptor: BfvEncryptor,
        decryptor: BfvDecryptor,
        evaluator: BfvEvaluator,
        rng: ChaCha20Rng,
    }

    impl Context {
        fn new(params: BfvParameters, seed: u64) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keygen = BfvKeyGenerator::new(&params, &mut rng).unwrap();
            Self {
                encryptor: BfvEncryptor::new(&params, keygen.public_key()),
                decryptor: BfvDecryptor::new(&params, keygen.secret_key()),
                evaluator: BfvEvaluator::new(&params),
                keygen,
                params,
                rng,
            }
        }

        fn reference(seed: u64) -> Self {
            let params =
                BfvParameters::new(16, BigInt::from(256), BigInt::from(8_000_000_000_000u64))
                    .unwrap();
            Self::new(params, seed)
        }

        fn encrypt(&mut self, coeffs: &[i64]) -> Ciphertext {
            let plaintext = Plaintext::new(&self.params, coeffs).unwrap();
            self.encryptor.encrypt(&plaintext, &mut self.rng).unwrap()
        }

        fn decrypt(&self, ciphertext: &Ciphertext) -> Vec<i64> {
            let plaintext = self.decryptor.decrypt(ciphertext).unwrap();
            plaintext
                .coeffs()
                .iter()
                .map(|c| i64::try_from(c).unwrap())
                .collect()
        }
    }

    /// Negacyclic product modulo `t`.
    fn plain_multiply(lhs: &[i64], rhs: &[i64], t: i64) -> Vec<i64> {
        let n = lhs.len();
        let mut result = vec![0; n];
        for i in 0..n {
            for j in 0..n {
                let product = lhs[i] * rhs[j];
                if i + j < n {
                    result[i + j] += product;
                } else {
                    result[i + j - n] -= product;
                }
            }
        }
        result.iter().map(|c| c.rem_euclid(t)).collect()
    }

    #[test]
    fn encrypt_decrypt() {
        let mut ctx = Context::reference(0);
        let ciphertext = ctx.encrypt(&VEC1);
        assert_eq!(ctx.decrypt(&ciphertext), VEC1);
    }

    #[test]
    fn add_and_subtract() {
        let mut ctx = Context::reference(1);
        let ct1 = ctx.encrypt(&VEC1);
        let ct2 = ctx.encrypt(&VEC2);

        let sum = ctx.evaluator.add(&ct1, &ct2).unwrap();
        let expected: Vec<i64> = VEC1.iter().zip(VEC2).map(|(a, b)| (a + b) % 256).collect();
        assert_eq!(ctx.decrypt(&sum), expected);

        let difference = ctx.evaluator.subtract(&ct1, &ct2).unwrap();
        let expected: Vec<i64> = VEC1
            .iter()
            .zip(VEC2)
            .map(|(a, b)| (a - b).rem_euclid(256))
            .collect();
        assert_eq!(ctx.decrypt(&difference), expected);

        let negated = ctx.evaluator.negate(&ct1).unwrap();
        let expected: Vec<i64> = VEC1.iter().map(|a| (-a).rem_euclid(256)).collect();
        assert_eq!(ctx.decrypt(&negated), expected);
    }

    #[test]
    fn multiply() {
        let mut ctx = Context::reference(2);
        let ct1 = ctx.encrypt(&VEC1);
        let ct2 = ctx.encrypt(&VEC2);
        let product = ctx
            .evaluator
            .multiply(&ct1, &ct2, ctx.keygen.relin_key())
            .unwrap();
        assert_eq!(ctx.decrypt(&product), plain_multiply(&VEC1, &VEC2, 256));
    }

    #[test]
    fn plaintext_operations() {
        let mut ctx = Context::reference(3);
        let ct1 = ctx.encrypt(&VEC1);
        let plaintext = Plaintext::new(&ctx.params, &VEC2).unwrap();

        let sum = ctx.evaluator.add_plain(&ct1, &plaintext).unwrap();
        let expected: Vec<i64> = VEC1.iter().zip(VEC2).map(|(a, b)| (a + b) % 256).collect();
        assert_eq!(ctx.decrypt(&sum), expected);

        let small = [3, 0, 255, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];
        let plaintext = Plaintext::new(&ctx.params, &small).unwrap();
        let product = ctx.evaluator.multiply_plain(&ct1, &plaintext).unwrap();
        assert_eq!(ctx.decrypt(&product), plain_multiply(&VEC1, &small, 256));

        let trivial = ctx.evaluator.trivial_encrypt(&plaintext).unwrap();
        assert_eq!(ctx.decrypt(&trivial), small);
    }

    #[test]
    fn relinearize_keeps_two_components() {
        let mut ctx = Context::reference(4);
        let ct1 = ctx.encrypt(&VEC1);
        let ct2 = ctx.encrypt(&VEC2);
        let product = ctx
            .evaluator
            .multiply(&ct1, &ct2, ctx.keygen.relin_key())
            .unwrap();
        assert_eq!(product.c0().ring_degree(), 16);
        assert_eq!(product.c1().ring_degree(), 16);

        // A finer base gives the same plaintext.
        let relin_key = ctx
            .keygen
            .relin_key_with_base(&BigInt::from(1 << 12), &mut ctx.rng)
            .unwrap();
        let product = ctx.evaluator.multiply(&ct1, &ct2, &relin_key).unwrap();
        assert_eq!(ctx.decrypt(&product), plain_multiply(&VEC1, &VEC2, 256));
    }

    #[test]
    fn noise_budget_shrinks() {
        let mut ctx = Context::reference(5);
        let ct1 = ctx.encrypt(&VEC1);
        let ct2 = ctx.encrypt(&VEC2);
        let fresh = ctx.decryptor.invariant_noise_budget(&ct1).unwrap();
        assert!(fresh > 0);

        let product = ctx
            .evaluator
            .multiply(&ct1, &ct2, ctx.keygen.relin_key())
            .unwrap();
        let after = ctx.decryptor.invariant_noise_budget(&product).unwrap();
        assert!(after < fresh);

        let trivial = ctx
            .evaluator
            .trivial_encrypt(&Plaintext::new(&ctx.params, &VEC1).unwrap())
            .unwrap();
        assert!(ctx.decryptor.invariant_noise_budget(&trivial).unwrap() >= fresh);
    }

    #[test]
    fn degree_mismatch_is_rejected() {
        let mut ctx = Context::reference(6);
        let small_params =
            BfvParameters::new(8, BigInt::from(256), BigInt::from(8_000_000_000_000u64)).unwrap();
        let mut small = Context::new(small_params, 7);
        let ct1 = ctx.encrypt(&VEC1);
        let ct2 = small.encrypt(&VEC1[..8]);
        assert!(matches!(
            ctx.evaluator.add(&ct1, &ct2),
            Err(Error::DegreeMismatch {
                expected: 16,
                found: 8
            })
        ));
        assert!(ctx.decryptor.decrypt(&ct2).is_err());
        let plaintext = Plaintext::new(&small.params, &VEC1[..8]).unwrap();
        assert!(ctx.encryptor.encrypt(&plaintext, &mut ctx.rng).is_err());
        assert!(Plaintext::new(&ctx.params, &VEC1[..8]).is_err());
    }

    #[test]
    fn divide_by_unit() {
        let params = BfvParameters::new(4, BigInt::from(16), BigInt::from(1) << 400).unwrap();
        let mut ctx = Context::new(params, 8);
        let dividend = [5, 7, 1, 12];
        let divisor = [3, 2, 1, 1];
        let t = ctx.params.plain_modulus();
        assert!(Polynomial::from_i64s(&divisor).evaluate_at_one_mod(t).is_odd());
        let ct1 = ctx.encrypt(&dividend);
        let ct2 = ctx.encrypt(&divisor);

        let quotient = ctx
            .evaluator
            .divide(&ct1, &ct2, ctx.keygen.relin_key())
            .unwrap();
        let quotient = ctx.decrypt(&quotient);
        assert_eq!(plain_multiply(&quotient, &divisor, 16), dividend);
    }

    #[test]
    fn inverse_requires_power_of_two_modulus() {
        let params =
            BfvParameters::new(4, BigInt::from(17), BigInt::from(1) << 100).unwrap();
        let mut ctx = Context::new(params, 9);
        let ct = ctx.encrypt(&[1, 0, 0, 0]);
        assert!(matches!(
            ctx.evaluator.inverse(&ct, ctx.keygen.relin_key()),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn ciphertext_serde_roundtrip() {
        let mut ctx = Context::reference(10);
        let ciphertext = ctx.encrypt(&VEC1);
        let bytes = bincode::serialize(&ciphertext).unwrap();
        let roundtrip: Ciphertext = bincode::deserialize(&bytes).unwrap();
        assert_eq!(ciphertext, roundtrip);

        let bytes = bincode::serialize(ctx.keygen.relin_key()).unwrap();
        let roundtrip: RelinKey = bincode::deserialize(&bytes).unwrap();
        assert_eq!(*ctx.keygen.relin_key(), roundtrip);
    }

    #[test]
    fn malformed_relin_key_is_rejected() {
        let ctx = Context::reference(11);
        let json = serde_json::to_value(ctx.keygen.relin_key()).unwrap();

        for base in ["0", "1", "-5"] {
            let mut bad = json.clone();
            bad["base"] = serde_json::Value::from(base);
            assert!(serde_json::from_value::<RelinKey>(bad).is_err());
        }
        let mut bad = json.clone();
        bad["keys"] = serde_json::Value::Array(vec![]);
        assert!(serde_json::from_value::<RelinKey>(bad).is_err());

        let roundtrip: RelinKey = serde_json::from_value(json).unwrap();
        assert_eq!(*ctx.keygen.relin_key(), roundtrip);
    }
}
