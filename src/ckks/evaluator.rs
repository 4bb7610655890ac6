use std::borrow::Cow;

use log::{debug, warn};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, Signed, ToPrimitive};

use super::{Ciphertext, CkksParameters, Plaintext, RelinKey};
use crate::{
    error::{Error, Result},
    poly::Polynomial,
};

/// Relative difference below which two scales count as equal.
const SCALE_TOLERANCE: f64 = 1e-9;

/// Homomorphic operations on CKKS ciphertexts of one parameter set.
#[derive(Clone, Debug)]
pub struct CkksEvaluator {
    params: CkksParameters,
}

impl CkksEvaluator {
    pub fn new(params: &CkksParameters) -> Self {
        Self {
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &CkksParameters {
        &self.params
    }

    pub fn add(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check_compatible(lhs, rhs)?;
        check_scale(lhs.scaling_factor, rhs.scaling_factor)?;
        let modulus = &lhs.modulus;
        Ok(Ciphertext {
            c0: lhs.c0.add(&rhs.c0, Some(modulus))?,
            c1: lhs.c1.add(&rhs.c1, Some(modulus))?,
            scaling_factor: lhs.scaling_factor,
            modulus: modulus.clone(),
        })
    }

    pub fn subtract(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check_compatible(lhs, rhs)?;
        check_scale(lhs.scaling_factor, rhs.scaling_factor)?;
        let modulus = &lhs.modulus;
        Ok(Ciphertext {
            c0: lhs.c0.subtract(&rhs.c0, Some(modulus))?,
            c1: lhs.c1.subtract(&rhs.c1, Some(modulus))?,
            scaling_factor: lhs.scaling_factor,
            modulus: modulus.clone(),
        })
    }

    pub fn negate(&self, ciphertext: &Ciphertext) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let modulus = &ciphertext.modulus;
        Ok(Ciphertext {
            c0: ciphertext.c0.negate(Some(modulus)),
            c1: ciphertext.c1.negate(Some(modulus)),
            scaling_factor: ciphertext.scaling_factor,
            modulus: modulus.clone(),
        })
    }

    pub fn add_plain(&self, ciphertext: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        check_scale(ciphertext.scaling_factor, plaintext.scaling_factor)?;
        let modulus = &ciphertext.modulus;
        Ok(Ciphertext {
            c0: ciphertext.c0.add(&plaintext.poly, Some(modulus))?,
            c1: ciphertext.c1.clone(),
            scaling_factor: ciphertext.scaling_factor,
            modulus: modulus.clone(),
        })
    }

    /// Multiplies by an encoded message.  The result has the product of both scales.
    pub fn multiply_plain(
        &self,
        ciphertext: &Ciphertext,
        plaintext: &Plaintext,
    ) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let modulus = &ciphertext.modulus;
        let scaling_factor = ciphertext.scaling_factor * plaintext.scaling_factor;
        self.warn_on_low_headroom(scaling_factor, modulus);
        Ok(Ciphertext {
            c0: ciphertext.c0.multiply(&plaintext.poly, Some(modulus))?,
            c1: ciphertext.c1.multiply(&plaintext.poly, Some(modulus))?,
            scaling_factor,
            modulus: modulus.clone(),
        })
    }

    /// Multiplies two ciphertexts at the same modulus and relinearizes the result.  The result has
    /// the product of both scales; follow up with [`CkksEvaluator::rescale`].
    pub fn multiply(
        &self,
        lhs: &Ciphertext,
        rhs: &Ciphertext,
        relin_key: &RelinKey,
    ) -> Result<Ciphertext> {
        self.check_compatible(lhs, rhs)?;
        let modulus = &lhs.modulus;

        let c0 = lhs.c0.multiply(&rhs.c0, Some(modulus))?;
        let c1 = lhs
            .c0
            .multiply(&rhs.c1, Some(modulus))?
            .add(&lhs.c1.multiply(&rhs.c0, Some(modulus))?, Some(modulus))?;
        let c2 = lhs.c1.multiply(&rhs.c1, Some(modulus))?;

        let scaling_factor = lhs.scaling_factor * rhs.scaling_factor;
        self.warn_on_low_headroom(scaling_factor, modulus);
        self.relinearize(relin_key, &c0, &c1, &c2, scaling_factor, modulus)
    }

    /// Turns the three-component ciphertext `(c0, c1, c2)` at `modulus` into `(c0', c1')` with the
    /// same plaintext, using the key for `s^2` and division by the special modulus `P`.
    pub fn relinearize(
        &self,
        relin_key: &RelinKey,
        c0: &Polynomial,
        c1: &Polynomial,
        c2: &Polynomial,
        scaling_factor: f64,
        modulus: &BigInt,
    ) -> Result<Ciphertext> {
        let n = self.params.poly_degree();
        for poly in [c0, c1, c2, &relin_key.p0, &relin_key.p1] {
            poly.check_degree(n)?;
        }

        let big_modulus = self.params.big_modulus();
        let key_modulus = modulus * big_modulus;
        let switch = |key: &Polynomial| -> Result<Polynomial> {
            Ok(key
                .multiply(c2, Some(&key_modulus))?
                .reduce_centered(&key_modulus)
                .divide_round(big_modulus))
        };

        Ok(Ciphertext {
            c0: switch(&relin_key.p0)?.add(c0, Some(modulus))?,
            c1: switch(&relin_key.p1)?.add(c1, Some(modulus))?,
            scaling_factor,
            modulus: modulus.clone(),
        })
    }

    /// Divides the ciphertext by `division_factor`, which must divide the current modulus.  Both
    /// the scale and the modulus shrink by that factor.
    pub fn rescale(&self, ciphertext: &Ciphertext, division_factor: &BigInt) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let modulus = &ciphertext.modulus;
        let new_modulus = divide_modulus(modulus, division_factor)?;

        let divide = |poly: &Polynomial| {
            poly.reduce_centered(modulus)
                .divide_round(division_factor)
                .reduce(&new_modulus)
        };
        let scaling_factor =
            ciphertext.scaling_factor / division_factor.to_f64().unwrap_or(f64::INFINITY);
        debug!(
            "rescaled from {} to {} bits, new scale 2^{:.1}",
            modulus.bits(),
            new_modulus.bits(),
            scaling_factor.log2()
        );

        Ok(Ciphertext {
            c0: divide(&ciphertext.c0),
            c1: divide(&ciphertext.c1),
            scaling_factor,
            modulus: new_modulus,
        })
    }

    /// Switches to the modulus `modulus / division_factor` without changing the scale.
    pub fn lower_modulus(
        &self,
        ciphertext: &Ciphertext,
        division_factor: &BigInt,
    ) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let new_modulus = divide_modulus(&ciphertext.modulus, division_factor)?;
        Ok(Ciphertext {
            c0: ciphertext.c0.reduce(&new_modulus),
            c1: ciphertext.c1.reduce(&new_modulus),
            scaling_factor: ciphertext.scaling_factor,
            modulus: new_modulus,
        })
    }

    /// Computes an approximation of `1 / a` for every slot value `a` in `(0, 2)` with the
    /// Goldschmidt iteration: with `b = 1 - a`, `x = (1 + b)(1 + b^2)(1 + b^4)...` satisfies
    /// `a * x = 1 - b^{2^{k+1}}` after `k` steps.
    ///
    /// The input should be at scale `Δ`.  Every step costs one rescaling, and the result ends up at
    /// modulus `q' / Δ^{iterations + 1}` for input modulus `q'`, which must still exceed `Δ`.
    pub fn inverse(
        &self,
        ciphertext: &Ciphertext,
        relin_key: &RelinKey,
        iterations: usize,
    ) -> Result<Ciphertext> {
        self.check(ciphertext)?;
        let delta = self.params.scaling_factor();

        let mut b = self.add_plain(&self.negate(ciphertext)?, &self.one(ciphertext.scaling_factor))?;
        let mut x = self.add_plain(&b, &self.one(b.scaling_factor))?;
        for _ in 0..iterations {
            b = self.rescale(&self.multiply(&b, &b, relin_key)?, delta)?;
            let factor = self.add_plain(&b, &self.one(b.scaling_factor))?;
            let product = {
                let (lhs, rhs) = self.align_moduli(&x, &factor)?;
                self.multiply(&lhs, &rhs, relin_key)?
            };
            x = self.rescale(&product, delta)?;
        }
        Ok(x)
    }

    /// Lowers the ciphertext with the larger modulus to the modulus of the other one.
    fn align_moduli<'a>(
        &self,
        lhs: &'a Ciphertext,
        rhs: &'a Ciphertext,
    ) -> Result<(Cow<'a, Ciphertext>, Cow<'a, Ciphertext>)> {
        if lhs.modulus > rhs.modulus {
            let factor = &lhs.modulus / &rhs.modulus;
            Ok((Cow::Owned(self.lower_modulus(lhs, &factor)?), Cow::Borrowed(rhs)))
        } else if lhs.modulus < rhs.modulus {
            let factor = &rhs.modulus / &lhs.modulus;
            Ok((Cow::Borrowed(lhs), Cow::Owned(self.lower_modulus(rhs, &factor)?)))
        } else {
            Ok((Cow::Borrowed(lhs), Cow::Borrowed(rhs)))
        }
    }

    /// The constant 1 encoded at `scaling_factor`: every slot of `round(scaling_factor)` is 1.
    fn one(&self, scaling_factor: f64) -> Plaintext {
        let value = BigInt::from_f64(scaling_factor.round()).unwrap_or_default();
        Plaintext {
            poly: Polynomial::constant(self.params.poly_degree(), value),
            scaling_factor,
        }
    }

    fn warn_on_low_headroom(&self, scaling_factor: f64, modulus: &BigInt) {
        let headroom = modulus.bits() as f64 - scaling_factor.log2();
        if headroom < self.params.scaling_factor_bits() as f64 {
            warn!(
                "scale 2^{:.1} leaves only {:.1} bits below the {}-bit modulus",
                scaling_factor.log2(),
                headroom,
                modulus.bits()
            );
        }
    }

    fn check(&self, ciphertext: &Ciphertext) -> Result<()> {
        ciphertext.check_degree(self.params.poly_degree())
    }

    fn check_compatible(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<()> {
        self.check(lhs)?;
        self.check(rhs)?;
        if lhs.modulus != rhs.modulus {
            return Err(Error::ModulusMismatch {
                lhs: lhs.modulus.clone(),
                rhs: rhs.modulus.clone(),
            });
        }
        Ok(())
    }
}

fn check_scale(lhs: f64, rhs: f64) -> Result<()> {
    if (lhs - rhs).abs() <= SCALE_TOLERANCE * lhs.abs().max(rhs.abs()) {
        Ok(())
    } else {
        Err(Error::ScaleMismatch { lhs, rhs })
    }
}

fn divide_modulus(modulus: &BigInt, division_factor: &BigInt) -> Result<BigInt> {
    if !division_factor.is_positive() {
        return Err(Error::unsupported(format!(
            "division by non-positive factor {}",
            division_factor
        )));
    }
    let (quotient, remainder) = modulus.div_rem(division_factor);
    if remainder.is_positive() || quotient < BigInt::from(2) {
        return Err(Error::unsupported(format!(
            "factor {} does not leave a proper divisor of modulus {}",
            division_factor, modulus
        )));
    }
    Ok(quotient)
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::ckks::{CkksDecryptor, CkksEncoder, CkksEncryptor, CkksKeyGenerator};

    struct Context {
        params: CkksParameters,
        keygen: CkksKeyGenerator,
        encoder: CkksEncoder,
        encryptor: CkksEncryptor,
        decryptor: CkksDecryptor,
        evaluator: CkksEvaluator,
        rng: ChaCha20Rng,
    }

    impl Context {
        fn new(seed: u64) -> Self {
            let params = CkksParameters::with_bits(8, 600, 1200, 30).unwrap();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keygen = CkksKeyGenerator::new(&params, &mut rng).unwrap();
            Self {
                encoder: CkksEncoder::new(&params),
                encryptor: CkksEncryptor::new(&params, keygen.public_key()),
                decryptor: CkksDecryptor::new(&params, keygen.secret_key()),
                evaluator: CkksEvaluator::new(&params),
                keygen,
                params,
                rng,
            }
        }

        fn encrypt(&mut self, values: &[Complex64]) -> Ciphertext {
            let plaintext = self.encoder.encode(values, self.params.scale()).unwrap();
            self.encryptor.encrypt(&plaintext, &mut self.rng).unwrap()
        }

        fn decrypt(&self, ciphertext: &Ciphertext) -> Vec<Complex64> {
            let plaintext = self.decryptor.decrypt(ciphertext).unwrap();
            self.encoder.decode(&plaintext).unwrap()
        }
    }

    fn message1() -> Vec<Complex64> {
        vec![
            Complex64::new(0.5, 0.0),
            Complex64::new(0.3, 0.2),
            Complex64::new(0.78, 0.0),
            Complex64::new(0.0, 0.88),
        ]
    }

    fn message2() -> Vec<Complex64> {
        vec![
            Complex64::new(0.2, 0.0),
            Complex64::new(0.11, 0.0),
            Complex64::new(0.4, 0.67),
            Complex64::new(0.9, 0.99),
        ]
    }

    fn assert_close(actual: &[Complex64], expected: &[Complex64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).norm() < tolerance, "{} is not close to {}", a, e);
        }
    }

    #[test]
    fn encrypt_decrypt() {
        let mut ctx = Context::new(0);
        let ciphertext = ctx.encrypt(&message1());
        assert_eq!(*ciphertext.modulus(), BigInt::from(1) << 600);
        assert_close(&ctx.decrypt(&ciphertext), &message1(), 1e-5);
    }

    #[test]
    fn add_and_subtract() {
        let mut ctx = Context::new(1);
        let ct1 = ctx.encrypt(&message1());
        let ct2 = ctx.encrypt(&message2());

        let sum = ctx.evaluator.add(&ct1, &ct2).unwrap();
        let expected: Vec<_> = message1().iter().zip(message2()).map(|(a, b)| a + b).collect();
        assert_close(&ctx.decrypt(&sum), &expected, 1e-4);

        let difference = ctx.evaluator.subtract(&ct1, &ct2).unwrap();
        let expected: Vec<_> = message1().iter().zip(message2()).map(|(a, b)| a - b).collect();
        assert_close(&ctx.decrypt(&difference), &expected, 1e-4);

        let negated = ctx.evaluator.negate(&ct1).unwrap();
        let expected: Vec<_> = message1().iter().map(|a| -a).collect();
        assert_close(&ctx.decrypt(&negated), &expected, 1e-4);
    }

    #[test]
    fn multiply_and_rescale() {
        let mut ctx = Context::new(2);
        let ct1 = ctx.encrypt(&message1());
        let ct2 = ctx.encrypt(&message2());
        let expected: Vec<_> = message1().iter().zip(message2()).map(|(a, b)| a * b).collect();

        let product = ctx
            .evaluator
            .multiply(&ct1, &ct2, ctx.keygen.relin_key())
            .unwrap();
        assert_eq!(product.scaling_factor(), ctx.params.scale() * ctx.params.scale());
        assert_close(&ctx.decrypt(&product), &expected, 1e-4);

        let rescaled = ctx
            .evaluator
            .rescale(&product, ctx.params.scaling_factor())
            .unwrap();
        assert_eq!(rescaled.scaling_factor(), ctx.params.scale());
        assert_eq!(*rescaled.modulus(), BigInt::from(1) << 570);
        assert_close(&ctx.decrypt(&rescaled), &expected, 1e-4);
    }

    #[test]
    fn plaintext_operations() {
        let mut ctx = Context::new(3);
        let ct1 = ctx.encrypt(&message1());
        let plaintext = ctx.encoder.encode(&message2(), ctx.params.scale()).unwrap();

        let sum = ctx.evaluator.add_plain(&ct1, &plaintext).unwrap();
        let expected: Vec<_> = message1().iter().zip(message2()).map(|(a, b)| a + b).collect();
        assert_close(&ctx.decrypt(&sum), &expected, 1e-4);

        let product = ctx.evaluator.multiply_plain(&ct1, &plaintext).unwrap();
        let product = ctx
            .evaluator
            .rescale(&product, ctx.params.scaling_factor())
            .unwrap();
        let expected: Vec<_> = message1().iter().zip(message2()).map(|(a, b)| a * b).collect();
        assert_close(&ctx.decrypt(&product), &expected, 1e-4);
    }

    #[test]
    fn lower_modulus_keeps_message() {
        let mut ctx = Context::new(4);
        let ct1 = ctx.encrypt(&message1());
        let lowered = ctx
            .evaluator
            .lower_modulus(&ct1, &(BigInt::from(1) << 100))
            .unwrap();
        assert_eq!(*lowered.modulus(), BigInt::from(1) << 500);
        assert_eq!(lowered.scaling_factor(), ct1.scaling_factor());
        assert_close(&ctx.decrypt(&lowered), &message1(), 1e-5);
    }

    #[test]
    fn mismatches_are_rejected() {
        let mut ctx = Context::new(5);
        let ct1 = ctx.encrypt(&message1());
        let ct2 = ctx.encrypt(&message2());

        let lowered = ctx
            .evaluator
            .lower_modulus(&ct2, ctx.params.scaling_factor())
            .unwrap();
        assert!(matches!(
            ctx.evaluator.add(&ct1, &lowered),
            Err(Error::ModulusMismatch { .. })
        ));
        assert!(matches!(
            ctx.evaluator.multiply(&ct1, &lowered, ctx.keygen.relin_key()),
            Err(Error::ModulusMismatch { .. })
        ));

        let plaintext = ctx.encoder.encode(&message2(), 1024.0).unwrap();
        let rescaled = ctx.encryptor.encrypt(&plaintext, &mut ctx.rng).unwrap();
        assert!(matches!(
            ctx.evaluator.add(&ct1, &rescaled),
            Err(Error::ScaleMismatch { .. })
        ));
        assert!(matches!(
            ctx.evaluator.add_plain(&ct1, &plaintext),
            Err(Error::ScaleMismatch { .. })
        ));

        assert!(matches!(
            ctx.evaluator.rescale(&ct1, &BigInt::from(3)),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn inverse_approximates_reciprocal() {
        let mut ctx = Context::new(6);
        let values = [0.5, 0.8, 1.25, 1.6];
        let plaintext = ctx.encoder.encode_real(&values, ctx.params.scale()).unwrap();
        let ciphertext = ctx.encryptor.encrypt(&plaintext, &mut ctx.rng).unwrap();

        let inverse = ctx
            .evaluator
            .inverse(&ciphertext, ctx.keygen.relin_key(), 6)
            .unwrap();
        let expected: Vec<_> = values.iter().map(|v| Complex64::new(1.0 / v, 0.0)).collect();
        assert_close(&ctx.decrypt(&inverse), &expected, 1e-3);
    }

    #[test]
    fn ciphertext_serde_roundtrip() {
        let mut ctx = Context::new(7);
        let ciphertext = ctx.encrypt(&message1());
        let bytes = bincode::serialize(&ciphertext).unwrap();
        let roundtrip: Ciphertext = bincode::deserialize(&bytes).unwrap();
        assert_eq!(ciphertext, roundtrip);
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let mut ctx = Context::new(8);
        let ciphertext = ctx.encrypt(&message1());
        let json = serde_json::to_value(&ciphertext).unwrap();

        for modulus in ["0", "1", "-7"] {
            let mut bad = json.clone();
            bad["modulus"] = serde_json::Value::from(modulus);
            assert!(serde_json::from_value::<Ciphertext>(bad).is_err());
        }
        for scale in [0.0, 0.25, -1e9] {
            let mut bad = json.clone();
            bad["scaling_factor"] = serde_json::Value::from(scale);
            assert!(serde_json::from_value::<Ciphertext>(bad).is_err());
        }

        let roundtrip: Ciphertext = serde_json::from_value(json).unwrap();
        assert_eq!(ctx.decrypt(&roundtrip), ctx.decrypt(&ciphertext));
    }

    #[test]
    fn malformed_plaintext_is_rejected() {
        let ctx = Context::new(9);
        let plaintext = ctx.encoder.encode(&message1(), ctx.params.scale()).unwrap();
        let mut json = serde_json::to_value(&plaintext).unwrap();
        json["scaling_factor"] = serde_json::Value::from(0.0);
        assert!(serde_json::from_value::<Plaintext>(json).is_err());
        assert!(Plaintext::new(plaintext.poly().clone(), f64::NAN).is_err());
    }
}
